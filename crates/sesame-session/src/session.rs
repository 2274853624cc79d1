//! The session: one authentication domain's login state machine.
//!
//! A [`Session`] sits between the application and an [`Authenticator`]:
//!
//! - **login / logout / reset** move it between `LoggedOut` and `LoggedIn`
//! - **manage_request_conf** decorates every outgoing request
//! - **handle_http_response** watches responses for auth failures
//!
//! and it drives the navigation side effects of those transitions:
//!
//! ```text
//!   LoggedOut ──login(accepted)──→ LoggedIn      redirect: saved path or post_login_path
//!   LoggedOut ──login(denied|error)─→ LoggedOut  no redirect
//!   LoggedIn ──logout──→ LoggedOut               redirect: login_path
//!   LoggedIn ──response(auth failure)──→ LoggedOut
//!                                                save current path, redirect: login_path
//! ```
//!
//! # Concurrency note
//!
//! The mutable part of a session lives behind one mutex that is never held
//! across an `.await` or a call into the navigator. Store writes happen
//! inside it, so the stored login always matches the in-memory state. A
//! login handshake runs unlocked and its outcome is applied in a single
//! locked step, so an auth failure racing a fresh login resolves as "last
//! transition wins". Login attempts are not queued; callers that need a
//! deterministic order must not start a second login while one is
//! outstanding.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sesame_auth::{AuthState, Authenticator, LoginResult};
use sesame_transport::{RequestConf, Response};

use crate::{LoginState, Navigator, SessionConfig, SessionError, SessionStore};

// ---------------------------------------------------------------------------
// LoginCallbacks
// ---------------------------------------------------------------------------

type Callback<S> = Box<dyn FnOnce(&LoginResult<S>) + Send>;

/// Optional per-outcome hooks for [`Session::login_with`].
///
/// Exactly one of them runs per login attempt; a missing one is skipped.
pub struct LoginCallbacks<S> {
    accepted: Option<Callback<S>>,
    denied: Option<Callback<S>>,
    error: Option<Callback<S>>,
}

impl<S> Default for LoginCallbacks<S> {
    fn default() -> Self {
        Self {
            accepted: None,
            denied: None,
            error: None,
        }
    }
}

impl<S> LoginCallbacks<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_accepted(mut self, f: impl FnOnce(&LoginResult<S>) + Send + 'static) -> Self {
        self.accepted = Some(Box::new(f));
        self
    }

    pub fn on_denied(mut self, f: impl FnOnce(&LoginResult<S>) + Send + 'static) -> Self {
        self.denied = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&LoginResult<S>) + Send + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    fn fire(self, result: &LoginResult<S>) {
        let callback = match result {
            LoginResult::Accepted(_) => self.accepted,
            LoginResult::Denied(_) => self.denied,
            LoginResult::Error(_) => self.error,
        };
        if let Some(callback) = callback {
            callback(result);
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// What the store holds for a logged-in session.
#[derive(Deserialize)]
struct PersistedLogin<S> {
    user: String,
    state: S,
}

/// Borrowed twin of [`PersistedLogin`] for writing.
#[derive(Serialize)]
struct PersistedLoginRef<'a, S> {
    user: &'a str,
    state: &'a S,
}

/// Mutable part of a session.
struct Inner<S> {
    login_state: LoginState<S>,
    /// Path the user was on when an auth failure logged them out.
    pre_failure_path: Option<String>,
}

/// Login state for one authentication domain.
///
/// Built with [`Session::builder`] and shared by `Arc`: the application,
/// the resource layer and the [`SessionRegistry`](crate::SessionRegistry)
/// all hold the same session.
pub struct Session<A: Authenticator> {
    authenticator: Arc<A>,
    navigator: Arc<dyn Navigator>,
    store: Option<Arc<dyn SessionStore>>,
    config: SessionConfig,
    persistence_key: String,
    inner: Mutex<Inner<A::State>>,
}

impl<A: Authenticator> Session<A> {
    /// Starts building a session around a shared authenticator.
    pub fn builder(authenticator: Arc<A>, navigator: Arc<dyn Navigator>) -> SessionBuilder<A> {
        SessionBuilder {
            authenticator,
            navigator,
            store: None,
            config: SessionConfig::default(),
        }
    }

    // -- Queries ----------------------------------------------------------

    /// The persistence key, `<session_name>-<auth type>`. Also used as the
    /// routing key on decorated requests.
    pub fn cookie_key(&self) -> &str {
        &self.persistence_key
    }

    pub fn logged_in(&self) -> bool {
        self.inner.lock().login_state.is_logged_in()
    }

    pub fn user_name(&self) -> Option<String> {
        self.inner.lock().login_state.user().map(str::to_string)
    }

    /// A snapshot of the current login state.
    pub fn login_state(&self) -> LoginState<A::State> {
        self.inner.lock().login_state.clone()
    }

    /// The page an auth failure interrupted, if a login has not consumed
    /// it yet.
    pub fn pre_failure_path(&self) -> Option<String> {
        self.inner.lock().pre_failure_path.clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn authenticator(&self) -> &Arc<A> {
        &self.authenticator
    }

    // -- Transitions ------------------------------------------------------

    /// Logs in without callbacks. See [`login_with`](Self::login_with).
    pub async fn login(&self, credentials: A::Credentials) -> LoginResult<A::State> {
        self.login_with(credentials, LoginCallbacks::new()).await
    }

    /// Runs the authenticator's handshake and applies its outcome.
    ///
    /// - **Accepted**: the session becomes `LoggedIn`, the login is
    ///   persisted, and the user is redirected (history replaced) to the
    ///   page an auth failure interrupted, or to `post_login_path`.
    /// - **Denied** / **Error**: nothing changes and nothing navigates.
    ///
    /// The matching callback fires after the state change, and the result
    /// is returned as well.
    pub async fn login_with(
        &self,
        credentials: A::Credentials,
        callbacks: LoginCallbacks<A::State>,
    ) -> LoginResult<A::State> {
        let result = self.authenticator.check_login(credentials).await;

        match &result {
            LoginResult::Accepted(state) => self.accept(state.clone()),
            LoginResult::Denied(msg) => {
                tracing::info!(key = %self.persistence_key, %msg, "login denied");
            }
            LoginResult::Error(msg) => {
                tracing::warn!(key = %self.persistence_key, %msg, "login failed");
            }
        }

        callbacks.fire(&result);
        result
    }

    /// Drops the login and sends the user to `login_path`.
    ///
    /// An explicit logout is not a failure, so nothing is remembered for
    /// the next login to return to.
    pub fn logout(&self) {
        self.reset();
        tracing::info!(key = %self.persistence_key, "logged out");
        self.redirect(&self.config.login_path);
    }

    /// Drops the login without navigating.
    pub fn reset(&self) {
        let was_logged_in = self.clear(&mut self.inner.lock());
        if was_logged_in {
            tracing::debug!(key = %self.persistence_key, "session reset");
        }
    }

    /// Tags a request with this session's routing key and, when logged in,
    /// lets the authenticator add its credentials.
    pub fn manage_request_conf(&self, conf: &mut RequestConf) {
        conf.routing_key = Some(self.persistence_key.clone());

        // Clone out so the authenticator runs without the lock.
        let state = self.inner.lock().login_state.state().cloned();
        if let Some(state) = state {
            self.authenticator.add_auth_to_request_conf(conf, &state);
            tracing::debug!(key = %self.persistence_key, url = %conf.url, "request decorated");
        }
    }

    /// Reacts to a response to one of this session's requests.
    ///
    /// If the authenticator classifies it as an auth failure, the current
    /// path is saved for the next login, the session resets, and the user
    /// is redirected to `login_path`. A missing response (the request never
    /// got one) is never an auth failure.
    pub fn handle_http_response(&self, response: Option<&Response>) {
        let Some(response) = response else {
            return;
        };
        if !self.authenticator.check_response(response).auth_failure {
            return;
        }

        let current = self.navigator.path();
        {
            let mut inner = self.inner.lock();
            // Returning to the login page after logging in would be a loop.
            if current != self.config.login_path {
                inner.pre_failure_path = Some(current);
            }
            self.clear(&mut inner);
        }

        tracing::info!(
            key = %self.persistence_key,
            status = response.status.as_u16(),
            "auth failure, redirecting to login"
        );
        self.redirect(&self.config.login_path);
    }

    // -- Internals --------------------------------------------------------

    fn accept(&self, state: A::State) {
        let user = state.user().to_string();
        let persisted = self.serialize_login(&user, &state);

        let saved = {
            let mut inner = self.inner.lock();
            match (&self.store, persisted) {
                (Some(store), Ok(value)) => store.set(&self.persistence_key, value),
                (Some(_), Err(e)) => tracing::warn!(error = %e, "login will not survive a restart"),
                (None, _) => {}
            }
            inner.login_state = LoginState::LoggedIn {
                user: user.clone(),
                state,
            };
            inner.pre_failure_path.take()
        };

        tracing::info!(key = %self.persistence_key, %user, "login accepted");
        let target = saved.unwrap_or_else(|| self.config.post_login_path.clone());
        self.redirect(&target);
    }

    /// Logs out in place and forgets the stored login. Returns whether the
    /// session was logged in.
    fn clear(&self, inner: &mut Inner<A::State>) -> bool {
        let was_logged_in = inner.login_state.is_logged_in();
        inner.login_state = LoginState::LoggedOut;
        if let Some(store) = &self.store {
            store.remove(&self.persistence_key);
        }
        was_logged_in
    }

    fn redirect(&self, path: &str) {
        self.navigator.set_path(path);
        self.navigator.replace();
    }

    fn serialize_login(&self, user: &str, state: &A::State) -> Result<String, SessionError> {
        serde_json::to_string(&PersistedLoginRef { user, state }).map_err(|source| {
            SessionError::Persist {
                key: self.persistence_key.clone(),
                source,
            }
        })
    }
}

// ---------------------------------------------------------------------------
// SessionBuilder
// ---------------------------------------------------------------------------

/// Builder for a [`Session`].
pub struct SessionBuilder<A: Authenticator> {
    authenticator: Arc<A>,
    navigator: Arc<dyn Navigator>,
    store: Option<Arc<dyn SessionStore>>,
    config: SessionConfig,
}

impl<A: Authenticator> SessionBuilder<A> {
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Persists logins in `store` and restores one from it on build.
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the session, restoring a stored login if there is one.
    ///
    /// An unreadable stored login is removed and the session starts
    /// logged out.
    pub fn build(self) -> Arc<Session<A>> {
        let persistence_key = format!(
            "{}-{}",
            self.config.session_name,
            self.authenticator.auth_type()
        );

        let login_state = match &self.store {
            Some(store) => match restore::<A::State>(store.as_ref(), &persistence_key) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(error = %e, "discarding stored login");
                    store.remove(&persistence_key);
                    LoginState::LoggedOut
                }
            },
            None => LoginState::LoggedOut,
        };
        if let Some(user) = login_state.user() {
            tracing::info!(key = %persistence_key, %user, "login restored");
        }

        Arc::new(Session {
            authenticator: self.authenticator,
            navigator: self.navigator,
            store: self.store,
            config: self.config,
            persistence_key,
            inner: Mutex::new(Inner {
                login_state,
                pre_failure_path: None,
            }),
        })
    }
}

fn restore<S: AuthState>(store: &dyn SessionStore, key: &str) -> Result<LoginState<S>, SessionError> {
    let Some(raw) = store.get(key) else {
        return Ok(LoginState::LoggedOut);
    };
    let persisted: PersistedLogin<S> =
        serde_json::from_str(&raw).map_err(|source| SessionError::Restore {
            key: key.to_string(),
            source,
        })?;
    Ok(LoginState::LoggedIn {
        user: persisted.user,
        state: persisted.state,
    })
}
