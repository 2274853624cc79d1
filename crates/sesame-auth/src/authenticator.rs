//! The login strategy trait.
//!
//! Sesame doesn't hard-code one login protocol. A session is built around
//! an [`Authenticator`], which knows three protocol-specific things:
//!
//! - how to run the login handshake ([`check_login`](Authenticator::check_login)),
//! - how to put credentials on an outgoing request
//!   ([`add_auth_to_request_conf`](Authenticator::add_auth_to_request_conf)),
//! - which responses mean the credentials stopped working
//!   ([`check_response`](Authenticator::check_response)).
//!
//! Strategies hold only configuration and collaborators. Everything that
//! belongs to one login (token, cookie value, user) lives in the
//! associated [`State`](Authenticator::State) and is handed back in by the
//! session on every call.

use std::fmt;
use std::future::Future;

use serde::{Serialize, de::DeserializeOwned};
use sesame_transport::{RequestConf, Response};

use crate::LoginResult;

/// Per-login data produced by a successful handshake.
///
/// Serializable so a session can persist it and restore it later.
pub trait AuthState:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The user this state was issued to.
    fn user(&self) -> &str;
}

/// What a strategy concluded about a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResponseCheck {
    /// `true` if the response invalidates the current session.
    pub auth_failure: bool,
}

impl ResponseCheck {
    pub fn auth_failure(auth_failure: bool) -> Self {
        Self { auth_failure }
    }
}

/// A login protocol.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static`: one authenticator is shared by a session and
///   every request it decorates, possibly across tokio worker threads.
///
/// # Example
///
/// ```rust
/// use sesame_auth::{AuthState, Authenticator, LoginResult, ResponseCheck};
/// use sesame_transport::{RequestConf, Response, StatusCode};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct ApiKeyState {
///     user: String,
///     key: String,
/// }
///
/// impl AuthState for ApiKeyState {
///     fn user(&self) -> &str {
///         &self.user
///     }
/// }
///
/// /// Accepts any non-empty key. Development only.
/// struct ApiKeyAuth;
///
/// impl Authenticator for ApiKeyAuth {
///     type Credentials = (String, String);
///     type State = ApiKeyState;
///
///     fn auth_type(&self) -> &str {
///         "ApiKey"
///     }
///
///     async fn check_login(&self, (user, key): (String, String)) -> LoginResult<ApiKeyState> {
///         if key.is_empty() {
///             return LoginResult::Denied("missing key".into());
///         }
///         LoginResult::Accepted(ApiKeyState { user, key })
///     }
///
///     fn add_auth_to_request_conf(&self, conf: &mut RequestConf, state: &ApiKeyState) {
///         if conf.set_header("x-api-key", &state.key).is_err() {
///             tracing::warn!("api key is not a valid header value");
///         }
///     }
///
///     fn check_response(&self, response: &Response) -> ResponseCheck {
///         ResponseCheck::auth_failure(response.status == StatusCode::UNAUTHORIZED)
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// What the user types in (password pair, OpenID identifier, ...).
    type Credentials: Send + 'static;

    /// What a successful login leaves behind.
    type State: AuthState;

    /// Stable tag naming the protocol. Part of the session's persistence
    /// key, so changing it orphans previously stored logins.
    fn auth_type(&self) -> &str;

    /// Runs the login handshake.
    ///
    /// May complete immediately or after several round trips (and, for
    /// popup-based protocols, after the user finishes in another window).
    /// Never fails: every fault is reported as [`LoginResult::Error`].
    fn check_login(
        &self,
        credentials: Self::Credentials,
    ) -> impl Future<Output = LoginResult<Self::State>> + Send;

    /// Adds this protocol's credentials to an outgoing request.
    fn add_auth_to_request_conf(&self, conf: &mut RequestConf, state: &Self::State);

    /// Decides whether a response means the session is no longer valid.
    fn check_response(&self, response: &Response) -> ResponseCheck;
}
