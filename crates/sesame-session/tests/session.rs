//! Integration tests for the session state machine, driven through a
//! scripted authenticator and an in-memory navigator.

use std::sync::{Arc, OnceLock, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sesame_auth::{AuthState, Authenticator, LoginResult, ResponseCheck};
use sesame_session::{
    LoginCallbacks, LoginState, MemoryNavigator, MemoryStore, Navigator, ResponseInterceptor,
    Session, SessionConfig, SessionRegistry, SessionStore,
};
use sesame_transport::{RequestConf, Response, StatusCode};
use tokio::sync::oneshot;

// =========================================================================
// Mock authenticator: answers logins from a script, fails on chosen codes.
// =========================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct MockState {
    user: String,
    token: String,
}

impl AuthState for MockState {
    fn user(&self) -> &str {
        &self.user
    }
}

/// What the next `check_login` returns.
#[derive(Clone, Copy)]
enum Script {
    Accept,
    Deny,
    Fail,
}

struct MockAuth {
    script: Mutex<Script>,
    failure_statuses: Vec<StatusCode>,
    logins: Mutex<Vec<String>>,
    /// When set, the next `check_login` waits for this before answering.
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl MockAuth {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(Script::Accept),
            failure_statuses: vec![StatusCode::UNAUTHORIZED],
            logins: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        })
    }

    fn answer(&self, script: Script) {
        *self.script.lock() = script;
    }

    /// Holds the next login open until the returned sender fires.
    fn hold_next_login(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        *self.gate.lock() = Some(gate);
        release
    }
}

impl Authenticator for MockAuth {
    type Credentials = String;
    type State = MockState;

    fn auth_type(&self) -> &str {
        "mock"
    }

    async fn check_login(&self, user: String) -> LoginResult<MockState> {
        self.logins.lock().push(user.clone());
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            gate.await.ok();
        }
        let script = *self.script.lock();
        match script {
            Script::Accept => LoginResult::Accepted(MockState {
                token: format!("t-{user}"),
                user,
            }),
            Script::Deny => LoginResult::Denied("Incorrect username or password".to_string()),
            Script::Fail => LoginResult::Error("Login failed: connection refused".to_string()),
        }
    }

    fn add_auth_to_request_conf(&self, conf: &mut RequestConf, state: &MockState) {
        conf.set_header("x-auth", &state.token).expect("token is a valid header value");
    }

    fn check_response(&self, response: &Response) -> ResponseCheck {
        ResponseCheck::auth_failure(self.failure_statuses.contains(&response.status))
    }
}

// =========================================================================
// Helpers
// =========================================================================

struct Fixture {
    auth: Arc<MockAuth>,
    nav: Arc<MemoryNavigator>,
    session: Arc<Session<MockAuth>>,
}

fn fixture_with(config: SessionConfig, start: &str) -> Fixture {
    let auth = MockAuth::new();
    let nav = Arc::new(MemoryNavigator::new(start));
    let session = Session::builder(Arc::clone(&auth), nav.clone() as Arc<dyn Navigator>)
        .config(config)
        .build();
    Fixture { auth, nav, session }
}

fn fixture() -> Fixture {
    fixture_with(SessionConfig::default(), "/")
}

fn unauthorized() -> Response {
    Response::empty(StatusCode::UNAUTHORIZED)
}

// =========================================================================
// State and keys
// =========================================================================

#[test]
fn test_new_session_starts_logged_out() {
    let f = fixture();

    assert!(!f.session.logged_in());
    assert!(f.session.user_name().is_none());
    assert_eq!(f.session.login_state(), LoginState::LoggedOut);
    assert!(f.session.pre_failure_path().is_none());
    assert!(f.nav.set_paths().is_empty());
}

#[test]
fn test_cookie_key_default_session_name() {
    assert_eq!(fixture().session.cookie_key(), "sesame-mock");
}

#[test]
fn test_cookie_key_custom_session_name() {
    let config = SessionConfig {
        session_name: "someSession".to_string(),
        ..SessionConfig::default()
    };

    assert_eq!(fixture_with(config, "/").session.cookie_key(), "someSession-mock");
}

// =========================================================================
// Login
// =========================================================================

#[tokio::test]
async fn test_login_accepted_logs_in_and_redirects_home() {
    let f = fixture_with(SessionConfig::default(), "/login");

    let result = f.session.login("alice".to_string()).await;

    assert!(result.is_accepted());
    assert!(f.session.logged_in());
    assert_eq!(f.session.user_name().as_deref(), Some("alice"));
    assert_eq!(f.nav.path(), "/");
    assert_eq!(f.nav.replace_count(), 1);
    assert_eq!(f.nav.history(), vec!["/"], "login page replaced, not pushed");
    assert_eq!(*f.auth.logins.lock(), vec!["alice"]);
}

#[tokio::test]
async fn test_login_accepted_custom_post_login_path() {
    let config = SessionConfig {
        post_login_path: "/dashboard".to_string(),
        ..SessionConfig::default()
    };
    let f = fixture_with(config, "/login");

    f.session.login("alice".to_string()).await;

    assert_eq!(f.nav.path(), "/dashboard");
}

#[tokio::test]
async fn test_login_denied_stays_logged_out_without_navigating() {
    let f = fixture_with(SessionConfig::default(), "/login");
    f.auth.answer(Script::Deny);

    let result = f.session.login("alice".to_string()).await;

    assert_eq!(result.msg(), Some("Incorrect username or password"));
    assert!(!f.session.logged_in());
    assert!(f.nav.set_paths().is_empty());
    assert_eq!(f.nav.replace_count(), 0);
}

#[tokio::test]
async fn test_login_error_stays_logged_out_without_navigating() {
    let f = fixture_with(SessionConfig::default(), "/login");
    f.auth.answer(Script::Fail);

    let result = f.session.login("alice".to_string()).await;

    assert!(matches!(result, LoginResult::Error(_)));
    assert!(!f.session.logged_in());
    assert!(f.nav.set_paths().is_empty());
}

#[tokio::test]
async fn test_login_with_fires_exactly_one_callback() {
    for (script, expected) in [
        (Script::Accept, "accepted"),
        (Script::Deny, "denied"),
        (Script::Fail, "error"),
    ] {
        let f = fixture();
        f.auth.answer(script);
        let fired = Arc::new(Mutex::new(Vec::new()));

        let callbacks = {
            let (a, d, e) = (fired.clone(), fired.clone(), fired.clone());
            LoginCallbacks::new()
                .on_accepted(move |_| a.lock().push("accepted"))
                .on_denied(move |_| d.lock().push("denied"))
                .on_error(move |_| e.lock().push("error"))
        };
        f.session.login_with("alice".to_string(), callbacks).await;

        assert_eq!(*fired.lock(), vec![expected]);
    }
}

#[tokio::test]
async fn test_login_with_accepted_callback_sees_new_state() {
    let f = fixture();
    let seen = Arc::new(Mutex::new(None));
    let sink = seen.clone();
    let session = Arc::clone(&f.session);

    let callbacks = LoginCallbacks::new().on_accepted(move |result: &LoginResult<MockState>| {
        *sink.lock() = Some((result.new_state().cloned(), session.logged_in()));
    });
    f.session.login_with("bob".to_string(), callbacks).await;

    let (state, logged_in) = seen.lock().clone().expect("callback ran");
    assert_eq!(state.map(|s| s.token), Some("t-bob".to_string()));
    assert!(logged_in, "state applied before the callback");
}

#[tokio::test]
async fn test_login_missing_callback_is_skipped() {
    let f = fixture();
    f.auth.answer(Script::Deny);
    let fired = Arc::new(Mutex::new(0));
    let count = fired.clone();

    let callbacks = LoginCallbacks::new().on_accepted(move |_| *count.lock() += 1);
    let result = f.session.login_with("alice".to_string(), callbacks).await;

    assert!(!result.is_accepted());
    assert_eq!(*fired.lock(), 0);
}

// =========================================================================
// Logout and reset
// =========================================================================

#[tokio::test]
async fn test_logout_clears_state_and_redirects_to_login() {
    let f = fixture();
    f.session.login("alice".to_string()).await;

    f.session.logout();

    assert!(!f.session.logged_in());
    assert!(f.session.user_name().is_none());
    assert_eq!(f.nav.path(), "/login");
    assert_eq!(f.nav.replace_count(), 2);
    assert!(f.session.pre_failure_path().is_none());
}

#[tokio::test]
async fn test_logout_custom_login_path() {
    let config = SessionConfig {
        login_path: "/welcome".to_string(),
        ..SessionConfig::default()
    };
    let f = fixture_with(config, "/");
    f.session.login("alice".to_string()).await;

    f.session.logout();

    assert_eq!(f.nav.path(), "/welcome");
}

#[tokio::test]
async fn test_reset_clears_state_without_navigating() {
    let f = fixture();
    f.session.login("alice".to_string()).await;
    let navigations = f.nav.set_paths().len();

    f.session.reset();

    assert!(!f.session.logged_in());
    assert_eq!(f.nav.set_paths().len(), navigations);
}

// =========================================================================
// Request decoration
// =========================================================================

#[test]
fn test_manage_request_conf_logged_out_only_sets_routing_key() {
    let f = fixture();
    let mut conf = RequestConf::get("https://api.example.com/things");

    f.session.manage_request_conf(&mut conf);

    assert_eq!(conf.routing_key.as_deref(), Some("sesame-mock"));
    assert!(conf.header("X-Auth").is_none());
}

#[tokio::test]
async fn test_manage_request_conf_logged_in_adds_auth() {
    let f = fixture();
    f.session.login("alice".to_string()).await;
    let mut conf = RequestConf::get("https://api.example.com/things");

    f.session.manage_request_conf(&mut conf);

    assert_eq!(conf.routing_key.as_deref(), Some("sesame-mock"));
    assert_eq!(conf.header("X-Auth"), Some("t-alice"));
}

#[tokio::test]
async fn test_manage_request_conf_after_logout_adds_nothing() {
    let f = fixture();
    f.session.login("alice".to_string()).await;
    f.session.logout();
    let mut conf = RequestConf::get("https://api.example.com/things");

    f.session.manage_request_conf(&mut conf);

    assert!(conf.header("X-Auth").is_none());
}

// =========================================================================
// Auth failures
// =========================================================================

#[tokio::test]
async fn test_handle_http_response_auth_failure_logs_out_and_redirects() {
    let f = fixture();
    f.session.login("alice".to_string()).await;
    f.nav.set_path("/reports/42");

    f.session.handle_http_response(Some(&unauthorized()));

    assert!(!f.session.logged_in());
    assert_eq!(f.nav.path(), "/login");
    assert_eq!(f.session.pre_failure_path().as_deref(), Some("/reports/42"));
}

#[tokio::test]
async fn test_handle_http_response_success_is_noop() {
    let f = fixture();
    f.session.login("alice".to_string()).await;
    let navigations = f.nav.set_paths().len();

    f.session.handle_http_response(Some(&Response::empty(StatusCode::OK)));
    f.session.handle_http_response(Some(&Response::empty(StatusCode::INTERNAL_SERVER_ERROR)));

    assert!(f.session.logged_in());
    assert_eq!(f.nav.set_paths().len(), navigations);
}

#[tokio::test]
async fn test_handle_http_response_missing_response_is_noop() {
    let f = fixture();
    f.session.login("alice".to_string()).await;

    f.session.handle_http_response(None);

    assert!(f.session.logged_in());
}

#[tokio::test]
async fn test_login_after_failure_returns_to_interrupted_page_once() {
    let f = fixture();
    f.session.login("alice".to_string()).await;
    f.nav.set_path("/reports/42");
    f.session.handle_http_response(Some(&unauthorized()));

    f.session.login("alice".to_string()).await;

    assert_eq!(f.nav.path(), "/reports/42");
    assert!(f.session.pre_failure_path().is_none(), "consumed by the login");

    f.session.logout();
    f.session.login("alice".to_string()).await;

    assert_eq!(f.nav.path(), "/");
}

#[tokio::test]
async fn test_auth_failure_on_login_page_does_not_save_it() {
    let f = fixture_with(SessionConfig::default(), "/login");

    f.session.handle_http_response(Some(&unauthorized()));
    f.session.login("alice".to_string()).await;

    assert_eq!(f.nav.path(), "/");
}

#[tokio::test]
async fn test_auth_failure_custom_login_path() {
    let config = SessionConfig {
        login_path: "/welcome".to_string(),
        ..SessionConfig::default()
    };
    let f = fixture_with(config, "/inbox");
    f.session.login("alice".to_string()).await;
    f.nav.set_path("/inbox");

    f.session.handle_http_response(Some(&unauthorized()));

    assert_eq!(f.nav.path(), "/welcome");
    assert_eq!(f.session.pre_failure_path().as_deref(), Some("/inbox"));
}

#[tokio::test]
async fn test_auth_failure_during_pending_login_is_returned_to_after_login() {
    let f = fixture_with(SessionConfig::default(), "/reports");
    let release = f.auth.hold_next_login();

    let (result, ()) = tokio::join!(f.session.login("alice".to_string()), async {
        while f.auth.logins.lock().is_empty() {
            tokio::task::yield_now().await;
        }
        f.session.handle_http_response(Some(&unauthorized()));
        assert_eq!(f.nav.path(), "/login");
        assert_eq!(f.session.pre_failure_path().as_deref(), Some("/reports"));
        release.send(()).expect("login still waiting");
    });

    assert!(result.is_accepted());
    assert!(f.session.logged_in());
    assert_eq!(f.nav.path(), "/reports");
    assert!(f.session.pre_failure_path().is_none());
}

// =========================================================================
// Persistence
// =========================================================================

fn persistent(store: &Arc<MemoryStore>) -> (Arc<MockAuth>, Arc<Session<MockAuth>>) {
    let auth = MockAuth::new();
    let session = Session::builder(Arc::clone(&auth), Arc::new(MemoryNavigator::default()))
        .store(store.clone() as Arc<dyn SessionStore>)
        .build();
    (auth, session)
}

#[tokio::test]
async fn test_login_is_restored_by_new_session() {
    let store = Arc::new(MemoryStore::new());
    let (_, first) = persistent(&store);
    first.login("alice".to_string()).await;
    assert!(store.get("sesame-mock").is_some());

    let (_, second) = persistent(&store);

    assert!(second.logged_in());
    assert_eq!(second.user_name().as_deref(), Some("alice"));
    let mut conf = RequestConf::get("https://api.example.com/");
    second.manage_request_conf(&mut conf);
    assert_eq!(conf.header("X-Auth"), Some("t-alice"));
}

#[tokio::test]
async fn test_logout_removes_stored_login() {
    let store = Arc::new(MemoryStore::new());
    let (_, session) = persistent(&store);
    session.login("alice".to_string()).await;

    session.logout();

    assert!(store.is_empty());
    let (_, restored) = persistent(&store);
    assert!(!restored.logged_in());
}

#[tokio::test]
async fn test_auth_failure_removes_stored_login() {
    let store = Arc::new(MemoryStore::new());
    let (_, session) = persistent(&store);
    session.login("alice".to_string()).await;

    session.handle_http_response(Some(&unauthorized()));

    assert!(store.get("sesame-mock").is_none());
}

/// Stores logins in memory and, the first time one is written, resets the
/// session from another thread.
#[derive(Default)]
struct ResettingStore {
    entries: MemoryStore,
    session: OnceLock<Weak<Session<MockAuth>>>,
    resetter: Mutex<Option<JoinHandle<()>>>,
}

impl SessionStore for ResettingStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key)
    }

    fn set(&self, key: &str, value: String) {
        self.entries.set(key, value);
        let mut resetter = self.resetter.lock();
        let Some(session) = self.session.get().and_then(Weak::upgrade) else {
            return;
        };
        if resetter.is_some() {
            return;
        }
        let (done, finished) = std::sync::mpsc::channel();
        *resetter = Some(std::thread::spawn(move || {
            session.reset();
            done.send(()).ok();
        }));
        // Lets the reset land between this write and the state change.
        finished.recv_timeout(Duration::from_millis(50)).ok();
    }

    fn remove(&self, key: &str) {
        self.entries.remove(key);
    }
}

#[tokio::test]
async fn test_reset_racing_login_keeps_store_in_step() {
    let store = Arc::new(ResettingStore::default());
    let session = Session::builder(MockAuth::new(), Arc::new(MemoryNavigator::default()))
        .store(store.clone() as Arc<dyn SessionStore>)
        .build();
    store.session.set(Arc::downgrade(&session)).ok();

    session.login("alice".to_string()).await;
    let resetter = store.resetter.lock().take().expect("reset started");
    resetter.join().expect("reset thread");

    assert!(!session.logged_in(), "the reset came last");
    assert_eq!(session.logged_in(), store.get(session.cookie_key()).is_some());
}

#[test]
fn test_corrupt_stored_login_is_discarded() {
    let store = Arc::new(MemoryStore::new());
    store.set("sesame-mock", "{not json".to_string());

    let (_, session) = persistent(&store);

    assert!(!session.logged_in());
    assert!(store.get("sesame-mock").is_none());
}

// =========================================================================
// Registry and interceptor
// =========================================================================

#[tokio::test]
async fn test_interceptor_routes_auth_failure_to_session() {
    let f = fixture();
    let registry = Arc::new(SessionRegistry::new());
    let _registration = registry.register(&f.session);
    let interceptor = ResponseInterceptor::new(registry);
    f.session.login("alice".to_string()).await;

    let mut conf = RequestConf::get("https://api.example.com/things");
    f.session.manage_request_conf(&mut conf);
    let response = interceptor.intercept(&conf, unauthorized());

    assert_eq!(response.status, StatusCode::UNAUTHORIZED, "response passed through");
    assert!(!f.session.logged_in());
    assert_eq!(f.nav.path(), "/login");
}

#[tokio::test]
async fn test_interceptor_without_routing_key_passes_through() {
    let f = fixture();
    let registry = Arc::new(SessionRegistry::new());
    let _registration = registry.register(&f.session);
    let interceptor = ResponseInterceptor::new(registry);
    f.session.login("alice".to_string()).await;

    let conf = RequestConf::get("https://api.example.com/things");
    let response = interceptor.intercept(&conf, unauthorized());

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(f.session.logged_in());
}

#[tokio::test]
async fn test_interceptor_unregistered_session_is_not_notified() {
    let f = fixture();
    let registry = Arc::new(SessionRegistry::new());
    let registration = registry.register(&f.session);
    let interceptor = ResponseInterceptor::new(registry);
    f.session.login("alice".to_string()).await;
    drop(registration);

    let mut conf = RequestConf::get("https://api.example.com/things");
    f.session.manage_request_conf(&mut conf);
    interceptor.intercept(&conf, unauthorized());

    assert!(f.session.logged_in());
}

#[tokio::test]
async fn test_interceptor_failure_keeps_session() {
    let f = fixture();
    let registry = Arc::new(SessionRegistry::new());
    let _registration = registry.register(&f.session);
    let interceptor = ResponseInterceptor::new(registry);
    f.session.login("alice".to_string()).await;

    let mut conf = RequestConf::get("https://api.example.com/things");
    f.session.manage_request_conf(&mut conf);
    interceptor.intercept_failure(&conf);

    assert!(f.session.logged_in());
}
