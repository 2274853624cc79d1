//! Session layer for Sesame.
//!
//! Owns everything that outlives a single request:
//!
//! - [`Session`]: login state for one authentication domain, and the
//!   redirects that go with logging in and out
//! - [`SessionRegistry`] and [`ResponseInterceptor`]: route each response
//!   back to the session whose request produced it
//! - [`Navigator`] and [`SessionStore`]: the host hooks a session drives
//!
//! # How it fits in the stack
//!
//! ```text
//! Application (above)        ← SecureClient, SecureResource
//!     ↕
//! Session Layer (this crate) ← login state, decoration, failure handling
//!     ↕
//! Auth Layer (below)         ← Authenticator implementations
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let registry = Arc::new(SessionRegistry::new());
//! let session = Session::builder(Arc::new(auth), navigator).build();
//! let _registration = registry.register(&session);
//!
//! match session.login(credentials).await {
//!     LoginResult::Accepted(_) => { /* navigator already redirected */ }
//!     other => eprintln!("{}", other.msg().unwrap_or_default()),
//! }
//! ```

mod config;
mod error;
mod interceptor;
mod navigation;
mod registry;
mod session;
mod store;

pub use config::{DEFAULT_SESSION_NAME, LoginState, SessionConfig};
pub use error::SessionError;
pub use interceptor::ResponseInterceptor;
pub use navigation::{MemoryNavigator, Navigator};
pub use registry::{Registration, RequestDecorator, ResponseSink, SessionRegistry};
pub use session::{LoginCallbacks, Session, SessionBuilder};
pub use store::{MemoryStore, SessionStore};
