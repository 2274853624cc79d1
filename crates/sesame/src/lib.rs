//! # Sesame
//!
//! Client-side login sessions layered on an HTTP client.
//!
//! A [`Session`] tracks whether the user is logged in to one backend, adds
//! credentials to outgoing requests, and logs the user out (remembering
//! where they were) when a response says the credentials stopped working.
//! How logging in works is up to an [`Authenticator`]: this crate ships
//! [`PasswordOAuth`] and [`OpenIdAuth`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use sesame::prelude::*;
//!
//! # async fn run() -> Result<(), SesameError> {
//! let transport = Arc::new(ReqwestTransport::new());
//! let registry = Arc::new(SessionRegistry::new());
//! let client = Arc::new(SecureClient::new(Arc::clone(&transport), Arc::clone(&registry)));
//!
//! let auth = PasswordOAuth::new(
//!     PasswordOAuthConfig::new("https://auth.example.com", "my_id", "my_secret"),
//!     transport,
//! );
//! let session = Session::builder(Arc::new(auth), Arc::new(MemoryNavigator::default())).build();
//! let _registration = registry.register(&session);
//!
//! let result = session.login(PasswordCredentials::new("alice", "swordfish")).await;
//! println!("login {}", result.status());
//!
//! let things = SecureResource::new(client, session, "https://api.example.com/thing/:id")?;
//! let response = things.get(&[("id", "3")]).await?;
//! println!("{}", response.body);
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod resource;

pub use client::SecureClient;
pub use error::SesameError;
pub use resource::{Action, SecureResource, UrlTemplate};

pub use sesame_auth::{
    AuthError, AuthState, Authenticator, CallbackBridge, LoginResult, LoginStatus, OAuthState,
    OpenIdAuth, OpenIdConfig, OpenIdCredentials, OpenIdState, PasswordCredentials, PasswordOAuth,
    PasswordOAuthConfig, PendingCallback, Popup, PopupOpener, ResponseCheck,
};
pub use sesame_session::{
    LoginCallbacks, LoginState, MemoryNavigator, MemoryStore, Navigator, Registration,
    RequestDecorator, ResponseInterceptor, ResponseSink, Session, SessionBuilder, SessionConfig,
    SessionError, SessionRegistry, SessionStore,
};
#[cfg(feature = "mock")]
pub use sesame_transport::MockTransport;
#[cfg(feature = "reqwest")]
pub use sesame_transport::ReqwestTransport;
pub use sesame_transport::{
    Body, DEFAULT_ACCEPT, HeaderMap, HeaderValue, HttpTransport, Method, RequestConf, Response,
    StatusCode, TransportError, header,
};

/// Everything an application usually needs, in one import.
pub mod prelude {
    pub use crate::{
        Authenticator, LoginCallbacks, LoginResult, LoginStatus, MemoryNavigator, MemoryStore,
        Method, Navigator, OpenIdAuth, OpenIdConfig, OpenIdCredentials, PasswordCredentials,
        PasswordOAuth, PasswordOAuthConfig, PopupOpener, RequestConf, Response, SecureClient,
        SecureResource, SesameError, Session, SessionConfig, SessionRegistry, SessionStore,
        StatusCode,
    };

    #[cfg(feature = "reqwest")]
    pub use crate::ReqwestTransport;
}
