//! Login strategies for Sesame.
//!
//! A session does not know how logging in works; it asks an
//! [`Authenticator`]. This crate defines that trait and ships two
//! strategies:
//!
//! - [`PasswordOAuth`]: exchanges a user name and password for a bearer
//!   token at an OAuth2 token endpoint.
//! - [`OpenIdAuth`]: runs an OpenID login in a popup and picks the answer
//!   up through a [`CallbackBridge`].
//!
//! # How it fits in the stack
//!
//! ```text
//! Session Layer (above)    ← owns login state, calls the strategy
//!     ↕
//! Auth Layer (this crate)  ← protocol-specific handshakes and header rules
//!     ↕
//! Transport Layer (below)  ← RequestConf, Response, HttpTransport
//! ```

mod authenticator;
mod bridge;
mod error;
mod openid;
mod password;
mod popup;
mod result;

pub use authenticator::{AuthState, Authenticator, ResponseCheck};
pub use bridge::{CallbackBridge, PendingCallback};
pub use error::AuthError;
pub use openid::{OpenIdAuth, OpenIdConfig, OpenIdCredentials, OpenIdState, POPUP_FEATURES, POPUP_NAME};
pub use password::{OAuthState, PasswordCredentials, PasswordOAuth, PasswordOAuthConfig, TOKEN_PATH};
pub use popup::{Popup, PopupOpener};
pub use result::{LoginResult, LoginStatus};
