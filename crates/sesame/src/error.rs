//! Unified error type for Sesame.

use sesame_auth::AuthError;
use sesame_session::SessionError;
use sesame_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Code that only depends on `sesame` deals with this one type; `?`
/// converts sub-crate errors through the `#[from]` impls.
///
/// Login outcomes are not in here. A denied or failed login is a
/// [`LoginResult`](sesame_auth::LoginResult), returned as data.
#[derive(Debug, thiserror::Error)]
pub enum SesameError {
    /// The request never got a response.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Saving or restoring a login failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The popup/callback part of a login handshake failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A resource URL template could not be used.
    #[error("invalid URL template: {0}")]
    InvalidTemplate(String),

    /// A resource was asked for an action it does not define.
    #[error("unknown resource action: {0}")]
    UnknownAction(String),
}
