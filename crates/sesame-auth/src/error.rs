//! Error types for the auth layer.

use std::time::Duration;

/// Faults inside a login handshake.
///
/// These never escape [`Authenticator::check_login`](crate::Authenticator::check_login):
/// the strategy turns them into [`LoginResult::Error`](crate::LoginResult::Error)
/// with the error's message. They exist so the collaborators a strategy
/// talks to (popup opener, callback bridge) have a typed way to fail.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The host could not open the login popup.
    #[error("could not open login popup: {0}")]
    PopupBlocked(String),

    /// The pending callback was cancelled before the popup answered.
    #[error("login callback was cancelled")]
    CallbackCancelled,

    /// The popup did not answer within the configured time.
    #[error("login popup did not respond within {0:?}")]
    CallbackTimedOut(Duration),
}
