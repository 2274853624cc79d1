//! The outcome of a login attempt.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which of the three outcome classes a [`LoginResult`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginStatus {
    Accepted,
    Denied,
    Error,
}

impl fmt::Display for LoginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => write!(f, "accepted"),
            Self::Denied => write!(f, "denied"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Result of [`Authenticator::check_login`](crate::Authenticator::check_login).
///
/// The new session state exists only on `Accepted` and a message exists
/// only on the two failures, so both are carried inside the variants rather
/// than as optional fields.
///
/// - **Accepted**: the strategy produced a session state.
/// - **Denied**: the authentication service rejected the credentials.
///   Recoverable and shown to the user.
/// - **Error**: the handshake itself failed (transport, protocol, malformed
///   reply). Also recoverable and shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginResult<S> {
    Accepted(S),
    Denied(String),
    Error(String),
}

impl<S> LoginResult<S> {
    pub fn status(&self) -> LoginStatus {
        match self {
            Self::Accepted(_) => LoginStatus::Accepted,
            Self::Denied(_) => LoginStatus::Denied,
            Self::Error(_) => LoginStatus::Error,
        }
    }

    /// The human-readable message, present on `Denied` and `Error`.
    pub fn msg(&self) -> Option<&str> {
        match self {
            Self::Accepted(_) => None,
            Self::Denied(msg) | Self::Error(msg) => Some(msg),
        }
    }

    /// The new session state, present only on `Accepted`.
    pub fn new_state(&self) -> Option<&S> {
        match self {
            Self::Accepted(state) => Some(state),
            _ => None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}
