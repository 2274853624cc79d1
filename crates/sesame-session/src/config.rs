//! Session configuration and login state.

use serde::{Deserialize, Serialize};

/// Session name used when none is configured.
pub const DEFAULT_SESSION_NAME: &str = "sesame";

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for one session.
///
/// `#[serde(default)]` lets a config file name only the fields it wants to
/// change; everything else comes from [`Default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// First half of the persistence key (`<session_name>-<auth type>`).
    /// Give each session its own name when an application talks to more
    /// than one backend with the same kind of authenticator.
    pub session_name: String,

    /// Where logout and auth failures send the user.
    pub login_path: String,

    /// Where a successful login goes when there is no interrupted page to
    /// return to.
    pub post_login_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_name: DEFAULT_SESSION_NAME.to_string(),
            login_path: "/login".to_string(),
            post_login_path: "/".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// LoginState
// ---------------------------------------------------------------------------

/// Whether a session is logged in, and as whom.
///
/// ```text
///   LoggedOut ──(login accepted)──→ LoggedIn
///       ↑                               │
///       └──(logout / reset / auth failure)
/// ```
///
/// `S` is the authenticator's per-login state (token, cookie value, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum LoginState<S> {
    LoggedOut,
    LoggedIn { user: String, state: S },
}

impl<S> Default for LoginState<S> {
    fn default() -> Self {
        Self::LoggedOut
    }
}

impl<S> LoginState<S> {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, Self::LoggedIn { .. })
    }

    pub fn user(&self) -> Option<&str> {
        match self {
            Self::LoggedIn { user, .. } => Some(user),
            Self::LoggedOut => None,
        }
    }

    pub fn state(&self) -> Option<&S> {
        match self {
            Self::LoggedIn { state, .. } => Some(state),
            Self::LoggedOut => None,
        }
    }
}
