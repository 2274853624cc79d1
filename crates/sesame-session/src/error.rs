//! Error types for the session layer.

/// Errors that can occur while saving or loading a login.
///
/// Login outcomes are never errors (they are [`LoginResult`]s), so this
/// enum is small: it only covers the persisted copy of the login state.
/// The session logs these and carries on with the in-memory state.
///
/// [`LoginResult`]: sesame_auth::LoginResult
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The login state could not be serialized for the store.
    #[error("could not persist login under {key}: {source}")]
    Persist {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The stored login could not be read back (corrupt, or written by an
    /// incompatible version).
    #[error("could not restore login from {key}: {source}")]
    Restore {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}
