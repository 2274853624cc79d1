//! Routing responses back to the session that issued the request.
//!
//! Every request a session decorates carries its routing key. The
//! [`SessionRegistry`] maps that key back to the live session, so code that
//! only sees responses (the [`ResponseInterceptor`](crate::ResponseInterceptor))
//! can still tell the right session about them.
//!
//! The registry does not own sessions. It holds weak references: a session
//! that has been dropped simply stops being found.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use sesame_auth::Authenticator;
use sesame_transport::{RequestConf, Response};

use crate::Session;

// ---------------------------------------------------------------------------
// Session-facing traits
// ---------------------------------------------------------------------------

/// The one thing the resource layer may do with a session: decorate a
/// request before it is sent.
pub trait RequestDecorator: Send + Sync {
    fn manage_request_conf(&self, conf: &mut RequestConf);
}

/// Something that can be told about responses to its requests.
///
/// Object-safe so sessions with different authenticators can share one
/// registry.
pub trait ResponseSink: Send + Sync {
    /// Key that requests decorated by this sink carry.
    fn routing_key(&self) -> &str;

    fn handle_http_response(&self, response: Option<&Response>);
}

impl<A: Authenticator> RequestDecorator for Session<A> {
    fn manage_request_conf(&self, conf: &mut RequestConf) {
        Self::manage_request_conf(self, conf);
    }
}

impl<A: Authenticator> ResponseSink for Session<A> {
    fn routing_key(&self) -> &str {
        self.cookie_key()
    }

    fn handle_http_response(&self, response: Option<&Response>) {
        Self::handle_http_response(self, response);
    }
}

// ---------------------------------------------------------------------------
// SessionRegistry
// ---------------------------------------------------------------------------

/// Maps routing keys to live sessions.
///
/// Construct one at startup and hand it (by `Arc`) to whatever installs the
/// interceptor. Tests build their own, so nothing leaks between them.
#[derive(Default)]
pub struct SessionRegistry {
    entries: Mutex<HashMap<String, Weak<dyn ResponseSink>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session under its routing key.
    ///
    /// The entry lives until the returned [`Registration`] is dropped (or
    /// [`unregister`](Self::unregister) is called). Registering a second
    /// session under the same key replaces the first.
    pub fn register<S: ResponseSink + 'static>(self: &Arc<Self>, session: &Arc<S>) -> Registration {
        let sink: Arc<dyn ResponseSink> = Arc::clone(session) as Arc<dyn ResponseSink>;
        let key = sink.routing_key().to_string();
        let weak = Arc::downgrade(&sink);
        self.register_key(&key, &sink);
        Registration {
            key,
            sink: weak,
            registry: Arc::downgrade(self),
        }
    }

    /// Registers a sink under an explicit key, with no guard.
    pub fn register_key(&self, key: &str, sink: &Arc<dyn ResponseSink>) {
        let previous = self
            .entries
            .lock()
            .insert(key.to_string(), Arc::downgrade(sink));
        if previous.is_some_and(|old| old.strong_count() > 0) {
            tracing::warn!(%key, "replacing live session in registry");
        } else {
            tracing::debug!(%key, "session registered");
        }
    }

    /// Removes the entry for `key`. Returns `true` if there was one.
    pub fn unregister(&self, key: &str) -> bool {
        let removed = self.entries.lock().remove(key).is_some();
        if removed {
            tracing::debug!(%key, "session unregistered");
        }
        removed
    }

    /// Finds the live session for `key`.
    ///
    /// An entry whose session has been dropped is pruned and reported as
    /// absent.
    pub fn lookup(&self, key: &str) -> Option<Arc<dyn ResponseSink>> {
        let mut entries = self.entries.lock();
        let session = entries.get(key)?.upgrade();
        if session.is_none() {
            entries.remove(key);
        }
        session
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Removes `key` only if it still points at `sink`.
    fn unregister_exact(&self, key: &str, sink: &Weak<dyn ResponseSink>) {
        let mut entries = self.entries.lock();
        if entries.get(key).is_some_and(|current| Weak::ptr_eq(current, sink)) {
            entries.remove(key);
            tracing::debug!(%key, "session unregistered");
        }
    }
}

/// Keeps a session registered. Dropping it removes the entry, unless a
/// newer session has taken the key over since.
#[must_use = "dropping the registration unregisters the session immediately"]
pub struct Registration {
    key: String,
    sink: Weak<dyn ResponseSink>,
    registry: Weak<SessionRegistry>,
}

impl Registration {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister_exact(&self.key, &self.sink);
        }
    }
}
