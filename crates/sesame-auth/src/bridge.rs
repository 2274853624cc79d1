//! One-shot callbacks between a login popup and the strategy waiting on it.
//!
//! A popup-based login has a gap in the middle: the strategy opens a
//! window, the user does their thing with the identity provider, and some
//! time later a redirect page hands a query string back. The
//! [`CallbackBridge`] is the mailbox for that hand-back.
//!
//! Each waiting login registers a [`PendingCallback`] under a fresh random
//! correlation id. The host routes the popup's answer to
//! [`CallbackBridge::deliver`] with that id. Delivery removes the entry
//! *before* sending, so a second message from a stale popup finds nothing
//! and is rejected. Dropping a `PendingCallback` (timeout, cancelled
//! future) removes the entry too.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::oneshot;

use crate::AuthError;

/// Routes popup answers to the login that is waiting for them.
///
/// Shared by `Arc`: the strategy registers, the host delivers.
#[derive(Debug, Default)]
pub struct CallbackBridge {
    pending: Mutex<HashMap<String, oneshot::Sender<String>>>,
}

impl CallbackBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new one-shot callback under a fresh correlation id.
    pub fn register(self: &Arc<Self>) -> PendingCallback {
        let (tx, rx) = oneshot::channel();
        let mut pending = self.pending.lock();

        // Never overwrite a waiting login.
        let mut id = generate_correlation_id();
        while pending.contains_key(&id) {
            id = generate_correlation_id();
        }
        pending.insert(id.clone(), tx);

        tracing::debug!(correlation_id = %id, "login callback registered");
        PendingCallback {
            id,
            receiver: rx,
            bridge: Arc::clone(self),
        }
    }

    /// Hands a popup's query string to the login waiting under `id`.
    ///
    /// Returns `false` if nothing is waiting (unknown id, already delivered,
    /// or the login gave up).
    pub fn deliver(&self, id: &str, query: impl Into<String>) -> bool {
        let Some(tx) = self.pending.lock().remove(id) else {
            tracing::warn!(correlation_id = %id, "no login waiting for this callback");
            return false;
        };
        // The receiver may have been dropped between the lock and here.
        tx.send(query.into()).is_ok()
    }

    /// Removes a pending callback without answering it.
    pub fn cancel(&self, id: &str) -> bool {
        self.pending.lock().remove(id).is_some()
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.lock().contains_key(id)
    }

    /// Number of logins currently waiting.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

/// A registered callback that has not fired yet.
///
/// Dropping it unregisters the correlation id.
#[derive(Debug)]
pub struct PendingCallback {
    id: String,
    receiver: oneshot::Receiver<String>,
    bridge: Arc<CallbackBridge>,
}

impl PendingCallback {
    /// The correlation id the host must deliver to.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Waits for the query string, up to `timeout` if one is given.
    pub async fn wait(mut self, timeout: Option<Duration>) -> Result<String, AuthError> {
        let received = match timeout {
            Some(limit) => tokio::time::timeout(limit, &mut self.receiver)
                .await
                .map_err(|_| AuthError::CallbackTimedOut(limit))?,
            None => (&mut self.receiver).await,
        };
        received.map_err(|_| AuthError::CallbackCancelled)
    }
}

impl Drop for PendingCallback {
    fn drop(&mut self) {
        if self.bridge.cancel(&self.id) {
            tracing::debug!(correlation_id = %self.id, "login callback abandoned");
        }
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
fn generate_correlation_id() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge() -> Arc<CallbackBridge> {
        Arc::new(CallbackBridge::new())
    }

    #[test]
    fn test_register_creates_unique_pending_ids() {
        let bridge = bridge();

        let a = bridge.register();
        let b = bridge.register();

        assert_eq!(a.id().len(), 32);
        assert_ne!(a.id(), b.id());
        assert_eq!(bridge.len(), 2);
    }

    #[tokio::test]
    async fn test_deliver_wakes_waiter_and_removes_entry() {
        let bridge = bridge();
        let pending = bridge.register();
        let id = pending.id().to_string();

        assert!(bridge.deliver(&id, "abc=123"));
        assert!(!bridge.is_pending(&id), "entry removed on delivery");

        let query = pending.wait(None).await.expect("should receive");
        assert_eq!(query, "abc=123");
    }

    #[test]
    fn test_deliver_twice_second_is_rejected() {
        let bridge = bridge();
        let pending = bridge.register();
        let id = pending.id().to_string();

        assert!(bridge.deliver(&id, "first"));
        assert!(!bridge.deliver(&id, "stale"));
    }

    #[test]
    fn test_deliver_unknown_id_returns_false() {
        assert!(!bridge().deliver("nope", "abc=123"));
    }

    #[test]
    fn test_drop_pending_unregisters() {
        let bridge = bridge();
        let pending = bridge.register();
        let id = pending.id().to_string();

        drop(pending);

        assert!(!bridge.is_pending(&id));
        assert!(bridge.is_empty());
    }

    #[tokio::test]
    async fn test_wait_times_out_and_unregisters() {
        let bridge = bridge();
        let pending = bridge.register();

        let result = pending.wait(Some(Duration::from_millis(10))).await;

        assert!(matches!(result, Err(AuthError::CallbackTimedOut(_))));
        assert!(bridge.is_empty());
    }

    #[tokio::test]
    async fn test_wait_after_cancel_reports_cancelled() {
        let bridge = bridge();
        let pending = bridge.register();
        bridge.cancel(pending.id());

        let result = pending.wait(None).await;

        assert!(matches!(result, Err(AuthError::CallbackCancelled)));
    }
}
