//! Popup window hook for browser-style login flows.

use std::sync::Arc;

use crate::AuthError;

/// A login window the host should open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    /// Page the popup starts on.
    pub url: String,
    /// Window name; reusing a name reuses the window.
    pub name: String,
    /// Window features string (size, toolbars).
    pub features: String,
    /// Id the popup's redirect page must deliver its answer to, via
    /// [`CallbackBridge::deliver`](crate::CallbackBridge::deliver).
    pub correlation_id: String,
}

/// Opens login popups. Implemented by the host (webview, desktop shell,
/// system browser launcher).
pub trait PopupOpener: Send + Sync + 'static {
    fn open(&self, popup: &Popup) -> Result<(), AuthError>;
}

impl<P: PopupOpener> PopupOpener for Arc<P> {
    fn open(&self, popup: &Popup) -> Result<(), AuthError> {
        (**self).open(popup)
    }
}
