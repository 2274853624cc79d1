//! Response interception: hands every response back to the session whose
//! request produced it.

use std::sync::Arc;

use sesame_transport::{RequestConf, Response};

use crate::SessionRegistry;

/// Routes responses to sessions through a [`SessionRegistry`].
///
/// Install one wherever responses come back; `sesame::SecureClient` does
/// this for you.
/// Requests without a routing key, or whose session is gone, pass through
/// untouched.
#[derive(Clone)]
pub struct ResponseInterceptor {
    registry: Arc<SessionRegistry>,
}

impl ResponseInterceptor {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Notifies the session attached to `request`, then returns `response`
    /// unchanged.
    ///
    /// The session is told even when the status is an error: auth failures
    /// arrive as 401/403 responses, and deciding which ones matter is the
    /// authenticator's job.
    pub fn intercept(&self, request: &RequestConf, response: Response) -> Response {
        if let Some(session) = self.session_for(request) {
            session.handle_http_response(Some(&response));
        }
        response
    }

    /// Notifies the session attached to `request` that no response arrived.
    pub fn intercept_failure(&self, request: &RequestConf) {
        if let Some(session) = self.session_for(request) {
            session.handle_http_response(None);
        }
    }

    fn session_for(&self, request: &RequestConf) -> Option<Arc<dyn crate::ResponseSink>> {
        let key = request.routing_key.as_deref()?;
        let session = self.registry.lookup(key);
        if session.is_none() {
            tracing::debug!(%key, url = %request.url, "no live session for response");
        }
        session
    }
}
