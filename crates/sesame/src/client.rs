//! An HTTP client that runs every request through a session.

use std::sync::Arc;

use sesame_session::{RequestDecorator, ResponseInterceptor, SessionRegistry};
use sesame_transport::{HttpTransport, RequestConf, Response};

use crate::SesameError;

/// Sends requests on behalf of sessions.
///
/// Each request is decorated by the session, sent over `T`, and the
/// outcome is handed to the [`ResponseInterceptor`], which routes it back
/// to the session through the registry. That is how a 401 on any request
/// logs the right session out.
pub struct SecureClient<T> {
    transport: T,
    interceptor: ResponseInterceptor,
}

impl<T: HttpTransport> SecureClient<T> {
    pub fn new(transport: T, registry: Arc<SessionRegistry>) -> Self {
        Self {
            transport,
            interceptor: ResponseInterceptor::new(registry),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.interceptor.registry()
    }

    /// Decorates `request` with `session`, sends it, and routes the outcome.
    ///
    /// Non-2xx responses are returned as `Ok`, after the session has seen
    /// them. A transport failure is reported to the session as a missing
    /// response and returned as [`SesameError::Transport`].
    pub async fn send(
        &self,
        session: &dyn RequestDecorator,
        mut request: RequestConf,
    ) -> Result<Response, SesameError> {
        session.manage_request_conf(&mut request);
        tracing::debug!(method = %request.method, url = %request.url, "sending request");

        match self.transport.send(request.clone()).await {
            Ok(response) => Ok(self.interceptor.intercept(&request, response)),
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "request failed");
                self.interceptor.intercept_failure(&request);
                Err(e.into())
            }
        }
    }
}
