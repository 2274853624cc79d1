//! Scripted transport for tests.

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::{HttpTransport, RequestConf, Response, TransportError};

/// An [`HttpTransport`] that answers from a queue and records every request.
///
/// When the queue runs dry, `send` fails with
/// [`TransportError::ConnectionFailed`], which makes a missing expectation
/// show up as a failed login rather than a hang.
#[derive(Debug, Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Result<Response, TransportError>>>,
    requests: Mutex<Vec<RequestConf>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn push_response(&self, response: Response) {
        self.replies.lock().push_back(Ok(response));
    }

    /// Queues a transport failure.
    pub fn push_error(&self, error: TransportError) {
        self.replies.lock().push_back(Err(error));
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<RequestConf> {
        self.requests.lock().clone()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<RequestConf> {
        self.requests.lock().last().cloned()
    }

    /// Number of queued replies not consumed yet.
    pub fn pending_replies(&self) -> usize {
        self.replies.lock().len()
    }
}

impl HttpTransport for MockTransport {
    async fn send(&self, request: RequestConf) -> Result<Response, TransportError> {
        let url = request.url.clone();
        self.requests.lock().push(request);
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::ConnectionFailed(format!("no reply queued for {url}"))))
    }
}
