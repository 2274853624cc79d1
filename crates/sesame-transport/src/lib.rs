//! HTTP transport abstraction for Sesame.
//!
//! Provides the request/response model shared by every other crate and the
//! [`HttpTransport`] trait that actually moves requests over the network.
//! Methods, headers and status codes are the `http` crate's types,
//! re-exported here.
//!
//! # Feature Flags
//!
//! - `reqwest` (default): [`ReqwestTransport`], backed by `reqwest`
//! - `mock`: [`MockTransport`], a scripted transport for tests

mod error;
#[cfg(feature = "mock")]
mod mock;
mod request;
mod response;
#[cfg(feature = "reqwest")]
mod reqwest_transport;

pub use error::TransportError;
#[cfg(feature = "mock")]
pub use mock::MockTransport;
pub use http::{HeaderMap, HeaderValue, Method, StatusCode, header};
pub use request::{Body, DEFAULT_ACCEPT, RequestConf};
#[cfg(feature = "reqwest")]
pub use reqwest_transport::ReqwestTransport;
pub use response::Response;

use std::future::Future;
use std::sync::Arc;

/// Sends a request and returns the response.
///
/// Non-2xx statuses are `Ok` responses; only faults that prevent a response
/// from arriving are errors. The returned future must be `Send` because
/// authenticators drive it from inside their own `Send` futures.
pub trait HttpTransport: Send + Sync + 'static {
    /// Sends the request.
    fn send(
        &self,
        request: RequestConf,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send;
}

/// A shared transport is still a transport, so several authenticators and a
/// client can use one connection pool.
impl<T: HttpTransport> HttpTransport for Arc<T> {
    fn send(
        &self,
        request: RequestConf,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send {
        (**self).send(request)
    }
}
