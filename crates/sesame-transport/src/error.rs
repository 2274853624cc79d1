/// Errors that can occur in the transport layer.
///
/// Only faults that prevent a response from arriving end up here. A
/// response with a 4xx or 5xx status is still a successful round trip and
/// comes back as `Ok(Response)`.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request never reached the server (refused, reset, DNS, ...).
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request URL could not be parsed.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The underlying HTTP client reported an error.
    #[cfg(feature = "reqwest")]
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),
}
