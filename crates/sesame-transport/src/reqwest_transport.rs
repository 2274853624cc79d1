//! HTTP transport implementation using `reqwest`.

use http::HeaderValue;
use http::header::CONTENT_TYPE;

use crate::{HttpTransport, RequestConf, Response, TransportError};

/// An [`HttpTransport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an already-configured client (timeouts, proxies, TLS roots).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: RequestConf) -> Result<Response, TransportError> {
        let RequestConf {
            method,
            url,
            mut headers,
            body,
            ..
        } = request;
        let parsed = reqwest::Url::parse(&url)
            .map_err(|e| TransportError::InvalidUrl(format!("{url}: {e}")))?;

        tracing::debug!(%method, %url, "sending request");

        let payload = body.encode().map(|(content_type, payload)| {
            headers
                .entry(CONTENT_TYPE)
                .or_insert(HeaderValue::from_static(content_type));
            payload
        });
        let mut builder = self.client.request(method, parsed).headers(headers);
        if let Some(payload) = payload {
            builder = builder.body(payload);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                TransportError::ConnectionFailed(e.to_string())
            } else {
                TransportError::Request(e)
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await.map_err(TransportError::Request)?;

        tracing::debug!(status = status.as_u16(), %url, "received response");
        Ok(Response::from_text(status, &text).with_headers(headers))
    }
}
