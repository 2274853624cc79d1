//! Outgoing request configuration.
//!
//! A [`RequestConf`] is the mutable description of a request before it is
//! sent. The session layer decorates it (credential headers plus a routing
//! key) and the transport turns it into bytes on the wire.

use http::header::{AsHeaderName, InvalidHeaderValue, IntoHeaderName};
use http::{HeaderMap, HeaderValue, Method};
use serde_json::Value;

/// `Accept` header sent when the caller has no preference.
pub const DEFAULT_ACCEPT: &str = "application/json, text/plain, */*";

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

/// Request payload.
///
/// Form pairs keep their insertion order so the encoded body is
/// deterministic (token endpoints and test doubles both rely on that).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` pairs.
    Form(Vec<(String, String)>),
    /// `application/json` document.
    Json(Value),
}

impl Body {
    /// Builds a form body from borrowed pairs.
    pub fn form<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    /// Returns `(content_type, payload)` or `None` for an empty body.
    pub fn encode(&self) -> Option<(&'static str, String)> {
        match self {
            Self::Empty => None,
            Self::Form(pairs) => {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                    .finish();
                Some(("application/x-www-form-urlencoded", encoded))
            }
            Self::Json(value) => Some(("application/json;charset=utf-8", value.to_string())),
        }
    }

    /// Returns `true` if there is nothing to send.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

// ---------------------------------------------------------------------------
// RequestConf
// ---------------------------------------------------------------------------

/// A request that has not been sent yet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestConf {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Body,

    /// Key of the session that decorated this request.
    ///
    /// Set by the session layer so the response can be routed back to the
    /// session that issued it. The transport never sends it.
    pub routing_key: Option<String>,
}

impl RequestConf {
    /// Creates a request with no headers and no body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Self::default()
        }
    }

    /// Shorthand for a `GET` request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Shorthand for a `POST` request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Builder-style header setter for values known at compile time.
    ///
    /// # Panics
    ///
    /// If `value` is not a valid header value.
    pub fn with_header<K: IntoHeaderName>(mut self, name: K, value: &'static str) -> Self {
        self.headers.insert(name, HeaderValue::from_static(value));
        self
    }

    /// Builder-style body setter.
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    /// Looks up a header value. Names are case-insensitive; a value that is
    /// not visible ASCII reads as absent.
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Sets a header, replacing every existing value under that name.
    pub fn set_header<K: IntoHeaderName>(
        &mut self,
        name: K,
        value: &str,
    ) -> Result<(), InvalidHeaderValue> {
        self.headers.insert(name, HeaderValue::try_from(value)?);
        Ok(())
    }

    /// Removes a header, returning its value.
    pub fn remove_header<K: AsHeaderName>(&mut self, name: K) -> Option<HeaderValue> {
        self.headers.remove(name)
    }
}
