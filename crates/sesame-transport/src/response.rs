//! Incoming response model.

use http::header::AsHeaderName;
use http::{HeaderMap, StatusCode};
use serde_json::Value;

/// A response as seen by the session layer: a status and a parsed body.
///
/// The body is always a [`Value`]. JSON payloads are parsed; anything else
/// is kept verbatim as [`Value::String`] and an empty payload becomes
/// [`Value::Null`]. Callers that expect an object simply find no fields in
/// the latter two cases, which is how malformed bodies degrade.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Response {
    /// Creates a response with an already-parsed body.
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
        }
    }

    /// Creates a response with no body.
    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, Value::Null)
    }

    /// Creates a response from a raw text payload, parsing it as JSON when
    /// possible.
    pub fn from_text(status: StatusCode, text: &str) -> Self {
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        };
        Self::new(status, body)
    }

    /// Builder-style header map setter.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// First value of a header, if it is visible ASCII.
    pub fn header<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a string field of an object body.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.body.get(name).and_then(Value::as_str)
    }
}
