//! REST resources whose requests go through a session.
//!
//! A [`SecureResource`] binds a URL template such as
//! `https://api.example.com/thing/:thingId` to a [`SecureClient`] and a
//! session. Each operation fills the template from its parameters, sends
//! the request through the client, and so picks up the session's
//! credentials and auth-failure handling without the caller doing anything.
//!
//! Template binding rules:
//!
//! - `:name` in the path or query is a placeholder when `name` starts with
//!   a letter or `_`. The scheme, user info, host and port are never
//!   scanned, so neither `:9001` nor `user:secret@` is mistaken for one.
//! - A placeholder with a value is replaced by the percent-encoded value.
//! - A placeholder without a value disappears together with the `/` in
//!   front of it: `/thing/:thingId` binds to `/thing`.
//! - Parameters that match no placeholder become the query string, sorted
//!   by name, placed before any `#fragment`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use sesame_session::RequestDecorator;
use sesame_transport::header::ACCEPT;
use sesame_transport::{Body, DEFAULT_ACCEPT, HttpTransport, Method, RequestConf, Response};

use crate::{SecureClient, SesameError};

// ---------------------------------------------------------------------------
// UrlTemplate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A parsed URL template with `:name` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    source: String,
    /// Scheme and authority, copied through as-is.
    origin: String,
    /// Path and query.
    segments: Vec<Segment>,
    fragment: Option<String>,
}

impl UrlTemplate {
    /// Parses `template`, which must be an absolute URL.
    pub fn parse(template: &str) -> Result<Self, SesameError> {
        url::Url::parse(template)
            .map_err(|e| SesameError::InvalidTemplate(format!("{template}: {e}")))?;

        let (origin, rest) = split_origin(template);
        let (path_and_query, fragment) = match rest.split_once('#') {
            Some((head, fragment)) => (head, Some(fragment.to_string())),
            None => (rest, None),
        };

        Ok(Self {
            source: template.to_string(),
            origin: origin.to_string(),
            segments: parse_segments(path_and_query),
            fragment,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names, in template order.
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Builds a URL from `params`.
    pub fn bind(&self, params: &BTreeMap<String, String>) -> String {
        let mut url = self.origin.clone();
        let path_start = url.len();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => url.push_str(text),
                Segment::Param(name) => match params.get(name) {
                    Some(value) => url.push_str(&encode_segment(value)),
                    None => {
                        if url.len() > path_start && url.ends_with('/') {
                            url.pop();
                        }
                    }
                },
            }
        }

        let mut query = url::form_urlencoded::Serializer::new(String::new());
        let mut has_query = false;
        for (name, value) in params {
            if !self.params().any(|p| p == name.as_str()) {
                query.append_pair(name, value);
                has_query = true;
            }
        }
        if has_query {
            url.push(if url[path_start..].contains('?') { '&' } else { '?' });
            url.push_str(&query.finish());
        }
        if let Some(fragment) = &self.fragment {
            url.push('#');
            url.push_str(fragment);
        }
        url
    }
}

/// Splits off `scheme://authority`, or just `scheme:` for URLs without an
/// authority.
fn split_origin(template: &str) -> (&str, &str) {
    if let Some(scheme_end) = template.find("://") {
        let authority_start = scheme_end + 3;
        let authority_end = template[authority_start..]
            .find(['/', '?', '#'])
            .map_or(template.len(), |i| authority_start + i);
        return template.split_at(authority_end);
    }
    match template.find(':') {
        Some(i) => template.split_at(i + 1),
        None => ("", template),
    }
}

fn parse_segments(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        let starts_name = c == ':'
            && chars
                .peek()
                .is_some_and(|next| next.is_ascii_alphabetic() || *next == '_');
        if !starts_name {
            literal.push(c);
            continue;
        }

        let mut name = String::new();
        while let Some(next) = chars.next_if(|n| n.is_ascii_alphanumeric() || *n == '_') {
            name.push(next);
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Param(name));
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

/// Percent-encodes a path segment. Spaces become `%20`, not `+`.
fn encode_segment(value: &str) -> String {
    // A literal '+' is encoded as %2B, so every '+' left is a space.
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

// ---------------------------------------------------------------------------
// SecureResource
// ---------------------------------------------------------------------------

/// A custom operation on a resource, e.g. `PUT ?volume=11`.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub method: Method,
    pub params: Vec<(String, String)>,
}

/// A REST endpoint bound to a session.
///
/// Default parameters whose value starts with `@` are read from the
/// request body: with a default `thingId = "@id"`, saving `{"id": 3}`
/// posts to `/thing/3`.
pub struct SecureResource<T> {
    client: Arc<SecureClient<T>>,
    session: Arc<dyn RequestDecorator>,
    template: UrlTemplate,
    defaults: Vec<(String, String)>,
    actions: BTreeMap<String, Action>,
}

impl<T: HttpTransport> SecureResource<T> {
    pub fn new(
        client: Arc<SecureClient<T>>,
        session: Arc<dyn RequestDecorator>,
        template: &str,
    ) -> Result<Self, SesameError> {
        Ok(Self {
            client,
            session,
            template: UrlTemplate::parse(template)?,
            defaults: Vec::new(),
            actions: BTreeMap::new(),
        })
    }

    /// Adds a default parameter. `@field` takes the value from the body.
    pub fn with_default(mut self, name: &str, value: &str) -> Self {
        self.defaults.push((name.to_string(), value.to_string()));
        self
    }

    /// Defines a named custom action, run with [`invoke`](Self::invoke).
    pub fn with_action(mut self, name: &str, method: Method, params: &[(&str, &str)]) -> Self {
        let params = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.actions.insert(name.to_string(), Action { method, params });
        self
    }

    pub fn template(&self) -> &UrlTemplate {
        &self.template
    }

    /// The URL a request with these parameters and body would go to.
    pub fn url_for(&self, params: &[(&str, &str)], body: Option<&Value>) -> String {
        self.bind(&[], params, body)
    }

    /// `GET` a single item.
    pub async fn get(&self, params: &[(&str, &str)]) -> Result<Response, SesameError> {
        self.send(Method::GET, &[], params, None).await
    }

    /// `GET` a collection. Same request as [`get`](Self::get); kept separate
    /// so call sites read like the endpoint they hit.
    pub async fn query(&self, params: &[(&str, &str)]) -> Result<Response, SesameError> {
        self.send(Method::GET, &[], params, None).await
    }

    /// `POST` `body` as JSON.
    pub async fn save(&self, params: &[(&str, &str)], body: Value) -> Result<Response, SesameError> {
        self.send(Method::POST, &[], params, Some(body)).await
    }

    /// `DELETE` an item.
    pub async fn remove(&self, params: &[(&str, &str)]) -> Result<Response, SesameError> {
        self.send(Method::DELETE, &[], params, None).await
    }

    /// Any method, with an optional JSON body.
    pub async fn action(
        &self,
        method: Method,
        params: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Response, SesameError> {
        self.send(method, &[], params, body).await
    }

    /// Runs an action defined with [`with_action`](Self::with_action).
    pub async fn invoke(
        &self,
        name: &str,
        params: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Response, SesameError> {
        let action = self
            .actions
            .get(name)
            .ok_or_else(|| SesameError::UnknownAction(name.to_string()))?;
        self.send(action.method.clone(), &action.params, params, body)
            .await
    }

    async fn send(
        &self,
        method: Method,
        action_params: &[(String, String)],
        params: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<Response, SesameError> {
        let url = self.bind(action_params, params, body.as_ref());
        let mut request = RequestConf::new(method, url).with_header(ACCEPT, DEFAULT_ACCEPT);
        if let Some(body) = body {
            request = request.with_body(Body::Json(body));
        }
        self.client.send(self.session.as_ref(), request).await
    }

    /// Merges defaults, action params and call params (later wins) and
    /// binds the template.
    fn bind(
        &self,
        action_params: &[(String, String)],
        params: &[(&str, &str)],
        body: Option<&Value>,
    ) -> String {
        let mut merged = BTreeMap::new();
        for (name, value) in &self.defaults {
            match value.strip_prefix('@') {
                Some(field) => {
                    if let Some(v) = body.and_then(|b| b.get(field)).and_then(param_value) {
                        merged.insert(name.clone(), v);
                    }
                }
                None => {
                    merged.insert(name.clone(), value.clone());
                }
            }
        }
        for (name, value) in action_params {
            merged.insert(name.clone(), value.clone());
        }
        for (name, value) in params {
            merged.insert(name.to_string(), value.to_string());
        }
        self.template.bind(&merged)
    }
}

/// Scalars become parameters; anything else is skipped.
fn param_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
