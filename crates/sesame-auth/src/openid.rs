//! Popup-based OpenID login.
//!
//! The flow has two legs:
//!
//! ```text
//! check_login ──open popup──→ <base><begin>?openid_identifier=...
//!      │                              │ (user talks to their provider)
//!      │                              ▼
//!      │◄──CallbackBridge::deliver(id, "<query>")── redirect page
//!      │
//!      └──GET──→ <base><finish>?<query>  ──→ {approved, user, ...}
//! ```
//!
//! The finish endpoint sets up a server-side session and hands back a
//! cookie value, which is then sent as `<cookie_field>=<value>` on every
//! request.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sesame_transport::header::{ACCEPT, COOKIE};
use sesame_transport::{DEFAULT_ACCEPT, HttpTransport, RequestConf, Response, StatusCode};

use crate::{AuthState, Authenticator, CallbackBridge, LoginResult, Popup, PopupOpener, ResponseCheck};

/// Window name for the login popup.
pub const POPUP_NAME: &str = "openid_popup";

/// Window features for the login popup.
pub const POPUP_FEATURES: &str = "width=450,height=500,location=1,status=1,resizable=yes";

/// Message for a denial that came without one.
const DEFAULT_DENIED: &str = "Access denied";

// ---------------------------------------------------------------------------
// Configuration and data
// ---------------------------------------------------------------------------

/// Endpoints and cookie naming for an OpenID relying party.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenIdConfig {
    pub base_url: String,
    /// Path that starts the provider dance, e.g. `/openid_begin`.
    pub begin_path: String,
    /// Path that verifies the provider's answer, e.g. `/openid_finish`.
    pub finish_path: String,
    /// Name of the cookie the session value is sent under.
    pub cookie_field: String,
    /// How long to wait for the popup. `None` waits forever.
    pub callback_timeout_secs: Option<u64>,
}

impl Default for OpenIdConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            begin_path: "/openid_begin".to_string(),
            finish_path: "/openid_finish".to_string(),
            cookie_field: "openid_session".to_string(),
            callback_timeout_secs: Some(300),
        }
    }
}

impl OpenIdConfig {
    pub fn new(
        base_url: impl Into<String>,
        begin_path: impl Into<String>,
        finish_path: impl Into<String>,
        cookie_field: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            begin_path: begin_path.into(),
            finish_path: finish_path.into(),
            cookie_field: cookie_field.into(),
            ..Self::default()
        }
    }

    fn callback_timeout(&self) -> Option<Duration> {
        self.callback_timeout_secs.map(Duration::from_secs)
    }

    fn begin_url(&self, identifier: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(identifier.as_bytes()).collect();
        format!(
            "{}{}?openid_identifier={encoded}",
            self.base_url.trim_end_matches('/'),
            self.begin_path
        )
    }

    fn finish_url(&self, query: &str) -> String {
        format!(
            "{}{}?{}",
            self.base_url.trim_end_matches('/'),
            self.finish_path,
            query.trim_start_matches('?')
        )
    }
}

/// The identifier the user typed (a URL or an `=name`-style i-name).
#[derive(Debug, Clone, Deserialize)]
pub struct OpenIdCredentials {
    pub openid_identifier: String,
}

impl OpenIdCredentials {
    pub fn new(openid_identifier: impl Into<String>) -> Self {
        Self {
            openid_identifier: openid_identifier.into(),
        }
    }
}

/// Session state after an approved login: the user, the cookie value, and
/// whatever else the finish endpoint chose to return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenIdState {
    pub user: String,
    #[serde(rename = "cookieVal", default, skip_serializing_if = "Option::is_none")]
    pub cookie_val: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthState for OpenIdState {
    fn user(&self) -> &str {
        &self.user
    }
}

// ---------------------------------------------------------------------------
// OpenIdAuth
// ---------------------------------------------------------------------------

/// The popup OpenID strategy.
pub struct OpenIdAuth<T, P> {
    config: OpenIdConfig,
    transport: T,
    popups: P,
    bridge: Arc<CallbackBridge>,
}

impl<T: HttpTransport, P: PopupOpener> OpenIdAuth<T, P> {
    pub fn new(config: OpenIdConfig, transport: T, popups: P, bridge: Arc<CallbackBridge>) -> Self {
        Self {
            config,
            transport,
            popups,
            bridge,
        }
    }

    pub fn config(&self) -> &OpenIdConfig {
        &self.config
    }

    /// The bridge the host must deliver popup answers to.
    pub fn bridge(&self) -> &Arc<CallbackBridge> {
        &self.bridge
    }
}

impl<T: HttpTransport, P: PopupOpener> Authenticator for OpenIdAuth<T, P> {
    type Credentials = OpenIdCredentials;
    type State = OpenIdState;

    fn auth_type(&self) -> &str {
        "OpenIDAuth"
    }

    async fn check_login(&self, credentials: OpenIdCredentials) -> LoginResult<OpenIdState> {
        // Register before opening so an instant answer has somewhere to go.
        let pending = self.bridge.register();
        let popup = Popup {
            url: self.config.begin_url(&credentials.openid_identifier),
            name: POPUP_NAME.to_string(),
            features: POPUP_FEATURES.to_string(),
            correlation_id: pending.id().to_string(),
        };

        if let Err(e) = self.popups.open(&popup) {
            tracing::warn!(error = %e, "could not open OpenID popup");
            return LoginResult::Error(e.to_string());
        }
        tracing::debug!(url = %popup.url, correlation_id = %popup.correlation_id, "OpenID popup opened");

        let query = match pending.wait(self.config.callback_timeout()).await {
            Ok(query) => query,
            Err(e) => {
                tracing::info!(error = %e, "OpenID popup never answered");
                return LoginResult::Error(e.to_string());
            }
        };

        let request = RequestConf::get(self.config.finish_url(&query))
            .with_header(ACCEPT, DEFAULT_ACCEPT);
        match self.transport.send(request).await {
            Ok(response) => classify_finish_reply(&response),
            Err(e) => {
                tracing::warn!(error = %e, "OpenID finish request failed");
                LoginResult::Error(format!("OpenID login failed: {e}"))
            }
        }
    }

    /// Appends the session cookie, keeping any cookies already on the
    /// request.
    fn add_auth_to_request_conf(&self, conf: &mut RequestConf, state: &OpenIdState) {
        let Some(cookie_val) = &state.cookie_val else {
            return;
        };
        let pair = format!("{}={cookie_val}", self.config.cookie_field);
        let cookie = match conf.header(COOKIE) {
            Some(existing) if !existing.is_empty() => format!("{existing}; {pair}"),
            _ => pair,
        };
        if let Err(e) = conf.set_header(COOKIE, &cookie) {
            tracing::warn!(error = %e, "session cookie is not a valid header value; request sent without it");
        }
    }

    /// Both 401 and 403 end the session: the server answers 403 once the
    /// OpenID cookie has lapsed.
    fn check_response(&self, response: &Response) -> ResponseCheck {
        ResponseCheck::auth_failure(matches!(
            response.status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ))
    }
}

/// Sorts a finish endpoint reply into the three outcome classes.
fn classify_finish_reply(response: &Response) -> LoginResult<OpenIdState> {
    if !response.is_success() {
        return LoginResult::Error(format!(
            "OpenID login failed with HTTP status {}",
            response.status.as_u16()
        ));
    }

    let malformed = || {
        LoginResult::Error(format!(
            "Malformed OpenID response (HTTP status {})",
            response.status.as_u16()
        ))
    };

    // Everything but the verdict becomes the session state, `message`
    // included when the login is approved.
    let Value::Object(mut reply) = response.body.clone() else {
        return malformed();
    };
    let approved = reply.remove("approved").and_then(|v| v.as_bool()).unwrap_or(false);
    if !approved {
        let message = reply.get("message").and_then(Value::as_str).unwrap_or(DEFAULT_DENIED);
        return LoginResult::Denied(message.to_string());
    }
    match serde_json::from_value::<OpenIdState>(Value::Object(reply)) {
        Ok(state) => LoginResult::Accepted(state),
        Err(_) => malformed(),
    }
}
