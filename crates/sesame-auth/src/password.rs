//! Resource-owner password grant against an OAuth2 token endpoint.
//!
//! The user's name and password are exchanged for a bearer token at
//! `<base>/oauth/v2/token`; afterwards every request carries
//! `Authorization: Bearer <token>`.

use std::fmt;

use serde::{Deserialize, Serialize};
use sesame_transport::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use sesame_transport::{Body, DEFAULT_ACCEPT, HttpTransport, RequestConf, Response, StatusCode};

use crate::{AuthState, Authenticator, LoginResult, ResponseCheck};

/// Path of the token endpoint, relative to the base URL.
pub const TOKEN_PATH: &str = "/oauth/v2/token";

/// Message for rejected credentials.
const BAD_CREDENTIALS: &str = "Incorrect username or password";

// ---------------------------------------------------------------------------
// Configuration and data
// ---------------------------------------------------------------------------

/// Where and as whom to request tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordOAuthConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl PasswordOAuthConfig {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    fn token_url(&self) -> String {
        format!("{}{TOKEN_PATH}", self.base_url.trim_end_matches('/'))
    }
}

/// A user name and password.
#[derive(Clone, Deserialize)]
pub struct PasswordCredentials {
    pub user: String,
    pub pass: String,
}

impl PasswordCredentials {
    pub fn new(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
        }
    }
}

/// Keeps the password out of logs.
impl fmt::Debug for PasswordCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCredentials")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

/// Session state after a successful token exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthState {
    pub token: String,
    pub refresh_token: Option<String>,
    /// Token lifetime in seconds, as reported by the server.
    pub expires_in: Option<u64>,
    pub user: String,
}

impl AuthState for OAuthState {
    fn user(&self) -> &str {
        &self.user
    }
}

/// Successful token endpoint reply.
#[derive(Debug, Deserialize)]
struct TokenReply {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

// ---------------------------------------------------------------------------
// PasswordOAuth
// ---------------------------------------------------------------------------

/// The password-grant OAuth strategy.
pub struct PasswordOAuth<T> {
    config: PasswordOAuthConfig,
    transport: T,
}

impl<T: HttpTransport> PasswordOAuth<T> {
    pub fn new(config: PasswordOAuthConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &PasswordOAuthConfig {
        &self.config
    }

    fn token_request(&self, credentials: &PasswordCredentials) -> RequestConf {
        RequestConf::post(self.config.token_url())
            .with_header(ACCEPT, DEFAULT_ACCEPT)
            .with_header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .with_body(Body::form([
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "password"),
                ("username", credentials.user.as_str()),
                ("password", credentials.pass.as_str()),
            ]))
    }
}

impl<T: HttpTransport> Authenticator for PasswordOAuth<T> {
    type Credentials = PasswordCredentials;
    type State = OAuthState;

    fn auth_type(&self) -> &str {
        "PasswordOAuth"
    }

    async fn check_login(&self, credentials: PasswordCredentials) -> LoginResult<OAuthState> {
        let request = self.token_request(&credentials);
        match self.transport.send(request).await {
            Ok(response) => {
                let result = classify_token_reply(&response, &credentials.user);
                tracing::debug!(
                    user = %credentials.user,
                    status = response.status.as_u16(),
                    outcome = %result.status(),
                    "token exchange finished"
                );
                result
            }
            Err(e) => {
                tracing::warn!(error = %e, "token request failed");
                LoginResult::Error(format!("Login failed: {e}"))
            }
        }
    }

    fn add_auth_to_request_conf(&self, conf: &mut RequestConf, state: &OAuthState) {
        if let Err(e) = conf.set_header(AUTHORIZATION, &format!("Bearer {}", state.token)) {
            tracing::warn!(error = %e, "token is not a valid header value; request sent without it");
        }
    }

    /// Only 401 invalidates the token; a 403 leaves the session alone.
    fn check_response(&self, response: &Response) -> ResponseCheck {
        ResponseCheck::auth_failure(response.status == StatusCode::UNAUTHORIZED)
    }
}

/// Sorts a token endpoint reply into the three outcome classes.
///
/// - 2xx with an `access_token` → Accepted
/// - 4xx with an OAuth `error` code → Denied
/// - anything with an `error_description` → Error carrying that text
/// - anything else → Error naming the HTTP status
fn classify_token_reply(response: &Response, user: &str) -> LoginResult<OAuthState> {
    if response.is_success() {
        return match serde_json::from_value::<TokenReply>(response.body.clone()) {
            Ok(reply) => LoginResult::Accepted(OAuthState {
                token: reply.access_token,
                refresh_token: reply.refresh_token,
                expires_in: reply.expires_in,
                user: user.to_string(),
            }),
            Err(_) => LoginResult::Error(format!(
                "Malformed token response (HTTP status {})",
                response.status.as_u16()
            )),
        };
    }

    let description = response.str_field("error_description");
    if response.status.is_client_error() {
        if let Some(code) = response.str_field("error") {
            let msg = match (code, description) {
                ("invalid_grant", _) => BAD_CREDENTIALS.to_string(),
                (_, Some(description)) => description.to_string(),
                (code, None) => format!("Login denied ({code})"),
            };
            return LoginResult::Denied(msg);
        }
    }

    match description {
        Some(description) => LoginResult::Error(description.to_string()),
        None => LoginResult::Error(format!(
            "Login failed with HTTP status {}",
            response.status.as_u16()
        )),
    }
}
