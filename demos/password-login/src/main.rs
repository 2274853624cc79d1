//! Logs in with a user name and password, then fetches a protected resource.
//!
//! ```text
//! SESAME_AUTH_URL=https://auth.example.com \
//! SESAME_CLIENT_ID=my_id SESAME_CLIENT_SECRET=my_secret \
//! SESAME_USER=alice SESAME_PASS=swordfish \
//! SESAME_API_URL=https://api.example.com/thing/:thingId \
//! RUST_LOG=sesame=debug cargo run -p password-login
//! ```

use std::sync::Arc;

use sesame::prelude::*;
use sesame::{OAuthState, Registration};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
struct Settings {
    oauth: PasswordOAuthConfig,
    user: String,
    pass: String,
    api_url: Option<String>,
    session: SessionConfig,
}

impl Settings {
    /// Reads settings through `var`, normally `std::env::var`.
    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let required = |name: &str| var(name).ok_or_else(|| format!("{name} is not set"));

        let mut session = SessionConfig::default();
        if let Some(name) = var("SESAME_SESSION_NAME") {
            session.session_name = name;
        }

        Ok(Self {
            oauth: PasswordOAuthConfig::new(
                required("SESAME_AUTH_URL")?,
                required("SESAME_CLIENT_ID")?,
                required("SESAME_CLIENT_SECRET")?,
            ),
            user: required("SESAME_USER")?,
            pass: required("SESAME_PASS")?,
            api_url: var("SESAME_API_URL"),
            session,
        })
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("sesame=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_lookup(|name| std::env::var(name).ok())?;

    let transport = Arc::new(ReqwestTransport::new());
    let registry = Arc::new(SessionRegistry::new());
    let client = Arc::new(SecureClient::new(Arc::clone(&transport), Arc::clone(&registry)));
    let navigator = Arc::new(MemoryNavigator::new("/login"));

    let auth = PasswordOAuth::new(settings.oauth, transport);
    let session = Session::builder(Arc::new(auth), navigator.clone())
        .config(settings.session)
        .store(Arc::new(MemoryStore::new()))
        .build();
    let _registration: Registration = registry.register(&session);

    let callbacks = LoginCallbacks::new()
        .on_accepted(|result: &LoginResult<OAuthState>| {
            if let Some(state) = result.new_state() {
                tracing::info!(user = %state.user, "welcome");
            }
        })
        .on_denied(|result| eprintln!("denied: {}", result.msg().unwrap_or_default()))
        .on_error(|result| eprintln!("error: {}", result.msg().unwrap_or_default()));

    let credentials = PasswordCredentials::new(settings.user, settings.pass);
    let result = session.login_with(credentials, callbacks).await;
    println!("login {} (now at {})", result.status(), navigator.path());

    if !session.logged_in() {
        return Ok(());
    }

    if let Some(api_url) = settings.api_url {
        let things = SecureResource::new(client, session.clone(), &api_url)?;
        let response = things.query(&[]).await?;
        println!("{} {}", response.status, response.body);
        if !session.logged_in() {
            println!("token rejected, back at {}", navigator.path());
        }
    }

    session.logout();
    println!("logged out (now at {})", navigator.path());
    Ok(())
}
