use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    config::Config,
    server::start_api_server,
    types::{PkceToken, Token},
    utils, warning,
};

const CALLBACK_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs the OAuth 2.0 PKCE authorization flow.
///
/// Starts the local callback server, opens the authorization URL in the
/// browser (or prints it) and waits for the callback to deliver the token.
///
/// # Returns
///
/// - `Ok(Token)` - the access and refresh token of the authorizing user
/// - `Err(String)` - the user did not finish in time or the exchange failed
pub async fn authorize(
    config: Arc<Config>,
    shared_state: Arc<Mutex<Option<PkceToken>>>,
) -> Result<Token, String> {
    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);

    // store verifier before the callback can be hit
    {
        let mut lock = shared_state.lock().await;
        *lock = Some(PkceToken {
            code_verifier,
            token: None,
        });
    }

    let server_state = Arc::clone(&shared_state);
    let server_config = Arc::clone(&config);
    let server = tokio::spawn(async move { start_api_server(server_state, server_config).await });

    let auth_url = format!(
        "{spotify_auth_url}?client_id={client_id}&response_type=code&redirect_uri={redirect_uri}&code_challenge={code_challenge}&code_challenge_method=S256&scope={scope}",
        spotify_auth_url = config.auth_url,
        client_id = config.client_id,
        redirect_uri = config.redirect_uri,
        code_challenge = code_challenge,
        scope = config.scope.replace(' ', "%20")
    );

    if webbrowser::open(&auth_url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    let token = wait_for_token(shared_state).await;
    server.abort();

    token.ok_or_else(|| "Authentication failed or timed out.".to_string())
}

async fn wait_for_token(shared_state: Arc<Mutex<Option<PkceToken>>>) -> Option<Token> {
    let start = Instant::now();

    while start.elapsed() < CALLBACK_TIMEOUT {
        let lock = shared_state.lock().await;
        if let Some(token) = lock.as_ref().and_then(|pkce| pkce.token.as_ref()) {
            return Some(token.clone());
        }
        drop(lock);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    None
}

pub async fn refresh_token(
    token_url: &str,
    client_id: &str,
    refresh_token: &str,
) -> Result<Token, String> {
    let client = Client::new();
    let res = client
        .post(token_url)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
        ])
        .send()
        .await
        .map_err(|e| e.to_string())?
        .error_for_status()
        .map_err(|e| e.to_string())?;

    let json: Value = res.json().await.map_err(|e| e.to_string())?;
    token_from_json(&json)
}

pub async fn exchange_code_pkce(
    config: &Config,
    code: &str,
    verifier: &str,
) -> Result<Token, String> {
    let client = Client::new();
    let res = client
        .post(&config.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", config.client_id.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", config.redirect_uri.as_str()),
        ])
        .send()
        .await
        .map_err(|e| e.to_string())?
        .error_for_status()
        .map_err(|e| e.to_string())?;

    let json: Value = res.json().await.map_err(|e| e.to_string())?;
    token_from_json(&json)
}

/// Builds a [`Token`] from a token endpoint response.
pub fn token_from_json(json: &Value) -> Result<Token, String> {
    let access_token = json["access_token"]
        .as_str()
        .ok_or("token response without access_token")?;

    Ok(Token {
        access_token: access_token.to_string(),
        refresh_token: json["refresh_token"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        scope: json["scope"].as_str().unwrap_or_default().to_string(),
        expires_in: json["expires_in"].as_u64().unwrap_or(3600),
        obtained_at: Utc::now().timestamp() as u64,
    })
}
