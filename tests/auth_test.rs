use chrono::Utc;
use newmusic::management::TokenManager;
use newmusic::spotify::auth::token_from_json;
use newmusic::types::Token;
use serde_json::json;

#[test]
fn test_token_from_json() {
    let token = token_from_json(&json!({
        "access_token": "access",
        "refresh_token": "refresh",
        "scope": "user-follow-read",
        "expires_in": 3600
    }))
    .unwrap();

    assert_eq!(token.access_token, "access");
    assert_eq!(token.refresh_token, "refresh");
    assert_eq!(token.expires_in, 3600);
    assert!(token.obtained_at > 0);

    // refresh responses may come without a refresh token
    let token = token_from_json(&json!({ "access_token": "access" })).unwrap();
    assert!(token.refresh_token.is_empty());
    assert_eq!(token.expires_in, 3600);

    assert!(token_from_json(&json!({ "error": "invalid_grant" })).is_err());
}

#[tokio::test]
async fn test_token_persist_and_load() {
    let dir = tempfile::tempdir().unwrap();
    unsafe { std::env::set_var("SPOTIFY_API_AUTH_CLIENT_ID", "client") };
    unsafe { std::env::set_var("NEWMUSIC_DATA_DIR", dir.path()) };
    let config = newmusic::config::Config::from_env().unwrap();

    let token = Token {
        access_token: "access".to_string(),
        refresh_token: "refresh".to_string(),
        scope: "user-follow-read".to_string(),
        expires_in: 3600,
        obtained_at: Utc::now().timestamp() as u64,
    };

    TokenManager::new(&config, "alice", token)
        .persist()
        .await
        .unwrap();
    assert!(config.token_path("alice").is_file());

    let stored: Token =
        serde_json::from_str(&std::fs::read_to_string(config.token_path("alice")).unwrap()).unwrap();
    assert_eq!(stored.refresh_token, "refresh");

    let mut loaded = TokenManager::load(&config, "alice").await.unwrap();
    // not expired, no refresh request
    assert_eq!(loaded.get_valid_token().await, "access");

    assert!(TokenManager::load(&config, "bob").await.is_err());
}
