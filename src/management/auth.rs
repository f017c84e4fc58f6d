use std::path::PathBuf;

use chrono::Utc;

use crate::{config::Config, spotify, types::Token, warning};

/// OAuth token of one account, cached on disk and refreshed on demand.
pub struct TokenManager {
    token: Token,
    path: PathBuf,
    client_id: String,
    token_url: String,
}

impl TokenManager {
    pub fn new(config: &Config, user: &str, token: Token) -> Self {
        TokenManager {
            token,
            path: config.token_path(user),
            client_id: config.client_id.clone(),
            token_url: config.token_url.clone(),
        }
    }

    pub async fn load(config: &Config, user: &str) -> Result<Self, String> {
        let path = config.token_path(user);
        let content = async_fs::read_to_string(&path)
            .await
            .map_err(|e| e.to_string())?;
        let token: Token = serde_json::from_str(&content).map_err(|e| e.to_string())?;
        Ok(Self::new(config, user, token))
    }

    pub async fn persist(&self) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(&self.token).map_err(|e| e.to_string())?;
        async_fs::write(&self.path, json)
            .await
            .map_err(|e| e.to_string())
    }

    pub async fn get_valid_token(&mut self) -> String {
        if self.is_expired() {
            match spotify::auth::refresh_token(
                &self.token_url,
                &self.client_id,
                &self.token.refresh_token,
            )
            .await
            {
                Ok(mut new_token) => {
                    // refresh responses may omit the refresh token
                    if new_token.refresh_token.is_empty() {
                        new_token.refresh_token = self.token.refresh_token.clone();
                    }
                    self.token = new_token;
                    if let Err(e) = self.persist().await {
                        warning!("Cannot cache refreshed token. Err: {}", e);
                    }
                }
                Err(e) => warning!("Cannot refresh token. Err: {}", e),
            }
        }

        self.token.access_token.clone()
    }

    fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp() as u64;
        now + 240 >= self.token.obtained_at + self.token.expires_in
    }
}
