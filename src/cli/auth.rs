use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    config::Config,
    error, info, success,
    management::{AccountRegistry, TokenManager},
    spotify,
    types::PkceToken,
};

/// Authorizes `user` and stores the token next to the account.
pub async fn auth(config: Arc<Config>, user: &str) {
    let shared_state: Arc<Mutex<Option<PkceToken>>> = Arc::new(Mutex::new(None));

    let token = match spotify::auth::authorize(Arc::clone(&config), shared_state).await {
        Ok(token) => token,
        Err(e) => error!("{}", e),
    };

    let token_manager = TokenManager::new(&config, user, token);
    if let Err(e) = token_manager.persist().await {
        error!("Failed to save token to cache: {}", e);
    }

    let mut registry = AccountRegistry::load(config.accounts_path()).await;
    if registry.add(user, None) {
        if let Err(e) = registry.persist().await {
            error!("Failed to save account {}: {}", user, e);
        }
        info!(
            "Added account {}. Set an email with: newmusic accounts add {} --email <address>",
            user, user
        );
    }

    success!("Authentication successful!");
}
