use tabled::Table;

use crate::{
    config::Config, error, info, management::AccountRegistry, success, types::AccountTableRow,
    warning,
};

pub async fn list_accounts(config: &Config) {
    let registry = AccountRegistry::load(config.accounts_path()).await;
    if registry.is_empty() {
        warning!("No accounts yet. Run newmusic auth --user <USER>.");
        return;
    }

    let rows: Vec<AccountTableRow> = registry
        .iter()
        .map(|(user, account)| AccountTableRow {
            user: user.clone(),
            email: account.email.clone(),
            playlist: account.playlist_id.clone().unwrap_or_default(),
            artists: account.followed_artists.len(),
            token: if config.token_path(user).is_file() {
                "yes".to_string()
            } else {
                "missing".to_string()
            },
        })
        .collect();

    println!("{}", Table::new(rows));
}

pub async fn add_account(config: &Config, user: &str, email: Option<String>) {
    let mut registry = AccountRegistry::load(config.accounts_path()).await;
    let is_new = registry.add(user, email);

    if let Err(e) = registry.persist().await {
        error!("Failed to save account {}: {}", user, e);
    }

    if is_new {
        success!("Account {} added.", user);
    } else {
        success!("Account {} updated.", user);
    }
    if !config.token_path(user).is_file() {
        info!("Authorize it with: newmusic auth --user {}", user);
    }
}

pub async fn remove_account(config: &Config, user: &str) {
    let mut registry = AccountRegistry::load(config.accounts_path()).await;
    if let Err(e) = registry.remove(user) {
        error!("{}", e);
    }

    if let Err(e) = registry.persist().await {
        error!("Failed to save accounts: {}", e);
    }

    if async_fs::remove_file(config.token_path(user)).await.is_err() {
        info!("No cached token for {}.", user);
    }
    success!("Account {} removed.", user);
}
