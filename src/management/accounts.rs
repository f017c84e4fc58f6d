use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::warning;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("account io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("account serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unknown account {0}")]
    Unknown(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist_id: Option<String>,
    #[serde(default)]
    pub email: String,
    /// Artist id to artist name.
    #[serde(default)]
    pub followed_artists: BTreeMap<String, String>,
}

impl Account {
    pub fn follows(&self, artist_id: &str) -> bool {
        self.followed_artists.contains_key(artist_id)
    }
}

/// Accounts the notifier runs for, keyed by Spotify user id.
pub struct AccountRegistry {
    path: PathBuf,
    accounts: BTreeMap<String, Account>,
}

impl AccountRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            accounts: BTreeMap::new(),
        }
    }

    /// Loads the registry. A missing or corrupt file yields no accounts.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let mut registry = Self::new(path);
        let content = match async_fs::read_to_string(&registry.path).await {
            Ok(content) => content,
            Err(_) => return registry,
        };

        match serde_json::from_str(&content) {
            Ok(accounts) => registry.accounts = accounts,
            Err(e) => warning!(
                "Cannot parse accounts file {}. Err: {}",
                registry.path.display(),
                e
            ),
        }
        registry
    }

    pub async fn persist(&self) -> Result<(), AccountError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&self.accounts)?;
        async_fs::write(&self.path, json).await?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Adds an account or updates the email of an existing one.
    ///
    /// Returns `true` when the account is new.
    pub fn add(&mut self, user: &str, email: Option<String>) -> bool {
        let is_new = !self.accounts.contains_key(user);
        let account = self.accounts.entry(user.to_string()).or_default();
        if let Some(email) = email {
            account.email = email;
        }
        is_new
    }

    pub fn remove(&mut self, user: &str) -> Result<Account, AccountError> {
        self.accounts
            .remove(user)
            .ok_or_else(|| AccountError::Unknown(user.to_string()))
    }

    pub fn get(&self, user: &str) -> Option<&Account> {
        self.accounts.get(user)
    }

    pub fn get_mut(&mut self, user: &str) -> Option<&mut Account> {
        self.accounts.get_mut(user)
    }

    pub fn users(&self) -> Vec<String> {
        self.accounts.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Account)> {
        self.accounts.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn set_followed_artists(
        &mut self,
        user: &str,
        artists: BTreeMap<String, String>,
    ) -> Result<(), AccountError> {
        let account = self
            .accounts
            .get_mut(user)
            .ok_or_else(|| AccountError::Unknown(user.to_string()))?;
        account.followed_artists = artists;
        Ok(())
    }

    /// Every artist followed by at least one of `users`.
    pub fn followed_union(&self, users: &[String]) -> BTreeMap<String, String> {
        users
            .iter()
            .filter_map(|user| self.accounts.get(user))
            .flat_map(|account| account.followed_artists.iter())
            .map(|(id, name)| (id.clone(), name.clone()))
            .collect()
    }
}
