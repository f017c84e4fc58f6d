//! Configuration management for newmusic.
//!
//! Configuration is read once from environment variables into a [`Config`]
//! value that is passed explicitly to every store, client and mailer. Values
//! come from, in order of priority:
//! 1. Environment variables
//! 2. The `.env` file in the local data directory
//! 3. Application defaults (where applicable)

use std::{env, path::PathBuf, str::FromStr};

use chrono::Duration;
use thiserror::Error;

use crate::{Res, catalog::IdentityScheme};

pub const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SPOTIFY_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_SPOTIFY_SCOPE: &str =
    "playlist-modify-private playlist-modify-public user-follow-read ugc-image-upload";
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8888";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";
pub const DEFAULT_RELEASE_WINDOW_DAYS: i64 = 2;
pub const DEFAULT_RELEASE_LIMIT: u32 = 5;
pub const DEFAULT_SMTP_PORT: u16 = 465;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// SMTP settings for notification emails.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub sender: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_url: String,
    pub server_addr: String,
    pub identity: IdentityScheme,
    /// `None` disables the recency filter.
    pub release_window: Option<Duration>,
    pub release_limit: u32,
    pub market: String,
    pub ledger_enabled: bool,
    /// `None` when no sender credentials are configured.
    pub smtp: Option<SmtpConfig>,
    pub data_dir: PathBuf,
}

impl Config {
    /// Builds the configuration from the process environment.
    ///
    /// Only `SPOTIFY_API_AUTH_CLIENT_ID` is required; everything else has a
    /// default. Malformed numeric or boolean values are reported instead of
    /// silently replaced.
    pub fn from_env() -> Result<Self, ConfigError> {
        let client_id = env::var("SPOTIFY_API_AUTH_CLIENT_ID")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("SPOTIFY_API_AUTH_CLIENT_ID"))?;

        let identity = parse_var("RELEASE_IDENTITY", IdentityScheme::ReleaseId)?;
        let window_days: i64 = parse_var("RELEASE_WINDOW_DAYS", DEFAULT_RELEASE_WINDOW_DAYS)?;
        if window_days < 0 {
            return Err(ConfigError::Invalid {
                key: "RELEASE_WINDOW_DAYS",
                value: window_days.to_string(),
            });
        }
        let release_limit: u32 = parse_var("RELEASE_LIMIT", DEFAULT_RELEASE_LIMIT)?;
        if release_limit == 0 || release_limit > 50 {
            return Err(ConfigError::Invalid {
                key: "RELEASE_LIMIT",
                value: release_limit.to_string(),
            });
        }

        let smtp_sender = var_or("SMTP_SENDER", "");
        let smtp_password = var_or("SMTP_PASSWORD", "");
        let smtp = if smtp_sender.is_empty() || smtp_password.is_empty() {
            None
        } else {
            Some(SmtpConfig {
                host: var_or("SMTP_HOST", "smtp.gmail.com"),
                port: parse_var("SMTP_PORT", DEFAULT_SMTP_PORT)?,
                sender: smtp_sender,
                password: smtp_password,
            })
        };

        Ok(Self {
            client_id,
            redirect_uri: var_or("SPOTIFY_API_REDIRECT_URI", DEFAULT_REDIRECT_URI),
            scope: var_or("SPOTIFY_API_AUTH_SCOPE", DEFAULT_SPOTIFY_SCOPE),
            auth_url: var_or("SPOTIFY_API_AUTH_URL", DEFAULT_SPOTIFY_AUTH_URL),
            token_url: var_or("SPOTIFY_API_TOKEN_URL", DEFAULT_SPOTIFY_TOKEN_URL),
            api_url: var_or("SPOTIFY_API_URL", DEFAULT_SPOTIFY_API_URL),
            server_addr: var_or("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS),
            identity,
            release_window: (window_days > 0).then(|| Duration::days(window_days)),
            release_limit,
            market: var_or("RELEASE_MARKET", "US"),
            ledger_enabled: parse_var("LEDGER_ENABLED", true)?,
            smtp,
            data_dir: env::var("NEWMUSIC_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_data_dir()),
        })
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir
            .join("cache")
            .join(format!("snapshot-{}.json", self.identity))
    }

    pub fn ledger_dir(&self) -> PathBuf {
        self.data_dir.join("ledger")
    }

    pub fn accounts_path(&self) -> PathBuf {
        self.data_dir.join("accounts.json")
    }

    pub fn token_path(&self, user: &str) -> PathBuf {
        self.data_dir
            .join("cache")
            .join("tokens")
            .join(format!("{user}.json"))
    }

    pub fn playlist_cover_path(&self) -> PathBuf {
        self.data_dir.join("playlist_cover.jpg")
    }
}

/// Loads environment variables from a `.env` file in the data directory.
///
/// The data directory is created when missing. A missing `.env` file is not
/// an error since every value can also come from the real environment.
///
/// The file is looked up in:
/// - Linux: `~/.local/share/newmusic/.env`
/// - macOS: `~/Library/Application Support/newmusic/.env`
/// - Windows: `%LOCALAPPDATA%/newmusic/.env`
pub async fn load_env() -> Res<()> {
    let dir = env::var("NEWMUSIC_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_data_dir());
    async_fs::create_dir_all(&dir).await?;

    let path = dir.join(".env");
    if path.is_file() {
        dotenv::from_path(&path)?;
    }
    Ok(())
}

fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("newmusic");
    path
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key, value })
        }
        _ => Ok(default),
    }
}
