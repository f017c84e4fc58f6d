//! newmusic library
//!
//! Watches the artists followed by one or more Spotify accounts, detects their
//! new albums and singles, appends the new tracks to a per-account playlist
//! and sends an email notification.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints of the local OAuth callback server
//! - `catalog` - Catalog snapshots, release identities and the release index
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration loaded from the environment and `.env` files
//! - `dispatch` - Playlist and email delivery of new music
//! - `fetch` - Catalog fetcher seam and fresh snapshot assembly
//! - `management` - Persisted state: snapshots, ledger, accounts and tokens
//! - `pipeline` - The stages of one polling run
//! - `reconcile` - Snapshot diffing and recency filtering
//! - `server` - Local HTTP server for OAuth callbacks
//! - `spotify` - Spotify Web API client
//! - `types` - Spotify wire types
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use newmusic::{config, cli};
//!
//! #[tokio::main]
//! async fn main() -> newmusic::Res<()> {
//!     config::load_env().await?;
//!     let config = config::Config::from_env()?;
//!     cli::run(&config, None).await;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod fetch;
pub mod management;
pub mod pipeline;
pub mod reconcile;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
///
/// Used by the glue layer (CLI, server, main) where errors of different
/// concerns meet. Keeps the Send + Sync bounds for async contexts.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Fetching releases for {} artists", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Added {} tracks to playlist", count);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only for unrecoverable errors in the CLI layer: the process terminates
/// with exit code 1 right after printing.
///
/// # Example
///
/// ```
/// error!("Missing required environment variable: {}", var_name);
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for recoverable issues: skipped artists, corrupt local state that
/// falls back to an empty baseline, failed emails.
///
/// # Example
///
/// ```
/// warning!("Snapshot not found, starting from an empty baseline");
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
