//! # CLI Module
//!
//! Command-line layer of newmusic. Each command loads the state it needs from
//! the data directory, delegates to the management, pipeline and Spotify
//! modules, and reports back with the logging macros.
//!
//! ## Commands
//!
//! ### Authentication
//!
//! - [`auth`] - OAuth 2.0 PKCE flow for one account, stores its token
//!
//! ### Accounts
//!
//! - [`list_accounts`] - Table of registered accounts and their token state
//! - [`add_account`] - Registers an account or updates its email
//! - [`remove_account`] - Drops an account and its cached token
//!
//! ### Polling
//!
//! - [`run`] - One full pass: refresh followed artists, detect new releases,
//!   fill playlists and send notifications
//!
//! ### Inspection
//!
//! - [`list_snapshot`] - Shows the stored catalog snapshot
//!
//! ## Layers
//!
//! ```text
//! CLI Layer (User Interface)
//!     ↓
//! Pipeline (Reconcile, Ledger, Dispatch)
//!     ↓
//! Management Layer (Snapshots, Ledger, Accounts, Tokens)
//!     ↓
//! Spotify Layer (HTTP Requests)
//! ```
//!
//! ## Usage Patterns
//!
//! ### Initial Setup
//! ```bash
//! newmusic auth --user alice                 # Authorize an account
//! newmusic accounts add alice --email a@b.c  # Set the notification address
//! newmusic run                               # First run seeds the snapshot
//! ```
//!
//! ### Regular Usage
//! ```bash
//! newmusic run                      # Scheduled, e.g. daily from cron
//! newmusic snapshot --search rock   # What the last run saw
//! newmusic accounts                 # Token and playlist state
//! ```
//!
//! ## Error Handling
//!
//! A command that cannot do anything useful ends through `error!` with exit
//! code 1. Inside [`run`] failures are per account or per artist and only
//! logged, so one broken account never blocks the others.

mod accounts;
mod auth;
mod run;
mod snapshot;

pub use accounts::add_account;
pub use accounts::list_accounts;
pub use accounts::remove_account;
pub use auth::auth;
pub use run::run;
pub use snapshot::list_snapshot;
