use std::sync::Arc;

use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use newmusic::{cli, config, error};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize an account with the Spotify API
    Auth(AuthOptions),

    /// Handle registered accounts
    Accounts(AccountsOptions),

    /// Check followed artists for new music and deliver it
    Run(RunOptions),

    /// Show the stored catalog snapshot
    Snapshot(SnapshotOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct AuthOptions {
    /// Spotify user id of the account
    #[clap(long)]
    pub user: String,
}

#[derive(Parser, Debug, Clone)]
#[command(about = "Handle registered accounts")]
pub struct AccountsOptions {
    /// Subcommands under `accounts` (e.g., `add`)
    #[command(subcommand)]
    pub command: Option<AccountsSubcommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AccountsSubcommand {
    /// Register an account or update its email
    Add(AccountsAddOpts),

    /// Remove an account and its cached token
    Remove(AccountsRemoveOpts),
}

#[derive(Parser, Debug, Clone)]
pub struct AccountsAddOpts {
    pub user: String,

    /// Address new music notifications are sent to
    #[clap(long)]
    pub email: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct AccountsRemoveOpts {
    pub user: String,
}

#[derive(Parser, Debug, Clone)]
pub struct RunOptions {
    /// Run as if today were this date (YYYY-MM-DD)
    #[clap(long)]
    pub date: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct SnapshotOptions {
    /// Search for artists
    #[clap(long)]
    pub search: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Command::Completions(opt) = &cli.command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let config = match config::Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => error!("Invalid configuration. Err: {}", e),
    };

    match cli.command {
        Command::Auth(opt) => cli::auth(Arc::clone(&config), &opt.user).await,
        Command::Accounts(opt) => match opt.command {
            Some(AccountsSubcommand::Add(a)) => cli::add_account(&config, &a.user, a.email).await,
            Some(AccountsSubcommand::Remove(r)) => cli::remove_account(&config, &r.user).await,
            None => cli::list_accounts(&config).await,
        },
        Command::Run(opt) => cli::run(&config, opt.date).await,
        Command::Snapshot(opt) => cli::list_snapshot(&config, opt.search).await,
        Command::Completions(_) => {}
    }
}
