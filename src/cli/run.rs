use std::{collections::BTreeMap, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config::Config,
    dispatch::SmtpMailer,
    error, info,
    management::{AccountRegistry, DeliveryLedger, SnapshotStore},
    pipeline::{self, RunOptions, RunSummary},
    reconcile::Reconciler,
    spotify::SpotifySession,
    success, utils, warning,
};

/// Runs one polling pass for every registered account.
///
/// `date` overrides today (`YYYY-MM-DD`), which moves the recency window and
/// the ledger file the run reads and writes.
pub async fn run(config: &Config, date: Option<String>) {
    let today = match utils::get_date_from_string(date.as_deref()) {
        Ok(today) => today,
        Err(e) => error!(
            "Invalid date {}, expected YYYY-MM-DD. Err: {}",
            date.unwrap_or_default(),
            e
        ),
    };

    let mut registry = AccountRegistry::load(config.accounts_path()).await;
    if registry.is_empty() {
        warning!("No accounts registered. Run newmusic auth --user <USER> first.");
        return;
    }

    let mut sessions: BTreeMap<String, SpotifySession> = BTreeMap::new();
    for user in registry.users() {
        match SpotifySession::open(config, &user).await {
            Ok(session) => {
                sessions.insert(user, session);
            }
            Err(e) => warning!(
                "Skipping {}, no usable token. Run newmusic auth --user {}. Err: {}",
                user,
                user,
                e
            ),
        }
    }

    let options = RunOptions::from_config(config);
    let reconciler = Reconciler::new(
        SnapshotStore::new(config.snapshot_path()),
        options.reconcile.clone(),
    );
    let ledger = config
        .ledger_enabled
        .then(|| DeliveryLedger::new(config.ledger_dir()));

    let mailer = match &config.smtp {
        Some(smtp) => match SmtpMailer::new(smtp) {
            Ok(mailer) => Some(mailer),
            Err(e) => {
                warning!("Email notifications disabled. Err: {}", e);
                None
            }
        },
        None => {
            info!("SMTP is not configured, email notifications are disabled.");
            None
        }
    };

    info!("Running for {} ({} identity).", today, options.reconcile.scheme);

    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(120));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style);
    }

    let summary = pipeline::run(
        &mut sessions,
        &mut registry,
        &reconciler,
        ledger.as_ref(),
        mailer.as_ref(),
        &options,
        today,
        |done, total, name| pb.set_message(format!("[{done}/{total}] {name}")),
    )
    .await;
    pb.finish_and_clear();

    print_summary(&summary);
}

fn print_summary(summary: &RunSummary) {
    info!(
        "Checked {} artists for {} accounts, {} new releases.",
        summary.artists, summary.accounts, summary.new_releases
    );

    for (user, ids) in &summary.suppressed {
        info!(
            "{} releases were already delivered to {} and are skipped.",
            ids.len(),
            user
        );
    }

    for (user, report) in &summary.deliveries {
        if report.playlist_recreated {
            info!("Playlist of {} was recreated.", user);
        }
        if !report.skipped.is_empty() {
            warning!(
                "{} releases without tracks for {}.",
                report.skipped.len(),
                user
            );
        }
        if report.emailed {
            info!("Notified {}.", user);
        }
    }

    if summary.failed.is_empty() {
        success!("Run finished.");
    } else {
        warning!(
            "Run finished with failed deliveries for: {}",
            summary.failed.join(", ")
        );
    }
}
