//! One polling run, stage by stage.
//!
//! 1. refresh the followed artists of every account
//! 2. fetch the catalog of every followed artist once
//! 3. reconcile against the saved snapshot and persist the fresh one
//! 4. per account: drop releases the ledger already saw, deliver the rest
//! 5. record deliveries and persist the account registry
//!
//! The pipeline is generic over the fetcher, playlist and mail seams so it
//! runs against Spotify in production and against fakes in tests.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::{
    catalog::NewMusicResult,
    config::Config,
    dispatch::{self, DeliveryReport, Mailer, PendingRelease, PlaylistService},
    fetch::{self, CatalogFetcher, FreshCatalog},
    info,
    management::{Account, AccountRegistry, DeliveryHistory, DeliveryLedger, lookback_days},
    reconcile::{ReconcileOptions, Reconciler},
    success, warning,
};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub reconcile: ReconcileOptions,
    pub release_limit: u32,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            reconcile: ReconcileOptions {
                scheme: config.identity,
                recency_window: config.release_window,
            },
            release_limit: config.release_limit,
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            reconcile: ReconcileOptions::default(),
            release_limit: crate::config::DEFAULT_RELEASE_LIMIT,
        }
    }
}

/// Result of the detection stages.
#[derive(Debug, Clone, Default)]
pub struct NewReleases {
    pub new_music: NewMusicResult,
    pub fresh: FreshCatalog,
}

impl NewReleases {
    pub fn count(&self) -> usize {
        self.new_music
            .values()
            .map(|m| m.new_albums.len() + m.new_singles.len())
            .sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub accounts: usize,
    pub artists: usize,
    pub new_releases: usize,
    pub deliveries: BTreeMap<String, DeliveryReport>,
    pub suppressed: BTreeMap<String, Vec<String>>,
    pub failed: Vec<String>,
}

/// Replaces the account's followed artists with the current list.
///
/// On failure the previous list is kept and `false` is returned.
pub async fn refresh_followed_artists<F: CatalogFetcher>(
    fetcher: &mut F,
    registry: &mut AccountRegistry,
    user: &str,
) -> bool {
    match fetcher.fetch_followed_artists().await {
        Ok(artists) => {
            let followed = artists.into_iter().map(|a| (a.id, a.name)).collect();
            match registry.set_followed_artists(user, followed) {
                Ok(()) => true,
                Err(e) => {
                    warning!("Cannot update followed artists of {}. Err: {}", user, e);
                    false
                }
            }
        }
        Err(e) => {
            warning!(
                "Cannot fetch followed artists of {}, keeping the previous list. Err: {}",
                user,
                e
            );
            false
        }
    }
}

/// Fetches the catalog of `followed`, reconciles it and persists it.
pub async fn detect_new_music<F: CatalogFetcher>(
    fetcher: &mut F,
    reconciler: &Reconciler,
    followed: &BTreeMap<String, String>,
    options: &RunOptions,
    today: NaiveDate,
    on_progress: impl FnMut(usize, usize, &str),
) -> NewReleases {
    let saved = reconciler.store().load().await;
    let fresh = fetch::collect_fresh_snapshot(
        fetcher,
        followed,
        &saved,
        options.reconcile.scheme,
        options.release_limit,
        on_progress,
    )
    .await;

    let new_music = reconciler
        .run_with(&saved, &fresh.snapshot, &fresh.index, today)
        .await;

    NewReleases { new_music, fresh }
}

/// New releases of the artists `account` follows.
pub fn pending_for_account(account: &Account, releases: &NewReleases) -> Vec<PendingRelease> {
    releases
        .new_music
        .iter()
        .filter(|(artist_id, _)| account.follows(artist_id))
        .flat_map(|(artist_id, music)| {
            music.all().filter_map(|(kind, key)| {
                let info = releases.fresh.index.get(artist_id, kind, key)?;
                Some(PendingRelease {
                    artist_id: artist_id.clone(),
                    artist_name: music.name.clone(),
                    release_id: info.id.clone(),
                    name: info.name.clone(),
                    kind,
                })
            })
        })
        .collect()
}

/// Splits pending releases into (deliverable, already delivered to `user`).
pub fn split_suppressed(
    user: &str,
    pending: Vec<PendingRelease>,
    history: &DeliveryHistory,
) -> (Vec<PendingRelease>, Vec<PendingRelease>) {
    pending
        .into_iter()
        .partition(|release| !history.was_delivered_to(user, &release.release_id))
}

/// Runs one pass for every account that has a session.
///
/// The first session doubles as the catalog fetcher. A failing account is
/// reported in [`RunSummary::failed`] and never stops the others. Without
/// any session nothing is fetched and the stored snapshot is left alone.
#[allow(clippy::too_many_arguments)]
pub async fn run<S, M>(
    sessions: &mut BTreeMap<String, S>,
    registry: &mut AccountRegistry,
    reconciler: &Reconciler,
    ledger: Option<&DeliveryLedger>,
    mailer: Option<&M>,
    options: &RunOptions,
    today: NaiveDate,
    on_progress: impl FnMut(usize, usize, &str),
) -> RunSummary
where
    S: CatalogFetcher + PlaylistService,
    M: Mailer,
{
    let mut summary = RunSummary {
        accounts: sessions.len(),
        ..RunSummary::default()
    };

    for (user, session) in sessions.iter_mut() {
        refresh_followed_artists(session, registry, user).await;
    }

    let users: Vec<String> = sessions.keys().cloned().collect();
    let followed = registry.followed_union(&users);
    summary.artists = followed.len();

    let Some(catalog) = sessions.values_mut().next() else {
        warning!("No account with a valid token, nothing to do.");
        return summary;
    };

    info!("Checking {} artists for new releases.", followed.len());
    let releases =
        detect_new_music(&mut *catalog, reconciler, &followed, options, today, on_progress).await;
    summary.new_releases = releases.count();

    let history = match ledger {
        Some(ledger) => {
            ledger
                .history(today, lookback_days(options.reconcile.recency_window))
                .await
        }
        None => DeliveryHistory::default(),
    };

    let mut plans: Vec<(String, Vec<PendingRelease>, Vec<PendingRelease>)> = Vec::new();
    let mut release_ids: BTreeSet<String> = BTreeSet::new();
    for user in &users {
        let Some(account) = registry.get(user) else {
            continue;
        };
        let (deliverable, suppressed) =
            split_suppressed(user, pending_for_account(account, &releases), &history);
        release_ids.extend(deliverable.iter().map(|r| r.release_id.clone()));
        plans.push((user.clone(), deliverable, suppressed));
    }

    let tracks = if release_ids.is_empty() {
        BTreeMap::new()
    } else {
        let ids: Vec<String> = release_ids.into_iter().collect();
        match catalog.fetch_release_tracks(&ids).await {
            Ok(tracks) => tracks,
            Err(e) => {
                warning!("Cannot fetch tracks of new releases. Err: {}", e);
                BTreeMap::new()
            }
        }
    };

    for (user, deliverable, suppressed) in plans {
        let suppressed_ids: Vec<String> =
            suppressed.iter().map(|r| r.release_id.clone()).collect();
        let mut recorded = suppressed_ids.clone();

        if !deliverable.is_empty() {
            let (Some(account), Some(session)) = (registry.get_mut(&user), sessions.get_mut(&user))
            else {
                continue;
            };

            match dispatch::deliver_to_account(
                &user,
                account,
                &deliverable,
                &tracks,
                session,
                mailer,
            )
            .await
            {
                Ok(report) => {
                    if report.tracks_added > 0 {
                        success!(
                            "Added {} tracks from {} releases for {}.",
                            report.tracks_added,
                            report.delivered.len(),
                            user
                        );
                    }
                    recorded.extend(report.delivered.iter().cloned());
                    summary.deliveries.insert(user.clone(), report);
                }
                Err(e) => {
                    warning!("Delivery for {} failed. Err: {}", user, e);
                    summary.failed.push(user.clone());
                }
            }
        }

        if let Some(ledger) = ledger {
            if let Err(e) = ledger.record_delivery(today, &user, &recorded).await {
                warning!("Cannot record deliveries of {}. Err: {}", user, e);
            }
        }
        if !suppressed_ids.is_empty() {
            summary.suppressed.insert(user, suppressed_ids);
        }
    }

    if let Err(e) = registry.persist().await {
        warning!("Cannot persist accounts. Err: {}", e);
    }

    summary
}
