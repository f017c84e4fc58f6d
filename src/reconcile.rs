//! New-release detection.
//!
//! [`reconcile`] compares the snapshot saved by the previous run with the
//! snapshot fetched now and reports, per artist, the releases that were not
//! known before. Comparison is by identity key with set semantics, so the
//! order the catalog returns releases in never matters.
//!
//! Artists that only appear in the fresh snapshot are never reported: there
//! is no baseline to compare them against. On the very first run the saved
//! snapshot is empty and nothing is reported at all.

use chrono::{Duration, NaiveDate};

use crate::{
    catalog::{
        CatalogSnapshot, IdentityScheme, NewMusic, NewMusicResult, ReleaseIndex, ReleaseRef,
        ReleaseSet,
    },
    management::SnapshotStore,
    types::ReleaseKind,
    warning,
};

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub scheme: IdentityScheme,
    /// Maximum age of a release that is still reported as new. `None`
    /// disables the filter.
    pub recency_window: Option<Duration>,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            scheme: IdentityScheme::ReleaseId,
            recency_window: Some(Duration::days(2)),
        }
    }
}

pub fn reconcile(
    saved: &CatalogSnapshot,
    fresh: &CatalogSnapshot,
    index: &ReleaseIndex,
    options: &ReconcileOptions,
    today: NaiveDate,
) -> NewMusicResult {
    let mut result = NewMusicResult::new();

    for (artist_id, current) in fresh {
        let Some(previous) = saved.get(artist_id) else {
            continue;
        };

        let candidates = |kind: ReleaseKind| {
            difference(current.releases(kind), previous.releases(kind))
                .filter(|key| is_recent(artist_id, kind, key, index, options, today))
                .cloned()
                .collect::<Vec<_>>()
        };

        let new_music = NewMusic {
            name: current.name.clone(),
            new_albums: candidates(ReleaseKind::Album),
            new_singles: candidates(ReleaseKind::Single),
        };

        if !new_music.is_empty() {
            result.insert(artist_id.clone(), new_music);
        }
    }

    result
}

fn difference<'a>(
    current: &'a ReleaseSet,
    previous: &'a ReleaseSet,
) -> impl Iterator<Item = &'a ReleaseRef> {
    current.keys().filter(|key| !previous.contains_key(*key))
}

/// Whether a candidate survives the recency filter.
///
/// The filter applies to release identifiers only. A release without a
/// day-precision date cannot be told apart from an old catalog entry and is
/// treated as not recent.
pub fn is_recent(
    artist_id: &str,
    kind: ReleaseKind,
    key: &ReleaseRef,
    index: &ReleaseIndex,
    options: &ReconcileOptions,
    today: NaiveDate,
) -> bool {
    let Some(window) = options.recency_window else {
        return true;
    };
    if options.scheme != IdentityScheme::ReleaseId {
        return true;
    }

    match index.get(artist_id, kind, key).and_then(|info| info.release_day()) {
        Some(day) => today.signed_duration_since(day) <= window,
        None => false,
    }
}

/// Reconciles against a [`SnapshotStore`] and persists the fresh snapshot.
pub struct Reconciler {
    store: SnapshotStore,
    options: ReconcileOptions,
}

impl Reconciler {
    pub fn new(store: SnapshotStore, options: ReconcileOptions) -> Self {
        Self { store, options }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Loads the saved snapshot, reconciles and overwrites the store with
    /// `fresh`, whether or not anything new was found.
    ///
    /// A failed save only produces a warning: the detected releases are
    /// still returned so they can be delivered.
    pub async fn run(
        &self,
        fresh: &CatalogSnapshot,
        index: &ReleaseIndex,
        today: NaiveDate,
    ) -> NewMusicResult {
        let saved = self.store.load().await;
        self.run_with(&saved, fresh, index, today).await
    }

    /// Same as [`Reconciler::run`] with an already loaded saved snapshot.
    pub async fn run_with(
        &self,
        saved: &CatalogSnapshot,
        fresh: &CatalogSnapshot,
        index: &ReleaseIndex,
        today: NaiveDate,
    ) -> NewMusicResult {
        let result = reconcile(saved, fresh, index, &self.options, today);

        if let Err(e) = self.store.save(fresh).await {
            warning!("Cannot persist catalog snapshot. Err: {}", e);
        }

        result
    }
}
