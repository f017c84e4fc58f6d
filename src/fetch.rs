//! Catalog fetcher seam.
//!
//! The reconciler never talks to the catalog itself. It receives a fresh
//! [`CatalogSnapshot`] built here from whatever implements
//! [`CatalogFetcher`]: the Spotify client in production, in-memory fakes in
//! tests.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::{
    catalog::{self, ArtistSnapshot, CatalogSnapshot, IdentityScheme, ReleaseIndex},
    types::{Album, Artist, ReleaseKind},
    warning,
};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog asked to retry after {0} seconds")]
    RateLimited(u64),
    #[error("{0}")]
    Other(String),
}

#[allow(async_fn_in_trait)]
pub trait CatalogFetcher {
    /// Every artist the account follows, across all pages.
    async fn fetch_followed_artists(&mut self) -> Result<Vec<Artist>, FetchError>;

    /// The artist's most recent releases of `kind`, most recent first.
    async fn fetch_recent_releases(
        &mut self,
        artist_id: &str,
        kind: ReleaseKind,
        limit: u32,
    ) -> Result<Vec<Album>, FetchError>;

    /// Track URIs of each release, keyed by release id.
    async fn fetch_release_tracks(
        &mut self,
        release_ids: &[String],
    ) -> Result<BTreeMap<String, Vec<String>>, FetchError>;
}

/// A freshly fetched catalog and the metadata of its releases.
#[derive(Debug, Clone, Default)]
pub struct FreshCatalog {
    pub snapshot: CatalogSnapshot,
    pub index: ReleaseIndex,
    /// Number of (artist, kind) lookups that failed and were carried over.
    pub failures: usize,
}

/// Drains the fetcher for every followed artist.
///
/// A failed lookup for one artist and kind does not abort the run: the
/// releases saved for it by the previous run are carried over so the failure
/// is not mistaken for a change. An artist without a saved baseline is left
/// out entirely on failure, so the next run still treats it as first seen.
/// `on_progress` receives the number of artists done, the total and the name
/// of the artist just processed.
pub async fn collect_fresh_snapshot<F: CatalogFetcher>(
    fetcher: &mut F,
    followed: &BTreeMap<String, String>,
    saved: &CatalogSnapshot,
    scheme: IdentityScheme,
    limit: u32,
    mut on_progress: impl FnMut(usize, usize, &str),
) -> FreshCatalog {
    let mut fresh = FreshCatalog::default();
    let total = followed.len();

    for (done, (artist_id, artist_name)) in followed.iter().enumerate() {
        let previous = saved.get(artist_id);
        let mut snapshot = ArtistSnapshot::new(artist_name.clone());
        let mut complete = true;

        for kind in ReleaseKind::ALL {
            match fetcher.fetch_recent_releases(artist_id, kind, limit).await {
                Ok(releases) => {
                    *snapshot.releases_mut(kind) = catalog::release_set_from(
                        artist_id,
                        &releases,
                        kind,
                        scheme,
                        limit as usize,
                        &mut fresh.index,
                    );
                }
                Err(e) => {
                    warning!(
                        "Cannot fetch {}s of {}, keeping the previous state. Err: {}",
                        kind,
                        artist_name,
                        e
                    );
                    fresh.failures += 1;
                    match previous {
                        Some(previous) => {
                            *snapshot.releases_mut(kind) = previous.releases(kind).clone();
                        }
                        None => complete = false,
                    }
                }
            }
        }

        if complete {
            fresh.snapshot.insert(artist_id.clone(), snapshot);
        }
        on_progress(done + 1, total, artist_name);
    }

    fresh
}
