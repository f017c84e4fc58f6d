//! # Spotify Integration Module
//!
//! Thin client for the parts of the Spotify Web API the notifier needs. Each
//! submodule offers free functions taking an access token; [`SpotifySession`]
//! binds them to one account and implements the [`CatalogFetcher`] and
//! [`PlaylistService`] seams used by the run pipeline.
//!
//! ## Architecture
//!
//! ```text
//! Pipeline (fetch, reconcile, dispatch)
//!          ↓
//! SpotifySession (one per account)
//!     ├── Authentication (OAuth 2.0 PKCE, token refresh)
//!     ├── Artist Operations (followed artists)
//!     ├── Release Operations (recent albums/singles, album tracks)
//!     └── Playlist Operations (create, add tracks, cover)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//! ```
//!
//! ## Error Handling
//!
//! - **502 Bad Gateway** is retried after 10 seconds, up to three attempts.
//! - **429 Too Many Requests** honours `Retry-After` when it is at most two
//!   minutes; longer waits are reported as [`FetchError::RateLimited`].
//! - Every other non-success status is returned as [`FetchError::Http`]
//!   with the status preserved, so callers can tell a deleted playlist
//!   (404/403) from a transient failure.
//!
//! ## API Coverage
//!
//! - `GET /me/following?type=artist`
//! - `GET /artists/{id}/albums`
//! - `GET /albums?ids=...`
//! - `POST /users/{user}/playlists`
//! - `POST /playlists/{id}/tracks`
//! - `PUT /playlists/{id}/images`
//! - `POST` to the token endpoint (code exchange and refresh)

use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::time::sleep;

use crate::{
    config::Config,
    dispatch::{DispatchError, PlaylistService},
    fetch::{CatalogFetcher, FetchError},
    management::TokenManager,
    types::{Album, Artist, ReleaseKind},
    warning,
};

pub mod artists;
pub mod auth;
pub mod playlist;
pub mod releases;

const MAX_BAD_GATEWAY_ATTEMPTS: u32 = 3;
const MAX_RETRY_AFTER_SECS: u64 = 120;

/// Sends the request built by `build`, retrying on 502 and short 429 waits.
pub(crate) async fn send_with_retry(
    build: impl Fn() -> RequestBuilder,
) -> Result<Response, FetchError> {
    let mut bad_gateway_attempts = 0;

    loop {
        let response = build().send().await?;

        match response.status() {
            StatusCode::BAD_GATEWAY if bad_gateway_attempts + 1 < MAX_BAD_GATEWAY_ATTEMPTS => {
                bad_gateway_attempts += 1;
                sleep(Duration::from_secs(10)).await;
                continue; // retry
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                if retry_after > MAX_RETRY_AFTER_SECS {
                    warning!(
                        "Retry after has reached an abnormal high of {} seconds.",
                        retry_after
                    );
                    return Err(FetchError::RateLimited(retry_after));
                }
                sleep(Duration::from_secs(retry_after)).await;
                continue; // retry
            }
            _ => return Ok(response.error_for_status()?),
        }
    }
}

/// Web API access on behalf of one account.
pub struct SpotifySession {
    client: Client,
    api_url: String,
    market: String,
    user: String,
    tokens: TokenManager,
    cover: PathBuf,
}

impl SpotifySession {
    pub fn new(config: &Config, user: &str, tokens: TokenManager) -> Self {
        Self {
            client: Client::new(),
            api_url: config.api_url.clone(),
            market: config.market.clone(),
            user: user.to_string(),
            tokens,
            cover: config.playlist_cover_path(),
        }
    }

    /// Loads the account's cached token and opens a session.
    pub async fn open(config: &Config, user: &str) -> Result<Self, String> {
        let tokens = TokenManager::load(config, user).await?;
        Ok(Self::new(config, user, tokens))
    }
}

impl CatalogFetcher for SpotifySession {
    async fn fetch_followed_artists(&mut self) -> Result<Vec<Artist>, FetchError> {
        let token = self.tokens.get_valid_token().await;
        artists::get_all_followed_artists(&self.client, &self.api_url, &token).await
    }

    async fn fetch_recent_releases(
        &mut self,
        artist_id: &str,
        kind: ReleaseKind,
        limit: u32,
    ) -> Result<Vec<Album>, FetchError> {
        let token = self.tokens.get_valid_token().await;
        releases::get_releases_for_artist(
            &self.client,
            &self.api_url,
            &token,
            artist_id,
            kind,
            &self.market,
            limit,
        )
        .await
    }

    async fn fetch_release_tracks(
        &mut self,
        release_ids: &[String],
    ) -> Result<BTreeMap<String, Vec<String>>, FetchError> {
        let mut tracks = BTreeMap::new();
        for chunk in release_ids.chunks(releases::SEVERAL_ALBUMS_LIMIT) {
            let token = self.tokens.get_valid_token().await;
            let response = releases::get_several_releases(
                &self.client,
                &self.api_url,
                &token,
                chunk,
                &self.market,
            )
            .await?;

            for album in response.albums.into_iter().flatten() {
                let uris = album.tracks.items.into_iter().map(|t| t.uri).collect();
                tracks.insert(album.id, uris);
            }
        }
        Ok(tracks)
    }
}

impl PlaylistService for SpotifySession {
    async fn create_playlist(&mut self, user: &str) -> Result<String, DispatchError> {
        let token = self.tokens.get_valid_token().await;
        let created = playlist::create(&self.client, &self.api_url, &token, user)
            .await
            .map_err(|e| DispatchError::Playlist(e.to_string()))?;

        if self.cover.is_file() {
            if let Err(e) =
                playlist::upload_cover(&self.client, &self.api_url, &token, &created.id, &self.cover)
                    .await
            {
                warning!("Cannot upload playlist cover for {}. Err: {}", self.user, e);
            }
        }

        Ok(created.id)
    }

    async fn append_tracks(
        &mut self,
        playlist_id: &str,
        track_uris: &[String],
    ) -> Result<(), DispatchError> {
        let token = self.tokens.get_valid_token().await;
        playlist::add_tracks(&self.client, &self.api_url, &token, playlist_id, track_uris)
            .await
            .map_err(|e| DispatchError::from_playlist_mutation(playlist_id, e))
    }
}
