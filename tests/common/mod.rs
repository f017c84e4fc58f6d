#![allow(dead_code)]

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Mutex,
};

use chrono::NaiveDate;
use newmusic::dispatch::{DispatchError, Mailer, PlaylistService};
use newmusic::fetch::{CatalogFetcher, FetchError};
use newmusic::types::{Album, Artist, ReleaseKind};

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
}

pub fn album(id: &str, name: &str, release_date: &str) -> Album {
    Album {
        id: id.to_string(),
        name: name.to_string(),
        release_date: release_date.to_string(),
        release_date_precision: "day".to_string(),
    }
}

pub fn artist(id: &str, name: &str) -> Artist {
    Artist {
        id: id.to_string(),
        name: name.to_string(),
    }
}

pub fn uris(release_id: &str, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("spotify:track:{release_id}-{i}"))
        .collect()
}

/// In-memory Spotify account: catalog, followed artists and playlists.
#[derive(Debug, Default)]
pub struct FakeSpotify {
    pub user: String,
    pub followed: Vec<Artist>,
    pub fail_followed: bool,
    pub releases: BTreeMap<(String, ReleaseKind), Vec<Album>>,
    pub failing: BTreeSet<(String, ReleaseKind)>,
    pub tracks: BTreeMap<String, Vec<String>>,
    pub playlists: BTreeMap<String, Vec<String>>,
    pub fail_appends: bool,
    pub created: usize,
    pub append_calls: Vec<(String, usize)>,
}

impl FakeSpotify {
    pub fn new(user: &str) -> Self {
        Self {
            user: user.to_string(),
            ..Self::default()
        }
    }

    pub fn follow(mut self, id: &str, name: &str) -> Self {
        self.followed.push(artist(id, name));
        self
    }

    pub fn with_releases(mut self, artist_id: &str, kind: ReleaseKind, releases: Vec<Album>) -> Self {
        self.releases.insert((artist_id.to_string(), kind), releases);
        self
    }

    pub fn with_tracks(mut self, release_id: &str, count: usize) -> Self {
        self.tracks.insert(release_id.to_string(), uris(release_id, count));
        self
    }

    pub fn playlist_tracks(&self) -> usize {
        self.playlists.values().map(Vec::len).sum()
    }
}

impl CatalogFetcher for FakeSpotify {
    async fn fetch_followed_artists(&mut self) -> Result<Vec<Artist>, FetchError> {
        if self.fail_followed {
            return Err(FetchError::Other("followed artists unavailable".to_string()));
        }
        Ok(self.followed.clone())
    }

    async fn fetch_recent_releases(
        &mut self,
        artist_id: &str,
        kind: ReleaseKind,
        limit: u32,
    ) -> Result<Vec<Album>, FetchError> {
        let key = (artist_id.to_string(), kind);
        if self.failing.contains(&key) {
            return Err(FetchError::RateLimited(300));
        }
        Ok(self
            .releases
            .get(&key)
            .map(|releases| releases.iter().take(limit as usize).cloned().collect())
            .unwrap_or_default())
    }

    async fn fetch_release_tracks(
        &mut self,
        release_ids: &[String],
    ) -> Result<BTreeMap<String, Vec<String>>, FetchError> {
        Ok(release_ids
            .iter()
            .filter_map(|id| self.tracks.get(id).map(|t| (id.clone(), t.clone())))
            .collect())
    }
}

impl PlaylistService for FakeSpotify {
    async fn create_playlist(&mut self, user: &str) -> Result<String, DispatchError> {
        self.created += 1;
        let id = format!("{user}-playlist-{}", self.created);
        self.playlists.insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn append_tracks(
        &mut self,
        playlist_id: &str,
        track_uris: &[String],
    ) -> Result<(), DispatchError> {
        self.append_calls
            .push((playlist_id.to_string(), track_uris.len()));
        if self.fail_appends {
            return Err(DispatchError::PlaylistMissing(playlist_id.to_string()));
        }
        match self.playlists.get_mut(playlist_id) {
            Some(tracks) => {
                tracks.extend(track_uris.iter().cloned());
                Ok(())
            }
            None => Err(DispatchError::PlaylistMissing(playlist_id.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

#[derive(Debug, Default)]
pub struct FakeMailer {
    pub fail: bool,
    pub sent: Mutex<Vec<SentEmail>>,
}

impl FakeMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

impl Mailer for FakeMailer {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        body_text: &str,
        body_html: &str,
    ) -> Result<(), DispatchError> {
        if self.fail {
            return Err(DispatchError::Email("relay refused".to_string()));
        }
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            text: body_text.to_string(),
            html: body_html.to_string(),
        });
        Ok(())
    }
}
