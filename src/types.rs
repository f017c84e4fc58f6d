use std::fmt;

use serde::{Deserialize, Serialize};
use tabled::Tabled;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

#[derive(Debug, Clone)]
pub struct PkceToken {
    pub code_verifier: String,
    pub token: Option<Token>,
}

/// Release groups the catalog is polled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReleaseKind {
    Album,
    Single,
}

impl ReleaseKind {
    pub const ALL: [ReleaseKind; 2] = [ReleaseKind::Album, ReleaseKind::Single];
}

impl fmt::Display for ReleaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseKind::Album => write!(f, "album"),
            ReleaseKind::Single => write!(f, "single"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowedArtistsResponse {
    pub artists: ArtistsContainer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtistsContainer {
    pub items: Vec<Artist>,
    pub cursors: Option<Cursors>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cursors {
    pub after: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumResponse {
    pub items: Vec<Album>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub release_date_precision: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSeveralAlbumsResponse {
    pub albums: Vec<Option<GetAlbumResponse>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetAlbumResponse {
    pub id: String,
    pub name: String,
    pub tracks: Tracks,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tracks {
    pub items: Vec<Track>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub description: String,
    pub public: bool,
    pub collaborative: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlaylistResponse {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrackToPlaylistRequest {
    pub uris: Vec<String>,
}

#[derive(Tabled)]
pub struct SnapshotTableRow {
    pub artist: String,
    pub albums: usize,
    pub singles: usize,
    pub releases: String,
}

#[derive(Tabled)]
pub struct AccountTableRow {
    pub user: String,
    pub email: String,
    pub playlist: String,
    pub artists: usize,
    pub token: String,
}
