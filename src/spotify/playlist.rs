use std::path::Path;

use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;

use crate::{
    fetch::FetchError,
    types::{AddTrackToPlaylistRequest, CreatePlaylistRequest, CreatePlaylistResponse},
};

pub const PLAYLIST_NAME: &str = "New Music";
pub const PLAYLIST_DESCRIPTION: &str =
    "New music from artists you follow, checked daily and updated by newmusic.";

/// Maximum number of tracks per add-tracks request.
pub const ADD_TRACKS_LIMIT: usize = 100;

/// Creates the private "New Music" playlist on the user's account.
pub async fn create(
    client: &Client,
    api_url: &str,
    token: &str,
    user: &str,
) -> Result<CreatePlaylistResponse, FetchError> {
    let url = format!("{uri}/users/{user}/playlists", uri = api_url, user = user);
    let body = CreatePlaylistRequest {
        name: PLAYLIST_NAME.to_string(),
        description: PLAYLIST_DESCRIPTION.to_string(),
        public: false,
        collaborative: false,
    };

    let response =
        super::send_with_retry(|| client.post(&url).bearer_auth(token).json(&body)).await?;
    Ok(response.json::<CreatePlaylistResponse>().await?)
}

/// Appends up to [`ADD_TRACKS_LIMIT`] track URIs to a playlist.
pub async fn add_tracks(
    client: &Client,
    api_url: &str,
    token: &str,
    playlist_id: &str,
    uris: &[String],
) -> Result<(), FetchError> {
    let url = format!(
        "{uri}/playlists/{playlist_id}/tracks",
        uri = api_url,
        playlist_id = playlist_id
    );
    let body = AddTrackToPlaylistRequest {
        uris: uris.to_vec(),
    };

    super::send_with_retry(|| client.post(&url).bearer_auth(token).json(&body)).await?;
    Ok(())
}

/// Uploads a JPEG file as the playlist cover.
pub async fn upload_cover(
    client: &Client,
    api_url: &str,
    token: &str,
    playlist_id: &str,
    cover: &Path,
) -> Result<(), FetchError> {
    let image = async_fs::read(cover)
        .await
        .map_err(|e| FetchError::Other(e.to_string()))?;
    let encoded = STANDARD.encode(image);
    let url = format!(
        "{uri}/playlists/{playlist_id}/images",
        uri = api_url,
        playlist_id = playlist_id
    );

    super::send_with_retry(|| {
        client
            .put(&url)
            .bearer_auth(token)
            .header("Content-Type", "image/jpeg")
            .body(encoded.clone())
    })
    .await?;
    Ok(())
}
