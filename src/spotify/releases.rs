use reqwest::Client;

use crate::{
    fetch::FetchError,
    types::{Album, AlbumResponse, GetSeveralAlbumsResponse, ReleaseKind},
};

/// Maximum number of ids accepted by the several albums endpoint.
pub const SEVERAL_ALBUMS_LIMIT: usize = 20;

/// Retrieves the most recent releases of one kind for an artist.
///
/// The API returns releases most recent first; only the first page is
/// requested since just the latest few releases are of interest.
pub async fn get_releases_for_artist(
    client: &Client,
    api_url: &str,
    token: &str,
    artist_id: &str,
    kind: ReleaseKind,
    market: &str,
    limit: u32,
) -> Result<Vec<Album>, FetchError> {
    let url = format!(
        "{uri}/artists/{id}/albums?include_groups={include_groups}&market={market}&limit={limit}",
        uri = api_url,
        id = artist_id,
        include_groups = kind,
        market = market,
        limit = limit
    );

    let response = super::send_with_retry(|| client.get(&url).bearer_auth(token)).await?;
    let json = response.json::<AlbumResponse>().await?;

    Ok(json.items)
}

/// Retrieves up to [`SEVERAL_ALBUMS_LIMIT`] albums with their tracks.
pub async fn get_several_releases(
    client: &Client,
    api_url: &str,
    token: &str,
    album_ids: &[String],
    market: &str,
) -> Result<GetSeveralAlbumsResponse, FetchError> {
    let url = format!(
        "{uri}/albums?ids={album_ids}&market={market}",
        uri = api_url,
        album_ids = album_ids.join(","),
        market = market
    );

    let response = super::send_with_retry(|| client.get(&url).bearer_auth(token)).await?;
    let json = response.json::<GetSeveralAlbumsResponse>().await?;

    Ok(json)
}
