use reqwest::Client;

use crate::{
    fetch::FetchError,
    types::{Artist, FollowedArtistsResponse},
};

/// Page size for followed artists; the API maximum.
pub const FOLLOWED_PAGE_LIMIT: u64 = 50;

/// Retrieves one page of followed artists.
///
/// Uses Spotify's cursor based pagination: `after` is the id of the last
/// artist of the previous page.
///
/// # Returns
///
/// - `Ok((Vec<Artist>, Option<String>))` - artists of this page and the
///   cursor of the next one
/// - `Err(FetchError)` - network, API or rate limit error
pub async fn get_followed_artists(
    client: &Client,
    api_url: &str,
    token: &str,
    limit: u64,
    after: Option<&str>,
) -> Result<(Vec<Artist>, Option<String>), FetchError> {
    let mut url = format!(
        "{uri}/me/following?type=artist&limit={limit}",
        uri = api_url,
        limit = limit
    );
    if let Some(after_val) = after {
        url.push_str(&format!("&after={}", after_val));
    }

    let response = super::send_with_retry(|| client.get(&url).bearer_auth(token)).await?;
    let res = response.json::<FollowedArtistsResponse>().await?;
    let next_after = res.artists.cursors.and_then(|c| c.after);

    Ok((res.artists.items, next_after))
}

/// Retrieves every followed artist.
pub async fn get_all_followed_artists(
    client: &Client,
    api_url: &str,
    token: &str,
) -> Result<Vec<Artist>, FetchError> {
    collect_followed_pages(FOLLOWED_PAGE_LIMIT, |after| async move {
        get_followed_artists(client, api_url, token, FOLLOWED_PAGE_LIMIT, after.as_deref()).await
    })
    .await
}

/// Drains a cursor paginated listing of followed artists.
///
/// `fetch_page` receives the cursor of the page to load (`None` for the
/// first one). Stops when a page comes back shorter than `limit` or without
/// a next cursor; a follow count divisible by `limit` ends on an empty page.
pub async fn collect_followed_pages<F, Fut>(
    limit: u64,
    mut fetch_page: F,
) -> Result<Vec<Artist>, FetchError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<(Vec<Artist>, Option<String>), FetchError>>,
{
    let mut all_artists = Vec::new();
    let mut after: Option<String> = None;

    loop {
        let (artists, next_after) = fetch_page(after.take()).await?;

        let page_len = artists.len() as u64;
        all_artists.extend(artists);

        if page_len < limit || next_after.is_none() {
            break;
        }
        after = next_after;
    }

    Ok(all_artists)
}
