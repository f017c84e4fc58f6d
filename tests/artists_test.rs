mod common;

use common::*;
use newmusic::fetch::FetchError;
use newmusic::spotify::artists::{FOLLOWED_PAGE_LIMIT, collect_followed_pages};
use newmusic::types::Artist;

fn page(from: usize, count: usize) -> Vec<Artist> {
    (from..from + count)
        .map(|i| artist(&format!("a{i}"), &format!("Artist {i}")))
        .collect()
}

/// Serves `pages` in order and records the cursor each request asked for.
async fn drain(
    pages: Vec<(Vec<Artist>, Option<String>)>,
) -> (Result<Vec<Artist>, FetchError>, Vec<Option<String>>) {
    let mut requested = Vec::new();
    let mut pages = pages.into_iter();
    let result = collect_followed_pages(FOLLOWED_PAGE_LIMIT, |after| {
        requested.push(after);
        let next = pages.next().unwrap_or_default();
        async move { Ok(next) }
    })
    .await;
    (result, requested)
}

#[tokio::test]
async fn test_short_page_ends_pagination() {
    let (result, requested) = drain(vec![
        (page(0, 30), Some("a29".to_string())),
        (page(30, 50), None),
    ])
    .await;

    assert_eq!(result.unwrap().len(), 30);
    assert_eq!(requested, vec![None]);
}

#[tokio::test]
async fn test_missing_cursor_ends_pagination() {
    let (result, requested) = drain(vec![(page(0, 50), None), (page(50, 50), None)]).await;

    assert_eq!(result.unwrap().len(), 50);
    assert_eq!(requested.len(), 1);
}

#[tokio::test]
async fn test_follow_count_multiple_of_page_size() {
    let (result, requested) = drain(vec![
        (page(0, 50), Some("a49".to_string())),
        (page(50, 50), Some("a99".to_string())),
        (Vec::new(), None),
    ])
    .await;

    let artists = result.unwrap();
    assert_eq!(artists.len(), 100);
    assert_eq!(artists[99].id, "a99");
    assert_eq!(
        requested,
        vec![None, Some("a49".to_string()), Some("a99".to_string())]
    );
}

#[tokio::test]
async fn test_failed_page_aborts_listing() {
    let mut calls = 0;
    let result = collect_followed_pages(FOLLOWED_PAGE_LIMIT, |after| {
        calls += 1;
        async move {
            match after {
                None => Ok((page(0, 50), Some("a49".to_string()))),
                Some(_) => Err(FetchError::RateLimited(30)),
            }
        }
    })
    .await;

    assert!(matches!(result, Err(FetchError::RateLimited(30))));
    assert_eq!(calls, 2);
}
