use tabled::Table;

use crate::{
    config::Config, info, management::SnapshotStore, types::SnapshotTableRow, warning,
};

/// Prints the stored catalog snapshot, optionally filtered by artist name.
pub async fn list_snapshot(config: &Config, search: Option<String>) {
    let store = SnapshotStore::new(config.snapshot_path());
    let snapshot = match store.try_load().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warning!(
                "No snapshot at {} yet. Run newmusic run first. Err: {}",
                store.path().display(),
                e
            );
            return;
        }
    };

    let mut artists: Vec<_> = snapshot.values().collect();
    artists.sort_by_key(|a| a.name.to_lowercase());

    if let Some(artist_search) = search {
        let search_term = artist_search.to_lowercase();
        artists.retain(|a| a.name.to_lowercase().contains(&search_term));
    }

    let rows: Vec<SnapshotTableRow> = artists
        .into_iter()
        .map(|a| SnapshotTableRow {
            artist: a.name.clone(),
            albums: a.albums.len(),
            singles: a.singles.len(),
            releases: a
                .albums
                .values()
                .chain(a.singles.values())
                .filter(|name| !name.is_empty())
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();

    info!(
        "{} artists in snapshot ({} identity).",
        snapshot.len(),
        config.identity
    );
    println!("{}", Table::new(rows));
}
