use std::collections::BTreeMap;

use newmusic::management::{AccountError, AccountRegistry};

fn artists(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(id, name)| (id.to_string(), name.to_string()))
        .collect()
}

#[tokio::test]
async fn test_add_persist_and_load_accounts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache").join("accounts.json");

    let mut registry = AccountRegistry::new(&path);
    assert!(registry.add("alice", Some("alice@example.com".to_string())));
    assert!(registry.add("bob", None));
    assert!(!registry.add("bob", Some("bob@example.com".to_string())));
    registry.get_mut("alice").unwrap().playlist_id = Some("p1".to_string());
    registry.persist().await.unwrap();

    let loaded = AccountRegistry::load(&path).await;
    assert_eq!(loaded.users(), vec!["alice".to_string(), "bob".to_string()]);
    assert_eq!(loaded.get("bob").unwrap().email, "bob@example.com");
    assert_eq!(loaded.get("alice").unwrap().playlist_id.as_deref(), Some("p1"));
}

#[tokio::test]
async fn test_load_missing_or_corrupt_accounts() {
    let dir = tempfile::tempdir().unwrap();
    assert!(AccountRegistry::load(dir.path().join("none.json")).await.is_empty());

    let path = dir.path().join("accounts.json");
    std::fs::write(&path, "[1, 2").unwrap();
    assert!(AccountRegistry::load(&path).await.is_empty());
}

#[test]
fn test_remove_account() {
    let mut registry = AccountRegistry::new("accounts.json");
    registry.add("alice", None);

    assert!(registry.remove("alice").is_ok());
    assert!(matches!(registry.remove("alice"), Err(AccountError::Unknown(_))));
    assert!(registry.is_empty());
}

#[test]
fn test_followed_union() {
    let mut registry = AccountRegistry::new("accounts.json");
    registry.add("alice", None);
    registry.add("bob", None);
    registry.add("carol", None);

    registry
        .set_followed_artists("alice", artists(&[("a1", "One"), ("a2", "Two")]))
        .unwrap();
    registry
        .set_followed_artists("bob", artists(&[("a2", "Two"), ("a3", "Three")]))
        .unwrap();
    registry
        .set_followed_artists("carol", artists(&[("a4", "Four")]))
        .unwrap();

    let union = registry.followed_union(&["alice".to_string(), "bob".to_string()]);
    assert_eq!(union.keys().collect::<Vec<_>>(), vec!["a1", "a2", "a3"]);

    assert!(registry.get("alice").unwrap().follows("a1"));
    assert!(!registry.get("alice").unwrap().follows("a3"));
    assert!(registry.set_followed_artists("dave", BTreeMap::new()).is_err());
}
