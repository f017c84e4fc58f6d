mod common;

use std::{collections::BTreeMap, path::Path};

use chrono::{Duration, NaiveDate};
use common::*;
use newmusic::catalog::{ArtistSnapshot, CatalogSnapshot, IdentityScheme};
use newmusic::management::{AccountRegistry, DeliveryLedger, SnapshotStore};
use newmusic::pipeline::{self, RunOptions, RunSummary};
use newmusic::reconcile::{ReconcileOptions, Reconciler};
use newmusic::types::ReleaseKind;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

struct Fixture {
    registry: AccountRegistry,
    reconciler: Reconciler,
    ledger: DeliveryLedger,
    options: RunOptions,
}

impl Fixture {
    fn new(dir: &Path) -> Self {
        Self::with_options(dir, RunOptions::default())
    }

    fn with_options(dir: &Path, options: RunOptions) -> Self {
        let mut registry = AccountRegistry::new(dir.join("cache").join("accounts.json"));
        registry.add("alice", Some("alice@example.com".to_string()));
        registry.add("bob", Some("bob@example.com".to_string()));

        Self {
            registry,
            reconciler: Reconciler::new(
                SnapshotStore::new(dir.join("cache").join("snapshot-id.json")),
                options.reconcile.clone(),
            ),
            ledger: DeliveryLedger::new(dir.join("logs")),
            options,
        }
    }

    async fn run(
        &mut self,
        sessions: &mut BTreeMap<String, FakeSpotify>,
        mailer: &FakeMailer,
        today: NaiveDate,
    ) -> RunSummary {
        pipeline::run(
            sessions,
            &mut self.registry,
            &self.reconciler,
            Some(&self.ledger),
            Some(mailer),
            &self.options,
            today,
            |_, _, _| {},
        )
        .await
    }
}

/// alice follows both artists and doubles as the catalog, bob follows a2.
fn sessions() -> BTreeMap<String, FakeSpotify> {
    let alice = FakeSpotify::new("alice")
        .follow("a1", "New Order")
        .follow("a2", "Joy Division")
        .with_releases(
            "a1",
            ReleaseKind::Album,
            vec![album("x", "Technique", "1989-01-30")],
        )
        .with_releases(
            "a2",
            ReleaseKind::Album,
            vec![album("y", "Closer", "1980-07-18")],
        );
    let bob = FakeSpotify::new("bob").follow("a2", "Joy Division");

    [("alice".to_string(), alice), ("bob".to_string(), bob)]
        .into_iter()
        .collect()
}

fn add_new_release(sessions: &mut BTreeMap<String, FakeSpotify>, release_date: &str) {
    let alice = sessions.get_mut("alice").unwrap();
    alice.releases.insert(
        ("a2".to_string(), ReleaseKind::Album),
        vec![
            album("n1", "Still", release_date),
            album("y", "Closer", "1980-07-18"),
        ],
    );
    alice.tracks.insert("n1".to_string(), uris("n1", 3));
}

#[tokio::test]
async fn test_run_bootstraps_then_delivers() {
    let dir = tempfile::tempdir().unwrap();
    let mut fixture = Fixture::new(dir.path());
    let mut sessions = sessions();
    let mailer = FakeMailer::default();

    let summary = fixture.run(&mut sessions, &mailer, day(9)).await;
    assert_eq!(summary.accounts, 2);
    assert_eq!(summary.artists, 2);
    assert_eq!(summary.new_releases, 0);
    assert!(summary.deliveries.is_empty());
    assert!(dir.path().join("cache").join("snapshot-id.json").is_file());

    add_new_release(&mut sessions, "2024-05-10");
    let summary = fixture.run(&mut sessions, &mailer, day(10)).await;

    assert_eq!(summary.new_releases, 1);
    assert!(summary.failed.is_empty());
    assert_eq!(summary.deliveries["alice"].delivered, vec!["n1".to_string()]);
    assert_eq!(summary.deliveries["bob"].delivered, vec!["n1".to_string()]);
    assert_eq!(sessions["alice"].playlist_tracks(), 3);
    assert_eq!(sessions["bob"].playlist_tracks(), 3);

    let recipients: Vec<String> = mailer.sent().into_iter().map(|m| m.to).collect();
    assert_eq!(
        recipients,
        vec!["alice@example.com".to_string(), "bob@example.com".to_string()]
    );

    let entry = fixture.ledger.entry(day(10)).await;
    assert!(entry.delivered_to("alice", "n1"));
    assert!(entry.delivered_to("bob", "n1"));

    let registry = AccountRegistry::load(fixture.registry.path()).await;
    assert_eq!(
        registry.get("alice").unwrap().playlist_id.as_deref(),
        Some("alice-playlist-1")
    );
    assert!(registry.get("bob").unwrap().follows("a2"));

    // nothing changed since the last run
    let summary = fixture.run(&mut sessions, &mailer, day(10)).await;
    assert_eq!(summary.new_releases, 0);
    assert_eq!(mailer.sent().len(), 2);
}

#[tokio::test]
async fn test_run_skips_old_catalog_additions() {
    let dir = tempfile::tempdir().unwrap();
    let mut fixture = Fixture::new(dir.path());
    let mut sessions = sessions();
    let mailer = FakeMailer::default();

    fixture.run(&mut sessions, &mailer, day(9)).await;

    add_new_release(&mut sessions, "2001-01-01");
    let summary = fixture.run(&mut sessions, &mailer, day(10)).await;

    assert_eq!(summary.new_releases, 0);
    assert_eq!(sessions["alice"].created, 0);
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn test_ledger_suppresses_per_user() {
    let dir = tempfile::tempdir().unwrap();
    let mut fixture = Fixture::new(dir.path());
    let mut sessions = sessions();
    let mailer = FakeMailer::default();

    // baseline without n1, as if the snapshot written on day 10 was lost
    let mut baseline = CatalogSnapshot::new();
    baseline.insert(
        "a1".to_string(),
        ArtistSnapshot::new("New Order").with_release(ReleaseKind::Album, "x", "Technique"),
    );
    baseline.insert(
        "a2".to_string(),
        ArtistSnapshot::new("Joy Division").with_release(ReleaseKind::Album, "y", "Closer"),
    );
    fixture.reconciler.store().save(&baseline).await.unwrap();

    fixture
        .ledger
        .record_delivery(day(10), "alice", &["n1".to_string()])
        .await
        .unwrap();

    add_new_release(&mut sessions, "2024-05-10");
    let summary = fixture.run(&mut sessions, &mailer, day(11)).await;

    assert_eq!(summary.new_releases, 1);
    assert_eq!(summary.suppressed["alice"], vec!["n1".to_string()]);
    assert!(!summary.deliveries.contains_key("alice"));
    assert_eq!(summary.deliveries["bob"].delivered, vec!["n1".to_string()]);
    assert_eq!(sessions["alice"].created, 0);
    assert_eq!(sessions["bob"].playlist_tracks(), 3);

    let entry = fixture.ledger.entry(day(11)).await;
    assert!(entry.delivered_to("alice", "n1"));
    assert!(entry.delivered_to("bob", "n1"));
}

#[tokio::test]
async fn test_failed_account_does_not_stop_others() {
    let dir = tempfile::tempdir().unwrap();
    let mut fixture = Fixture::new(dir.path());
    let mut sessions = sessions();
    let mailer = FakeMailer::default();

    fixture.run(&mut sessions, &mailer, day(9)).await;

    add_new_release(&mut sessions, "2024-05-10");
    sessions.get_mut("bob").unwrap().fail_appends = true;
    let summary = fixture.run(&mut sessions, &mailer, day(10)).await;

    assert_eq!(summary.failed, vec!["bob".to_string()]);
    assert_eq!(summary.deliveries["alice"].delivered, vec!["n1".to_string()]);

    let entry = fixture.ledger.entry(day(10)).await;
    assert!(entry.delivered_to("alice", "n1"));
    assert!(!entry.delivered_to("bob", "n1"));

    let content = std::fs::read_to_string(dir.path().join("logs").join("2024-05-10.json")).unwrap();
    let on_disk: BTreeMap<String, Vec<String>> = serde_json::from_str(&content).unwrap();
    assert_eq!(on_disk["bob"], Vec::<String>::new());
}

#[tokio::test]
async fn test_title_scheme_delivers_release_of_its_own_artist() {
    let dir = tempfile::tempdir().unwrap();
    let options = RunOptions {
        reconcile: ReconcileOptions {
            scheme: IdentityScheme::NormalizedTitle,
            recency_window: Some(Duration::days(2)),
        },
        release_limit: 5,
    };
    let mut fixture = Fixture::with_options(dir.path(), options);
    let mailer = FakeMailer::default();

    // both artists have a release titled "Intro"
    let alice = FakeSpotify::new("alice")
        .follow("a1", "Opener")
        .follow("b1", "Latecomer")
        .with_releases(
            "a1",
            ReleaseKind::Album,
            vec![album("a-intro", "Intro", "2024-05-01")],
        )
        .with_releases(
            "b1",
            ReleaseKind::Album,
            vec![album("b-old", "Debut", "2020-01-01")],
        );
    let bob = FakeSpotify::new("bob").follow("b1", "Latecomer");
    let mut sessions: BTreeMap<String, FakeSpotify> =
        [("alice".to_string(), alice), ("bob".to_string(), bob)]
            .into_iter()
            .collect();

    fixture.run(&mut sessions, &mailer, day(9)).await;

    let alice = sessions.get_mut("alice").unwrap();
    alice.releases.insert(
        ("b1".to_string(), ReleaseKind::Album),
        vec![
            album("b-intro", "Intro", "2024-05-10"),
            album("b-old", "Debut", "2020-01-01"),
        ],
    );
    alice.tracks.insert("a-intro".to_string(), uris("a-intro", 2));
    alice.tracks.insert("b-intro".to_string(), uris("b-intro", 3));

    let summary = fixture.run(&mut sessions, &mailer, day(10)).await;

    assert_eq!(summary.new_releases, 1);
    assert_eq!(summary.deliveries["alice"].delivered, vec!["b-intro".to_string()]);
    assert_eq!(summary.deliveries["bob"].delivered, vec!["b-intro".to_string()]);
    assert_eq!(sessions["bob"].playlist_tracks(), 3);
    assert_eq!(sessions["alice"].playlist_tracks(), 3);

    let entry = fixture.ledger.entry(day(10)).await;
    assert!(entry.delivered_to("alice", "b-intro"));
    assert!(entry.delivered_to("bob", "b-intro"));
    assert!(!entry.delivered_to_anyone("a-intro"));
}

#[tokio::test]
async fn test_failed_followed_refresh_keeps_previous_list() {
    let dir = tempfile::tempdir().unwrap();
    let mut fixture = Fixture::new(dir.path());
    fixture
        .registry
        .set_followed_artists(
            "bob",
            [("a3".to_string(), "Section 25".to_string())]
                .into_iter()
                .collect(),
        )
        .unwrap();

    let mut sessions = sessions();
    sessions.get_mut("bob").unwrap().fail_followed = true;

    let summary = fixture
        .run(&mut sessions, &FakeMailer::default(), day(9))
        .await;

    assert!(fixture.registry.get("bob").unwrap().follows("a3"));
    assert!(!fixture.registry.get("bob").unwrap().follows("a2"));
    assert_eq!(summary.artists, 3);
}

#[tokio::test]
async fn test_run_without_sessions_leaves_snapshot_alone() {
    let dir = tempfile::tempdir().unwrap();
    let mut fixture = Fixture::new(dir.path());
    let mut sessions: BTreeMap<String, FakeSpotify> = BTreeMap::new();

    let summary = fixture
        .run(&mut sessions, &FakeMailer::default(), day(9))
        .await;

    assert_eq!(summary.accounts, 0);
    assert!(!fixture.reconciler.store().path().exists());
}
