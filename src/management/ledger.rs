use std::{collections::BTreeMap, path::PathBuf};

use chrono::{Duration, NaiveDate};
use thiserror::Error;

use crate::{utils, warning};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("ledger serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Number of previous days the ledger is consulted for.
///
/// One day covers the default two day recency window; a wider window needs
/// a longer lookback.
pub fn lookback_days(recency_window: Option<Duration>) -> i64 {
    recency_window
        .map(|window| (window.num_days() - 1).max(1))
        .unwrap_or(1)
}

/// Releases delivered on one day, keyed by user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerEntry {
    deliveries: BTreeMap<String, Vec<String>>,
}

impl LedgerEntry {
    pub fn delivered_to(&self, user: &str, release_id: &str) -> bool {
        self.deliveries
            .get(user)
            .is_some_and(|ids| ids.iter().any(|id| id == release_id))
    }

    pub fn delivered_to_anyone(&self, release_id: &str) -> bool {
        self.deliveries
            .values()
            .any(|ids| ids.iter().any(|id| id == release_id))
    }

    fn record(&mut self, user: &str, release_ids: &[String]) {
        let ids = self.deliveries.entry(user.to_string()).or_default();
        for release_id in release_ids {
            if !ids.contains(release_id) {
                ids.push(release_id.clone());
            }
        }
    }
}

/// Ledger entries of the days preceding a run.
#[derive(Debug, Clone, Default)]
pub struct DeliveryHistory {
    entries: Vec<LedgerEntry>,
}

impl DeliveryHistory {
    pub fn was_delivered_to(&self, user: &str, release_id: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.delivered_to(user, release_id))
    }
}

/// Day-keyed record of delivered releases, one JSON file per date.
pub struct DeliveryLedger {
    dir: PathBuf,
}

impl DeliveryLedger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The entry for `date`. Missing or unreadable files count as empty.
    pub async fn entry(&self, date: NaiveDate) -> LedgerEntry {
        let path = self.entry_path(date);
        let content = match async_fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(_) => return LedgerEntry::default(),
        };

        match serde_json::from_str(&content) {
            Ok(deliveries) => LedgerEntry { deliveries },
            Err(e) => {
                warning!(
                    "Ignoring corrupt ledger file {}. Err: {}",
                    path.display(),
                    e
                );
                LedgerEntry::default()
            }
        }
    }

    /// Whether `release_id` was delivered to any user on `date`.
    pub async fn was_already_delivered(&self, date: NaiveDate, release_id: &str) -> bool {
        self.entry(date).await.delivered_to_anyone(release_id)
    }

    pub async fn was_delivered_to(&self, date: NaiveDate, user: &str, release_id: &str) -> bool {
        self.entry(date).await.delivered_to(user, release_id)
    }

    /// Loads the entries of the `days` days before `today`.
    pub async fn history(&self, today: NaiveDate, days: i64) -> DeliveryHistory {
        let mut entries = Vec::new();
        for date in utils::previous_days(today, days) {
            entries.push(self.entry(date).await);
        }
        DeliveryHistory { entries }
    }

    /// Adds `release_ids` to the user's record for `date`.
    ///
    /// The user is recorded even when `release_ids` is empty.
    pub async fn record_delivery(
        &self,
        date: NaiveDate,
        user: &str,
        release_ids: &[String],
    ) -> Result<(), LedgerError> {
        let mut entry = self.entry(date).await;
        entry.record(user, release_ids);

        async_fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(&entry.deliveries)?;
        async_fs::write(self.entry_path(date), json).await?;
        Ok(())
    }

    fn entry_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.json", date.format("%Y-%m-%d")))
    }
}
