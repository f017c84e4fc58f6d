use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::{catalog::CatalogSnapshot, warning};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot is not valid json: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Last-known catalog state, persisted as one JSON file.
///
/// The file maps artist ids to `{ "name", "albums", "singles" }`.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the saved snapshot.
    ///
    /// A missing, truncated or malformed file yields an empty snapshot, which
    /// makes the run a first run.
    pub async fn load(&self) -> CatalogSnapshot {
        match self.try_load().await {
            Ok(snapshot) => snapshot,
            Err(SnapshotError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                CatalogSnapshot::new()
            }
            Err(e) => {
                warning!(
                    "Cannot read snapshot {}, starting from an empty baseline. Err: {}",
                    self.path.display(),
                    e
                );
                CatalogSnapshot::new()
            }
        }
    }

    pub async fn try_load(&self) -> Result<CatalogSnapshot, SnapshotError> {
        let content = async_fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Replaces the persisted snapshot with `snapshot`.
    pub async fn save(&self, snapshot: &CatalogSnapshot) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        async_fs::write(&self.path, json).await?;
        Ok(())
    }
}
