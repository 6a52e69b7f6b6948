//! JSON checkpoint files.
//!
//! Each checkpoint is one `generation-<n>.json` file in the checkpoint
//! directory, written to a temp file first and renamed into place so a
//! crash mid-write never leaves a truncated checkpoint behind.

use async_trait::async_trait;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::collaborators::{LeagueSnapshot, PersistenceCollaborator};
use crate::error::PersistenceError;

const PREFIX: &str = "generation-";
const EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct JsonCheckpointStore {
    dir: PathBuf,
}

impl JsonCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, generation_index: u64) -> PathBuf {
        self.dir
            .join(format!("{PREFIX}{generation_index}.{EXTENSION}"))
    }

    /// Generation indices with a checkpoint file, ascending.
    pub fn indices(&self) -> Result<Vec<u64>, PersistenceError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut indices = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if let Some(index) = parse_index(&path) {
                indices.push(index);
            }
        }
        indices.sort_unstable();
        Ok(indices)
    }

    fn write_sync(&self, snapshot: &LeagueSnapshot) -> Result<PathBuf, PersistenceError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(snapshot)?;

        let path = self.path_for(snapshot.generation_index);
        let temp_path = path.with_extension("json.tmp");
        let written = fs::File::create(&temp_path).and_then(|mut file| {
            file.write_all(json.as_bytes())?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|_| fs::rename(&temp_path, &path)) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        Ok(path)
    }

    fn read_sync(&self, generation_index: u64) -> Result<LeagueSnapshot, PersistenceError> {
        let path = self.path_for(generation_index);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound(generation_index))
            }
            Err(e) => return Err(e.into()),
        };
        let snapshot: LeagueSnapshot = serde_json::from_str(&json)?;
        if snapshot.generation_index != generation_index {
            return Err(PersistenceError::Encoding(format!(
                "{} holds generation {}",
                path.display(),
                snapshot.generation_index
            )));
        }
        Ok(snapshot)
    }

    fn latest_sync(&self) -> Result<Option<LeagueSnapshot>, PersistenceError> {
        match self.indices()?.last() {
            Some(&index) => self.read_sync(index).map(Some),
            None => Ok(None),
        }
    }
}

fn parse_index(path: &Path) -> Option<u64> {
    if path.extension()? != EXTENSION {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix(PREFIX)?
        .parse()
        .ok()
}

/// Run blocking file IO off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T, PersistenceError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PersistenceError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PersistenceError::Unavailable(format!("checkpoint task failed: {e}")))?
}

#[async_trait]
impl PersistenceCollaborator for JsonCheckpointStore {
    async fn save(&self, snapshot: &LeagueSnapshot) -> Result<(), PersistenceError> {
        let store = self.clone();
        let snapshot = snapshot.clone();
        let generation = snapshot.generation_index;
        match blocking(move || store.write_sync(&snapshot)).await {
            Ok(path) => {
                debug!(generation, path = %path.display(), "Wrote checkpoint");
                Ok(())
            }
            Err(e) => {
                warn!(generation, error = %e, "Failed to write checkpoint");
                Err(e)
            }
        }
    }

    async fn load(&self, generation_index: u64) -> Result<LeagueSnapshot, PersistenceError> {
        let store = self.clone();
        blocking(move || store.read_sync(generation_index)).await
    }

    async fn latest(&self) -> Result<Option<LeagueSnapshot>, PersistenceError> {
        let store = self.clone();
        blocking(move || store.latest_sync()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Roster, WeightsVersion};
    use crate::stats::LeagueStatistics;
    use tempfile::tempdir;

    fn snapshot(generation_index: u64) -> LeagueSnapshot {
        let roster = Roster::new(
            WeightsVersion::new("w0", 0),
            vec![
                ("Alpha".into(), WeightsVersion::new("w1", 2)),
                ("Beta".into(), WeightsVersion::new("w2", 1)),
            ],
        )
        .unwrap();
        let mut statistics = LeagueStatistics::new();
        statistics.generations_completed = generation_index + 1;
        LeagueSnapshot {
            generation_index,
            roster,
            statistics,
            saved_at: 1_700_000_000,
        }
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path().join("checkpoints"));

        store.save(&snapshot(3)).await.unwrap();

        assert!(store.path_for(3).exists());
        assert!(!store.path_for(3).with_extension("json.tmp").exists());
        assert_eq!(store.load(3).await.unwrap(), snapshot(3));
    }

    #[tokio::test]
    async fn test_latest_picks_highest_index() {
        let dir = tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path());
        assert_eq!(store.latest().await.unwrap(), None);

        for index in [2, 10, 9] {
            store.save(&snapshot(index)).await.unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join("generation-x.json"), "{}").unwrap();

        assert_eq!(store.indices().unwrap(), vec![2, 9, 10]);
        let latest = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.generation_index, 10);
    }

    #[tokio::test]
    async fn test_missing_checkpoint() {
        let dir = tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path());
        assert_eq!(
            store.load(4).await.unwrap_err(),
            PersistenceError::NotFound(4)
        );
    }

    #[tokio::test]
    async fn test_corrupt_checkpoint() {
        let dir = tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path());
        fs::write(store.path_for(1), "{ not json").unwrap();
        assert!(matches!(
            store.load(1).await,
            Err(PersistenceError::Encoding(_))
        ));
    }

    #[tokio::test]
    async fn test_unwritable_dir() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let store = JsonCheckpointStore::new(blocker.join("nested"));
        assert!(matches!(
            store.save(&snapshot(0)).await,
            Err(PersistenceError::Io(_))
        ));
    }
}
