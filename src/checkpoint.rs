//! Durable progress checkpoint, one small JSON file per source document.
//!
//! The checkpoint is the whole resume story: after every committed chunk
//! the driver persists the highest fully-processed page, so an interrupted
//! or halted run picks up exactly where the last one stopped. The record
//! is deliberately a single scalar pair, not a log. There is no locking,
//! no versioning, and no history; two concurrent runs against the same
//! document would race, which is an accepted limitation.
//!
//! A missing or unreadable checkpoint is indistinguishable from "never
//! started": [`CheckpointStore::load`] swallows corruption and returns the
//! zero-value record (with a warning log so operators can notice).

use crate::error::RecipeExtractError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Progress record for one source document.
///
/// Invariants maintained by the driver: `last_processed_page` never
/// exceeds the document's page count, and `completed == true` implies
/// `last_processed_page` equals it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Checkpoint {
    /// Highest page whose chunk committed successfully.
    pub last_processed_page: usize,
    /// True once every page of the document has been processed.
    pub completed: bool,
}

impl Checkpoint {
    /// The zero-value checkpoint: nothing processed yet.
    pub fn fresh() -> Self {
        Self::default()
    }
}

/// Reads and writes the checkpoint file for one source document.
///
/// The file lives at `<documentBaseName>_run_log.json`, in the working
/// directory by default, pretty-printed so a human can inspect or delete
/// it to force reprocessing.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Store keyed by the source document's base name.
    ///
    /// `cookbook.pdf` maps to `cookbook_run_log.json` under `dir` when
    /// given, otherwise relative to the working directory.
    pub fn for_source(source: &Path, dir: Option<&Path>) -> Self {
        let base = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let file_name = format!("{base}_run_log.json");
        let path = match dir {
            Some(d) => d.join(file_name),
            None => PathBuf::from(file_name),
        };
        Self { path }
    }

    /// Location of the checkpoint file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the checkpoint, treating a missing or corrupt file as fresh.
    pub fn load(&self) -> Checkpoint {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => {
                debug!("No checkpoint at {}, starting fresh", self.path.display());
                return Checkpoint::fresh();
            }
        };

        match serde_json::from_str::<Checkpoint>(&raw) {
            Ok(checkpoint) => {
                debug!(
                    "Loaded checkpoint {}: last_processed_page={}, completed={}",
                    self.path.display(),
                    checkpoint.last_processed_page,
                    checkpoint.completed
                );
                checkpoint
            }
            Err(e) => {
                warn!(
                    "Checkpoint {} is corrupt ({}), treating as fresh start",
                    self.path.display(),
                    e
                );
                Checkpoint::fresh()
            }
        }
    }

    /// Persist the checkpoint, overwriting any previous record.
    ///
    /// Writes to a sibling temp file and renames over the target, so a
    /// reader never observes a partially written record.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), RecipeExtractError> {
        let to_err = |source: std::io::Error| RecipeExtractError::CheckpointWrite {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(to_err)?;
            }
        }

        let body = serde_json::to_string_pretty(checkpoint)
            .map_err(|e| RecipeExtractError::Internal(format!("checkpoint serialise: {e}")))?;

        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, body).map_err(to_err)?;
        std::fs::rename(&tmp_path, &self.path).map_err(to_err)?;

        debug!(
            "Saved checkpoint {}: last_processed_page={}, completed={}",
            self.path.display(),
            checkpoint.last_processed_page,
            checkpoint.completed
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> CheckpointStore {
        CheckpointStore::for_source(Path::new("cookbook.pdf"), Some(dir))
    }

    #[test]
    fn derives_file_name_from_source_base_name() {
        let store = CheckpointStore::for_source(Path::new("/books/french_classics.pdf"), None);
        assert_eq!(
            store.path(),
            Path::new("french_classics_run_log.json")
        );
    }

    #[test]
    fn missing_file_loads_fresh() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        assert_eq!(store.load(), Checkpoint::fresh());
    }

    #[test]
    fn corrupt_file_loads_fresh() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        std::fs::write(store.path(), "{not json at all").unwrap();
        assert_eq!(store.load(), Checkpoint::fresh());
    }

    #[test]
    fn partial_record_fills_defaults() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        std::fs::write(store.path(), r#"{"last_processed_page": 6}"#).unwrap();
        let cp = store.load();
        assert_eq!(cp.last_processed_page, 6);
        assert!(!cp.completed);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        let cp = Checkpoint {
            last_processed_page: 4,
            completed: false,
        };
        store.save(&cp).unwrap();
        assert_eq!(store.load(), cp);
    }

    #[test]
    fn save_overwrites_previous_record() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store
            .save(&Checkpoint {
                last_processed_page: 2,
                completed: false,
            })
            .unwrap();
        store
            .save(&Checkpoint {
                last_processed_page: 5,
                completed: true,
            })
            .unwrap();
        let cp = store.load();
        assert_eq!(cp.last_processed_page, 5);
        assert!(cp.completed);
    }

    #[test]
    fn saved_file_is_pretty_printed_json() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store
            .save(&Checkpoint {
                last_processed_page: 3,
                completed: false,
            })
            .unwrap();
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains('\n'), "expected multi-line JSON, got: {raw}");
        assert!(raw.contains("\"last_processed_page\": 3"));
        assert!(raw.contains("\"completed\": false"));
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store.save(&Checkpoint::fresh()).unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp file survived: {leftovers:?}");
    }
}
