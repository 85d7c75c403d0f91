//! Local persistent storage for the inventory
//!
//! The whole inventory state (entries, family context, sync status and the
//! last-modified timestamp) lives in a single JSON file named after
//! [`STORAGE_NAME`](crate::STORAGE_NAME). It is rehydrated on open and
//! rewritten after every mutation.
//!
//! ## Atomic Writes
//!
//! Data is first written to a `.tmp` file, then renamed to the final path, so
//! a crash during a write never leaves a truncated file behind.
//!
//! ## Self-healing
//!
//! A state file that cannot be parsed is logged, removed, and treated as an
//! empty inventory.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::entry::InventoryEntry;
use crate::error::{Error, Result};
use crate::family::FamilyContext;
use crate::status::SyncStatus;

/// Everything that survives a restart
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    /// The inventory
    #[serde(default)]
    pub entries: Vec<InventoryEntry>,
    /// Family context, when this device has joined a family
    #[serde(default)]
    pub family: Option<FamilyContext>,
    /// Status of the last mutation
    #[serde(default)]
    pub sync_status: SyncStatus,
    /// Time of the last mutation
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

/// JSON-file backed storage for [`PersistedState`]
#[derive(Debug)]
pub struct LocalStore {
    /// Path of the state file
    path: PathBuf,
}

impl LocalStore {
    /// Create a store from config, creating the storage directory
    pub fn new(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.storage_path)
            .map_err(|e| Error::storage(format!("failed to create storage directory: {e}")))?;

        Ok(Self {
            path: config.state_path(),
        })
    }

    /// Path of the state file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }

    /// Load the persisted state
    ///
    /// Returns the default (empty) state if nothing was saved yet or the file
    /// is corrupt.
    pub fn load(&self) -> Result<PersistedState> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No saved inventory, starting empty");
            return Ok(PersistedState::default());
        }

        let bytes = std::fs::read(&self.path)
            .map_err(|e| Error::storage(format!("failed to read inventory: {e}")))?;

        match serde_json::from_slice::<PersistedState>(&bytes) {
            Ok(state) => {
                info!(
                    path = %self.path.display(),
                    entries = state.entries.len(),
                    family = ?state.family.as_ref().map(|f| f.family_id.as_str()),
                    "Loaded inventory from disk"
                );
                Ok(state)
            }
            Err(e) => {
                warn!(path = %self.path.display(), "Inventory file corrupted, starting empty: {e}");
                let _ = std::fs::remove_file(&self.path);
                Ok(PersistedState::default())
            }
        }
    }

    /// Save the state atomically
    pub fn save(&self, state: &PersistedState) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state)?;

        let temp_path = self.temp_path();
        std::fs::write(&temp_path, bytes)
            .map_err(|e| Error::storage(format!("failed to write temp file: {e}")))?;
        std::fs::rename(&temp_path, &self.path)
            .map_err(|e| Error::storage(format!("failed to rename temp file: {e}")))?;

        debug!(path = %self.path.display(), entries = state.entries.len(), "Saved inventory");
        Ok(())
    }

    /// Remove the saved state
    ///
    /// Returns `Ok(())` if there was nothing to remove.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)
                .map_err(|e| Error::storage(format!("failed to remove inventory: {e}")))?;
            info!(path = %self.path.display(), "Inventory cleared");
        }
        let temp_path = self.temp_path();
        if temp_path.exists() {
            let _ = std::fs::remove_file(&temp_path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::NewEntry;
    use tempfile::TempDir;

    fn test_store(dir: &TempDir) -> LocalStore {
        LocalStore::new(&Config::new(dir.path())).unwrap()
    }

    #[test]
    fn test_load_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        let state = store.load().unwrap();
        assert_eq!(state, PersistedState::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        let state = PersistedState {
            entries: vec![InventoryEntry::from_new(
                1,
                &NewEntry::new("Nux Vomica", "30C", "SBL", "Shelf B", 3),
            )],
            family: Some(FamilyContext {
                family_id: "QWERTY12".to_string(),
                family_name: None,
                member_id: "abc".to_string(),
                member_name: "Ravi".to_string(),
                sync_active: true,
            }),
            sync_status: SyncStatus::Error,
            last_modified: Some(Utc::now()),
        };
        store.save(&state).unwrap();

        assert!(!store.temp_path().exists());
        assert_eq!(store.load().unwrap(), state);
    }

    #[test]
    fn test_corrupt_file_is_replaced() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        std::fs::write(store.path(), b"{ not json").unwrap();

        let state = store.load().unwrap();
        assert!(state.entries.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        store.save(&PersistedState::default()).unwrap();
        assert!(store.path().exists());

        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
    }
}
