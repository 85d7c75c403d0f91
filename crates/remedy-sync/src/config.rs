//! Configuration for the inventory store.
//!
//! # Example
//!
//! ```rust
//! use remedy_sync::Config;
//!
//! // Local-only inventory
//! let config = Config::new("/path/to/storage");
//!
//! // Family sharing enabled
//! let config = Config::new("/path/to/storage")
//!     .with_server_url("https://family.example.com")
//!     .with_member_name("Asha")
//!     .with_sync_interval(10);
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_SYNC_INTERVAL_SECS, STORAGE_NAME};

/// Configuration for an [`InventoryStore`](crate::InventoryStore).
///
/// # Storage Layout
///
/// ```text
/// {storage_path}/
/// └── remedy-inventory.json   # entries, family context, sync status
/// ```
///
/// # Defaults
///
/// - `server_url`: `None` (local-only; family sharing unavailable)
/// - `storage_path`: Platform-specific data directory + "remedy-sync"
/// - `member_name`: `"Me"`
/// - `sync_interval_secs`: 5 seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the family backend, e.g. `https://family.example.com`.
    ///
    /// Cloud sync is considered configured only when this is set.
    pub server_url: Option<String>,

    /// Directory holding the persisted inventory.
    pub storage_path: PathBuf,

    /// Member name used when creating or joining a family without one.
    pub member_name: String,

    /// How often the family inventory is refreshed while sync is active.
    pub sync_interval_secs: u64,
}

impl Config {
    /// Create a new configuration with the given storage path
    #[must_use]
    pub fn new(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            server_url: None,
            storage_path: storage_path.into(),
            member_name: "Me".to_string(),
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
        }
    }

    /// Set the server URL
    #[must_use]
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Set the member display name
    #[must_use]
    pub fn with_member_name(mut self, name: impl Into<String>) -> Self {
        self.member_name = name.into();
        self
    }

    /// Set the sync interval
    #[must_use]
    pub const fn with_sync_interval(mut self, secs: u64) -> Self {
        self.sync_interval_secs = secs;
        self
    }

    /// Get the default storage path
    #[must_use]
    pub fn default_storage_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("remedy-sync")
    }

    /// Path to the persisted inventory state
    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.storage_path.join(format!("{STORAGE_NAME}.json"))
    }

    /// Whether a family backend URL is present
    #[must_use]
    pub fn is_cloud_configured(&self) -> bool {
        self.server_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Self::default_storage_path())
    }
}
