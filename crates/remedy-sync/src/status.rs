//! Sync status flag shown next to the inventory

use serde::{Deserialize, Serialize};

/// Whether the last mutation has been confirmed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Persisted locally and, when a family is active, confirmed by the backend
    #[default]
    Synced,
    /// The local write failed; the change only lives in memory
    Unsaved,
    /// A family is active but the backend call failed; the change is local only
    Error,
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Synced => write!(f, "synced"),
            Self::Unsaved => write!(f, "unsaved"),
            Self::Error => write!(f, "error"),
        }
    }
}
