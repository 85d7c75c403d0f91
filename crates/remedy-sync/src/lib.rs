//! # remedy-sync - Local-first remedy inventory
//!
//! remedy-sync keeps a personal inventory of homeopathic remedies on the
//! device and, optionally, shares it with a family through a small backend
//! service. The device is always usable: every read is local, and every write
//! lands locally even when the family backend cannot be reached.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use remedy_sync::{Config, EntryPatch, HttpBackend, InventoryStore, NewEntry};
//!
//! #[tokio::main]
//! async fn main() -> remedy_sync::Result<()> {
//!     let config = Config::new("/path/to/storage")
//!         .with_server_url("https://family.example.com");
//!     let backend = Arc::new(HttpBackend::from_config(&config));
//!     let store = InventoryStore::open(config, backend).await?;
//!
//!     // Always local, mirrored to the family when one is joined
//!     let added = store
//!         .add(NewEntry::new("Arnica Montana", "30C", "SBL", "Shelf A", 2))
//!         .await?;
//!     store.update(added.entry().id, EntryPatch::quantity(1)).await?;
//!
//!     // Share the inventory with the family
//!     let family = store.create_family("Sharma", "Asha").await?;
//!     println!("Family code: {}", family.family_id);
//!
//!     println!("Status: {}", store.sync_status());
//!     store.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`config`]: Configuration
//! - [`entry`]: Inventory entries and operation outcomes
//! - [`error`]: Error types and Result alias
//! - [`family`]: Family context and backend request shapes
//! - [`inventory`]: The [`InventoryStore`]
//! - [`status`]: The [`SyncStatus`] flag
//! - [`store`]: Local persistent storage
//! - [`backend`]: The [`FamilyBackend`] trait and its HTTP client
//! - [`sync`]: Family inventory subscription

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::all)]

pub mod backend;
pub mod config;
pub mod entry;
pub mod error;
pub mod family;
pub mod inventory;
pub mod status;
pub mod store;
pub mod sync;

pub use backend::{FamilyBackend, HttpBackend};
pub use config::Config;
pub use entry::{
    AddOutcome, DuplicateKey, EntryId, EntryPatch, InventoryEntry, InventoryExport, NewEntry,
    UpdateOutcome,
};
pub use error::{Error, Result};
pub use family::{FamilyContext, FamilyMember, FamilyMembership};
pub use inventory::InventoryStore;
pub use status::SyncStatus;
pub use sync::FamilySync;

/// Name of the persisted inventory, used as the state file stem.
pub const STORAGE_NAME: &str = "remedy-inventory";

/// Default interval between family inventory refreshes, in seconds.
///
/// Can be configured via [`Config::with_sync_interval`].
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 5;
