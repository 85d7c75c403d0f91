//! Family inventory sync adapter
//!
//! [`FamilySync`] wraps a [`FamilyBackend`] and adds the push-style
//! subscription used by the inventory store: while a family is active, a
//! background task refreshes the family's full inventory on an interval and
//! hands every changed snapshot to the registered callback. Snapshots replace
//! the local list wholesale; there is no incremental merge.
//!
//! Only one subscription runs at a time. Starting a new one stops the old one.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::FamilyBackend;
use crate::entry::{EntryId, EntryPatch, InventoryEntry, NewEntry};
use crate::error::{Error, Result};
use crate::family::FamilyMembership;

/// A running inventory subscription
struct Subscription {
    family_id: String,
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Sync adapter around a [`FamilyBackend`]
pub struct FamilySync {
    backend: Arc<dyn FamilyBackend>,
    sync_interval: Duration,
    subscription: Mutex<Option<Subscription>>,
}

impl std::fmt::Debug for FamilySync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FamilySync")
            .field("configured", &self.backend.is_configured())
            .field("sync_interval", &self.sync_interval)
            .field("active_family", &self.active_family())
            .finish()
    }
}

impl FamilySync {
    /// Create an adapter polling the backend every `sync_interval`
    pub fn new(backend: Arc<dyn FamilyBackend>, sync_interval: Duration) -> Self {
        Self {
            backend,
            sync_interval,
            subscription: Mutex::new(None),
        }
    }

    /// Whether cloud credentials are present
    pub fn is_configured(&self) -> bool {
        self.backend.is_configured()
    }

    fn require_configured(&self) -> Result<()> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(Error::config("cloud sync is not configured"))
        }
    }

    /// Start delivering the family inventory to `on_update`
    ///
    /// The first successful fetch is always delivered; after that only
    /// snapshots that differ from the previous one are. Fetch failures are
    /// logged and retried on the next tick.
    ///
    /// Returns `false` without starting anything when the backend is not
    /// configured.
    pub fn start_inventory_sync<F>(&self, family_id: &str, on_update: F) -> bool
    where
        F: Fn(Vec<InventoryEntry>) + Send + Sync + 'static,
    {
        if !self.is_configured() {
            warn!(family_id, "Cloud sync not configured, inventory sync not started");
            return false;
        }

        self.stop_inventory_sync();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = Self::spawn_sync_loop(
            self.backend.clone(),
            family_id.to_string(),
            self.sync_interval,
            on_update,
            shutdown_rx,
        );

        *self.subscription.lock() = Some(Subscription {
            family_id: family_id.to_string(),
            shutdown_tx,
            handle,
        });
        true
    }

    fn spawn_sync_loop<F>(
        backend: Arc<dyn FamilyBackend>,
        family_id: String,
        sync_interval: Duration,
        on_update: F,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()>
    where
        F: Fn(Vec<InventoryEntry>) + Send + Sync + 'static,
    {
        tokio::spawn(async move {
            info!(
                family_id = %family_id,
                interval_ms = sync_interval.as_millis(),
                "Family inventory sync started"
            );

            let mut last_delivered: Option<Vec<InventoryEntry>> = None;

            loop {
                match backend.list_medicines(&family_id).await {
                    Ok(entries) => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                        if last_delivered.as_ref() != Some(&entries) {
                            debug!(family_id = %family_id, entries = entries.len(), "Family inventory changed");
                            on_update(entries.clone());
                            last_delivered = Some(entries);
                        }
                    }
                    Err(e) => {
                        warn!(family_id = %family_id, error = %e, "Failed to fetch family inventory");
                    }
                }

                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(sync_interval) => {}
                }
            }

            info!(family_id = %family_id, "Family inventory sync stopped");
        })
    }

    /// Stop the subscription, if any
    pub fn stop_inventory_sync(&self) {
        if let Some(subscription) = self.subscription.lock().take() {
            let _ = subscription.shutdown_tx.send(true);
            subscription.handle.abort();
            debug!(family_id = %subscription.family_id, "Inventory sync cancelled");
        }
    }

    /// Whether a subscription is running
    pub fn is_syncing(&self) -> bool {
        self.subscription
            .lock()
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }

    /// Family id of the running subscription
    pub fn active_family(&self) -> Option<String> {
        self.subscription.lock().as_ref().map(|s| s.family_id.clone())
    }

    /// Create a family
    pub async fn create_family(
        &self,
        family_name: &str,
        member_name: &str,
    ) -> Result<FamilyMembership> {
        self.require_configured()?;
        self.backend.create_family(family_name, member_name).await
    }

    /// Join a family
    pub async fn join_family(&self, family_id: &str, member_name: &str) -> Result<FamilyMembership> {
        self.require_configured()?;
        self.backend.join_family(family_id, member_name).await
    }

    /// Leave a family
    pub async fn leave_family(&self, family_id: &str, member_id: &str) -> Result<()> {
        self.require_configured()?;
        self.backend.leave_family(family_id, member_id).await
    }

    /// Fetch the family inventory once
    pub async fn fetch_inventory(&self, family_id: &str) -> Result<Vec<InventoryEntry>> {
        self.require_configured()?;
        self.backend.list_medicines(family_id).await
    }

    /// Create an entry remotely
    pub async fn add_medicine(
        &self,
        family_id: &str,
        entry: &NewEntry,
        updated_by: &str,
    ) -> Result<InventoryEntry> {
        self.require_configured()?;
        self.backend.add_medicine(family_id, entry, updated_by).await
    }

    /// Update an entry remotely
    pub async fn update_medicine(
        &self,
        family_id: &str,
        id: EntryId,
        patch: &EntryPatch,
        updated_by: &str,
    ) -> Result<InventoryEntry> {
        self.require_configured()?;
        self.backend
            .update_medicine(family_id, id, patch, updated_by)
            .await
    }

    /// Delete an entry remotely
    pub async fn delete_medicine(&self, family_id: &str, id: EntryId, updated_by: &str) -> Result<()> {
        self.require_configured()?;
        self.backend.delete_medicine(family_id, id, updated_by).await
    }
}

impl Drop for FamilySync {
    fn drop(&mut self) {
        self.stop_inventory_sync();
    }
}
