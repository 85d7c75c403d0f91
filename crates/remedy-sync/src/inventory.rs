//! The inventory store
//!
//! [`InventoryStore`] is the single source of truth for this device's view of
//! the remedy inventory. It owns the in-memory state, writes it to local
//! storage after every mutation, and, while a family is active, mirrors every
//! mutation to the family backend.
//!
//! # Mutation pipeline
//!
//! Every mutation goes through the same steps:
//!
//! 1. Pick a [`SyncStrategy`]: remote-with-fallback when a family is active and
//!    the backend is configured, local-only otherwise.
//! 2. Try the remote call, if any. A failure is logged and never returned.
//! 3. Apply the change to the in-memory list, using the server's copy of the
//!    entry when one came back.
//! 4. Persist and record the [`SyncStatus`].
//!
//! The device stays usable offline: a mutation that could not reach the
//! backend still succeeds locally and leaves the status at
//! [`SyncStatus::Error`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use remedy_sync::{AddOutcome, Config, HttpBackend, InventoryStore, NewEntry};
//!
//! # async fn example() -> remedy_sync::Result<()> {
//! let config = Config::new("/path/to/storage");
//! let backend = Arc::new(HttpBackend::from_config(&config));
//! let store = InventoryStore::open(config, backend).await?;
//!
//! let arnica = NewEntry::new("Arnica Montana", "30C", "SBL", "Shelf A", 2);
//! match store.add(arnica).await? {
//!     AddOutcome::Added(entry) => println!("stored as #{}", entry.id),
//!     AddOutcome::Duplicate(existing) => println!("already have #{}", existing.id),
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::backend::FamilyBackend;
use crate::config::Config;
use crate::entry::{
    AddOutcome, EntryId, EntryPatch, InventoryEntry, InventoryExport, NewEntry, UpdateOutcome,
    EXPORT_VERSION,
};
use crate::error::{Error, Result};
use crate::family::FamilyContext;
use crate::status::SyncStatus;
use crate::store::{LocalStore, PersistedState};
use crate::sync::FamilySync;

/// How a mutation reaches storage
#[derive(Debug, Clone)]
enum SyncStrategy {
    /// Local persistence only
    LocalOnly,
    /// Backend first, local persistence regardless of the outcome
    RemoteWithFallback(FamilyContext),
}

/// A mutation as sent to the backend
#[derive(Debug, Clone, Copy)]
enum Mutation<'a> {
    Add(&'a NewEntry),
    Update(EntryId, &'a EntryPatch),
    Delete(EntryId),
}

impl Mutation<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Self::Add(_) => "add",
            Self::Update(..) => "update",
            Self::Delete(_) => "delete",
        }
    }
}

/// What the remote stage produced
#[derive(Debug)]
enum RemoteOutcome {
    /// No remote applies
    Skipped,
    /// The backend accepted the mutation, returning its copy of the entry if any
    Confirmed(Option<InventoryEntry>),
    /// The backend call failed
    Failed,
}

impl RemoteOutcome {
    fn status(&self) -> SyncStatus {
        match self {
            Self::Skipped | Self::Confirmed(_) => SyncStatus::Synced,
            Self::Failed => SyncStatus::Error,
        }
    }

    fn into_entry(self) -> Option<InventoryEntry> {
        match self {
            Self::Confirmed(entry) => entry,
            Self::Skipped | Self::Failed => None,
        }
    }
}

/// Local-first inventory with optional family sync
///
/// Construct one with [`InventoryStore::open`] at application start and share
/// it; all methods take `&self`.
///
/// Two calls racing on the same entry are not serialized: the second may
/// observe state from before the first call's network round-trip.
pub struct InventoryStore {
    config: Config,
    storage: Arc<LocalStore>,
    state: Arc<RwLock<PersistedState>>,
    sync: FamilySync,
}

impl std::fmt::Debug for InventoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("InventoryStore")
            .field("storage", &self.storage.path())
            .field("entries", &state.entries.len())
            .field("family", &state.family)
            .field("sync_status", &state.sync_status)
            .finish()
    }
}

impl InventoryStore {
    /// Open the store, rehydrating persisted state
    ///
    /// If the device was part of a family and the backend is configured, the
    /// family inventory sync starts immediately.
    pub async fn open(config: Config, backend: Arc<dyn FamilyBackend>) -> Result<Self> {
        let storage = Arc::new(LocalStore::new(&config)?);
        let mut persisted = storage.load()?;
        if let Some(family) = persisted.family.as_mut() {
            family.sync_active = false;
        }

        let sync_interval = Duration::from_secs(config.sync_interval_secs.max(1));
        let store = Self {
            config,
            storage,
            state: Arc::new(RwLock::new(persisted)),
            sync: FamilySync::new(backend, sync_interval),
        };

        if let Some(family) = store.family() {
            store.start_family_sync(&family.family_id);
        }

        info!(
            entries = store.state.read().entries.len(),
            family = ?store.family().map(|f| f.family_id),
            "Inventory store opened"
        );
        Ok(store)
    }

    /// Configuration the store was opened with
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Snapshot of every entry
    pub fn entries(&self) -> Vec<InventoryEntry> {
        self.state.read().entries.clone()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Whether the inventory is empty
    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Look up an entry by id
    pub fn get_by_id(&self, id: EntryId) -> Option<InventoryEntry> {
        self.state.read().entries.iter().find(|e| e.id == id).cloned()
    }

    /// Distinct storage locations, in first-seen order
    pub fn unique_locations(&self) -> Vec<String> {
        self.unique_values(|e| e.location.as_str())
    }

    /// Distinct manufacturers, in first-seen order
    pub fn unique_companies(&self) -> Vec<String> {
        self.unique_values(|e| e.company.as_str())
    }

    fn unique_values(&self, field: impl Fn(&InventoryEntry) -> &str) -> Vec<String> {
        let state = self.state.read();
        let mut seen = HashSet::new();
        state
            .entries
            .iter()
            .map(field)
            .filter(|value| seen.insert(*value))
            .map(str::to_string)
            .collect()
    }

    /// The current family context
    pub fn family(&self) -> Option<FamilyContext> {
        self.state.read().family.clone()
    }

    /// Status of the last mutation
    pub fn sync_status(&self) -> SyncStatus {
        self.state.read().sync_status
    }

    /// Time of the last mutation
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_modified
    }

    /// Whether the family inventory subscription is running
    pub fn is_syncing(&self) -> bool {
        self.sync.is_syncing()
    }

    /// Snapshot of the inventory for backup or sharing
    pub fn export_data(&self) -> InventoryExport {
        let state = self.state.read();
        InventoryExport {
            version: EXPORT_VERSION,
            exported_at: Utc::now(),
            family_id: state.family.as_ref().map(|f| f.family_id.clone()),
            entries: state.entries.clone(),
        }
    }

    fn find_duplicate(&self, entry: &NewEntry) -> Option<InventoryEntry> {
        let key = entry.key();
        self.state
            .read()
            .entries
            .iter()
            .find(|e| e.key() == key)
            .cloned()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add an entry
    ///
    /// If an entry with the same (name, potency, company) exists, nothing is
    /// changed and [`AddOutcome::Duplicate`] carries the existing entry.
    pub async fn add(&self, entry: NewEntry) -> Result<AddOutcome> {
        entry.validate()?;

        if let Some(existing) = self.find_duplicate(&entry) {
            info!(
                id = existing.id,
                name = %entry.name,
                potency = %entry.potency,
                company = %entry.company,
                "Duplicate entry rejected"
            );
            return Ok(AddOutcome::Duplicate(existing));
        }

        let remote = self.push_remote(Mutation::Add(&entry)).await;
        let status = remote.status();

        let added = self.commit(status, |state| {
            let stored = remote.into_entry().unwrap_or_else(|| {
                let mut local = InventoryEntry::from_new(next_id(&state.entries), &entry);
                local.updated_by = state.family.as_ref().map(|f| f.member_name.clone());
                local
            });
            // The subscription may already have delivered the server copy.
            match state.entries.iter_mut().find(|e| e.id == stored.id) {
                Some(slot) => *slot = stored.clone(),
                None => state.entries.push(stored.clone()),
            }
            stored
        });

        debug!(id = added.id, status = %status, "Entry added");
        Ok(AddOutcome::Added(added))
    }

    /// Update an entry
    ///
    /// Returns [`UpdateOutcome::NotFound`] without touching anything when the id
    /// is unknown.
    pub async fn update(&self, id: EntryId, patch: EntryPatch) -> Result<UpdateOutcome> {
        patch.validate()?;

        let Some(current) = self.get_by_id(id) else {
            debug!(id, "Update of unknown entry ignored");
            return Ok(UpdateOutcome::NotFound);
        };
        if patch.is_empty() {
            return Ok(UpdateOutcome::Updated(current));
        }

        let remote = self.push_remote(Mutation::Update(id, &patch)).await;
        let status = remote.status();

        let updated = self.commit(status, |state| {
            let slot = state.entries.iter_mut().find(|e| e.id == id)?;
            match remote.into_entry() {
                Some(server_copy) => *slot = server_copy,
                None => {
                    patch.apply_to(slot);
                    if let Some(family) = &state.family {
                        slot.updated_by = Some(family.member_name.clone());
                    }
                }
            }
            Some(slot.clone())
        });

        Ok(updated.map_or(UpdateOutcome::NotFound, UpdateOutcome::Updated))
    }

    /// Delete an entry
    ///
    /// Returns the removed entry, or `None` (leaving everything unchanged) when
    /// the id is unknown.
    pub async fn delete(&self, id: EntryId) -> Option<InventoryEntry> {
        if self.get_by_id(id).is_none() {
            debug!(id, "Delete of unknown entry ignored");
            return None;
        }

        let remote = self.push_remote(Mutation::Delete(id)).await;
        let status = remote.status();

        self.commit(status, |state| {
            let position = state.entries.iter().position(|e| e.id == id)?;
            Some(state.entries.remove(position))
        })
    }

    /// Replace the whole inventory with a snapshot pushed by the family backend
    pub fn apply_remote_snapshot(&self, entries: Vec<InventoryEntry>) {
        replace_entries(&self.state, &self.storage, entries);
    }

    /// Pull the family inventory now instead of waiting for the next refresh
    ///
    /// Returns the number of entries received. On error the local list is
    /// left as it was.
    pub async fn refresh_from_family(&self) -> Result<usize> {
        let family = self.family().ok_or(Error::NotInFamily)?;
        let entries = self.sync.fetch_inventory(&family.family_id).await?;
        let count = entries.len();
        self.apply_remote_snapshot(entries);
        Ok(count)
    }

    fn strategy(&self) -> SyncStrategy {
        match self.family() {
            Some(family) if self.sync.is_configured() => SyncStrategy::RemoteWithFallback(family),
            Some(family) => {
                warn!(
                    family_id = %family.family_id,
                    "Family active but cloud sync is not configured; keeping change local"
                );
                SyncStrategy::LocalOnly
            }
            None => SyncStrategy::LocalOnly,
        }
    }

    /// Run the remote stage of a mutation according to the current strategy
    async fn push_remote(&self, mutation: Mutation<'_>) -> RemoteOutcome {
        let family = match self.strategy() {
            SyncStrategy::LocalOnly => return RemoteOutcome::Skipped,
            SyncStrategy::RemoteWithFallback(family) => family,
        };
        let family_id = family.family_id.as_str();
        let updated_by = family.member_name.as_str();

        let result = match mutation {
            Mutation::Add(entry) => self
                .sync
                .add_medicine(family_id, entry, updated_by)
                .await
                .map(Some),
            Mutation::Update(id, patch) => self
                .sync
                .update_medicine(family_id, id, patch, updated_by)
                .await
                .map(Some),
            Mutation::Delete(id) => self
                .sync
                .delete_medicine(family_id, id, updated_by)
                .await
                .map(|()| None),
        };

        match result {
            Ok(confirmed) => RemoteOutcome::Confirmed(confirmed),
            Err(e) => {
                warn!(
                    family_id,
                    mutation = mutation.kind(),
                    error = %e,
                    "Family sync failed, keeping change locally"
                );
                RemoteOutcome::Failed
            }
        }
    }

    /// Apply a mutation to the in-memory state, then persist it
    fn commit<R>(&self, status: SyncStatus, mutate: impl FnOnce(&mut PersistedState) -> R) -> R {
        let mut state = self.state.write();
        let result = mutate(&mut state);
        state.last_modified = Some(Utc::now());
        state.sync_status = status;
        persist(&self.storage, &mut state);
        result
    }

    // =========================================================================
    // Family lifecycle
    // =========================================================================

    /// Create a family and share the current inventory with it
    ///
    /// Each local entry is uploaded with its own call; entries that fail to
    /// upload are logged and skipped. Any previously joined family is left
    /// first.
    pub async fn create_family(&self, family_name: &str, member_name: &str) -> Result<FamilyContext> {
        let member_name = self.member_name_or_default(member_name);
        let membership = self.sync.create_family(family_name, member_name).await?;
        self.leave_family().await;

        let context = FamilyContext::from(membership);
        info!(family_id = %context.family_id, "Family created");

        let local = self.entries();
        let mut uploaded = 0usize;
        for entry in &local {
            match self
                .sync
                .add_medicine(&context.family_id, &NewEntry::from(entry), &context.member_name)
                .await
            {
                Ok(_) => uploaded += 1,
                Err(e) => warn!(id = entry.id, error = %e, "Failed to share entry with family"),
            }
        }
        info!(uploaded, total = local.len(), "Local inventory shared with family");

        Ok(self.enter_family(context))
    }

    /// Join an existing family
    ///
    /// The family's inventory replaces the local list as soon as the first
    /// snapshot arrives.
    pub async fn join_family(&self, family_id: &str, member_name: &str) -> Result<FamilyContext> {
        let family_id = family_id.trim().to_uppercase();
        let member_name = self.member_name_or_default(member_name);
        let membership = self.sync.join_family(&family_id, member_name).await?;
        self.leave_family().await;

        let context = FamilyContext::from(membership);
        info!(family_id = %context.family_id, member = %context.member_name, "Joined family");
        Ok(self.enter_family(context))
    }

    /// Leave the current family
    ///
    /// Stops the subscription and clears the family context. The local list is
    /// kept. Does nothing when no family is active.
    pub async fn leave_family(&self) {
        let Some(family) = self.family() else {
            return;
        };

        self.sync.stop_inventory_sync();

        if self.sync.is_configured() {
            if let Err(e) = self
                .sync
                .leave_family(&family.family_id, &family.member_id)
                .await
            {
                warn!(family_id = %family.family_id, error = %e, "Failed to leave family remotely");
            }
        }

        let mut state = self.state.write();
        state.family = None;
        persist(&self.storage, &mut state);
        info!(family_id = %family.family_id, "Left family");
    }

    fn member_name_or_default<'a>(&'a self, member_name: &'a str) -> &'a str {
        if member_name.trim().is_empty() {
            &self.config.member_name
        } else {
            member_name
        }
    }

    fn enter_family(&self, context: FamilyContext) -> FamilyContext {
        {
            let mut state = self.state.write();
            state.family = Some(context.clone());
            persist(&self.storage, &mut state);
        }
        self.start_family_sync(&context.family_id);
        self.family().unwrap_or(context)
    }

    fn start_family_sync(&self, family_id: &str) {
        let state = self.state.clone();
        let storage = self.storage.clone();
        let subscribed_family = family_id.to_string();

        let started = self.sync.start_inventory_sync(family_id, move |entries| {
            let still_member = state
                .read()
                .family
                .as_ref()
                .is_some_and(|f| f.family_id == subscribed_family);
            if still_member {
                replace_entries(&state, &storage, entries);
            }
        });

        if let Some(family) = self.state.write().family.as_mut() {
            family.sync_active = started;
        }
    }

    /// Stop the family subscription
    pub fn shutdown(&self) {
        self.sync.stop_inventory_sync();
        if let Some(family) = self.state.write().family.as_mut() {
            family.sync_active = false;
        }
        debug!("Inventory store shut down");
    }
}

/// Next locally assigned id: one more than the current maximum, or 1
fn next_id(entries: &[InventoryEntry]) -> EntryId {
    entries.iter().map(|e| e.id).max().map_or(1, |max| max + 1)
}

fn persist(storage: &LocalStore, state: &mut PersistedState) {
    if let Err(e) = storage.save(state) {
        error!(error = %e, "Failed to persist inventory");
        state.sync_status = SyncStatus::Unsaved;
    }
}

fn replace_entries(state: &RwLock<PersistedState>, storage: &LocalStore, entries: Vec<InventoryEntry>) {
    let mut state = state.write();
    debug!(entries = entries.len(), "Replacing inventory with family snapshot");
    state.entries = entries;
    state.sync_status = SyncStatus::Synced;
    state.last_modified = Some(Utc::now());
    persist(storage, &mut state);
}
