//! Integration tests for the inventory store
//!
//! These tests drive [`InventoryStore`] against an in-memory [`FamilyBackend`]
//! that can be switched offline, so both sync strategies and the fallback
//! path are exercised without a network.
//!
//! Run with: `cargo test -p remedy-sync --test inventory_integration`

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::time::timeout;

use remedy_sync::{
    AddOutcome, Config, EntryId, EntryPatch, Error, FamilyBackend, FamilyMembership,
    InventoryEntry, InventoryStore, NewEntry, Result, SyncStatus, UpdateOutcome,
};

/// In-memory family backend
struct MockBackend {
    configured: bool,
    offline: AtomicBool,
    next_id: AtomicU64,
    medicines: Mutex<Vec<InventoryEntry>>,
    calls: Mutex<Vec<String>>,
}

impl MockBackend {
    fn with_configured(configured: bool) -> Arc<Self> {
        Arc::new(Self {
            configured,
            offline: AtomicBool::new(false),
            next_id: AtomicU64::new(100),
            medicines: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn new() -> Arc<Self> {
        Self::with_configured(true)
    }

    fn unconfigured() -> Arc<Self> {
        Self::with_configured(false)
    }

    fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn record(&self, call: impl Into<String>) -> Result<()> {
        self.calls.lock().push(call.into());
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::remote("connection refused"));
        }
        Ok(())
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn mutation_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !c.starts_with("list"))
            .collect()
    }

    /// Simulate another family member adding an entry
    fn insert_remote(&self, entry: &NewEntry) -> InventoryEntry {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut stored = InventoryEntry::from_new(id, entry);
        stored.updated_by = Some("Someone else".to_string());
        self.medicines.lock().push(stored.clone());
        stored
    }

    fn medicines(&self) -> Vec<InventoryEntry> {
        self.medicines.lock().clone()
    }
}

#[async_trait]
impl FamilyBackend for MockBackend {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn create_family(&self, family_name: &str, member_name: &str) -> Result<FamilyMembership> {
        self.record(format!("create {family_name}"))?;
        Ok(FamilyMembership {
            family_id: "FAMILY01".to_string(),
            family_name: Some(family_name.to_string()),
            member_id: "m-1".to_string(),
            member_name: member_name.to_string(),
        })
    }

    async fn join_family(&self, family_id: &str, member_name: &str) -> Result<FamilyMembership> {
        self.record(format!("join {family_id}"))?;
        Ok(FamilyMembership {
            family_id: family_id.to_string(),
            family_name: None,
            member_id: "m-2".to_string(),
            member_name: member_name.to_string(),
        })
    }

    async fn leave_family(&self, family_id: &str, member_id: &str) -> Result<()> {
        self.record(format!("leave {family_id} {member_id}"))
    }

    async fn list_medicines(&self, family_id: &str) -> Result<Vec<InventoryEntry>> {
        self.record(format!("list {family_id}"))?;
        Ok(self.medicines())
    }

    async fn add_medicine(
        &self,
        family_id: &str,
        entry: &NewEntry,
        updated_by: &str,
    ) -> Result<InventoryEntry> {
        self.record(format!("add {family_id} {}", entry.name))?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut stored = InventoryEntry::from_new(id, entry);
        stored.updated_by = Some(updated_by.to_string());
        self.medicines.lock().push(stored.clone());
        Ok(stored)
    }

    async fn update_medicine(
        &self,
        family_id: &str,
        id: EntryId,
        patch: &EntryPatch,
        updated_by: &str,
    ) -> Result<InventoryEntry> {
        self.record(format!("update {family_id} {id}"))?;
        let mut medicines = self.medicines.lock();
        let entry = medicines
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::remote("server returned 404 Not Found"))?;
        patch.apply_to(entry);
        entry.updated_by = Some(updated_by.to_string());
        Ok(entry.clone())
    }

    async fn delete_medicine(&self, family_id: &str, id: EntryId, _updated_by: &str) -> Result<()> {
        self.record(format!("delete {family_id} {id}"))?;
        self.medicines.lock().retain(|e| e.id != id);
        Ok(())
    }
}

fn arnica(quantity: u32) -> NewEntry {
    NewEntry::new("Arnica Montana", "30C", "SBL", "Shelf A", quantity)
}

fn belladonna() -> NewEntry {
    NewEntry::new("Belladonna", "200C", "Schwabe", "Shelf B", 1).with_bottle_size("10g")
}

async fn open_store(dir: &TempDir, backend: Arc<MockBackend>) -> InventoryStore {
    let config = Config::new(dir.path())
        .with_member_name("Asha")
        .with_sync_interval(1);
    InventoryStore::open(config, backend).await.unwrap()
}

/// Wait until `condition` holds, failing the test after a few seconds
async fn wait_until(condition: impl Fn() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

// =============================================================================
// Local-only path
// =============================================================================

#[tokio::test]
async fn test_duplicate_add_keeps_original() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::new();
    let store = open_store(&dir, backend.clone()).await;

    let first = store.add(arnica(2)).await.unwrap();
    let AddOutcome::Added(added) = first else {
        panic!("expected entry to be added");
    };
    assert_eq!(added.id, 1);
    assert_eq!(store.len(), 1);

    let second = store.add(arnica(5)).await.unwrap();
    assert_eq!(second, AddOutcome::Duplicate(added.clone()));
    assert_eq!(store.len(), 1);
    assert_eq!(store.get_by_id(1).unwrap().quantity, 2);

    // No family, so the backend is never touched
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_local_add_assigns_next_id_and_persists() {
    let dir = TempDir::new().unwrap();
    {
        let store = open_store(&dir, MockBackend::new()).await;
        store.add(arnica(2)).await.unwrap();
        store.add(belladonna()).await.unwrap();
        store.delete(1).await.unwrap();

        let added = store
            .add(NewEntry::new("Nux Vomica", "30C", "SBL", "Shelf A", 4))
            .await
            .unwrap();
        assert_eq!(added.entry().id, 3);
        assert_eq!(store.sync_status(), SyncStatus::Synced);
    }

    let reopened = open_store(&dir, MockBackend::new()).await;
    let ids: Vec<EntryId> = reopened.entries().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![2, 3]);
    assert_eq!(reopened.get_by_id(2).unwrap().bottle_size.as_deref(), Some("10g"));
    assert!(reopened.last_modified().is_some());
}

#[tokio::test]
async fn test_delete_unknown_id_is_noop() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, MockBackend::new()).await;
    store.add(arnica(2)).await.unwrap();
    let before = store.entries();
    let modified = store.last_modified();

    assert!(store.delete(99).await.is_none());
    assert_eq!(store.entries(), before);
    assert_eq!(store.last_modified(), modified);
}

#[tokio::test]
async fn test_update_merges_fields() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, MockBackend::new()).await;
    store.add(arnica(2)).await.unwrap();

    let patch = EntryPatch {
        quantity: Some(7),
        sub_location: Some("Drawer 3".to_string()),
        ..EntryPatch::default()
    };
    let UpdateOutcome::Updated(updated) = store.update(1, patch).await.unwrap() else {
        panic!("expected entry to be updated");
    };

    assert_eq!(updated.quantity, 7);
    assert_eq!(updated.sub_location.as_deref(), Some("Drawer 3"));
    assert_eq!(updated.location, "Shelf A");
    assert_eq!(store.get_by_id(1), Some(updated));
}

#[tokio::test]
async fn test_export_matches_memory() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, MockBackend::new()).await;
    store.add(arnica(2)).await.unwrap();
    store.add(belladonna()).await.unwrap();

    let export = store.export_data();
    assert_eq!(export.entries, store.entries());
    assert!(export.exported_at >= store.last_modified().unwrap());
    assert!(export.family_id.is_none());
}

#[tokio::test]
async fn test_unique_values_are_distinct() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, MockBackend::new()).await;
    store.add(arnica(2)).await.unwrap();
    store.add(NewEntry::new("Arnica Montana", "200C", "SBL", "Shelf A", 1)).await.unwrap();
    store.add(belladonna()).await.unwrap();
    store.add(NewEntry::new("Bryonia", "6C", "SBL", "Shelf B", 3)).await.unwrap();

    assert_eq!(store.unique_locations(), vec!["Shelf A", "Shelf B"]);
    assert_eq!(store.unique_companies(), vec!["SBL", "Schwabe"]);
}

// =============================================================================
// Family path
// =============================================================================

#[tokio::test]
async fn test_family_add_uses_server_id() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::new();
    let store = open_store(&dir, backend.clone()).await;
    store.join_family("family01", "Asha").await.unwrap();
    assert_eq!(store.family().unwrap().family_id, "FAMILY01");

    let added = store.add(arnica(2)).await.unwrap();
    assert_eq!(added.entry().id, 100);
    assert_eq!(added.entry().updated_by.as_deref(), Some("Asha"));
    assert_eq!(store.sync_status(), SyncStatus::Synced);
    assert!(backend
        .mutation_calls()
        .contains(&"add FAMILY01 Arnica Montana".to_string()));

    store.shutdown();
}

#[tokio::test]
async fn test_remote_failure_falls_back_to_local() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::new();
    let store = open_store(&dir, backend.clone()).await;
    store.join_family("FAMILY01", "Asha").await.unwrap();
    wait_until(|| backend.calls().iter().any(|c| c.starts_with("list"))).await;
    backend.set_offline(true);

    let added = store.add(arnica(2)).await.unwrap();
    assert_eq!(added.entry().id, 1);
    assert_eq!(store.sync_status(), SyncStatus::Error);

    let updated = store.update(1, EntryPatch::quantity(5)).await.unwrap();
    assert!(matches!(updated, UpdateOutcome::Updated(ref e) if e.quantity == 5));
    assert_eq!(store.sync_status(), SyncStatus::Error);

    assert!(store.delete(1).await.is_some());
    assert!(store.is_empty());
    assert!(backend.medicines().is_empty());

    backend.set_offline(false);
    store.add(belladonna()).await.unwrap();
    assert_eq!(store.sync_status(), SyncStatus::Synced);

    store.shutdown();
}

#[tokio::test]
async fn test_unknown_update_skips_backend() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::new();
    let store = open_store(&dir, backend.clone()).await;
    store.join_family("FAMILY01", "Asha").await.unwrap();

    let outcome = store.update(7, EntryPatch::quantity(1)).await.unwrap();
    assert_eq!(outcome, UpdateOutcome::NotFound);
    assert!(store.delete(7).await.is_none());
    assert_eq!(backend.mutation_calls(), vec!["join FAMILY01".to_string()]);

    store.shutdown();
}

#[tokio::test]
async fn test_join_replaces_local_list_with_family_inventory() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::new();
    backend.insert_remote(&belladonna());

    let store = open_store(&dir, backend.clone()).await;
    store.add(arnica(2)).await.unwrap();

    let family = store.join_family("FAMILY01", "Asha").await.unwrap();
    assert!(family.sync_active);
    assert!(store.is_syncing());

    wait_until(|| store.entries() == backend.medicines()).await;
    assert!(store.entries().iter().all(|e| e.name != "Arnica Montana"));

    // Another member adds an entry; the next refresh delivers it
    backend.insert_remote(&NewEntry::new("Bryonia", "6C", "SBL", "Shelf C", 1));
    wait_until(|| store.len() == 2).await;
    assert_eq!(store.entries(), backend.medicines());

    store.shutdown();
    assert!(!store.is_syncing());
}

#[tokio::test]
async fn test_remote_snapshot_replaces_wholesale() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, MockBackend::new()).await;
    store.add(arnica(2)).await.unwrap();
    store.add(belladonna()).await.unwrap();

    let pushed = vec![InventoryEntry::from_new(
        40,
        &NewEntry::new("Rhus Tox", "30C", "Boiron", "Box", 1),
    )];
    store.apply_remote_snapshot(pushed.clone());

    assert_eq!(store.entries(), pushed);
    assert_eq!(store.sync_status(), SyncStatus::Synced);
}

#[tokio::test]
async fn test_create_family_shares_local_inventory() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::new();
    let store = open_store(&dir, backend.clone()).await;
    store.add(arnica(2)).await.unwrap();
    store.add(belladonna()).await.unwrap();

    let family = store.create_family("Sharma", "Asha").await.unwrap();
    assert_eq!(family.family_id, "FAMILY01");
    assert_eq!(family.family_name.as_deref(), Some("Sharma"));

    let shared: Vec<String> = backend.medicines().into_iter().map(|e| e.name).collect();
    assert_eq!(shared, vec!["Arnica Montana", "Belladonna"]);

    wait_until(|| store.entries() == backend.medicines()).await;
    assert_eq!(store.export_data().family_id.as_deref(), Some("FAMILY01"));

    store.shutdown();
}

#[tokio::test]
async fn test_leave_family_keeps_list_and_goes_local() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::new();
    let store = open_store(&dir, backend.clone()).await;
    store.join_family("FAMILY01", "Asha").await.unwrap();
    store.add(arnica(2)).await.unwrap();

    store.leave_family().await;
    assert!(store.family().is_none());
    assert!(!store.is_syncing());
    assert_eq!(store.len(), 1);
    assert!(backend.calls().contains(&"leave FAMILY01 m-2".to_string()));

    let calls_before = backend.mutation_calls().len();
    let added = store.add(belladonna()).await.unwrap();
    assert_eq!(added.entry().id, 101);
    assert_eq!(backend.mutation_calls().len(), calls_before);

    // Leaving twice is harmless
    store.leave_family().await;
}

#[tokio::test]
async fn test_reopen_resumes_family_sync() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::new();
    {
        let store = open_store(&dir, backend.clone()).await;
        store.join_family("FAMILY01", "Asha").await.unwrap();
        store.shutdown();
    }

    backend.insert_remote(&belladonna());
    let store = open_store(&dir, backend.clone()).await;
    assert_eq!(store.family().unwrap().member_name, "Asha");
    assert!(store.is_syncing());
    wait_until(|| store.len() == 1).await;

    store.shutdown();
}

#[tokio::test]
async fn test_unconfigured_backend_cannot_join() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::unconfigured();
    let store = open_store(&dir, backend.clone()).await;

    let result = store.join_family("FAMILY01", "Asha").await;
    assert!(matches!(result, Err(Error::Config(_))));
    assert!(store.family().is_none());
    assert!(backend.calls().is_empty());

    // The inventory itself still works
    assert!(!store.add(arnica(1)).await.unwrap().is_duplicate());
    assert!(store.last_modified().unwrap() <= Utc::now());
}

#[tokio::test]
async fn test_refresh_requires_family() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::new();
    let store = open_store(&dir, backend.clone()).await;

    let result = store.refresh_from_family().await;
    assert!(matches!(result, Err(Error::NotInFamily)));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn test_refresh_pulls_family_inventory() {
    let dir = TempDir::new().unwrap();
    let backend = MockBackend::new();
    let store = open_store(&dir, backend.clone()).await;
    store.join_family("FAMILY01", "Asha").await.unwrap();

    backend.insert_remote(&belladonna());
    backend.insert_remote(&arnica(3));
    assert_eq!(store.refresh_from_family().await.unwrap(), 2);
    assert_eq!(store.entries(), backend.medicines());

    // A failed refresh leaves the list alone
    backend.set_offline(true);
    assert!(matches!(store.refresh_from_family().await, Err(Error::Remote(_))));
    assert_eq!(store.len(), 2);

    store.shutdown();
}

#[tokio::test]
async fn test_blank_member_name_uses_config() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir, MockBackend::new()).await;

    let family = store.join_family(" family01 ", "  ").await.unwrap();
    assert_eq!(family.family_id, "FAMILY01");
    assert_eq!(family.member_name, "Asha");

    store.shutdown();
}
