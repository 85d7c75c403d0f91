//! Basic usage example for remedy-sync.
//!
//! Works entirely offline: no server URL is configured, so every change stays
//! on this device.
//!
//! Run with: cargo run --example basic_usage

use std::sync::Arc;

use remedy_sync::{AddOutcome, Config, EntryPatch, HttpBackend, InventoryStore, NewEntry};

#[tokio::main]
async fn main() -> remedy_sync::Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== remedy-sync Basic Usage Example ===\n");

    let storage_path = std::env::temp_dir().join("remedy-sync-example");
    println!("Storage path: {}", storage_path.display());

    let config = Config::new(&storage_path);
    let backend = Arc::new(HttpBackend::from_config(&config));
    let store = InventoryStore::open(config, backend).await?;
    println!("Loaded {} entries\n", store.len());

    // -------------------------------------------------------------------------
    // Adding, with duplicate detection
    // -------------------------------------------------------------------------
    let arnica = NewEntry::new("Arnica Montana", "30C", "SBL", "Shelf A", 2).with_bottle_size("10g");
    for attempt in 1..=2 {
        match store.add(arnica.clone()).await? {
            AddOutcome::Added(entry) => println!("Attempt {attempt}: added #{}", entry.id),
            AddOutcome::Duplicate(entry) => {
                println!("Attempt {attempt}: already stocked as #{}", entry.id)
            }
        }
    }

    store
        .add(NewEntry::new("Nux Vomica", "200C", "Schwabe", "Drawer 1", 1))
        .await?;

    // -------------------------------------------------------------------------
    // Updating and querying
    // -------------------------------------------------------------------------
    if let Some(first) = store.entries().first() {
        store.update(first.id, EntryPatch::quantity(5)).await?;
    }

    println!("\nInventory:");
    for entry in store.entries() {
        println!(
            "  #{} {} {} ({}) x{} @ {}",
            entry.id, entry.name, entry.potency, entry.company, entry.quantity, entry.location
        );
    }
    println!("Locations: {:?}", store.unique_locations());
    println!("Companies: {:?}", store.unique_companies());
    println!("Status: {}", store.sync_status());

    // -------------------------------------------------------------------------
    // Export
    // -------------------------------------------------------------------------
    let export = store.export_data();
    let json = serde_json::to_string_pretty(&export)?;
    println!("\nExport ({} bytes, version {})", json.len(), export.version);

    store.shutdown();
    println!("\n=== Example complete ===");
    Ok(())
}
