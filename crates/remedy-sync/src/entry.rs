//! Inventory entries
//!
//! An [`InventoryEntry`] is one bottle/stock record. Entries are identified by
//! an integer id that is either assigned locally (`max + 1`) or by the family
//! backend when the entry was created remotely.
//!
//! The (name, potency, company) triple is the [`DuplicateKey`]: the store
//! never holds two entries with the same triple.
//!
//! All types here serialize with camelCase field names, which is also the
//! JSON shape exchanged with the family backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier of an inventory entry
pub type EntryId = u64;

/// Current version of the export format
pub const EXPORT_VERSION: u32 = 1;

/// One bottle/stock record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    /// Entry id
    pub id: EntryId,
    /// Remedy name, e.g. "Arnica Montana"
    pub name: String,
    /// Potency, e.g. "30C"
    pub potency: String,
    /// Manufacturer
    pub company: String,
    /// Storage location, e.g. "Shelf A"
    pub location: String,
    /// Optional finer-grained location inside `location`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_location: Option<String>,
    /// Number of bottles
    pub quantity: u32,
    /// Optional bottle size, e.g. "30ml"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottle_size: Option<String>,
    /// Display name of the family member who last changed the entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    /// When the entry was last changed
    pub updated_at: DateTime<Utc>,
}

impl InventoryEntry {
    /// Build an entry from its input fields and an assigned id
    pub fn from_new(id: EntryId, new: &NewEntry) -> Self {
        Self {
            id,
            name: new.name.clone(),
            potency: new.potency.clone(),
            company: new.company.clone(),
            location: new.location.clone(),
            sub_location: new.sub_location.clone(),
            quantity: new.quantity,
            bottle_size: new.bottle_size.clone(),
            updated_by: None,
            updated_at: Utc::now(),
        }
    }

    /// The duplicate-detection key of this entry
    pub fn key(&self) -> DuplicateKey<'_> {
        DuplicateKey {
            name: &self.name,
            potency: &self.potency,
            company: &self.company,
        }
    }
}

/// The (name, potency, company) triple used to detect duplicate entries.
///
/// Comparison is exact: "Arnica" and "arnica" are different remedies as far
/// as the store is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DuplicateKey<'a> {
    /// Remedy name
    pub name: &'a str,
    /// Potency
    pub potency: &'a str,
    /// Manufacturer
    pub company: &'a str,
}

/// Fields of an entry that is about to be added
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    /// Remedy name
    pub name: String,
    /// Potency
    pub potency: String,
    /// Manufacturer
    pub company: String,
    /// Storage location
    pub location: String,
    /// Optional sub-location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_location: Option<String>,
    /// Number of bottles
    pub quantity: u32,
    /// Optional bottle size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottle_size: Option<String>,
}

impl NewEntry {
    /// Create a new entry with the required fields
    pub fn new(
        name: impl Into<String>,
        potency: impl Into<String>,
        company: impl Into<String>,
        location: impl Into<String>,
        quantity: u32,
    ) -> Self {
        Self {
            name: name.into(),
            potency: potency.into(),
            company: company.into(),
            location: location.into(),
            sub_location: None,
            quantity,
            bottle_size: None,
        }
    }

    /// Set the sub-location
    #[must_use]
    pub fn with_sub_location(mut self, sub_location: impl Into<String>) -> Self {
        self.sub_location = Some(sub_location.into());
        self
    }

    /// Set the bottle size
    #[must_use]
    pub fn with_bottle_size(mut self, bottle_size: impl Into<String>) -> Self {
        self.bottle_size = Some(bottle_size.into());
        self
    }

    /// The duplicate-detection key of this entry
    pub fn key(&self) -> DuplicateKey<'_> {
        DuplicateKey {
            name: &self.name,
            potency: &self.potency,
            company: &self.company,
        }
    }

    /// Check that every required text field is present
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("name", &self.name),
            ("potency", &self.potency),
            ("company", &self.company),
            ("location", &self.location),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::validation(format!("{field} is required")));
            }
        }
        Ok(())
    }
}

impl From<&InventoryEntry> for NewEntry {
    fn from(entry: &InventoryEntry) -> Self {
        Self {
            name: entry.name.clone(),
            potency: entry.potency.clone(),
            company: entry.company.clone(),
            location: entry.location.clone(),
            sub_location: entry.sub_location.clone(),
            quantity: entry.quantity,
            bottle_size: entry.bottle_size.clone(),
        }
    }
}

/// A partial update of an entry; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPatch {
    /// New name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New potency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub potency: Option<String>,
    /// New manufacturer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// New location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// New sub-location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_location: Option<String>,
    /// New quantity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    /// New bottle size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottle_size: Option<String>,
}

impl EntryPatch {
    /// A patch that only changes the quantity
    pub fn quantity(quantity: u32) -> Self {
        Self {
            quantity: Some(quantity),
            ..Self::default()
        }
    }

    /// A patch that only moves the entry
    pub fn location(location: impl Into<String>) -> Self {
        Self {
            location: Some(location.into()),
            ..Self::default()
        }
    }

    /// Whether the patch changes nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check that no required text field is being blanked out
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("name", &self.name),
            ("potency", &self.potency),
            ("company", &self.company),
            ("location", &self.location),
        ];
        for (field, value) in required {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(Error::validation(format!("{field} cannot be blank")));
            }
        }
        Ok(())
    }

    /// Merge the present fields into `entry` and bump its timestamp
    pub fn apply_to(&self, entry: &mut InventoryEntry) {
        if let Some(name) = &self.name {
            entry.name.clone_from(name);
        }
        if let Some(potency) = &self.potency {
            entry.potency.clone_from(potency);
        }
        if let Some(company) = &self.company {
            entry.company.clone_from(company);
        }
        if let Some(location) = &self.location {
            entry.location.clone_from(location);
        }
        if let Some(sub_location) = &self.sub_location {
            entry.sub_location = Some(sub_location.clone());
        }
        if let Some(quantity) = self.quantity {
            entry.quantity = quantity;
        }
        if let Some(bottle_size) = &self.bottle_size {
            entry.bottle_size = Some(bottle_size.clone());
        }
        entry.updated_at = Utc::now();
    }
}

/// Snapshot produced by [`InventoryStore::export_data`](crate::InventoryStore::export_data)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryExport {
    /// Export format version
    pub version: u32,
    /// When the snapshot was taken
    pub exported_at: DateTime<Utc>,
    /// Family the inventory belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_id: Option<String>,
    /// Every entry, unmodified
    pub entries: Vec<InventoryEntry>,
}

/// Result of [`InventoryStore::add`](crate::InventoryStore::add)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// The entry was stored
    Added(InventoryEntry),
    /// An entry with the same (name, potency, company) already exists; nothing changed
    Duplicate(InventoryEntry),
}

impl AddOutcome {
    /// The stored or conflicting entry
    pub fn entry(&self) -> &InventoryEntry {
        match self {
            Self::Added(entry) | Self::Duplicate(entry) => entry,
        }
    }

    /// Whether the entry was rejected as a duplicate
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }
}

/// Result of [`InventoryStore::update`](crate::InventoryStore::update)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The entry after the update
    Updated(InventoryEntry),
    /// No entry has the requested id; nothing changed
    NotFound,
}
