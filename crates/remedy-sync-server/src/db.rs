//! Family inventory database

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::Rng;
use remedy_sync::{EntryId, EntryPatch, FamilyMember, InventoryEntry, NewEntry};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

/// Characters used in family share codes (no 0/O or 1/I lookalikes)
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of a family share code
const CODE_LEN: usize = 8;

const MEDICINE_COLUMNS: &str = "id, name, potency, company, location, sub_location, quantity, \
                                bottle_size, updated_by, updated_at";

/// A family as stored in the database
#[derive(Debug, Clone)]
pub struct FamilyRecord {
    /// Share code
    pub id: String,
    /// Display name
    pub name: String,
    /// When the family was created
    pub created_at: DateTime<Utc>,
}

/// Raw medicines row, before timestamp and id conversion
struct MedicineRow {
    id: i64,
    name: String,
    potency: String,
    company: String,
    location: String,
    sub_location: Option<String>,
    quantity: u32,
    bottle_size: Option<String>,
    updated_by: Option<String>,
    updated_at: String,
}

impl MedicineRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            potency: row.get(2)?,
            company: row.get(3)?,
            location: row.get(4)?,
            sub_location: row.get(5)?,
            quantity: row.get(6)?,
            bottle_size: row.get(7)?,
            updated_by: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_entry(self) -> Result<InventoryEntry> {
        Ok(InventoryEntry {
            id: EntryId::try_from(self.id).context("Negative medicine id")?,
            name: self.name,
            potency: self.potency,
            company: self.company,
            location: self.location,
            sub_location: self.sub_location,
            quantity: self.quantity,
            bottle_size: self.bottle_size,
            updated_by: self.updated_by,
            updated_at: parse_timestamp(&self.updated_at).context("Failed to parse updated_at")?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

fn sql_id(id: EntryId) -> Result<i64> {
    i64::try_from(id).context("Medicine id out of range")
}

fn family_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

fn member_id() -> String {
    format!("{:016x}", rand::random::<u64>())
}

/// SQLite database holding families, their members and their medicines
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open SQLite database")?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS families (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS family_members (
                id TEXT PRIMARY KEY,
                family_id TEXT NOT NULL REFERENCES families(id),
                name TEXT NOT NULL,
                joined_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS medicines (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                family_id TEXT NOT NULL REFERENCES families(id),
                name TEXT NOT NULL,
                potency TEXT NOT NULL,
                company TEXT NOT NULL,
                location TEXT NOT NULL,
                sub_location TEXT,
                quantity INTEGER NOT NULL,
                bottle_size TEXT,
                updated_by TEXT,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS medicines_family ON medicines (family_id);",
        )
        .context("Failed to create tables")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a family with a fresh share code
    pub fn create_family(&self, name: &str) -> Result<FamilyRecord> {
        let now = Utc::now();
        let conn = self.conn.lock();

        let id = loop {
            let candidate = family_code();
            let taken: bool = conn
                .query_row(
                    "SELECT EXISTS(SELECT 1 FROM families WHERE id = ?1)",
                    [&candidate],
                    |row| row.get(0),
                )
                .context("Failed to check family code")?;
            if !taken {
                break candidate;
            }
        };

        conn.execute(
            "INSERT INTO families (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![id, name, now.to_rfc3339()],
        )
        .context("Failed to insert family")?;

        debug!(family_id = %id, name, "Family created");

        Ok(FamilyRecord {
            id,
            name: name.to_string(),
            created_at: now,
        })
    }

    /// Look up a family
    pub fn get_family(&self, family_id: &str) -> Result<Option<FamilyRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, name, created_at FROM families WHERE id = ?1",
                [family_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()
            .context("Failed to query family")?;

        row.map(|(id, name, created_at)| {
            Ok(FamilyRecord {
                id,
                name,
                created_at: parse_timestamp(&created_at).context("Failed to parse created_at")?,
            })
        })
        .transpose()
    }

    /// Add a member to a family
    pub fn add_member(&self, family_id: &str, name: &str) -> Result<FamilyMember> {
        let member = FamilyMember {
            id: member_id(),
            name: name.to_string(),
            joined_at: Utc::now(),
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO family_members (id, family_id, name, joined_at) VALUES (?1, ?2, ?3, ?4)",
            params![member.id, family_id, member.name, member.joined_at.to_rfc3339()],
        )
        .context("Failed to insert member")?;

        debug!(family_id, member_id = %member.id, name, "Member added");
        Ok(member)
    }

    /// Remove a member from a family
    pub fn remove_member(&self, family_id: &str, member_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "DELETE FROM family_members WHERE family_id = ?1 AND id = ?2",
                [family_id, member_id],
            )
            .context("Failed to delete member")?;

        debug!(family_id, member_id, removed = rows > 0, "Member removal attempted");
        Ok(rows > 0)
    }

    /// All members of a family, oldest first
    pub fn list_members(&self, family_id: &str) -> Result<Vec<FamilyMember>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, joined_at FROM family_members
                 WHERE family_id = ?1 ORDER BY joined_at, id",
            )
            .context("Failed to prepare statement")?;

        let rows = stmt
            .query_map([family_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .context("Failed to query members")?;

        let mut members = Vec::new();
        for row in rows {
            let (id, name, joined_at) = row.context("Failed to read member row")?;
            members.push(FamilyMember {
                id,
                name,
                joined_at: parse_timestamp(&joined_at).context("Failed to parse joined_at")?,
            });
        }
        Ok(members)
    }

    /// The family's whole inventory, in id order
    pub fn list_medicines(&self, family_id: &str) -> Result<Vec<InventoryEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {MEDICINE_COLUMNS} FROM medicines WHERE family_id = ?1 ORDER BY id"
            ))
            .context("Failed to prepare statement")?;

        let rows = stmt
            .query_map([family_id], MedicineRow::from_row)
            .context("Failed to query medicines")?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.context("Failed to read medicine row")?.into_entry()?);
        }
        Ok(entries)
    }

    /// Get one medicine
    pub fn get_medicine(&self, family_id: &str, id: EntryId) -> Result<Option<InventoryEntry>> {
        let conn = self.conn.lock();
        Self::get_medicine_locked(&conn, family_id, sql_id(id)?)
    }

    fn get_medicine_locked(
        conn: &Connection,
        family_id: &str,
        id: i64,
    ) -> Result<Option<InventoryEntry>> {
        conn.query_row(
            &format!("SELECT {MEDICINE_COLUMNS} FROM medicines WHERE family_id = ?1 AND id = ?2"),
            params![family_id, id],
            MedicineRow::from_row,
        )
        .optional()
        .context("Failed to query medicine")?
        .map(MedicineRow::into_entry)
        .transpose()
    }

    /// Find an entry with the same (name, potency, company)
    pub fn find_duplicate(&self, family_id: &str, entry: &NewEntry) -> Result<Option<InventoryEntry>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {MEDICINE_COLUMNS} FROM medicines
                 WHERE family_id = ?1 AND name = ?2 AND potency = ?3 AND company = ?4"
            ),
            params![family_id, entry.name, entry.potency, entry.company],
            MedicineRow::from_row,
        )
        .optional()
        .context("Failed to query duplicate")?
        .map(MedicineRow::into_entry)
        .transpose()
    }

    /// Insert a medicine; the database assigns its id
    pub fn insert_medicine(
        &self,
        family_id: &str,
        entry: &NewEntry,
        updated_by: &str,
    ) -> Result<InventoryEntry> {
        let now = Utc::now();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO medicines
                (family_id, name, potency, company, location, sub_location, quantity,
                 bottle_size, updated_by, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                family_id,
                entry.name,
                entry.potency,
                entry.company,
                entry.location,
                entry.sub_location,
                entry.quantity,
                entry.bottle_size,
                updated_by,
                now.to_rfc3339(),
            ],
        )
        .context("Failed to insert medicine")?;

        let id = EntryId::try_from(conn.last_insert_rowid()).context("Negative medicine id")?;
        debug!(family_id, id, name = %entry.name, "Medicine added");

        let mut stored = InventoryEntry::from_new(id, entry);
        stored.updated_by = Some(updated_by.to_string());
        stored.updated_at = now;
        Ok(stored)
    }

    /// Apply a patch to a medicine
    ///
    /// Returns `None` if the family has no medicine with this id.
    pub fn update_medicine(
        &self,
        family_id: &str,
        id: EntryId,
        patch: &EntryPatch,
        updated_by: &str,
    ) -> Result<Option<InventoryEntry>> {
        let id = sql_id(id)?;
        let conn = self.conn.lock();

        let Some(mut entry) = Self::get_medicine_locked(&conn, family_id, id)? else {
            return Ok(None);
        };
        patch.apply_to(&mut entry);
        entry.updated_by = Some(updated_by.to_string());

        conn.execute(
            "UPDATE medicines SET
                name = ?1, potency = ?2, company = ?3, location = ?4, sub_location = ?5,
                quantity = ?6, bottle_size = ?7, updated_by = ?8, updated_at = ?9
             WHERE family_id = ?10 AND id = ?11",
            params![
                entry.name,
                entry.potency,
                entry.company,
                entry.location,
                entry.sub_location,
                entry.quantity,
                entry.bottle_size,
                entry.updated_by,
                entry.updated_at.to_rfc3339(),
                family_id,
                id,
            ],
        )
        .context("Failed to update medicine")?;

        debug!(family_id, id, updated_by, "Medicine updated");
        Ok(Some(entry))
    }

    /// Delete a medicine
    pub fn delete_medicine(&self, family_id: &str, id: EntryId) -> Result<bool> {
        let id = sql_id(id)?;
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "DELETE FROM medicines WHERE family_id = ?1 AND id = ?2",
                params![family_id, id],
            )
            .context("Failed to delete medicine")?;

        debug!(family_id, id, removed = rows > 0, "Medicine removal attempted");
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_db(dir: &TempDir) -> Database {
        Database::open(&dir.path().join("test.db")).unwrap()
    }

    fn arnica() -> NewEntry {
        NewEntry::new("Arnica Montana", "30C", "SBL", "Shelf A", 2)
    }

    #[test]
    fn test_family_code_shape() {
        let code = family_code();
        assert_eq!(code.len(), CODE_LEN);
        assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        assert_eq!(member_id().len(), 16);
    }

    #[test]
    fn test_family_and_members() {
        let dir = TempDir::new().unwrap();
        let db = test_db(&dir);

        let family = db.create_family("Sharma").unwrap();
        assert_eq!(db.get_family(&family.id).unwrap().unwrap().name, "Sharma");
        assert!(db.get_family("NOPE0000").unwrap().is_none());

        let asha = db.add_member(&family.id, "Asha").unwrap();
        db.add_member(&family.id, "Ravi").unwrap();
        assert_eq!(db.list_members(&family.id).unwrap().len(), 2);

        assert!(db.remove_member(&family.id, &asha.id).unwrap());
        assert!(!db.remove_member(&family.id, &asha.id).unwrap());
        let names: Vec<String> = db
            .list_members(&family.id)
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Ravi"]);
    }

    #[test]
    fn test_medicine_crud() {
        let dir = TempDir::new().unwrap();
        let db = test_db(&dir);
        let family = db.create_family("Sharma").unwrap();

        let stored = db
            .insert_medicine(&family.id, &arnica().with_sub_location("Top"), "Asha")
            .unwrap();
        assert_eq!(stored.updated_by.as_deref(), Some("Asha"));

        let listed = db.list_medicines(&family.id).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, stored.id);
        assert_eq!(listed[0].sub_location.as_deref(), Some("Top"));

        let dup = db.find_duplicate(&family.id, &arnica()).unwrap();
        assert_eq!(dup.map(|e| e.id), Some(stored.id));

        let updated = db
            .update_medicine(&family.id, stored.id, &EntryPatch::quantity(9), "Ravi")
            .unwrap()
            .unwrap();
        assert_eq!(updated.quantity, 9);
        assert_eq!(updated.updated_by.as_deref(), Some("Ravi"));
        assert_eq!(db.get_medicine(&family.id, stored.id).unwrap().unwrap().quantity, 9);

        assert!(db.delete_medicine(&family.id, stored.id).unwrap());
        assert!(!db.delete_medicine(&family.id, stored.id).unwrap());
        assert!(db
            .update_medicine(&family.id, stored.id, &EntryPatch::quantity(1), "Ravi")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_medicines_are_scoped_to_family() {
        let dir = TempDir::new().unwrap();
        let db = test_db(&dir);
        let ours = db.create_family("Ours").unwrap();
        let theirs = db.create_family("Theirs").unwrap();

        let stored = db.insert_medicine(&ours.id, &arnica(), "Asha").unwrap();

        assert!(db.list_medicines(&theirs.id).unwrap().is_empty());
        assert!(db.find_duplicate(&theirs.id, &arnica()).unwrap().is_none());
        assert!(!db.delete_medicine(&theirs.id, stored.id).unwrap());
    }
}
