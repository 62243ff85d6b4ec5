use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

use crate::models::{HeightUnit, PreferredUnits, UserProfile, WeightEntry, WeightUnit};

pub const SCHEMA_VERSION: i64 = 3;

const WEIGHT_ENTRY_COLUMNS: &str =
    "id, date, weight_kg, bmi, time, notes, units, created_at, updated_at";

const USER_PROFILE_COLUMNS: &str = "id, name, age, avatar, height_cm, preferred_height_unit, \
     preferred_weight_unit, created_at, updated_at";

/// Synchronous SQLite store with two collections: weight entries and the user profile.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn schema_version(&self) -> Result<i64> {
        Ok(self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?)
    }

    fn migrate(&self) -> Result<()> {
        let version = self.schema_version()?;
        if version >= SCHEMA_VERSION {
            return Ok(());
        }
        info!(from = version, to = SCHEMA_VERSION, "upgrading database schema");

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS weight_entries (
                    id TEXT PRIMARY KEY NOT NULL,
                    date TEXT NOT NULL,
                    weight_kg REAL NOT NULL,
                    bmi REAL,
                    time TEXT,
                    notes TEXT,
                    units TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT
                );

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            self.conn.execute_batch(
                "CREATE INDEX IF NOT EXISTS idx_weight_entries_created_at ON weight_entries(created_at);
                 CREATE INDEX IF NOT EXISTS idx_weight_entries_date ON weight_entries(date);

                 PRAGMA user_version = 2;",
            )?;
        }

        if version < 3 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS user_profile (
                    id TEXT PRIMARY KEY NOT NULL,
                    name TEXT,
                    age INTEGER,
                    avatar TEXT,
                    height_cm REAL NOT NULL DEFAULT 0,
                    preferred_height_unit TEXT NOT NULL DEFAULT 'cm',
                    preferred_weight_unit TEXT NOT NULL DEFAULT 'kg',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 3;",
            )?;
        }

        info!("database upgrade complete");
        Ok(())
    }

    // --- Row mapping helpers ---

    fn weight_entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<WeightEntry> {
        Ok(WeightEntry {
            id: row.get(0)?,
            date: row.get(1)?,
            weight_kg: row.get(2)?,
            bmi: row.get(3)?,
            time: row.get(4)?,
            notes: row.get(5)?,
            units: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn user_profile_from_row(row: &rusqlite::Row) -> rusqlite::Result<UserProfile> {
        Ok(UserProfile {
            id: row.get(0)?,
            name: row.get(1)?,
            age: row.get(2)?,
            avatar: row.get(3)?,
            height_cm: row.get(4)?,
            preferred_units: PreferredUnits {
                height: row.get(5)?,
                weight: row.get(6)?,
            },
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    // --- Weight entries ---

    /// Upsert by id. `created_at` of an existing row is never overwritten.
    pub fn put_weight_entry(&self, entry: &WeightEntry) -> Result<String> {
        self.conn.execute(
            "INSERT INTO weight_entries (id, date, weight_kg, bmi, time, notes, units, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                date = excluded.date,
                weight_kg = excluded.weight_kg,
                bmi = excluded.bmi,
                time = excluded.time,
                notes = excluded.notes,
                units = excluded.units,
                updated_at = excluded.updated_at",
            params![
                entry.id,
                entry.date,
                entry.weight_kg,
                entry.bmi,
                entry.time,
                entry.notes,
                entry.units,
                entry.created_at,
                entry.updated_at,
            ],
        )?;
        Ok(entry.id.clone())
    }

    pub fn get_weight_entry(&self, id: &str) -> Result<Option<WeightEntry>> {
        let entry = self
            .conn
            .query_row(
                &format!("SELECT {WEIGHT_ENTRY_COLUMNS} FROM weight_entries WHERE id = ?1"),
                params![id],
                Self::weight_entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// All entries in storage order; callers sort.
    pub fn list_weight_entries(&self) -> Result<Vec<WeightEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {WEIGHT_ENTRY_COLUMNS} FROM weight_entries"))?;
        let entries = stmt
            .query_map([], Self::weight_entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    /// Entries whose date lies in `[start, end]`, walking the date index.
    pub fn list_weight_entries_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WeightEntry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {WEIGHT_ENTRY_COLUMNS} FROM weight_entries
             WHERE date >= ?1 AND date <= ?2 ORDER BY date"
        ))?;
        let entries = stmt
            .query_map(params![start, end], Self::weight_entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn delete_weight_entry(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM weight_entries WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn clear_weight_entries(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM weight_entries", [])?)
    }

    pub fn count_weight_entries(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM weight_entries", [], |row| row.get(0))?)
    }

    // --- User profile ---

    /// Upsert the single profile row. A profile with a different id is rejected
    /// while another one is stored.
    pub fn put_user_profile(&self, profile: &UserProfile) -> Result<String> {
        let tx = self.conn.unchecked_transaction()?;
        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM user_profile WHERE id != ?1 LIMIT 1",
                params![profile.id],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(existing) = existing {
            bail!(
                "A different user profile ({existing}) is already stored; clear it before saving '{}'",
                profile.id
            );
        }
        tx.execute(
            "INSERT INTO user_profile (id, name, age, avatar, height_cm, preferred_height_unit, preferred_weight_unit, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                age = excluded.age,
                avatar = excluded.avatar,
                height_cm = excluded.height_cm,
                preferred_height_unit = excluded.preferred_height_unit,
                preferred_weight_unit = excluded.preferred_weight_unit,
                updated_at = excluded.updated_at",
            params![
                profile.id,
                profile.name,
                profile.age,
                profile.avatar,
                profile.height_cm,
                profile.preferred_units.height,
                profile.preferred_units.weight,
                profile.created_at,
                profile.updated_at,
            ],
        )?;
        tx.commit()?;
        Ok(profile.id.clone())
    }

    /// The first stored profile by creation time.
    pub fn get_user_profile(&self) -> Result<Option<UserProfile>> {
        let profile = self
            .conn
            .query_row(
                &format!(
                    "SELECT {USER_PROFILE_COLUMNS} FROM user_profile ORDER BY created_at, id LIMIT 1"
                ),
                [],
                Self::user_profile_from_row,
            )
            .optional()?;
        Ok(profile)
    }

    pub fn clear_user_profile(&self) -> Result<()> {
        self.conn.execute("DELETE FROM user_profile", [])?;
        Ok(())
    }

    pub fn count_user_profiles(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM user_profile", [], |row| row.get(0))?)
    }
}

// --- Unit columns are stored as their short codes ---

impl ToSql for WeightUnit {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for WeightUnit {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for HeightUnit {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for HeightUnit {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}
