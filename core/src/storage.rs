use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDate, Utc};
use tokio::sync::OnceCell;
use tokio::task;
use tracing::{debug, error, info};

use crate::bmi::calculate_bmi;
use crate::db::Database;
use crate::models::{NewWeightEntry, UserProfile, WeightEntry};
use crate::validation::{ensure_date_in_allowed_range, ensure_positive_weight};

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Async handle over [`Database`].
///
/// The database is opened lazily on first use; concurrent callers await the same
/// initialization. Each operation runs on the blocking pool and is independent:
/// there is no transaction spanning several calls.
pub struct Storage {
    location: Location,
    db: OnceCell<Arc<Mutex<Database>>>,
}

impl Storage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
            db: OnceCell::new(),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            db: OnceCell::new(),
        }
    }

    /// Open (creating or upgrading) the database. Safe to call repeatedly.
    pub async fn open(&self) -> Result<()> {
        self.handle().await.map(|_| ())
    }

    async fn handle(&self) -> Result<Arc<Mutex<Database>>> {
        let db = self
            .db
            .get_or_try_init(|| async {
                let location = self.location.clone();
                let db = task::spawn_blocking(move || match location {
                    Location::File(path) => Database::open(&path),
                    Location::Memory => Database::open_in_memory(),
                })
                .await
                .context("Database open task failed")?
                .inspect_err(|e| error!(error = %e, "failed to open database"))?;
                info!("database ready");
                Ok::<_, anyhow::Error>(Arc::new(Mutex::new(db)))
            })
            .await?;
        Ok(Arc::clone(db))
    }

    async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.handle().await?;
        let result = task::spawn_blocking(move || {
            let guard = db.lock().map_err(|_| anyhow!("Database lock poisoned"))?;
            f(&guard)
        })
        .await
        .with_context(|| format!("Storage task '{op}' failed"))?;
        match result {
            Ok(value) => {
                debug!(op, "storage operation complete");
                Ok(value)
            }
            Err(e) => {
                error!(op, error = %e, "storage operation failed");
                Err(e)
            }
        }
    }

    // --- Weight entries ---

    /// Validate and upsert an entry, stamping `updated_at`. Returns the id.
    pub async fn put_weight_entry(&self, mut entry: WeightEntry) -> Result<String> {
        ensure_positive_weight(entry.weight_kg)?;
        ensure_date_in_allowed_range(entry.date, Local::now().date_naive())?;
        entry.updated_at = Some(Utc::now());
        self.run("put_weight_entry", move |db| db.put_weight_entry(&entry))
            .await
    }

    pub async fn update_weight_entry(&self, entry: WeightEntry) -> Result<String> {
        self.put_weight_entry(entry).await
    }

    pub async fn get_weight_entry(&self, id: &str) -> Result<Option<WeightEntry>> {
        let id = id.to_string();
        self.run("get_weight_entry", move |db| db.get_weight_entry(&id))
            .await
    }

    /// Every stored entry, in no particular order.
    pub async fn list_weight_entries(&self) -> Result<Vec<WeightEntry>> {
        self.run("list_weight_entries", Database::list_weight_entries)
            .await
    }

    /// Entries dated within `[start, end]`, ascending by date.
    pub async fn entries_in_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<WeightEntry>> {
        self.run("entries_in_date_range", move |db| {
            db.list_weight_entries_between(start, end)
        })
        .await
    }

    pub async fn delete_weight_entry(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.run("delete_weight_entry", move |db| db.delete_weight_entry(&id))
            .await
    }

    pub async fn clear_weight_entries(&self) -> Result<()> {
        let removed = self
            .run("clear_weight_entries", Database::clear_weight_entries)
            .await?;
        info!(removed, "cleared weight entries");
        Ok(())
    }

    /// Build an entry from `draft`, attaching a BMI when a height is known.
    ///
    /// `height_cm` falls back to the stored profile's height.
    pub async fn add_entry_with_bmi(
        &self,
        draft: NewWeightEntry,
        height_cm: Option<f64>,
    ) -> Result<WeightEntry> {
        let height_cm = match height_cm {
            Some(h) => h,
            None => self
                .get_user_profile()
                .await?
                .map_or(0.0, |p| p.height_cm),
        };

        let mut entry = WeightEntry::from_draft(draft);
        if height_cm > 0.0 && entry.weight_kg > 0.0 {
            let bmi = calculate_bmi(entry.weight_kg, height_cm);
            debug!(bmi, weight_kg = entry.weight_kg, height_cm, "calculated BMI");
            entry.bmi = Some(bmi);
        }

        let id = self.put_weight_entry(entry).await?;
        self.get_weight_entry(&id)
            .await?
            .with_context(|| format!("Weight entry {id} vanished after save"))
    }

    /// Rewrite the BMI of every entry for a new height.
    ///
    /// Writes are sequential and independent; a failure part way leaves earlier
    /// entries updated and later ones untouched. Returns the number rewritten.
    pub async fn recalculate_all_bmi(&self, height_cm: f64) -> Result<usize> {
        if !(height_cm > 0.0) {
            return Ok(0);
        }
        let entries = self.list_weight_entries().await?;
        let mut updated = 0;
        for mut entry in entries {
            if entry.weight_kg <= 0.0 {
                continue;
            }
            entry.bmi = Some(calculate_bmi(entry.weight_kg, height_cm));
            entry.updated_at = Some(Utc::now());
            // Stored entries may predate the entry window; they are rewritten as is.
            self.run("recalculate_bmi", move |db| db.put_weight_entry(&entry))
                .await?;
            updated += 1;
        }
        info!(updated, height_cm, "recalculated BMI for stored entries");
        Ok(updated)
    }

    // --- User profile ---

    pub async fn put_user_profile(&self, profile: UserProfile) -> Result<String> {
        self.run("put_user_profile", move |db| db.put_user_profile(&profile))
            .await
    }

    pub async fn get_user_profile(&self) -> Result<Option<UserProfile>> {
        self.run("get_user_profile", Database::get_user_profile)
            .await
    }

    pub async fn clear_user_profile(&self) -> Result<()> {
        self.run("clear_user_profile", Database::clear_user_profile)
            .await
    }

    pub async fn has_user_profile(&self) -> Result<bool> {
        let count = self
            .run("has_user_profile", Database::count_user_profiles)
            .await?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileDraft;
    use crate::validation::ValidationError;
    use chrono::{Duration, TimeZone};

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    fn draft(days_ago: i64, weight_kg: f64) -> NewWeightEntry {
        NewWeightEntry::new(today() - Duration::days(days_ago), weight_kg)
    }

    async fn storage_with_height(height_cm: f64) -> Storage {
        let storage = Storage::in_memory();
        let profile = UserProfile::from_draft(ProfileDraft {
            height_cm: Some(height_cm),
            ..ProfileDraft::default()
        });
        storage.put_user_profile(profile).await.unwrap();
        storage
    }

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let storage = Storage::in_memory();
        storage.open().await.unwrap();
        storage.open().await.unwrap();
        assert!(storage.list_weight_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_open_shares_one_database() {
        let storage = Arc::new(Storage::in_memory());
        let (a, b) = tokio::join!(storage.open(), storage.open());
        a.unwrap();
        b.unwrap();

        let entry = WeightEntry::from_draft(draft(0, 80.0));
        storage.put_weight_entry(entry.clone()).await.unwrap();
        // An in-memory database opened twice would not see this row
        assert!(storage.get_weight_entry(&entry.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_put_stamps_updated_at() {
        let storage = Storage::in_memory();
        let entry = WeightEntry::from_draft(draft(1, 80.0));
        let id = storage.put_weight_entry(entry.clone()).await.unwrap();
        assert_eq!(id, entry.id);

        let stored = storage.get_weight_entry(&id).await.unwrap().unwrap();
        assert!(stored.updated_at.is_some());
        assert_eq!(stored.created_at, entry.created_at);
    }

    #[tokio::test]
    async fn test_put_rejects_dates_outside_window() {
        let storage = Storage::in_memory();

        let tomorrow = WeightEntry::from_draft(draft(-1, 80.0));
        let err = storage.put_weight_entry(tomorrow).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::DateOutOfRange { .. })
        ));

        let ancient = WeightEntry::from_draft(NewWeightEntry::new(
            crate::validation::min_allowed_date(today()) - Duration::days(1),
            80.0,
        ));
        assert!(storage.put_weight_entry(ancient).await.is_err());
        assert!(storage.list_weight_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_accepts_window_edges() {
        let storage = Storage::in_memory();
        let oldest = WeightEntry::from_draft(NewWeightEntry::new(
            crate::validation::min_allowed_date(today()),
            80.0,
        ));
        let newest = WeightEntry::from_draft(draft(0, 80.0));
        storage.put_weight_entry(oldest).await.unwrap();
        storage.put_weight_entry(newest).await.unwrap();
        assert_eq!(storage.list_weight_entries().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_put_rejects_non_positive_weight() {
        let storage = Storage::in_memory();
        let entry = WeightEntry::from_draft(draft(0, 0.0));
        let err = storage.put_weight_entry(entry).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::NonPositiveWeight)
        );
    }

    #[tokio::test]
    async fn test_put_rejects_infinite_weight() {
        let storage = Storage::in_memory();
        let entry = WeightEntry::from_draft(draft(0, f64::INFINITY));
        let err = storage.put_weight_entry(entry).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<ValidationError>(),
            Some(&ValidationError::NonPositiveWeight)
        );
        assert!(storage.list_weight_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_weight_entry_overwrites_in_place() {
        let storage = Storage::in_memory();
        let mut entry = WeightEntry::from_draft(draft(1, 80.0));
        storage.put_weight_entry(entry.clone()).await.unwrap();

        entry.weight_kg = 79.5;
        entry.notes = Some("after run".to_string());
        let id = storage.update_weight_entry(entry.clone()).await.unwrap();
        assert_eq!(id, entry.id);

        let stored = storage.get_weight_entry(&id).await.unwrap().unwrap();
        assert!((stored.weight_kg - 79.5).abs() < f64::EPSILON);
        assert_eq!(stored.notes.as_deref(), Some("after run"));
        assert!(stored.updated_at.is_some());
        assert_eq!(storage.list_weight_entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_writing_same_entry_twice_keeps_one_record() {
        let storage = Storage::in_memory();
        let entry = WeightEntry::from_draft(draft(2, 75.0));
        storage.put_weight_entry(entry.clone()).await.unwrap();
        storage.put_weight_entry(entry.clone()).await.unwrap();

        let all = storage.list_weight_entries().await.unwrap();
        assert_eq!(all.iter().filter(|e| e.id == entry.id).count(), 1);
    }

    #[tokio::test]
    async fn test_sort_by_created_at_descending() {
        let storage = Storage::in_memory();
        for day in 1..=3 {
            let mut d = draft(0, 80.0 - f64::from(day));
            d.id = Some(format!("entry-{day}"));
            d.created_at = Some(Utc.with_ymd_and_hms(2023, 1, day, 0, 0, 0).unwrap());
            storage
                .put_weight_entry(WeightEntry::from_draft(d))
                .await
                .unwrap();
        }

        let mut all = storage.list_weight_entries().await.unwrap();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        assert_eq!(all[0].id, "entry-3");
        assert_eq!(all[2].id, "entry-1");
    }

    #[tokio::test]
    async fn test_delete_then_get_returns_none() {
        let storage = Storage::in_memory();
        let entry = WeightEntry::from_draft(draft(0, 72.0));
        let id = storage.put_weight_entry(entry).await.unwrap();
        assert!(storage.get_weight_entry(&id).await.unwrap().is_some());

        assert!(storage.delete_weight_entry(&id).await.unwrap());
        assert!(storage.get_weight_entry(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_weight_entries() {
        let storage = Storage::in_memory();
        for days_ago in 0..2 {
            storage
                .put_weight_entry(WeightEntry::from_draft(draft(days_ago, 90.0)))
                .await
                .unwrap();
        }
        assert_eq!(storage.list_weight_entries().await.unwrap().len(), 2);
        storage.clear_weight_entries().await.unwrap();
        assert!(storage.list_weight_entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_entry_with_bmi_uses_profile_height() {
        let storage = storage_with_height(180.0).await;
        let entry = storage.add_entry_with_bmi(draft(0, 81.0), None).await.unwrap();
        assert_eq!(entry.bmi, Some(25.0));
        assert_eq!(
            crate::bmi::categorize(entry.bmi.unwrap()),
            crate::bmi::BmiCategory::Overweight
        );
    }

    #[tokio::test]
    async fn test_add_entry_with_bmi_without_height_has_no_bmi() {
        let storage = Storage::in_memory();
        let entry = storage.add_entry_with_bmi(draft(0, 81.0), None).await.unwrap();
        assert!(entry.bmi.is_none());
    }

    #[tokio::test]
    async fn test_add_entry_with_explicit_height() {
        let storage = Storage::in_memory();
        let entry = storage
            .add_entry_with_bmi(draft(0, 70.0), Some(175.0))
            .await
            .unwrap();
        assert_eq!(entry.bmi, Some(22.9));
    }

    #[tokio::test]
    async fn test_recalculate_all_bmi() {
        let storage = storage_with_height(180.0).await;
        storage.add_entry_with_bmi(draft(1, 81.0), None).await.unwrap();
        storage.add_entry_with_bmi(draft(0, 72.0), None).await.unwrap();

        let updated = storage.recalculate_all_bmi(170.0).await.unwrap();
        assert_eq!(updated, 2);
        for entry in storage.list_weight_entries().await.unwrap() {
            assert_eq!(entry.bmi, Some(calculate_bmi(entry.weight_kg, 170.0)));
        }

        assert_eq!(storage.recalculate_all_bmi(0.0).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_entries_in_date_range() {
        let storage = Storage::in_memory();
        for days_ago in 0..10 {
            storage
                .put_weight_entry(WeightEntry::from_draft(draft(days_ago, 80.0)))
                .await
                .unwrap();
        }
        let entries = storage
            .entries_in_date_range(today() - Duration::days(4), today() - Duration::days(2))
            .await
            .unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[tokio::test]
    async fn test_profile_operations() {
        let storage = Storage::in_memory();
        assert!(!storage.has_user_profile().await.unwrap());
        assert!(storage.get_user_profile().await.unwrap().is_none());

        let profile = UserProfile::from_draft(ProfileDraft {
            name: Some("Kim".to_string()),
            ..ProfileDraft::default()
        });
        let id = storage.put_user_profile(profile.clone()).await.unwrap();
        assert_eq!(id, profile.id);
        assert!(storage.has_user_profile().await.unwrap());
        assert_eq!(storage.get_user_profile().await.unwrap(), Some(profile));

        storage.clear_user_profile().await.unwrap();
        assert!(!storage.has_user_profile().await.unwrap());
    }

    #[tokio::test]
    async fn test_file_backed_storage_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fitlog.db");
        let entry = WeightEntry::from_draft(draft(0, 66.6));
        {
            let storage = Storage::new(&path);
            storage.put_weight_entry(entry.clone()).await.unwrap();
        }
        let storage = Storage::new(&path);
        let loaded = storage.get_weight_entry(&entry.id).await.unwrap().unwrap();
        assert!((loaded.weight_kg - 66.6).abs() < f64::EPSILON);
    }
}
