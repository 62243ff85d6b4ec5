use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::info;

use crate::bmi::{BmiCategory, IdealWeightRange, calculate_bmi, categorize, ideal_weight_range};
use crate::chart::{ChartService, window_start};
use crate::insights::{self, Insight, InsightProvider};
use crate::legacy::KeyValueStore;
use crate::models::{HeightUnit, NewWeightEntry, UserProfile, WeightEntry, WeightUnit};
use crate::preferences::Preferences;
use crate::profile::{LegacyMirror, ProfileService};
use crate::storage::Storage;
use crate::units::normalize_to_kg;
use crate::validation::ensure_positive_weight;

/// A weight as the user typed it, before conversion to kilograms.
#[derive(Debug, Clone, Default)]
pub struct WeightInput {
    pub id: Option<String>,
    pub value: f64,
    pub unit: WeightUnit,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BmiSummary {
    pub bmi: f64,
    pub category: BmiCategory,
    pub label: &'static str,
    pub ideal_range: IdealWeightRange,
    pub entry_date: NaiveDate,
}

/// Everything the front ends need, wired to one storage handle.
pub struct FitLog {
    storage: Arc<Storage>,
    profile: Arc<ProfileService>,
    charts: ChartService,
    preferences: Preferences,
}

impl FitLog {
    pub async fn open(
        db_path: &Path,
        kv: Arc<dyn KeyValueStore>,
        mirror: LegacyMirror,
    ) -> Result<Self> {
        Self::with_storage(Storage::new(db_path), kv, mirror).await
    }

    pub async fn open_in_memory(kv: Arc<dyn KeyValueStore>) -> Result<Self> {
        Self::with_storage(Storage::in_memory(), kv, LegacyMirror::default()).await
    }

    async fn with_storage(
        storage: Storage,
        kv: Arc<dyn KeyValueStore>,
        mirror: LegacyMirror,
    ) -> Result<Self> {
        let storage = Arc::new(storage);
        storage.open().await?;
        let profile = ProfileService::new(Arc::clone(&storage), Arc::clone(&kv)).with_mirror(mirror);
        profile.initialize().await?;
        let profile = Arc::new(profile);
        Ok(Self {
            charts: ChartService::new(Arc::clone(&storage), Arc::clone(&profile)),
            preferences: Preferences::new(kv),
            storage,
            profile,
        })
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn profile(&self) -> &ProfileService {
        &self.profile
    }

    #[must_use]
    pub fn charts(&self) -> &ChartService {
        &self.charts
    }

    #[must_use]
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    async fn height_cm(&self) -> Result<f64> {
        Ok(self.profile.get_profile().await?.map_or(0.0, |p| p.height_cm))
    }

    /// Convert, validate and store a weight, attaching a BMI when the height is known.
    pub async fn log_weight(&self, input: WeightInput) -> Result<WeightEntry> {
        ensure_positive_weight(input.value)?;
        let draft = NewWeightEntry {
            id: input.id,
            date: input.date,
            weight_kg: normalize_to_kg(input.value, input.unit),
            time: input.time,
            notes: input.notes,
            units: Some(input.unit),
            ..NewWeightEntry::default()
        };
        let height = self.height_cm().await?;
        let entry = self.storage.add_entry_with_bmi(draft, Some(height)).await?;
        info!(id = %entry.id, date = %entry.date, weight_kg = entry.weight_kg, "logged weight");
        Ok(entry)
    }

    /// Store a new height and recompute every entry's BMI against it.
    pub async fn set_height(&self, height_cm: f64, unit: HeightUnit) -> Result<UserProfile> {
        let profile = self.profile.update_height(height_cm, unit).await?;
        self.storage.recalculate_all_bmi(profile.height_cm).await?;
        Ok(profile)
    }

    pub async fn recalculate_bmi(&self) -> Result<usize> {
        let height = self.height_cm().await?;
        self.storage.recalculate_all_bmi(height).await
    }

    /// Entries newest first, optionally limited to the last `days` days.
    pub async fn history(&self, days: Option<u32>) -> Result<Vec<WeightEntry>> {
        let mut entries = match days {
            Some(days) => {
                let today = Local::now().date_naive();
                self.storage
                    .entries_in_date_range(window_start(today, days), today)
                    .await?
            }
            None => self.storage.list_weight_entries().await?,
        };
        entries.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));
        Ok(entries)
    }

    pub async fn latest_entry(&self) -> Result<Option<WeightEntry>> {
        Ok(self.history(None).await?.into_iter().next())
    }

    /// BMI of the most recent entry against the current height.
    pub async fn bmi_summary(&self) -> Result<Option<BmiSummary>> {
        let height = self.height_cm().await?;
        if height <= 0.0 {
            return Ok(None);
        }
        let Some(latest) = self.latest_entry().await? else {
            return Ok(None);
        };
        let bmi = calculate_bmi(latest.weight_kg, height);
        let category = categorize(bmi);
        Ok(Some(BmiSummary {
            bmi,
            category,
            label: category.label(),
            ideal_range: ideal_weight_range(height),
            entry_date: latest.date,
        }))
    }

    pub async fn insights(&self, provider: &dyn InsightProvider) -> Result<Vec<Insight>> {
        let entries = self.storage.list_weight_entries().await?;
        let height = self.height_cm().await?;
        Ok(insights::generate_insights(provider, &entries, (height > 0.0).then_some(height)).await)
    }
}
