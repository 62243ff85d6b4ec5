use std::sync::Arc;

use anyhow::Result;
use chrono::{Days, Local, NaiveDate};
use serde::Serialize;

use crate::bmi::calculate_bmi;
use crate::models::WeightEntry;
use crate::profile::ProfileService;
use crate::storage::Storage;

pub const DEFAULT_WINDOW_DAYS: u32 = 365;

/// Parallel label/value arrays ready to hand to a line chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub label: String,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartSeries {
    fn empty(label: &str) -> Self {
        Self {
            label: label.to_string(),
            labels: Vec::new(),
            values: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// First day included in a window of `days` ending today.
#[must_use]
pub fn window_start(today: NaiveDate, days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Entries dated on or after `start`, oldest first.
#[must_use]
pub fn entries_since(entries: Vec<WeightEntry>, start: NaiveDate) -> Vec<WeightEntry> {
    let mut recent: Vec<WeightEntry> = entries.into_iter().filter(|e| e.date >= start).collect();
    recent.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
    recent
}

fn date_label(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

#[must_use]
pub fn weight_series(entries: Vec<WeightEntry>, today: NaiveDate, days: u32) -> ChartSeries {
    let recent = entries_since(entries, window_start(today, days));
    ChartSeries {
        label: "Weight (kg)".to_string(),
        labels: recent.iter().map(|e| date_label(e.date)).collect(),
        values: recent.iter().map(|e| e.weight_kg).collect(),
    }
}

/// BMI per entry. A stored BMI is used as is; a missing one is computed from
/// `height_cm`. Empty without a height.
#[must_use]
pub fn bmi_series(
    entries: Vec<WeightEntry>,
    today: NaiveDate,
    days: u32,
    height_cm: f64,
) -> ChartSeries {
    if !(height_cm > 0.0) {
        return ChartSeries::empty("BMI");
    }
    let recent = entries_since(entries, window_start(today, days));
    ChartSeries {
        label: "BMI".to_string(),
        labels: recent.iter().map(|e| date_label(e.date)).collect(),
        values: recent
            .iter()
            .map(|e| match e.bmi {
                Some(bmi) if bmi > 0.0 => bmi,
                _ => calculate_bmi(e.weight_kg, height_cm),
            })
            .collect(),
    }
}

pub struct ChartService {
    storage: Arc<Storage>,
    profile: Arc<ProfileService>,
}

impl ChartService {
    pub fn new(storage: Arc<Storage>, profile: Arc<ProfileService>) -> Self {
        Self { storage, profile }
    }

    pub async fn entries_for_last_days(&self, days: u32) -> Result<Vec<WeightEntry>> {
        let entries = self.storage.list_weight_entries().await?;
        Ok(entries_since(
            entries,
            window_start(Local::now().date_naive(), days),
        ))
    }

    pub async fn weight_chart(&self, days: u32) -> Result<ChartSeries> {
        let entries = self.storage.list_weight_entries().await?;
        Ok(weight_series(entries, Local::now().date_naive(), days))
    }

    pub async fn bmi_chart(&self, days: u32) -> Result<ChartSeries> {
        let height_cm = self
            .profile
            .get_profile()
            .await?
            .map_or(0.0, |p| p.height_cm);
        let entries = self.storage.list_weight_entries().await?;
        Ok(bmi_series(entries, Local::now().date_naive(), days, height_cm))
    }
}
