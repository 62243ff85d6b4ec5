use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::ValidationError;

// --- Units ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lb,
}

impl WeightUnit {
    pub const ALL: [WeightUnit; 2] = [WeightUnit::Kg, WeightUnit::Lb];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            WeightUnit::Kg => "kg",
            WeightUnit::Lb => "lb",
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kg" | "kgs" => Ok(WeightUnit::Kg),
            "lb" | "lbs" => Ok(WeightUnit::Lb),
            _ => Err(ValidationError::UnsupportedValue {
                kind: "weight unit",
                value: s.to_string(),
                allowed: "kg, lb".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeightUnit {
    #[default]
    Cm,
    In,
    Ft,
}

impl HeightUnit {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HeightUnit::Cm => "cm",
            HeightUnit::In => "in",
            HeightUnit::Ft => "ft",
        }
    }
}

impl fmt::Display for HeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeightUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cm" => Ok(HeightUnit::Cm),
            "in" | "inch" | "inches" => Ok(HeightUnit::In),
            "ft" | "feet" => Ok(HeightUnit::Ft),
            _ => Err(ValidationError::UnsupportedValue {
                kind: "height unit",
                value: s.to_string(),
                allowed: "cm, in, ft".to_string(),
            }),
        }
    }
}

/// Display-only unit preferences. Stored values are always kg / cm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PreferredUnits {
    pub height: HeightUnit,
    pub weight: WeightUnit,
}

#[must_use]
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

// --- Weight entries ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightEntry {
    pub id: String,
    pub date: NaiveDate,
    pub weight_kg: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bmi: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub units: Option<WeightUnit>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A weight entry before an identifier and timestamps have been assigned.
#[derive(Debug, Clone, Default)]
pub struct NewWeightEntry {
    pub id: Option<String>,
    pub date: Option<NaiveDate>,
    pub weight_kg: f64,
    pub bmi: Option<f64>,
    pub time: Option<String>,
    pub notes: Option<String>,
    pub units: Option<WeightUnit>,
    pub created_at: Option<DateTime<Utc>>,
}

impl NewWeightEntry {
    #[must_use]
    pub fn new(date: NaiveDate, weight_kg: f64) -> Self {
        Self {
            date: Some(date),
            weight_kg,
            ..Self::default()
        }
    }
}

impl From<WeightEntry> for NewWeightEntry {
    fn from(entry: WeightEntry) -> Self {
        Self {
            id: Some(entry.id),
            date: Some(entry.date),
            weight_kg: entry.weight_kg,
            bmi: entry.bmi,
            time: entry.time,
            notes: entry.notes,
            units: entry.units,
            created_at: Some(entry.created_at),
        }
    }
}

impl WeightEntry {
    #[must_use]
    pub fn from_draft(draft: NewWeightEntry) -> Self {
        Self::from_draft_at(draft, Utc::now())
    }

    /// Fill in the id, date and `created_at` only where the draft left them empty.
    #[must_use]
    pub fn from_draft_at(draft: NewWeightEntry, now: DateTime<Utc>) -> Self {
        Self {
            id: draft.id.filter(|id| !id.is_empty()).unwrap_or_else(new_record_id),
            date: draft
                .date
                .unwrap_or_else(|| now.with_timezone(&Local).date_naive()),
            weight_kg: draft.weight_kg,
            bmi: draft.bmi,
            time: draft.time,
            notes: draft.notes,
            units: draft.units,
            created_at: draft.created_at.unwrap_or(now),
            updated_at: None,
        }
    }
}

// --- User profile ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub age: Option<u32>,
    /// Base64-encoded image.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub height_cm: f64,
    #[serde(default)]
    pub preferred_units: PreferredUnits,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.height_cm > 0.0
    }

    #[must_use]
    pub fn from_draft(draft: ProfileDraft) -> Self {
        Self::from_draft_at(draft, Utc::now())
    }

    /// `updated_at` is always refreshed; every other field keeps the draft's value when set.
    #[must_use]
    pub fn from_draft_at(draft: ProfileDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: draft.id.filter(|id| !id.is_empty()).unwrap_or_else(new_record_id),
            name: draft.name,
            age: draft.age,
            avatar: draft.avatar,
            height_cm: draft.height_cm.unwrap_or(0.0),
            preferred_units: PreferredUnits {
                height: draft.preferred_height_unit.unwrap_or_default(),
                weight: draft.preferred_weight_unit.unwrap_or_default(),
            },
            created_at: draft.created_at.unwrap_or(now),
            updated_at: now,
        }
    }
}

/// Partial profile fields. `None` means "leave as is" when merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileDraft {
    pub id: Option<String>,
    pub name: Option<String>,
    pub age: Option<u32>,
    pub avatar: Option<String>,
    pub height_cm: Option<f64>,
    pub preferred_height_unit: Option<HeightUnit>,
    pub preferred_weight_unit: Option<WeightUnit>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ProfileDraft {
    /// Overlay `other` on top of `self`; fields set in `other` win.
    #[must_use]
    pub fn merge(self, other: ProfileDraft) -> Self {
        Self {
            id: other.id.or(self.id),
            name: other.name.or(self.name),
            age: other.age.or(self.age),
            avatar: other.avatar.or(self.avatar),
            height_cm: other.height_cm.or(self.height_cm),
            preferred_height_unit: other.preferred_height_unit.or(self.preferred_height_unit),
            preferred_weight_unit: other.preferred_weight_unit.or(self.preferred_weight_unit),
            created_at: other.created_at.or(self.created_at),
        }
    }
}

impl From<&UserProfile> for ProfileDraft {
    fn from(profile: &UserProfile) -> Self {
        Self {
            id: Some(profile.id.clone()),
            name: profile.name.clone(),
            age: profile.age,
            avatar: profile.avatar.clone(),
            height_cm: Some(profile.height_cm),
            preferred_height_unit: Some(profile.preferred_units.height),
            preferred_weight_unit: Some(profile.preferred_units.weight),
            created_at: Some(profile.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_weight_unit_parse() {
        assert_eq!("kg".parse::<WeightUnit>().unwrap(), WeightUnit::Kg);
        assert_eq!("LBS".parse::<WeightUnit>().unwrap(), WeightUnit::Lb);
        assert!("stone".parse::<WeightUnit>().is_err());
    }

    #[test]
    fn test_height_unit_parse() {
        assert_eq!("cm".parse::<HeightUnit>().unwrap(), HeightUnit::Cm);
        assert_eq!("Feet".parse::<HeightUnit>().unwrap(), HeightUnit::Ft);
        assert_eq!("in".parse::<HeightUnit>().unwrap(), HeightUnit::In);
        assert!("m".parse::<HeightUnit>().is_err());
    }

    #[test]
    fn test_entry_from_draft_generates_id_and_timestamps() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let entry = WeightEntry::from_draft_at(NewWeightEntry::new(date, 80.0), fixed_now());
        assert!(!entry.id.is_empty());
        assert_eq!(entry.date, date);
        assert_eq!(entry.created_at, fixed_now());
        assert!(entry.updated_at.is_none());
    }

    #[test]
    fn test_entry_from_draft_keeps_explicit_values() {
        let created = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let draft = NewWeightEntry {
            id: Some("entry-1".to_string()),
            date: NaiveDate::from_ymd_opt(2023, 1, 1),
            weight_kg: 70.0,
            created_at: Some(created),
            ..NewWeightEntry::default()
        };
        let entry = WeightEntry::from_draft_at(draft, fixed_now());
        assert_eq!(entry.id, "entry-1");
        assert_eq!(entry.created_at, created);
    }

    #[test]
    fn test_entry_ids_are_unique() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let a = WeightEntry::from_draft(NewWeightEntry::new(date, 80.0));
        let b = WeightEntry::from_draft(NewWeightEntry::new(date, 80.0));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_profile_from_empty_draft_defaults() {
        let profile = UserProfile::from_draft_at(ProfileDraft::default(), fixed_now());
        assert!(!profile.id.is_empty());
        assert!((profile.height_cm - 0.0).abs() < f64::EPSILON);
        assert_eq!(profile.preferred_units.height, HeightUnit::Cm);
        assert_eq!(profile.preferred_units.weight, WeightUnit::Kg);
        assert!(!profile.is_complete());
    }

    #[test]
    fn test_profile_draft_merge_prefers_override() {
        let base = ProfileDraft {
            name: Some("Ada".to_string()),
            height_cm: Some(170.0),
            ..ProfileDraft::default()
        };
        let merged = base.merge(ProfileDraft {
            height_cm: Some(180.0),
            ..ProfileDraft::default()
        });
        assert_eq!(merged.name.as_deref(), Some("Ada"));
        assert_eq!(merged.height_cm, Some(180.0));
    }

    #[test]
    fn test_profile_reads_camel_case_json() {
        let json = r#"{
            "id": "p-1",
            "name": "Sam",
            "heightCm": 172.5,
            "preferredUnits": {"height": "ft", "weight": "lb"},
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-02T00:00:00.000Z"
        }"#;
        let profile: UserProfile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.id, "p-1");
        assert!((profile.height_cm - 172.5).abs() < f64::EPSILON);
        assert_eq!(profile.preferred_units.height, HeightUnit::Ft);
        assert_eq!(profile.preferred_units.weight, WeightUnit::Lb);
        assert!(profile.is_complete());
    }
}
