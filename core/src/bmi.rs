use serde::Serialize;

const IDEAL_BMI_MIN: f64 = 18.5;
const IDEAL_BMI_MAX: f64 = 24.9;

/// WHO adult BMI bands. Lower bounds inclusive, upper bounds exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    ObeseClassI,
    ObeseClassII,
    ObeseClassIII,
}

impl BmiCategory {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            BmiCategory::Underweight => "Underweight",
            BmiCategory::Normal => "Normal weight",
            BmiCategory::Overweight => "Overweight",
            BmiCategory::ObeseClassI => "Obesity class I",
            BmiCategory::ObeseClassII => "Obesity class II",
            BmiCategory::ObeseClassIII => "Obesity class III",
        }
    }

    /// Style hook used by front ends; the three obesity classes share one.
    #[must_use]
    pub fn css_class(self) -> &'static str {
        match self {
            BmiCategory::Underweight => "bmi-underweight",
            BmiCategory::Normal => "bmi-normal",
            BmiCategory::Overweight => "bmi-overweight",
            BmiCategory::ObeseClassI | BmiCategory::ObeseClassII | BmiCategory::ObeseClassIII => {
                "bmi-obese"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IdealWeightRange {
    pub min: f64,
    pub max: f64,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn is_positive(value: f64) -> bool {
    value > 0.0 && value.is_finite()
}

/// `weight / (height_m)^2`, rounded to one decimal. Zero for any non-positive input.
#[must_use]
pub fn calculate_bmi(weight_kg: f64, height_cm: f64) -> f64 {
    if !is_positive(weight_kg) || !is_positive(height_cm) {
        return 0.0;
    }
    let height_m = height_cm / 100.0;
    round1(weight_kg / (height_m * height_m))
}

#[must_use]
pub fn categorize(bmi: f64) -> BmiCategory {
    if bmi < 18.5 {
        BmiCategory::Underweight
    } else if bmi < 25.0 {
        BmiCategory::Normal
    } else if bmi < 30.0 {
        BmiCategory::Overweight
    } else if bmi < 35.0 {
        BmiCategory::ObeseClassI
    } else if bmi < 40.0 {
        BmiCategory::ObeseClassII
    } else {
        BmiCategory::ObeseClassIII
    }
}

/// Weights that put `height_cm` inside the 18.5–24.9 band.
#[must_use]
pub fn ideal_weight_range(height_cm: f64) -> IdealWeightRange {
    if !is_positive(height_cm) {
        return IdealWeightRange { min: 0.0, max: 0.0 };
    }
    let height_m = height_cm / 100.0;
    let squared = height_m * height_m;
    IdealWeightRange {
        min: round1(IDEAL_BMI_MIN * squared),
        max: round1(IDEAL_BMI_MAX * squared),
    }
}
