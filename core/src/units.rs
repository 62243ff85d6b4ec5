use crate::models::{HeightUnit, WeightUnit};

/// Exact international avoirdupois pound.
pub const KG_PER_LB: f64 = 0.453_592_37;
pub const CM_PER_IN: f64 = 2.54;
const INCHES_PER_FOOT: f64 = 12.0;

#[must_use]
pub fn lb_to_kg(lb: f64) -> f64 {
    lb * KG_PER_LB
}

#[must_use]
pub fn kg_to_lb(kg: f64) -> f64 {
    kg / KG_PER_LB
}

#[must_use]
pub fn cm_to_in(cm: f64) -> f64 {
    cm / CM_PER_IN
}

#[must_use]
pub fn in_to_cm(inches: f64) -> f64 {
    inches * CM_PER_IN
}

/// Convert a weight entered in `unit` into canonical kilograms.
#[must_use]
pub fn normalize_to_kg(value: f64, unit: WeightUnit) -> f64 {
    match unit {
        WeightUnit::Kg => value,
        WeightUnit::Lb => lb_to_kg(value),
    }
}

/// Convert a canonical kilogram value into `unit` for display.
#[must_use]
pub fn kg_to_display(kg: f64, unit: WeightUnit) -> f64 {
    match unit {
        WeightUnit::Kg => kg,
        WeightUnit::Lb => kg_to_lb(kg),
    }
}

#[must_use]
pub fn feet_inches_to_cm(feet: f64, inches: f64) -> f64 {
    in_to_cm(feet * INCHES_PER_FOOT + inches)
}

/// Convert a height entered in `unit` into centimeters. Feet are fractional
/// (5.5 ft is 5 ft 6 in).
#[must_use]
pub fn height_to_cm(value: f64, unit: HeightUnit) -> f64 {
    match unit {
        HeightUnit::Cm => value,
        HeightUnit::In => in_to_cm(value),
        HeightUnit::Ft => {
            let feet = value.trunc();
            feet_inches_to_cm(feet, (value - feet) * INCHES_PER_FOOT)
        }
    }
}

/// Split a centimeter height into whole feet and rounded inches.
/// Rounding up to 12 inches rolls over into the next foot.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub fn cm_to_feet_inches(cm: f64) -> (u32, u32) {
    let total_inches = cm_to_in(cm).max(0.0);
    let mut feet = (total_inches / INCHES_PER_FOOT).floor() as u32;
    let mut inches = (total_inches % INCHES_PER_FOOT).round() as u32;
    if inches == 12 {
        feet += 1;
        inches = 0;
    }
    (feet, inches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lb_to_kg_exact_factor() {
        assert!((lb_to_kg(1.0) - 0.453_592_37).abs() < f64::EPSILON);
        assert!((lb_to_kg(200.0) - 90.718_474).abs() < 1e-9);
    }

    #[test]
    fn test_weight_round_trip() {
        for x in [0.1, 1.0, 55.5, 81.0, 150.25, 400.0] {
            assert!((kg_to_lb(lb_to_kg(x)) - x).abs() < 1e-9, "round trip failed for {x}");
            assert!((lb_to_kg(kg_to_lb(x)) - x).abs() < 1e-9, "round trip failed for {x}");
        }
    }

    #[test]
    fn test_height_round_trip() {
        for x in [0.5, 12.0, 70.0, 180.0, 250.0] {
            assert!((in_to_cm(cm_to_in(x)) - x).abs() < 1e-9, "round trip failed for {x}");
        }
        assert!((cm_to_in(2.54) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_no_rounding_inside_conversion() {
        // 1 lb is not a round number of kg; the raw factor must survive
        assert!((lb_to_kg(3.0) - 1.360_777_11).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_to_kg() {
        assert!((normalize_to_kg(80.0, WeightUnit::Kg) - 80.0).abs() < f64::EPSILON);
        assert!((normalize_to_kg(176.0, WeightUnit::Lb) - 79.832_257_12).abs() < 1e-6);
        assert!((kg_to_display(80.0, WeightUnit::Lb) - kg_to_lb(80.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_feet_inches() {
        assert!((feet_inches_to_cm(6.0, 0.0) - 182.88).abs() < 1e-9);
        assert_eq!(cm_to_feet_inches(182.88), (6, 0));
        assert_eq!(cm_to_feet_inches(180.0), (5, 11));
        // 5' 11.8" rounds to 6' 0"
        assert_eq!(cm_to_feet_inches(feet_inches_to_cm(5.0, 11.8)), (6, 0));
        assert_eq!(cm_to_feet_inches(-10.0), (0, 0));
    }

    #[test]
    fn test_height_to_cm() {
        assert!((height_to_cm(180.0, HeightUnit::Cm) - 180.0).abs() < f64::EPSILON);
        assert!((height_to_cm(70.0, HeightUnit::In) - 177.8).abs() < 1e-9);
        assert!((height_to_cm(5.5, HeightUnit::Ft) - 167.64).abs() < 1e-9);
    }
}
