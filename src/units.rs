//! Length conversion between the user-facing centimetre margins and the
//! typographic point (1/72 inch) used by page-layout engines.

pub const CM_PER_INCH: f64 = 2.54;
pub const POINTS_PER_INCH: f64 = 72.0;

/// Convert centimetres to whole points, rounding to the nearest point.
///
/// Total: NaN maps to 0 and out-of-range values saturate.
pub fn cm_to_points(cm: f32) -> i32 {
    (f64::from(cm) / CM_PER_INCH * POINTS_PER_INCH).round() as i32
}

/// Fractional variant used by the CSS length parser.
pub fn cm_to_points_f32(cm: f32) -> f32 {
    (f64::from(cm) / CM_PER_INCH * POINTS_PER_INCH) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_inch_is_72_points() {
        assert_eq!(cm_to_points(2.54), 72);
    }

    #[test]
    fn zero_is_zero() {
        assert_eq!(cm_to_points(0.0), 0);
    }

    #[test]
    fn rounds_to_nearest_point() {
        // 1 cm = 28.346 pt
        assert_eq!(cm_to_points(1.0), 28);
        // 2 cm = 56.69 pt
        assert_eq!(cm_to_points(2.0), 57);
    }

    #[test]
    fn non_negative_input_gives_non_negative_output() {
        for i in 0..500 {
            let cm = i as f32 * 0.037;
            assert!(cm_to_points(cm) >= 0, "negative result for {cm} cm");
        }
    }

    #[test]
    fn nan_is_total() {
        assert_eq!(cm_to_points(f32::NAN), 0);
    }
}
