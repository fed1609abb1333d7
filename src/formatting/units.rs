//! Conversions from physical units to WordprocessingML's native units.
//!
//! Page geometry and paragraph spacing are stored in twentieths of a point
//! ("twips", 1440 per inch) and font sizes in half-points. Every conversion
//! goes straight from the profile's unit to the stored unit so no rounding
//! accumulates through an intermediate representation.

pub const TWIPS_PER_INCH: f64 = 1440.0;
pub const CM_PER_INCH: f64 = 2.54;
pub const TWIPS_PER_POINT: f64 = 20.0;

/// Line height of single spacing under `lineRule="auto"`.
pub const SINGLE_LINE: f64 = 240.0;

pub fn cm_to_twips(cm: f64) -> i64 {
    (cm * TWIPS_PER_INCH / CM_PER_INCH).round() as i64
}

pub fn pt_to_twips(pt: f64) -> i64 {
    (pt * TWIPS_PER_POINT).round() as i64
}

pub fn pt_to_half_points(pt: f64) -> i64 {
    (pt * 2.0).round() as i64
}

/// `w:line` value for a line-spacing multiplier.
pub fn line_multiple(multiplier: f64) -> i64 {
    (multiplier * SINGLE_LINE).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cm_to_twips_is_exact() {
        assert_eq!(cm_to_twips(2.0), 1134);
        assert_eq!(cm_to_twips(2.54), 1440);
        assert_eq!(cm_to_twips(21.0), 11906);
        assert_eq!(cm_to_twips(29.7), 16838);
    }

    #[test]
    fn test_repeated_conversion_does_not_drift() {
        let first = cm_to_twips(2.5);
        for _ in 0..100 {
            assert_eq!(cm_to_twips(2.5), first);
        }
        assert_eq!(first, 1417);
    }

    #[test]
    fn test_point_conversions() {
        assert_eq!(pt_to_twips(6.0), 120);
        assert_eq!(pt_to_twips(0.0), 0);
        assert_eq!(pt_to_half_points(11.0), 22);
        assert_eq!(pt_to_half_points(10.5), 21);
    }

    #[test]
    fn test_line_multiple() {
        assert_eq!(line_multiple(1.0), 240);
        assert_eq!(line_multiple(1.15), 276);
        assert_eq!(line_multiple(1.5), 360);
    }
}
