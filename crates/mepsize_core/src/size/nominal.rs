//! Nominal pipe size lookup.
//!
//! # Invariants
//! - Entries are an ordered list; lookup returns the first entry within
//!   tolerance, so declaration order decides overlaps.

/// Default lookup window in millimeters.
pub const DEFAULT_NOMINAL_TOLERANCE_MM: f64 = 0.6;

/// Millimeter value and canonical inch label, 1/4" through 12".
const NOMINAL_PIPE_SIZES: &[(f64, &str)] = &[
    (6.35, "1/4\""),
    (9.525, "3/8\""),
    (12.7, "1/2\""),
    (19.05, "3/4\""),
    (25.4, "1\""),
    (31.75, "1 1/4\""),
    (38.1, "1 1/2\""),
    (50.8, "2\""),
    (63.5, "2 1/2\""),
    (76.2, "3\""),
    (88.9, "3 1/2\""),
    (101.6, "4\""),
    (127.0, "5\""),
    (152.4, "6\""),
    (203.2, "8\""),
    (254.0, "10\""),
    (304.8, "12\""),
];

/// Returns the label of the first nominal size within `tolerance` of `mm`.
pub fn lookup(mm: f64, tolerance: f64) -> Option<&'static str> {
    if !mm.is_finite() {
        return None;
    }
    NOMINAL_PIPE_SIZES
        .iter()
        .find(|(size_mm, _)| (size_mm - mm).abs() <= tolerance)
        .map(|(_, label)| *label)
}

/// Returns the full table in declaration order.
pub fn entries() -> &'static [(f64, &'static str)] {
    NOMINAL_PIPE_SIZES
}

#[cfg(test)]
mod tests {
    use super::{entries, lookup, DEFAULT_NOMINAL_TOLERANCE_MM};

    #[test]
    fn exact_values_hit_their_labels() {
        for (mm, label) in entries() {
            assert_eq!(lookup(*mm, DEFAULT_NOMINAL_TOLERANCE_MM), Some(*label));
        }
    }

    #[test]
    fn tolerance_window_is_honored() {
        assert_eq!(lookup(12.2, DEFAULT_NOMINAL_TOLERANCE_MM), Some("1/2\""));
        assert_eq!(lookup(13.2, DEFAULT_NOMINAL_TOLERANCE_MM), Some("1/2\""));
        assert_eq!(lookup(50.0, DEFAULT_NOMINAL_TOLERANCE_MM), None);
        assert_eq!(lookup(4.0, DEFAULT_NOMINAL_TOLERANCE_MM), None);
    }

    #[test]
    fn wide_tolerance_prefers_earliest_entry() {
        // 8.0 is within 3.0 of both 6.35 and 9.525.
        assert_eq!(lookup(8.0, 3.0), Some("1/4\""));
    }

    #[test]
    fn non_finite_input_misses() {
        assert_eq!(lookup(f64::NAN, DEFAULT_NOMINAL_TOLERANCE_MM), None);
        assert_eq!(lookup(f64::INFINITY, 1e9), None);
    }

    #[test]
    fn table_is_ascending() {
        let values: Vec<f64> = entries().iter().map(|(mm, _)| *mm).collect();
        assert!(values.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
