//! Round vs rectangular size classification.
//!
//! # Invariants
//! - A category name mentioning pipes is authoritative.
//! - String heuristics only apply when the category does not decide.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Category name fragments that mark an element as round.
const ROUND_CATEGORY_MARKERS: &[&str] = &["pipe", "rohr"];

/// Inch marks accepted on input: ASCII quote, double prime, closing quote.
pub(crate) const INCH_MARKS: &[char] = &['"', '\u{2033}', '\u{201D}'];

/// Standalone vulgar fraction, optionally preceded by a whole part (`1 1/2`).
///
/// Capture groups: 1 = whole part, 2 = numerator, 3 = denominator.
pub(crate) static FRACTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^\d.,])(?:(\d+)\s+)?(\d+)\s*/\s*(\d+)(?:$|[^\d.,/])")
        .expect("valid fraction regex")
});

/// Shape of a sized element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeKind {
    /// Circular, pipe-like.
    Round,
    /// Multi-dimension, duct/tray/conduit-like.
    Rectangular,
}

/// Decides whether a cleaned size string denotes a round or rectangular size.
pub fn classify(category_name: Option<&str>, cleaned: &str) -> SizeKind {
    if let Some(category) = category_name {
        let category = category.to_lowercase();
        if ROUND_CATEGORY_MARKERS
            .iter()
            .any(|marker| category.contains(marker))
        {
            return SizeKind::Round;
        }
    }

    if cleaned.contains(INCH_MARKS)
        || cleaned.to_lowercase().contains("mm")
        || FRACTION_RE.is_match(cleaned)
    {
        return SizeKind::Round;
    }

    SizeKind::Rectangular
}

#[cfg(test)]
mod tests {
    use super::{classify, SizeKind};

    #[test]
    fn pipe_categories_are_round_regardless_of_content() {
        assert_eq!(classify(Some("Pipes"), "200x100"), SizeKind::Round);
        assert_eq!(classify(Some("Pipe Fittings"), "50"), SizeKind::Round);
        assert_eq!(classify(Some("Rohrformteile"), "50"), SizeKind::Round);
        assert_eq!(classify(Some("FLEX PIPES"), "50"), SizeKind::Round);
    }

    #[test]
    fn content_heuristics_apply_without_a_pipe_category() {
        assert_eq!(classify(None, "3/4\""), SizeKind::Round);
        assert_eq!(classify(Some("Ducts"), "25mm"), SizeKind::Round);
        assert_eq!(classify(None, "1 / 2"), SizeKind::Round);
        assert_eq!(classify(None, "2\u{2033}"), SizeKind::Round);
    }

    #[test]
    fn everything_else_is_rectangular() {
        assert_eq!(classify(None, "200x100"), SizeKind::Rectangular);
        assert_eq!(classify(Some("Duct Fittings"), "50"), SizeKind::Rectangular);
        assert_eq!(classify(Some("Cable Trays"), "300-60"), SizeKind::Rectangular);
        assert_eq!(classify(None, "1.5/2"), SizeKind::Rectangular);
    }
}
