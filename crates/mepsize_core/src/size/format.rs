//! Canonical size rendering.
//!
//! # Responsibility
//! - Clean raw size input, classify it and re-render it canonically.
//!
//! # Invariants
//! - Formatting never fails: unparseable content passes through at the
//!   smallest granularity available (per dimension once split).
//! - Vulgar fractions are rendered verbatim, never decimalized.
//! - Numeric output is locale-invariant.

use crate::config::FormatterConfig;
use crate::size::classify::{classify, SizeKind, FRACTION_RE, INCH_MARKS};
use crate::size::nominal;
use crate::size::number::parse_number;
use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;

/// Characters splitting a size into dimensions.
const SEPARATORS: &[char] = &['x', 'X', '\u{00D7}', '-', '*'];

/// `DN`/`NW` prefix not preceded by a letter other than the `x` separator.
///
/// Group 1 keeps the preceding character.
static NOISE_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^|[^a-wyz])\s*(?:DN|NW)\s*").expect("valid noise token regex")
});
/// Unit suffix standing alone: no letter other than `x` on either side.
///
/// Groups 1 and 2 keep the neighbouring characters.
static UNIT_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^|[^a-wyz])(?:mm|inch(?:es)?|in)([^a-wyz]|$)")
        .expect("valid unit token regex")
});

/// One component of a split size.
#[derive(Debug, Clone, PartialEq)]
pub enum Dimension {
    /// Token parsed as a number.
    Parsed(f64),
    /// Token that did not parse, carried through verbatim.
    Opaque(String),
}

impl Dimension {
    /// Parses one token, keeping it verbatim when it is not numeric.
    pub fn parse(token: &str) -> Self {
        match parse_number(token) {
            Some(value) => Self::Parsed(value),
            None => Self::Opaque(token.to_string()),
        }
    }

    /// Parsed value, `None` for opaque tokens.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Parsed(value) => Some(*value),
            Self::Opaque(_) => None,
        }
    }
}

/// Splits a size on dimension separators, dropping empty parts.
pub fn split_dimensions(value: &str) -> Vec<Dimension> {
    value
        .split(SEPARATORS)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(Dimension::parse)
        .collect()
}

/// Formats raw size strings into their canonical display form.
#[derive(Debug, Clone, Default)]
pub struct SizeFormatter {
    config: FormatterConfig,
}

impl SizeFormatter {
    /// Creates a formatter with explicit knobs; `Default` uses the stock ones.
    pub fn new(config: FormatterConfig) -> Self {
        Self { config }
    }

    /// Active formatting knobs.
    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    /// Formats `raw` using `category_name` as the authoritative shape hint.
    ///
    /// Blank input comes back trimmed (possibly empty).
    pub fn format(&self, raw: &str, category_name: Option<&str>) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return trimmed.to_string();
        }

        let cleaned = strip_noise_tokens(trimmed);
        let kind = classify(category_name, &cleaned);
        let formatted = match kind {
            SizeKind::Round => self.format_round(raw, &cleaned),
            SizeKind::Rectangular => self.format_rectangular(&cleaned),
        };
        trace!(
            "event=size_format module=size status=ok kind={:?} input_chars={} output_chars={}",
            kind,
            raw.chars().count(),
            formatted.chars().count()
        );
        formatted
    }

    fn format_round(&self, raw: &str, cleaned: &str) -> String {
        let without_units = UNIT_TOKEN_RE.replace_all(cleaned, "${1} ${2}");
        let stripped = collapse_whitespace(&without_units.replace(INCH_MARKS, " "));

        if let Some(caps) = FRACTION_RE.captures(&stripped) {
            let numerator = &caps[2];
            let denominator = &caps[3];
            return match caps.get(1) {
                Some(whole) => format!("{} {numerator}/{denominator}\"", whole.as_str()),
                None => format!("{numerator}/{denominator}\""),
            };
        }

        if stripped.contains(SEPARATORS) {
            let parts = split_dimensions(&stripped);
            if parts.is_empty() {
                return raw.to_string();
            }
            return parts
                .iter()
                .map(|part| match part {
                    Dimension::Parsed(value) => self.format_pipe_value(*value),
                    Dimension::Opaque(text) => text.clone(),
                })
                .collect::<Vec<_>>()
                .join("x");
        }

        match parse_number(&stripped) {
            Some(value) => self.format_pipe_value(value),
            None => raw.to_string(),
        }
    }

    /// Single round value: nominal label, small inch decimal, or `DN<mm>`.
    fn format_pipe_value(&self, value: f64) -> String {
        if let Some(label) = nominal::lookup(value, self.config.nominal_tolerance_mm) {
            return label.to_string();
        }
        if value < self.config.inch_threshold {
            return format_inch_decimal(value);
        }
        format!("DN{}", render_integer(value))
    }

    fn format_rectangular(&self, cleaned: &str) -> String {
        let stripped = strip_noise_tokens(cleaned);

        if stripped.contains(SEPARATORS) {
            let dimensions = self.arrange_dimensions(split_dimensions(&stripped));
            if dimensions.is_empty() {
                return format!("DN{stripped}");
            }
            let joined = dimensions
                .iter()
                .map(|dimension| match dimension {
                    Dimension::Parsed(value) => render_integer(*value),
                    Dimension::Opaque(text) => text.clone(),
                })
                .collect::<Vec<_>>()
                .join("x");
            return format!("DN{joined}");
        }

        match parse_number(&stripped) {
            Some(value) => format!("DN{}", render_integer(value)),
            None => format!("DN{stripped}"),
        }
    }

    /// Larger of two dimensions first; three collapse to two when the first
    /// pair is equal. Decisions use the unrounded values.
    fn arrange_dimensions(&self, mut dimensions: Vec<Dimension>) -> Vec<Dimension> {
        let first = dimensions.first().and_then(Dimension::value);
        let second = dimensions.get(1).and_then(Dimension::value);
        match (dimensions.len(), first, second) {
            (2, Some(a), Some(b)) if a < b => dimensions.swap(0, 1),
            (3, Some(a), Some(b)) if self.is_same_dimension(a, b) => {
                dimensions.remove(1);
            }
            _ => {}
        }
        dimensions
    }

    fn is_same_dimension(&self, a: f64, b: f64) -> bool {
        let difference = (a - b).abs();
        if difference < self.config.collapse_tolerance {
            return true;
        }
        let percent = self.config.collapse_relative_percent;
        percent > 0.0 && difference * 100.0 <= percent * a.abs().max(b.abs())
    }
}

/// Formats a raw size with the default configuration.
pub fn format_size(raw: &str, category_name: Option<&str>) -> String {
    SizeFormatter::default().format(raw, category_name)
}

fn strip_noise_tokens(value: &str) -> String {
    collapse_whitespace(&NOISE_TOKEN_RE.replace_all(value, "${1} "))
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn format_inch_decimal(value: f64) -> String {
    let fixed = format!("{value:.1}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Nearest whole number without an integer cast, so large values keep
/// their digits.
fn render_integer(value: f64) -> String {
    let rounded = value.round();
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{rounded:.0}")
    }
}

#[cfg(test)]
mod tests {
    use super::{
        format_inch_decimal, render_integer, split_dimensions, strip_noise_tokens, Dimension,
        SizeFormatter, UNIT_TOKEN_RE,
    };
    use crate::config::FormatterConfig;

    #[test]
    fn inch_decimal_drops_trailing_zero_and_point() {
        assert_eq!(format_inch_decimal(4.0), "4");
        assert_eq!(format_inch_decimal(4.5), "4.5");
        assert_eq!(format_inch_decimal(0.04), "0");
        assert_eq!(format_inch_decimal(-0.04), "0");
        assert_eq!(format_inch_decimal(2.3), "2.3");
    }

    #[test]
    fn split_keeps_unparsed_parts_verbatim() {
        assert_eq!(
            split_dimensions("200 x abc"),
            vec![Dimension::Parsed(200.0), Dimension::Opaque("abc".to_string())]
        );
        assert_eq!(split_dimensions("200x"), vec![Dimension::Parsed(200.0)]);
    }

    #[test]
    fn tokens_inside_words_are_kept() {
        assert_eq!(strip_noise_tokens("Rainwater"), "Rainwater");
        assert_eq!(strip_noise_tokens("Condenser DN 50"), "Condenser 50");
        assert_eq!(strip_noise_tokens("DN 200 x DN 100"), "200 x 100");
        assert_eq!(
            UNIT_TOKEN_RE.replace_all("Sprinkler 25mm", "${1} ${2}"),
            "Sprinkler 25 "
        );
        assert_eq!(UNIT_TOKEN_RE.replace_all("2in", "${1} ${2}"), "2 ");
    }

    #[test]
    fn large_values_render_without_saturating() {
        assert_eq!(render_integer(1e20), "100000000000000000000");
        assert_eq!(render_integer(-0.4), "0");
        assert_eq!(render_integer(199.5), "200");
    }

    #[test]
    fn collapse_uses_absolute_and_relative_tolerance() {
        let formatter = SizeFormatter::default();
        assert!(formatter.is_same_dimension(200.0, 199.5));
        assert!(formatter.is_same_dimension(200.0, 198.0));
        assert!(!formatter.is_same_dimension(200.0, 197.0));
        assert!(!formatter.is_same_dimension(50.0, 48.0));
    }

    #[test]
    fn relative_collapse_can_be_disabled() {
        let formatter = SizeFormatter::new(FormatterConfig {
            collapse_relative_percent: 0.0,
            ..FormatterConfig::default()
        });
        assert_eq!(formatter.format("200x198x100", Some("Ducts")), "DN200x198x100");
        assert_eq!(formatter.format("200x199.5x100", Some("Ducts")), "DN200x100");
    }

    #[test]
    fn custom_inch_threshold_moves_the_decimal_cutoff() {
        let formatter = SizeFormatter::new(FormatterConfig {
            inch_threshold: 2.0,
            ..FormatterConfig::default()
        });
        assert_eq!(formatter.format("4", Some("Pipes")), "DN4");
        assert_eq!(formatter.format("1.5", Some("Pipes")), "1.5");
    }
}
