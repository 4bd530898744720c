//! Numeric token parsing for free-form size input.
//!
//! # Responsibility
//! - Turn one size token (`12,5`, `3/4`, `DN50mm`) into an `f64`.
//!
//! # Invariants
//! - Output is culture-invariant: comma is accepted as a decimal separator on
//!   input, never produced.
//! - Parsing never panics; every malformed token yields `None`.

/// Smallest denominator magnitude accepted for vulgar fractions.
const MIN_DENOMINATOR: f64 = 1e-9;

/// Parses a numeric token, tolerating noise characters.
///
/// Everything except digits, sign, comma, dot and slash is dropped first.
/// A single remaining `/` makes the token a vulgar fraction `num/den`.
///
/// Returns `None` for empty input, malformed fractions, zero denominators and
/// non-numeric content.
pub fn parse_number(token: &str) -> Option<f64> {
    let kept: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | ',' | '.' | '/'))
        .collect();
    if kept.is_empty() {
        return None;
    }

    if kept.matches('/').count() == 1 {
        let (num, den) = kept.split_once('/')?;
        let num = parse_decimal(num)?;
        let den = parse_decimal(den)?;
        if den.abs() < MIN_DENOMINATOR {
            return None;
        }
        let value = num / den;
        return value.is_finite().then_some(value);
    }

    parse_decimal(&kept)
}

fn parse_decimal(text: &str) -> Option<f64> {
    let normalized = text.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
