//! Typed reads and idempotent writes across storage kinds.
//!
//! # Responsibility
//! - Extract text/number views of any stored value.
//! - Write only when the new value differs under kind-specific comparison.
//! - Retry a failed write once against the owning-type attribute.
//!
//! # Invariants
//! - Every (value kind, storage kind) pair has exactly one conversion.
//! - Public update calls never return errors; failures become
//!   `UpdateOutcome::Failed` and are logged.

use crate::attribute::accessor::{AccessError, AccessResult, DocumentAccessor};
use crate::attribute::model::{AttributeHandle, AttributeValue, EntityId, StorageKind, StoredValue};
use crate::attribute::resolver::AttributeResolver;
use crate::config::UpdatePolicy;
use crate::size::number::parse_number;
use log::{debug, warn};
use serde::Serialize;

/// Result of an idempotent update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// A write happened.
    Updated,
    /// Target already held an equivalent value, or there was nothing to write.
    Unchanged,
    /// Primary and fallback writes were both impossible.
    Failed,
}

impl UpdateOutcome {
    pub fn is_updated(self) -> bool {
        matches!(self, Self::Updated)
    }
}

/// Converts `value` into the representation of `target`.
///
/// Returns `None` when text does not parse as a number, or when a value
/// falls outside the `i64` range of integer storage.
pub fn convert_value(
    value: &AttributeValue,
    target: StorageKind,
    text_decimals: usize,
) -> Option<AttributeValue> {
    match (value, target) {
        (AttributeValue::Text(text), StorageKind::Text) => Some(AttributeValue::Text(text.clone())),
        (AttributeValue::Text(text), StorageKind::Number) => {
            parse_number(text).map(AttributeValue::Number)
        }
        (AttributeValue::Text(text), StorageKind::Integer) => {
            parse_number(text)
                .and_then(round_to_integer)
                .map(AttributeValue::Integer)
        }
        (AttributeValue::Number(number), StorageKind::Text) => Some(AttributeValue::Text(
            format!("{number:.text_decimals$}"),
        )),
        (AttributeValue::Number(number), StorageKind::Number) => {
            Some(AttributeValue::Number(*number))
        }
        (AttributeValue::Number(number), StorageKind::Integer) => {
            round_to_integer(*number).map(AttributeValue::Integer)
        }
        (AttributeValue::Integer(integer), StorageKind::Text) => {
            Some(AttributeValue::Text(integer.to_string()))
        }
        (AttributeValue::Integer(integer), StorageKind::Number) => {
            Some(AttributeValue::Number(*integer as f64))
        }
        (AttributeValue::Integer(integer), StorageKind::Integer) => {
            Some(AttributeValue::Integer(*integer))
        }
    }
}

/// Text view of a stored value: native text, then display form, then the
/// invariant rendering of numeric storage.
pub fn stored_text(stored: &StoredValue) -> Option<String> {
    if let Some(AttributeValue::Text(text)) = &stored.value {
        return Some(text.clone());
    }
    if let Some(display) = &stored.display {
        return Some(display.clone());
    }
    match &stored.value {
        Some(AttributeValue::Number(number)) => Some(number.to_string()),
        Some(AttributeValue::Integer(integer)) => Some(integer.to_string()),
        Some(AttributeValue::Text(_)) | None => None,
    }
}

/// Numeric view of a stored value: native number, then parsed text, then
/// parsed display form.
pub fn stored_number(stored: &StoredValue) -> Option<f64> {
    let native = match &stored.value {
        Some(AttributeValue::Number(number)) => Some(*number),
        Some(AttributeValue::Integer(integer)) => Some(*integer as f64),
        Some(AttributeValue::Text(text)) => parse_number(text),
        None => None,
    };
    native.or_else(|| stored.display.as_deref().and_then(parse_number))
}

/// Reads the text view of `handle`; read failures read as absent.
pub fn read_text<D>(doc: &D, handle: &AttributeHandle) -> Option<String>
where
    D: DocumentAccessor + ?Sized,
{
    read_stored(doc, handle).as_ref().and_then(stored_text)
}

/// Reads the numeric view of `handle`; read failures read as absent.
pub fn read_number<D>(doc: &D, handle: &AttributeHandle) -> Option<f64>
where
    D: DocumentAccessor + ?Sized,
{
    read_stored(doc, handle).as_ref().and_then(stored_number)
}

fn read_stored<D>(doc: &D, handle: &AttributeHandle) -> Option<StoredValue>
where
    D: DocumentAccessor + ?Sized,
{
    match doc.read_value(handle) {
        Ok(stored) => Some(stored),
        Err(err) => {
            debug!(
                "event=attribute_read module=attribute status=error attribute={} error={}",
                handle.name(),
                err
            );
            None
        }
    }
}

/// Idempotent writer with a type-level fallback path.
pub struct ValueUpdater<'r> {
    resolver: &'r mut AttributeResolver,
    policy: UpdatePolicy,
}

impl<'r> ValueUpdater<'r> {
    pub fn new(resolver: &'r mut AttributeResolver, policy: UpdatePolicy) -> Self {
        Self { resolver, policy }
    }

    /// Writes `new_value` as text; `true` only when a write happened.
    pub fn update_text<D>(
        &mut self,
        doc: &mut D,
        handle: &AttributeHandle,
        entity: EntityId,
        new_value: &str,
    ) -> bool
    where
        D: DocumentAccessor + ?Sized,
    {
        self.update_text_outcome(doc, handle, entity, new_value)
            .is_updated()
    }

    /// Text update reporting `Updated`, `Unchanged` or `Failed`.
    ///
    /// Blank input is `Unchanged`. Current and new values compare trimmed and
    /// case-insensitively.
    pub fn update_text_outcome<D>(
        &mut self,
        doc: &mut D,
        handle: &AttributeHandle,
        entity: EntityId,
        new_value: &str,
    ) -> UpdateOutcome
    where
        D: DocumentAccessor + ?Sized,
    {
        let new_value = new_value.trim();
        if new_value.is_empty() {
            return UpdateOutcome::Unchanged;
        }
        let policy = self.policy.clone();
        self.write_with_fallback(doc, handle, entity, |doc, target| {
            write_text(doc, target, new_value, &policy)
        })
    }

    /// Writes `new_value` numerically; `true` only when a write happened.
    pub fn update_numeric<D>(
        &mut self,
        doc: &mut D,
        handle: &AttributeHandle,
        entity: EntityId,
        new_value: f64,
    ) -> bool
    where
        D: DocumentAccessor + ?Sized,
    {
        self.update_numeric_outcome(doc, handle, entity, new_value)
            .is_updated()
    }

    /// Numeric update using the comparison rule of the slot's storage kind.
    ///
    /// - Number: absolute tolerance from `UpdatePolicy::float_tolerance`.
    /// - Integer: rounded to nearest, compared exactly.
    /// - Text: fixed decimals, compared as trimmed strings.
    pub fn update_numeric_outcome<D>(
        &mut self,
        doc: &mut D,
        handle: &AttributeHandle,
        entity: EntityId,
        new_value: f64,
    ) -> UpdateOutcome
    where
        D: DocumentAccessor + ?Sized,
    {
        if !new_value.is_finite() {
            debug!(
                "event=attribute_update module=attribute status=skip reason=non_finite attribute={}",
                handle.name()
            );
            return UpdateOutcome::Failed;
        }
        let policy = self.policy.clone();
        self.write_with_fallback(doc, handle, entity, |doc, target| {
            write_number(doc, target, new_value, &policy)
        })
    }

    fn write_with_fallback<D, F>(
        &mut self,
        doc: &mut D,
        handle: &AttributeHandle,
        entity: EntityId,
        write: F,
    ) -> UpdateOutcome
    where
        D: DocumentAccessor + ?Sized,
        F: Fn(&mut D, &AttributeHandle) -> AccessResult<UpdateOutcome>,
    {
        let primary_err = match write(&mut *doc, handle) {
            Ok(outcome) => return outcome,
            Err(err) => err,
        };
        debug!(
            "event=attribute_update module=attribute status=retry entity={} attribute={} error={}",
            entity,
            handle.name(),
            primary_err
        );

        let Some(fallback) = self.resolver.resolve_type(&*doc, entity, handle.name()) else {
            return UpdateOutcome::Failed;
        };
        if fallback == *handle {
            return UpdateOutcome::Failed;
        }

        match write(&mut *doc, &fallback) {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(
                    "event=attribute_update module=attribute status=error entity={} attribute={} error={}",
                    entity,
                    handle.name(),
                    err
                );
                UpdateOutcome::Failed
            }
        }
    }
}

fn write_text<D>(
    doc: &mut D,
    handle: &AttributeHandle,
    new_value: &str,
    policy: &UpdatePolicy,
) -> AccessResult<UpdateOutcome>
where
    D: DocumentAccessor + ?Sized,
{
    if handle.kind() == StorageKind::Text {
        let unchanged = read_text(&*doc, handle)
            .is_some_and(|current| current.trim().to_lowercase() == new_value.to_lowercase());
        if unchanged {
            return Ok(UpdateOutcome::Unchanged);
        }
    }

    let value = convert_for(handle, &AttributeValue::Text(new_value.to_string()), policy)?;
    if holds_equivalent(&*doc, handle, &value, policy) {
        return Ok(UpdateOutcome::Unchanged);
    }
    commit(doc, handle, value)
}

fn write_number<D>(
    doc: &mut D,
    handle: &AttributeHandle,
    new_value: f64,
    policy: &UpdatePolicy,
) -> AccessResult<UpdateOutcome>
where
    D: DocumentAccessor + ?Sized,
{
    let value = convert_for(handle, &AttributeValue::Number(new_value), policy)?;
    if holds_equivalent(&*doc, handle, &value, policy) {
        return Ok(UpdateOutcome::Unchanged);
    }
    commit(doc, handle, value)
}

fn convert_for(
    handle: &AttributeHandle,
    value: &AttributeValue,
    policy: &UpdatePolicy,
) -> AccessResult<AttributeValue> {
    convert_value(value, handle.kind(), policy.text_decimals).ok_or_else(|| {
        AccessError::Unconvertible {
            attribute: handle.name().to_string(),
            kind: handle.kind(),
        }
    })
}

/// Compares an already converted value with the slot using its kind's rule.
fn holds_equivalent<D>(
    doc: &D,
    handle: &AttributeHandle,
    value: &AttributeValue,
    policy: &UpdatePolicy,
) -> bool
where
    D: DocumentAccessor + ?Sized,
{
    match value {
        AttributeValue::Number(number) => read_number(doc, handle)
            .is_some_and(|current| (current - number).abs() <= policy.float_tolerance),
        AttributeValue::Integer(integer) => read_number(doc, handle)
            .and_then(round_to_integer)
            .is_some_and(|current| current == *integer),
        AttributeValue::Text(text) => {
            read_text(doc, handle).is_some_and(|current| current.trim() == text.trim())
        }
    }
}

fn commit<D>(doc: &mut D, handle: &AttributeHandle, value: AttributeValue) -> AccessResult<UpdateOutcome>
where
    D: DocumentAccessor + ?Sized,
{
    if handle.is_read_only() {
        return Err(AccessError::ReadOnly(handle.name().to_string()));
    }
    doc.write_value(handle, value)?;
    debug!(
        "event=attribute_update module=attribute status=ok attribute={} kind={}",
        handle.name(),
        handle.kind().as_str()
    );
    Ok(UpdateOutcome::Updated)
}

/// Nearest integer, or `None` outside the `i64` range.
fn round_to_integer(value: f64) -> Option<i64> {
    let rounded = value.round();
    // `i64::MAX as f64` is 2^63, one past the largest i64.
    (rounded >= i64::MIN as f64 && rounded < i64::MAX as f64).then_some(rounded as i64)
}

#[cfg(test)]
mod tests {
    use super::{convert_value, stored_number, stored_text};
    use crate::attribute::model::{AttributeValue, StorageKind, StoredValue};

    #[test]
    fn conversion_matrix_covers_every_pair() {
        let text = AttributeValue::Text("12,5".to_string());
        assert_eq!(
            convert_value(&text, StorageKind::Number, 2),
            Some(AttributeValue::Number(12.5))
        );
        assert_eq!(
            convert_value(&text, StorageKind::Integer, 2),
            Some(AttributeValue::Integer(13))
        );
        assert_eq!(convert_value(&text, StorageKind::Text, 2), Some(text.clone()));

        let number = AttributeValue::Number(1.005_1);
        assert_eq!(
            convert_value(&number, StorageKind::Text, 2),
            Some(AttributeValue::Text("1.01".to_string()))
        );
        assert_eq!(
            convert_value(&number, StorageKind::Integer, 2),
            Some(AttributeValue::Integer(1))
        );

        let integer = AttributeValue::Integer(7);
        assert_eq!(
            convert_value(&integer, StorageKind::Number, 2),
            Some(AttributeValue::Number(7.0))
        );
        assert_eq!(
            convert_value(&integer, StorageKind::Text, 2),
            Some(AttributeValue::Text("7".to_string()))
        );
    }

    #[test]
    fn integer_conversion_rejects_out_of_range_values() {
        assert_eq!(
            convert_value(&AttributeValue::Number(1e20), StorageKind::Integer, 2),
            None
        );
        assert_eq!(
            convert_value(&AttributeValue::Number(-1e19), StorageKind::Integer, 2),
            None
        );
        assert_eq!(
            convert_value(
                &AttributeValue::Text("100000000000000000000".to_string()),
                StorageKind::Integer,
                2
            ),
            None
        );
        assert_eq!(
            convert_value(&AttributeValue::Number(-4.0e18), StorageKind::Integer, 2),
            Some(AttributeValue::Integer(-4_000_000_000_000_000_000))
        );
    }

    #[test]
    fn non_numeric_text_cannot_become_a_number() {
        let text = AttributeValue::Text("DN".to_string());
        assert_eq!(convert_value(&text, StorageKind::Number, 2), None);
        assert_eq!(convert_value(&text, StorageKind::Integer, 2), None);
    }

    #[test]
    fn text_view_prefers_native_then_display_then_number() {
        let native = StoredValue::new(AttributeValue::Text("DN50".to_string())).with_display("x");
        assert_eq!(stored_text(&native).as_deref(), Some("DN50"));

        let display = StoredValue::new(AttributeValue::Number(0.05)).with_display("50 mm");
        assert_eq!(stored_text(&display).as_deref(), Some("50 mm"));

        let number = StoredValue::new(AttributeValue::Number(1.5));
        assert_eq!(stored_text(&number).as_deref(), Some("1.5"));

        assert_eq!(stored_text(&StoredValue::default()), None);
    }

    #[test]
    fn number_view_parses_text_and_display() {
        let text = StoredValue::new(AttributeValue::Text("12,5 mm".to_string()));
        assert_eq!(stored_number(&text), Some(12.5));

        let display_only = StoredValue {
            value: None,
            display: Some("40".to_string()),
        };
        assert_eq!(stored_number(&display_only), Some(40.0));
    }
}
