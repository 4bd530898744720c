//! Batch size normalization over a document.
//!
//! # Responsibility
//! - Run the size job (read raw size, format, write canonical size) and the
//!   optional quantity job for every entity of a batch.
//! - Report per-entity outcomes and batch totals.
//!
//! # Invariants
//! - Entities are processed sequentially, in the given order.
//! - A failure on one entity never stops the batch.
//! - One service instance is one processing session: the type attribute
//!   cache lives as long as the service unless `clear_cache()` is called.

use crate::attribute::accessor::DocumentAccessor;
use crate::attribute::coercion::{read_number, read_text, UpdateOutcome, ValueUpdater};
use crate::attribute::model::EntityId;
use crate::attribute::resolver::AttributeResolver;
use crate::config::{BatchConfig, CoreConfig, QuantityConfig, UpdatePolicy};
use crate::size::format::SizeFormatter;
use log::{debug, info};
use serde::Serialize;

/// Outcome of one job on one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOutcome {
    Updated,
    Unchanged,
    Failed,
    MissingSource,
    EmptySource,
    MissingTarget,
}

impl From<UpdateOutcome> for FieldOutcome {
    fn from(value: UpdateOutcome) -> Self {
        match value {
            UpdateOutcome::Updated => Self::Updated,
            UpdateOutcome::Unchanged => Self::Unchanged,
            UpdateOutcome::Failed => Self::Failed,
        }
    }
}

/// Per-entity batch result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityReport {
    pub entity: EntityId,
    pub category: Option<String>,
    /// `true` when the category does not take part in the batch.
    pub skipped: bool,
    pub size: Option<FieldOutcome>,
    /// Canonical size computed for the entity, when a source was read.
    pub formatted_size: Option<String>,
    /// `None` when no quantity job is configured or the entity was skipped.
    pub quantity: Option<FieldOutcome>,
}

impl EntityReport {
    fn skipped(entity: EntityId, category: Option<String>) -> Self {
        Self {
            entity,
            category,
            skipped: true,
            size: None,
            formatted_size: None,
            quantity: None,
        }
    }
}

/// Outcome counts for one job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldTally {
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub missing_source: usize,
    pub empty_source: usize,
    pub missing_target: usize,
}

impl FieldTally {
    fn record(&mut self, outcome: FieldOutcome) {
        let counter = match outcome {
            FieldOutcome::Updated => &mut self.updated,
            FieldOutcome::Unchanged => &mut self.unchanged,
            FieldOutcome::Failed => &mut self.failed,
            FieldOutcome::MissingSource => &mut self.missing_source,
            FieldOutcome::EmptySource => &mut self.empty_source,
            FieldOutcome::MissingTarget => &mut self.missing_target,
        };
        *counter += 1;
    }
}

/// Totals and per-entity results of one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub processed: usize,
    pub skipped_category: usize,
    pub size: FieldTally,
    pub quantity: FieldTally,
    pub entities: Vec<EntityReport>,
}

/// Size/quantity normalization session.
pub struct BatchService {
    formatter: SizeFormatter,
    policy: UpdatePolicy,
    batch: BatchConfig,
    resolver: AttributeResolver,
}

impl BatchService {
    /// Creates a session from a validated config.
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            formatter: SizeFormatter::new(config.formatter.clone()),
            policy: config.update.clone(),
            batch: config.batch.clone(),
            resolver: AttributeResolver::new(),
        }
    }

    pub fn resolver(&self) -> &AttributeResolver {
        &self.resolver
    }

    /// Ends the session's cache; required before reusing the service on a
    /// document whose attribute layout may have changed.
    pub fn clear_cache(&mut self) {
        self.resolver.clear_cache();
    }

    /// Processes `entities` in order and returns the batch report.
    pub fn run<D>(&mut self, doc: &mut D, entities: &[EntityId]) -> BatchReport
    where
        D: DocumentAccessor + ?Sized,
    {
        let mut report = BatchReport::default();
        for entity in entities {
            let entry = self.process_entity(doc, *entity);
            if entry.skipped {
                report.skipped_category += 1;
            } else {
                report.processed += 1;
            }
            if let Some(outcome) = entry.size {
                report.size.record(outcome);
            }
            if let Some(outcome) = entry.quantity {
                report.quantity.record(outcome);
            }
            report.entities.push(entry);
        }

        info!(
            "event=batch_run module=service status=ok processed={} skipped_category={} size_updated={} size_unchanged={} size_failed={} quantity_updated={} types_indexed={}",
            report.processed,
            report.skipped_category,
            report.size.updated,
            report.size.unchanged,
            report.size.failed,
            report.quantity.updated,
            self.resolver.cache().len()
        );
        report
    }

    /// Processes one entity.
    pub fn process_entity<D>(&mut self, doc: &mut D, entity: EntityId) -> EntityReport
    where
        D: DocumentAccessor + ?Sized,
    {
        let category = doc.category_name(entity).unwrap_or_else(|err| {
            debug!(
                "event=entity_category module=service status=error entity={} error={}",
                entity, err
            );
            None
        });
        if !self.batch.accepts_category(category.as_deref()) {
            debug!(
                "event=entity_process module=service status=skip reason=category entity={}",
                entity
            );
            return EntityReport::skipped(entity, category);
        }

        let (size, formatted_size) = self.normalize_size(doc, entity, category.as_deref());
        let quantity = self
            .batch
            .quantity
            .clone()
            .map(|job| self.copy_quantity(doc, entity, &job));

        debug!(
            "event=entity_process module=service status=ok entity={} size={:?} quantity={:?}",
            entity, size, quantity
        );
        EntityReport {
            entity,
            category,
            skipped: false,
            size: Some(size),
            formatted_size,
            quantity,
        }
    }

    fn normalize_size<D>(
        &mut self,
        doc: &mut D,
        entity: EntityId,
        category: Option<&str>,
    ) -> (FieldOutcome, Option<String>)
    where
        D: DocumentAccessor + ?Sized,
    {
        let Some(source) = self
            .resolver
            .resolve(&*doc, entity, &self.batch.source_attribute)
        else {
            return (FieldOutcome::MissingSource, None);
        };
        let raw = match read_text(&*doc, &source) {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return (FieldOutcome::EmptySource, None),
        };

        let formatted = self.formatter.format(&raw, category);
        let Some(target) =
            self.resolver
                .resolve_instance_or_type(&*doc, entity, &self.batch.target_attribute)
        else {
            return (FieldOutcome::MissingTarget, Some(formatted));
        };

        let outcome = ValueUpdater::new(&mut self.resolver, self.policy.clone())
            .update_text_outcome(doc, &target, entity, &formatted);
        (outcome.into(), Some(formatted))
    }

    fn copy_quantity<D>(&mut self, doc: &mut D, entity: EntityId, job: &QuantityConfig) -> FieldOutcome
    where
        D: DocumentAccessor + ?Sized,
    {
        let Some(source) = self.resolver.resolve(&*doc, entity, &job.source_attribute) else {
            return FieldOutcome::MissingSource;
        };
        let Some(value) = read_number(&*doc, &source) else {
            return FieldOutcome::EmptySource;
        };
        let Some(target) =
            self.resolver
                .resolve_instance_or_type(&*doc, entity, &job.target_attribute)
        else {
            return FieldOutcome::MissingTarget;
        };

        ValueUpdater::new(&mut self.resolver, self.policy.clone())
            .update_numeric_outcome(doc, &target, entity, value * job.scale)
            .into()
    }
}
