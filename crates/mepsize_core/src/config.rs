//! Runtime configuration for size formatting, updates and batch runs.
//!
//! # Responsibility
//! - Hold tunable tolerances and batch attribute names in one serde model.
//! - Validate values before any processing starts.
//!
//! # Invariants
//! - Every field has a default, so a partial JSON document is a valid config.
//! - A config that passed `validate()` never makes formatting panic.

use crate::size::nominal::DEFAULT_NOMINAL_TOLERANCE_MM;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Configuration load/validation errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Tolerance or threshold is negative or not finite.
    InvalidValue { field: &'static str, value: f64 },
    /// Attribute name is blank.
    EmptyAttributeName(&'static str),
    /// JSON text could not be decoded.
    Decode(serde_json::Error),
    /// Config file could not be read.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { field, value } => {
                write!(f, "config field `{field}` has invalid value {value}")
            }
            Self::EmptyAttributeName(field) => {
                write!(f, "config field `{field}` must not be blank")
            }
            Self::Decode(err) => write!(f, "invalid config json: {err}"),
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::InvalidValue { .. } | Self::EmptyAttributeName(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value)
    }
}

/// Size formatting knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterConfig {
    /// Window for nominal pipe size lookup, in millimeters.
    pub nominal_tolerance_mm: f64,
    /// Round values below this are already inches and render as decimals.
    pub inch_threshold: f64,
    /// Absolute difference under which the first two of three rectangular
    /// dimensions are treated as equal.
    pub collapse_tolerance: f64,
    /// Relative difference (percent of the larger value) that also counts as
    /// equal for the three-dimension collapse. `0` disables it.
    pub collapse_relative_percent: f64,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            nominal_tolerance_mm: DEFAULT_NOMINAL_TOLERANCE_MM,
            inch_threshold: 6.0,
            collapse_tolerance: 1.0,
            collapse_relative_percent: 1.0,
        }
    }
}

/// Comparison rules for idempotent writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdatePolicy {
    /// Absolute tolerance for floating-point storage.
    pub float_tolerance: f64,
    /// Fixed decimals used when a number is written to text storage.
    pub text_decimals: usize,
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self {
            float_tolerance: 1e-6,
            text_decimals: 2,
        }
    }
}

/// Batch size-normalization job settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Attribute holding the raw, user-entered size.
    pub source_attribute: String,
    /// Attribute receiving the canonical size.
    pub target_attribute: String,
    /// Participating category names, compared case-insensitively.
    /// Empty means every category participates.
    pub categories: BTreeSet<String>,
    /// Optional numeric copy run alongside the size job.
    pub quantity: Option<QuantityConfig>,
}

/// Numeric quantity copy: `target = source * scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantityConfig {
    pub source_attribute: String,
    pub target_attribute: String,
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            source_attribute: "Size".to_string(),
            target_attribute: "Nominal Size".to_string(),
            categories: BTreeSet::new(),
            quantity: None,
        }
    }
}

impl BatchConfig {
    /// Returns whether an element of `category` takes part in the batch.
    pub fn accepts_category(&self, category: Option<&str>) -> bool {
        if self.categories.is_empty() {
            return true;
        }
        let Some(category) = category.map(str::trim) else {
            return false;
        };
        self.categories
            .iter()
            .any(|allowed| allowed.trim().eq_ignore_ascii_case(category))
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub formatter: FormatterConfig,
    pub update: UpdatePolicy,
    pub batch: BatchConfig,
}

impl CoreConfig {
    /// Decodes and validates a JSON config document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, decodes and validates a JSON config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Checks that tolerances are usable and attribute names are present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative(
            "formatter.nominal_tolerance_mm",
            self.formatter.nominal_tolerance_mm,
        )?;
        check_non_negative("formatter.inch_threshold", self.formatter.inch_threshold)?;
        check_non_negative(
            "formatter.collapse_tolerance",
            self.formatter.collapse_tolerance,
        )?;
        check_non_negative(
            "formatter.collapse_relative_percent",
            self.formatter.collapse_relative_percent,
        )?;
        check_non_negative("update.float_tolerance", self.update.float_tolerance)?;

        if self.batch.source_attribute.trim().is_empty() {
            return Err(ConfigError::EmptyAttributeName("batch.source_attribute"));
        }
        if self.batch.target_attribute.trim().is_empty() {
            return Err(ConfigError::EmptyAttributeName("batch.target_attribute"));
        }
        if let Some(quantity) = &self.batch.quantity {
            if quantity.source_attribute.trim().is_empty() {
                return Err(ConfigError::EmptyAttributeName(
                    "batch.quantity.source_attribute",
                ));
            }
            if quantity.target_attribute.trim().is_empty() {
                return Err(ConfigError::EmptyAttributeName(
                    "batch.quantity.target_attribute",
                ));
            }
            if !quantity.scale.is_finite() {
                return Err(ConfigError::InvalidValue {
                    field: "batch.quantity.scale",
                    value: quantity.scale,
                });
            }
        }
        Ok(())
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::{BatchConfig, ConfigError, CoreConfig};

    #[test]
    fn defaults_validate() {
        CoreConfig::default()
            .validate()
            .expect("default config should be valid");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = CoreConfig::from_json_str(r#"{"update": {"float_tolerance": 0.01}}"#)
            .expect("partial config should decode");
        assert_eq!(config.update.float_tolerance, 0.01);
        assert_eq!(config.update.text_decimals, 2);
        assert_eq!(config.formatter.nominal_tolerance_mm, 0.6);
        assert_eq!(config.batch.source_attribute, "Size");
    }

    #[test]
    fn rejects_negative_tolerance() {
        let err = CoreConfig::from_json_str(r#"{"formatter": {"nominal_tolerance_mm": -1}}"#)
            .expect_err("negative tolerance must fail");
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "formatter.nominal_tolerance_mm",
                ..
            }
        ));
    }

    #[test]
    fn rejects_blank_attribute_names() {
        let err = CoreConfig::from_json_str(r#"{"batch": {"target_attribute": "  "}}"#)
            .expect_err("blank target must fail");
        assert!(matches!(
            err,
            ConfigError::EmptyAttributeName("batch.target_attribute")
        ));
    }

    #[test]
    fn quantity_job_defaults_scale_to_one() {
        let config = CoreConfig::from_json_str(
            r#"{"batch": {"quantity": {"source_attribute": "Length", "target_attribute": "Qty"}}}"#,
        )
        .expect("quantity config should decode");
        let quantity = config.batch.quantity.expect("quantity job should be set");
        assert_eq!(quantity.scale, 1.0);
        assert_eq!(quantity.target_attribute, "Qty");
    }

    #[test]
    fn rejects_malformed_json() {
        let err = CoreConfig::from_json_str("{").expect_err("broken json must fail");
        assert!(matches!(err, ConfigError::Decode(_)));
    }

    #[test]
    fn category_filter_is_case_insensitive_and_open_when_empty() {
        let open = BatchConfig::default();
        assert!(open.accepts_category(None));
        assert!(open.accepts_category(Some("Ducts")));

        let mut closed = BatchConfig::default();
        closed.categories.insert("Pipes".to_string());
        assert!(closed.accepts_category(Some("pipes")));
        assert!(!closed.accepts_category(Some("Ducts")));
        assert!(!closed.accepts_category(None));
    }
}
