//! Dataset files.
//!
//! A dataset is one dashboard list (cases, incidents, vendors, ...) stored as
//! JSON or TOML, together with the field names that say which property is the
//! category and which one is the numeric value.

use crate::analysis::ScoreBands;
use crate::models::{ClassificationRule, Record, Tier};
use crate::rules::{self, RuleError};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON dataset {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse TOML dataset {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unsupported dataset format: {0} (expected .json or .toml)")]
    UnsupportedFormat(PathBuf),

    #[error("dataset {path}: {source}")]
    Rule {
        path: PathBuf,
        #[source]
        source: RuleError,
    },
}

fn default_category_field() -> String {
    "status".to_string()
}

/// Dataset file as stored on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetFile {
    /// Display name.
    pub name: String,

    /// Dashboard screen the list belongs to.
    #[serde(default)]
    pub screen: Option<String>,

    /// Field holding the category.
    #[serde(default = "default_category_field")]
    pub category_field: String,

    /// Field holding the numeric value.
    #[serde(default)]
    pub value_field: Option<String>,

    /// Built-in preset to start the rule from.
    #[serde(default)]
    pub preset: Option<String>,

    /// Inline mappings, applied over the preset.
    #[serde(default)]
    pub rules: BTreeMap<String, Tier>,

    /// Tier for unmapped categories.
    #[serde(default)]
    pub default_tier: Option<Tier>,

    /// Score bands for the numeric field.
    #[serde(default)]
    pub bands: Option<ScoreBands>,

    /// Built-in score bands, used when `bands` is absent.
    #[serde(default)]
    pub band_preset: Option<String>,

    /// Raw items.
    #[serde(default)]
    pub records: Vec<Map<String, Value>>,
}

/// Field overrides supplied by the caller, taking precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct FieldOverrides {
    pub category_field: Option<String>,
    pub value_field: Option<String>,
}

/// A loaded dataset with records projected for aggregation.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub path: PathBuf,
    pub file: DatasetFile,
    pub records: Vec<Record>,
}

impl Dataset {
    /// Load and project a dataset file.
    pub fn load(path: &Path, overrides: &FieldOverrides) -> Result<Self, DatasetError> {
        let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut file = parse_dataset(path, &content)?;

        if let Some(ref field) = overrides.category_field {
            file.category_field = field.clone();
        }
        if let Some(ref field) = overrides.value_field {
            file.value_field = Some(field.clone());
        }

        let records = project_records(&file);
        debug!(
            "Loaded {} records from {} (category: {}, value: {:?})",
            records.len(),
            path.display(),
            file.category_field,
            file.value_field
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            records,
        })
    }

    /// Resolve the rule for this dataset.
    ///
    /// Layers, later wins: `base` (config and CLI preset), the dataset's own
    /// preset, its inline rules, then `overrides`. The default tier comes
    /// from the dataset when it sets one, otherwise from `base`.
    pub fn rule(
        &self,
        base: &ClassificationRule,
        overrides: &ClassificationRule,
    ) -> Result<ClassificationRule, DatasetError> {
        let mut rule = base.clone();

        if let Some(ref name) = self.file.preset {
            let preset = rules::require_preset(name).map_err(|source| DatasetError::Rule {
                path: self.path.clone(),
                source,
            })?;
            rule.extend(&preset);
        }

        for (category, tier) in &self.file.rules {
            rule.insert(category.clone(), *tier);
        }
        rule.extend(overrides);

        if let Some(tier) = self.file.default_tier {
            rule = rule.with_default(tier);
        }

        Ok(rule)
    }

    /// Score bands for this dataset, if it defines any.
    pub fn bands(&self) -> Result<Option<ScoreBands>, DatasetError> {
        if let Some(ref bands) = self.file.bands {
            return Ok(Some(bands.clone()));
        }

        match self.file.band_preset {
            Some(ref name) => rules::band_preset(name)
                .map(Some)
                .ok_or_else(|| DatasetError::Rule {
                    path: self.path.clone(),
                    source: RuleError::UnknownBandPreset(name.clone()),
                }),
            None => Ok(None),
        }
    }
}

/// Parse dataset content according to the file extension.
pub fn parse_dataset(path: &Path, content: &str) -> Result<DatasetFile, DatasetError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(content).map_err(|source| DatasetError::Json {
            path: path.to_path_buf(),
            source,
        }),
        Some("toml") => toml::from_str(content).map_err(|source| DatasetError::Toml {
            path: path.to_path_buf(),
            source,
        }),
        _ => Err(DatasetError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Project raw items into records using the dataset's field names.
pub fn project_records(file: &DatasetFile) -> Vec<Record> {
    file.records
        .iter()
        .map(|raw| {
            let category = raw.get(&file.category_field).and_then(category_of);
            let value = file
                .value_field
                .as_ref()
                .and_then(|field| raw.get(field))
                .and_then(value_of);

            let mut fields = raw.clone();
            fields.remove(&file.category_field);
            if let Some(ref field) = file.value_field {
                fields.remove(field);
            }

            Record {
                category,
                value,
                fields,
            }
        })
        .collect()
}

/// Category of a raw field.
///
/// Strings are used verbatim; numbers and booleans are stringified since some
/// screens key their badges on numeric grades. Anything else has no category.
fn category_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Numeric value of a raw field: a number, or a string that parses as one.
fn value_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
