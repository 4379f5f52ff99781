//! Data models for dashboard aggregation.
//!
//! This module contains the core data structures shared by the aggregator,
//! the dataset loader and the report generator: records, tiers,
//! classification rules and aggregation results.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// Display tier assigned to a record's category.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Informational - neutral badges, unmapped categories
    #[default]
    Info,
    /// Normal - healthy, completed, compliant
    Normal,
    /// Warning - in progress, moderate, needs attention
    Warning,
    /// Critical - overdue, non-compliant, high risk
    Critical,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Info => write!(f, "Info"),
            Tier::Normal => write!(f, "Normal"),
            Tier::Warning => write!(f, "Warning"),
            Tier::Critical => write!(f, "Critical"),
        }
    }
}

impl Tier {
    /// All tiers, most severe first.
    pub const ALL: [Tier; 4] = [Tier::Critical, Tier::Warning, Tier::Normal, Tier::Info];

    /// Returns an emoji badge for the tier.
    pub fn emoji(&self) -> &'static str {
        match self {
            Tier::Info => "🔵",
            Tier::Normal => "🟢",
            Tier::Warning => "🟠",
            Tier::Critical => "🔴",
        }
    }

    /// Lowercase name as used in configs and datasets.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Info => "info",
            Tier::Normal => "normal",
            Tier::Warning => "warning",
            Tier::Critical => "critical",
        }
    }
}

/// Error returned when a tier name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tier '{0}' (expected critical, warning, normal or info)")]
pub struct UnknownTier(pub String);

impl FromStr for Tier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Tier::Critical),
            "warning" => Ok(Tier::Warning),
            "normal" => Ok(Tier::Normal),
            "info" => Ok(Tier::Info),
            other => Err(UnknownTier(other.to_string())),
        }
    }
}

/// A single domain item reduced to what the aggregator looks at.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Classification key (status, priority, risk level, ...).
    pub category: Option<String>,
    /// Optional numeric measure (score, percentage, count).
    pub value: Option<f64>,
    /// Remaining fields of the source item, carried but never interpreted.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Record {
    /// Creates a record with a category and an optional value.
    pub fn new(category: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            category: Some(category.into()),
            value,
            fields: serde_json::Map::new(),
        }
    }

    /// Creates a record without a usable category.
    #[allow(dead_code)]
    pub fn uncategorized(value: Option<f64>) -> Self {
        Self {
            category: None,
            value,
            fields: serde_json::Map::new(),
        }
    }
}

/// Mapping from category value to display tier.
///
/// Lookups are exact and case-sensitive. Categories without an entry resolve
/// to the default tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRule {
    #[serde(default)]
    entries: Vec<(String, Tier)>,
    #[serde(default)]
    default_tier: Tier,
}

impl ClassificationRule {
    /// Creates an empty rule; every category falls to `Tier::Info`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a rule from `(category, tier)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Tier)>,
        S: Into<String>,
    {
        let mut rule = Self::new();
        for (category, tier) in pairs {
            rule.insert(category, tier);
        }
        rule
    }

    /// Sets the tier used for unmapped or missing categories.
    pub fn with_default(mut self, tier: Tier) -> Self {
        self.default_tier = tier;
        self
    }

    /// Adds or replaces a mapping.
    pub fn insert(&mut self, category: impl Into<String>, tier: Tier) {
        let category = category.into();
        match self.entries.iter_mut().find(|(c, _)| *c == category) {
            Some(entry) => entry.1 = tier,
            None => self.entries.push((category, tier)),
        }
    }

    /// Merges another rule into this one. Entries from `other` win.
    pub fn extend(&mut self, other: &ClassificationRule) {
        for (category, tier) in &other.entries {
            self.insert(category.clone(), *tier);
        }
    }

    /// Resolves the tier for a category.
    pub fn classify(&self, category: Option<&str>) -> Tier {
        category
            .and_then(|c| self.entries.iter().find(|(k, _)| k == c))
            .map(|(_, tier)| *tier)
            .unwrap_or(self.default_tier)
    }

    /// The tier used for unmapped categories.
    pub fn default_tier(&self) -> Tier {
        self.default_tier
    }

    /// Iterates over mappings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Tier)> {
        self.entries.iter().map(|(c, t)| (c.as_str(), *t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Counter that remembers the order in which keys were first seen.
#[derive(Debug, Clone)]
pub struct OrderedCounts<K> {
    entries: Vec<(K, usize)>,
    index: HashMap<K, usize>,
}

impl<K> Default for OrderedCounts<K> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: PartialEq> PartialEq for OrderedCounts<K> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Eq> Eq for OrderedCounts<K> {}

impl<K: Clone + Eq + Hash> OrderedCounts<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the count for `key`, appending it if unseen.
    pub fn increment(&mut self, key: K) {
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].1 += 1,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, 1));
            }
        }
    }

    /// Count for a key, if it was seen.
    pub fn get<Q>(&self, key: &Q) -> Option<usize>
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(key).map(|&pos| self.entries[pos].1)
    }

    /// Sum of all counts.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// Iterates in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, usize)> {
        self.entries.iter().map(|(k, c)| (k, *c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Serialize> Serialize for OrderedCounts<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, count) in &self.entries {
            map.serialize_entry(key, count)?;
        }
        map.end()
    }
}

/// Summary over the records that carry a numeric value.
///
/// `average`, `min` and `max` are `None` when no record had a value, so an
/// empty summary is never mistaken for a zero reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NumericSummary {
    pub sum: f64,
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub count: usize,
}

/// A record that had no usable category.
///
/// Non-fatal: the record is still counted and falls to the default tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("record #{index} has no usable category; assigned default tier {tier}")]
pub struct InvalidRecordError {
    /// Position of the record in the input list.
    pub index: usize,
    /// Tier the record was assigned.
    pub tier: Tier,
}

/// Output of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationResult {
    /// Number of records processed.
    pub total: usize,
    /// Records per category, in first-seen order.
    pub counts_by_category: OrderedCounts<String>,
    /// Records with no usable category; not part of `counts_by_category`.
    pub uncategorized: usize,
    /// Summary over numeric values.
    pub numeric_summary: NumericSummary,
    /// Records per tier, in first-seen order.
    pub tier_counts: OrderedCounts<Tier>,
    /// Records that were defaulted instead of classified.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<InvalidRecordError>,
}

impl AggregationResult {
    /// Number of records in `tier`.
    pub fn tier_count(&self, tier: Tier) -> usize {
        self.tier_counts.get(&tier).unwrap_or(0)
    }
}

/// Aggregation output for a single dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetReport {
    /// Dataset name.
    pub name: String,
    /// Dashboard screen the dataset belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screen: Option<String>,
    /// Path the dataset was loaded from.
    pub source: String,
    /// Field used as the category.
    pub category_field: String,
    /// Field used as the numeric value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_field: Option<String>,
    /// Rule applied to the records.
    pub rule: ClassificationRule,
    /// Aggregation output.
    pub result: AggregationResult,
    /// Tier counts from score banding, when the dataset defines bands.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band_counts: Option<OrderedCounts<Tier>>,
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Tool version.
    pub version: String,
    /// Number of datasets processed.
    pub datasets: usize,
    /// Total records across all datasets.
    pub records: usize,
    /// Total defaulted records across all datasets.
    pub warnings: usize,
}

/// The complete aggregation report.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub datasets: Vec<DatasetReport>,
}

impl Report {
    /// Builds a report and its metadata from dataset outputs.
    pub fn new(datasets: Vec<DatasetReport>) -> Self {
        let records = datasets.iter().map(|d| d.result.total).sum();
        let warnings = datasets.iter().map(|d| d.result.warnings.len()).sum();
        Self {
            metadata: ReportMetadata {
                generated_at: Utc::now(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                datasets: datasets.len(),
                records,
                warnings,
            },
            datasets,
        }
    }

    /// Highest tier present in any dataset.
    pub fn highest_tier(&self) -> Option<Tier> {
        self.datasets
            .iter()
            .flat_map(|d| d.result.tier_counts.iter().map(|(tier, _)| *tier))
            .max()
    }
}
