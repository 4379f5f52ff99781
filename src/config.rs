//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.wardboard.toml` files.

use crate::feed::FeedConfig;
use crate::models::{ClassificationRule, Tier};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".wardboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Aggregation settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Simulated feed settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report output path; defaults per format when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Classification settings applied to every dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Tier for categories no rule maps.
    #[serde(default)]
    pub default_tier: Tier,

    /// Preset applied before dataset rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,

    /// Category field override for all datasets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_field: Option<String>,

    /// Value field override for all datasets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_field: Option<String>,

    /// Extra mappings, applied after each dataset's own rules.
    #[serde(default)]
    pub rules: BTreeMap<String, Tier>,
}

impl AggregationConfig {
    /// Rule built from the configured mappings.
    pub fn override_rule(&self) -> ClassificationRule {
        ClassificationRule::from_pairs(self.rules.iter().map(|(c, t)| (c.clone(), *t)))
    }
}

/// Dataset scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Maximum datasets to process.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Names to exclude.
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            excludes: default_excludes(),
        }
    }
}

fn default_max_files() -> usize {
    100
}

fn default_excludes() -> Vec<String> {
    vec!["target", "node_modules", "dist", "build"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// List defaulted records in the report.
    #[serde(default = "default_true")]
    pub include_warnings: bool,

    /// Include score band tables.
    #[serde(default = "default_true")]
    pub include_bands: bool,

    /// Number of categories shown in the top-categories line.
    #[serde(default = "default_top_categories")]
    pub top_categories: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_warnings: true,
            include_bands: true,
            top_categories: default_top_categories(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_top_categories() -> usize {
    3
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load configuration from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref preset) = args.preset {
            self.aggregation.preset = Some(preset.clone());
        }
        if let Some(tier) = args.default_tier {
            self.aggregation.default_tier = tier;
        }
        if let Some(ref field) = args.category_field {
            self.aggregation.category_field = Some(field.clone());
        }
        if let Some(ref field) = args.value_field {
            self.aggregation.value_field = Some(field.clone());
        }

        // Feed settings - only override if explicitly provided
        if let Some(ticks) = args.ticks {
            self.feed.ticks = ticks;
        }
        if let Some(interval) = args.interval_ms {
            self.feed.interval_ms = interval;
        }
        if let Some(delta) = args.max_delta {
            self.feed.max_delta = delta;
        }
        if args.seed.is_some() {
            self.feed.seed = args.seed;
        }

        if let Some(max) = args.max_files {
            self.scanner.max_files = max;
        }

        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check settings that are only invalid once file and CLI are merged.
    pub fn validate(&self) -> Result<()> {
        if self.feed.interval_ms == 0 {
            anyhow::bail!("[feed] interval_ms must be at least 1 millisecond");
        }
        if self.scanner.max_files == 0 {
            anyhow::bail!("[scanner] max_files must be at least 1");
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
