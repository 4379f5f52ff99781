//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::Tier;
use crate::rules;
use clap::Parser;
use std::path::PathBuf;

/// Wardboard - status and metrics aggregation for hospital dashboards
///
/// Loads dashboard record lists (cases, incidents, vendors, ...) from JSON or
/// TOML datasets, classifies each record into a display tier and reports
/// category counts, tier counts and numeric summaries.
///
/// Examples:
///   wardboard --data fixtures/
///   wardboard --data cases.json --preset pathology-priority --format json
///   wardboard --data vendors.json --rule Partial=critical --fail-on critical
///   wardboard --data cases.json --watch --ticks 5 --interval-ms 1000
///   wardboard --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Dataset file or directory of datasets
    #[arg(
        short,
        long,
        value_name = "PATH",
        required_unless_present_any = ["init_config", "list_presets"]
    )]
    pub data: Option<PathBuf>,

    /// Built-in classification preset applied to every dataset
    ///
    /// Run with --list-presets to see the available names.
    #[arg(short, long, value_name = "NAME", env = "WARDBOARD_PRESET")]
    pub preset: Option<String>,

    /// Extra category=tier mappings (comma-separated, repeatable)
    ///
    /// Example: --rule "stat=critical,Under Review=warning"
    #[arg(short, long = "rule", value_name = "CAT=TIER", value_delimiter = ',')]
    pub rules: Vec<String>,

    /// Tier for categories no rule maps
    #[arg(long, value_name = "TIER")]
    pub default_tier: Option<Tier>,

    /// Field holding the category (overrides datasets)
    #[arg(long, value_name = "FIELD")]
    pub category_field: Option<String>,

    /// Field holding the numeric value (overrides datasets)
    #[arg(long, value_name = "FIELD")]
    pub value_field: Option<String>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .wardboard.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Maximum number of datasets to process
    #[arg(long, value_name = "COUNT")]
    pub max_files: Option<usize>,

    /// Fail if records at or above this tier are found
    ///
    /// Useful for CI pipelines. Exit code 2 when threshold is exceeded.
    /// Values: critical, warning, normal, info
    #[arg(long, value_name = "TIER")]
    pub fail_on: Option<Tier>,

    /// Minimum tier shown in the console summary
    #[arg(long, value_name = "TIER")]
    pub min_tier: Option<Tier>,

    /// Run the simulated metrics feed instead of writing a report
    #[arg(short, long)]
    pub watch: bool,

    /// Number of feed ticks (0 = until interrupted)
    #[arg(long, value_name = "COUNT", requires = "watch")]
    pub ticks: Option<u64>,

    /// Delay between feed ticks in milliseconds
    #[arg(long, value_name = "MS", requires = "watch")]
    pub interval_ms: Option<u64>,

    /// Largest random change per value per tick
    #[arg(long, value_name = "N", requires = "watch")]
    pub max_delta: Option<u32>,

    /// RNG seed for a reproducible feed
    #[arg(long, value_name = "SEED", requires = "watch")]
    pub seed: Option<u64>,

    /// Dry run: list the datasets that would be processed and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Print the built-in presets and exit
    #[arg(long)]
    pub list_presets: bool,

    /// Generate a default .wardboard.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Default report file name for this format.
    pub fn default_output(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "wardboard_report.md",
            OutputFormat::Json => "wardboard_report.json",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for commands that don't touch data
        if self.init_config || self.list_presets {
            return Ok(());
        }

        if let Some(ref data) = self.data {
            if !data.exists() {
                return Err(format!("Data path does not exist: {}", data.display()));
            }
        }

        if let Some(ref preset) = self.preset {
            if rules::preset(preset).is_none() {
                return Err(format!(
                    "Unknown preset '{}'. Run --list-presets to see available presets",
                    preset
                ));
            }
        }

        for spec in &self.rules {
            rules::parse_rule_override(spec).map_err(|e| e.to_string())?;
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.watch && self.dry_run {
            return Err("Cannot use both --watch and --dry-run".to_string());
        }

        if let Some(0) = self.max_files {
            return Err("Max files must be at least 1".to_string());
        }

        if let Some(0) = self.interval_ms {
            return Err("Interval must be at least 1 millisecond".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `verbose` is the merged setting (flag or config file); `--quiet` wins.
    pub fn log_level(&self, verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if verbose || self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

/// Parse tier names for clap.
impl clap::ValueEnum for Tier {
    fn value_variants<'a>() -> &'a [Self] {
        &Self::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}
