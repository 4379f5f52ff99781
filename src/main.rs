//! Wardboard - hospital dashboard aggregation
//!
//! A CLI tool that loads dashboard record lists, classifies every record
//! into a display tier and reports category counts, tier counts and numeric
//! summaries.
//!
//! Exit codes:
//!   0 - Success (no records above threshold, or no --fail-on set)
//!   1 - Runtime error (missing data, bad config, unreadable dataset, etc.)
//!   2 - Records found at or above the --fail-on tier

mod analysis;
mod cli;
mod config;
mod dataset;
mod feed;
mod models;
mod report;
mod rules;
mod scanner;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Config;
use dataset::{Dataset, FieldOverrides};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use models::{AggregationResult, ClassificationRule, DatasetReport, Report, Tier};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config and --list-presets early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }
    if args.list_presets {
        handle_list_presets();
        return Ok(());
    }

    // Config decides the log level, so it is loaded before logging starts
    let config = match prepare_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&args, &config);

    info!("Wardboard v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Aggregation failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .wardboard.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE);
    println!("   Edit it to set presets, extra rules, feed timing, and more.");
    Ok(())
}

/// Handle --list-presets: print every preset and its mappings.
fn handle_list_presets() {
    for name in rules::preset_names() {
        println!("{}", name);
        if let Some(rule) = rules::preset(name) {
            for (category, tier) in rule.iter() {
                println!("   {} {:<16} → {}", tier.emoji(), category, tier);
            }
        }
    }

    println!("\nScore bands:");
    for name in rules::band_preset_names() {
        if let Some(bands) = rules::band_preset(name) {
            let thresholds: Vec<_> = bands
                .bands()
                .iter()
                .map(|b| format!(">= {} {}", b.min, b.tier))
                .collect();
            println!(
                "   {}: {}, else {}",
                name,
                thresholds.join(", "),
                bands.floor()
            );
        }
    }
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = args.log_level(config.general.verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the aggregation workflow. Returns exit code (0 or 2).
async fn run(args: Args, config: Config) -> Result<i32> {
    let data_root = args.data.clone().context("No data path given")?;

    // Step 1: Find datasets
    let scan_config = scanner::ScanConfig::from(&config.scanner);
    let paths = scanner::discover(&data_root, &scan_config)?;
    info!("Found {} dataset(s) under {}", paths.len(), data_root.display());

    if args.dry_run {
        return handle_dry_run(&data_root, &paths);
    }

    // Step 2: Resolve rules shared by all datasets
    let base_rule = base_rule(&config)?;
    let override_rule = override_rule(&config, &args)?;
    let fields = FieldOverrides {
        category_field: config.aggregation.category_field.clone(),
        value_field: config.aggregation.value_field.clone(),
    };

    if args.watch {
        return run_feed(&paths, &base_rule, &override_rule, &fields, &config, &args).await;
    }

    // Step 3: Aggregate each dataset
    let datasets = aggregate_all(&paths, &base_rule, &override_rule, &fields, args.quiet)?;
    let report = Report::new(datasets);

    // Step 4: Write the report
    let output_path = output_path(&config, &args);
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report, &config.report),
    };

    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    if !args.quiet {
        print_summary(&report, args.min_tier);
        println!("\n✅ Report saved to: {}", output_path.display());
    }

    // Check --fail-on threshold
    if let Some(threshold) = args.fail_on {
        let above: usize = report
            .datasets
            .iter()
            .map(|d| analysis::count_at_or_above(&d.result, threshold))
            .sum();

        if above > 0 {
            eprintln!(
                "\n⛔ {} record(s) at or above {} tier. Failing (exit code 2).",
                above, threshold
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Load, classify and aggregate every dataset.
///
/// A dataset that fails to load is skipped with a warning; the run only fails
/// when nothing could be loaded.
fn aggregate_all(
    paths: &[PathBuf],
    base_rule: &ClassificationRule,
    override_rule: &ClassificationRule,
    fields: &FieldOverrides,
    quiet: bool,
) -> Result<Vec<DatasetReport>> {
    let pb = if quiet || paths.len() < 2 {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(paths.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    };

    let mut reports = Vec::with_capacity(paths.len());
    let mut failed = 0;

    for path in paths {
        pb.set_message(path.display().to_string());

        match aggregate_dataset(path, base_rule, override_rule, fields) {
            Ok(report) => reports.push(report),
            Err(e) => {
                warn!("Skipping {}: {:#}", path.display(), e);
                failed += 1;
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if reports.is_empty() {
        anyhow::bail!("None of the {} dataset(s) could be loaded", failed);
    }
    if failed > 0 {
        warn!("{} dataset(s) skipped", failed);
    }

    Ok(reports)
}

/// Aggregate a single dataset file.
fn aggregate_dataset(
    path: &Path,
    base_rule: &ClassificationRule,
    override_rule: &ClassificationRule,
    fields: &FieldOverrides,
) -> Result<DatasetReport> {
    let dataset = Dataset::load(path, fields)?;
    let rule = dataset.rule(base_rule, override_rule)?;
    let bands = dataset.bands()?;
    if rule.is_empty() {
        warn!(
            "{}: no classification rules; every record gets the {} tier",
            path.display(),
            rule.default_tier()
        );
    } else {
        debug!("{}: {} mapped categories", path.display(), rule.len());
    }

    let result = analysis::aggregate(&dataset.records, &rule);
    let band_counts = bands.map(|b| analysis::band_counts(&dataset.records, &b));

    for warning in &result.warnings {
        debug!("{}: {}", path.display(), warning);
    }
    info!(
        "{}: {} records, {} categories",
        dataset.file.name,
        result.total,
        result.counts_by_category.len()
    );

    Ok(DatasetReport {
        name: dataset.file.name,
        screen: dataset.file.screen,
        source: path.display().to_string(),
        category_field: dataset.file.category_field,
        value_field: dataset.file.value_field,
        rule,
        result,
        band_counts,
    })
}

/// Run the simulated metrics feed over the first dataset.
async fn run_feed(
    paths: &[PathBuf],
    base_rule: &ClassificationRule,
    override_rule: &ClassificationRule,
    fields: &FieldOverrides,
    config: &Config,
    args: &Args,
) -> Result<i32> {
    let path = &paths[0];
    if paths.len() > 1 {
        warn!(
            "Feed runs on one dataset; using {} and ignoring {} other(s)",
            path.display(),
            paths.len() - 1
        );
    }

    let dataset = Dataset::load(path, fields)?;
    let rule = dataset.rule(base_rule, override_rule)?;

    println!("📡 Simulated feed: {}", dataset.file.name);
    println!(
        "   Interval: {}ms | Max delta: ±{} | Ticks: {}",
        config.feed.interval_ms,
        config.feed.max_delta,
        if config.feed.ticks == 0 {
            "unbounded".to_string()
        } else {
            config.feed.ticks.to_string()
        }
    );

    let mut ticks = Box::pin(feed::ticks(dataset.records, rule, config.feed.clone()));
    let mut highest: Option<Tier> = None;

    loop {
        let tick = tokio::select! {
            tick = ticks.next() => match tick {
                Some(tick) => tick,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Feed interrupted");
                break;
            }
        };

        match args.format {
            OutputFormat::Json => println!("{}", serde_json::to_string(&tick)?),
            OutputFormat::Markdown => {
                println!("#{:<4} {}", tick.tick, tick_line(&tick.result, args.min_tier))
            }
        }
        highest = highest.max(analysis::highest_tier(&tick.result));
    }

    if let (Some(threshold), Some(seen)) = (args.fail_on, highest) {
        if seen >= threshold {
            eprintln!(
                "\n⛔ Feed produced records at or above {} tier. Failing (exit code 2).",
                threshold
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// One-line summary of a feed tick.
fn tick_line(result: &AggregationResult, min_tier: Option<Tier>) -> String {
    let mut parts: Vec<String> = Tier::ALL
        .iter()
        .filter(|tier| min_tier.map_or(true, |min| **tier >= min))
        .map(|tier| format!("{} {}", tier.emoji(), result.tier_count(*tier)))
        .collect();

    let summary = &result.numeric_summary;
    parts.push(format!(
        "avg {} (min {}, max {})",
        report::generator::format_optional(summary.average),
        report::generator::format_optional(summary.min),
        report::generator::format_optional(summary.max)
    ));

    parts.join(" | ")
}

/// Handle --dry-run: list datasets, exit.
fn handle_dry_run(root: &Path, paths: &[PathBuf]) -> Result<i32> {
    println!("\n🔍 Dry run: datasets that would be aggregated\n");

    let scanner = scanner::DatasetScanner::new(root.to_path_buf(), scanner::ScanConfig::default());
    for path in paths {
        println!("     📄 {}", scanner.relative(path).display());
    }
    println!("\n   Total: {} dataset(s)", paths.len());

    println!("\n✅ Dry run complete. Nothing was aggregated.");
    Ok(0)
}

/// Print the console summary.
fn print_summary(report: &Report, min_tier: Option<Tier>) {
    println!("\n📊 Aggregation Summary:");
    println!(
        "   Datasets: {} | Records: {}",
        report.metadata.datasets, report.metadata.records
    );

    if let Some(tier) = report.highest_tier() {
        println!("   Highest tier: {} {}", tier.emoji(), tier);
    }

    for dataset in &report.datasets {
        println!(
            "   - {}: {}",
            dataset.name,
            tick_line(&dataset.result, min_tier)
        );
    }

    if report.metadata.warnings > 0 {
        println!(
            "   ⚠️  {} record(s) had no category and were assigned the default tier",
            report.metadata.warnings
        );
    }
}

/// Rule shared by every dataset before its own preset and rules apply.
fn base_rule(config: &Config) -> Result<ClassificationRule> {
    let rule = match config.aggregation.preset {
        Some(ref name) => rules::require_preset(name)?,
        None => ClassificationRule::new(),
    };
    Ok(rule.with_default(config.aggregation.default_tier))
}

/// Mappings applied after each dataset's own rules: config first, CLI last.
fn override_rule(config: &Config, args: &Args) -> Result<ClassificationRule> {
    let mut rule = config.aggregation.override_rule();
    for spec in &args.rules {
        let (category, tier) = rules::parse_rule_override(spec)?;
        rule.insert(category, tier);
    }
    Ok(rule)
}

/// Resolve the report path: CLI, then config, then the format default.
fn output_path(config: &Config, args: &Args) -> PathBuf {
    config
        .general
        .output
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(args.format.default_output()))
}

/// Load the config file, apply CLI overrides and validate the result.
fn prepare_config(args: &Args) -> Result<Config> {
    let mut config = load_config(args)?;
    config.merge_with_args(args);
    config.validate()?;
    Ok(config)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixtures() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    #[test]
    fn test_aggregate_fixture_datasets() {
        let paths = scanner::discover(&fixtures(), &scanner::ScanConfig::default()).unwrap();
        let reports = aggregate_all(
            &paths,
            &ClassificationRule::new(),
            &ClassificationRule::new(),
            &FieldOverrides::default(),
            true,
        )
        .unwrap();

        assert_eq!(reports.len(), 3);

        let cases = reports.iter().find(|r| r.name == "Pathology cases").unwrap();
        assert_eq!(cases.result.tier_count(Tier::Critical), 1);
        assert_eq!(cases.result.tier_count(Tier::Warning), 1);
        assert_eq!(cases.result.tier_count(Tier::Normal), 1);
        assert_eq!(cases.result.numeric_summary.count, 2);
        assert_eq!(cases.result.numeric_summary.average, Some(22.0));

        let vendors = reports.iter().find(|r| r.name == "Vendor risk").unwrap();
        let bands = vendors.band_counts.as_ref().unwrap();
        assert_eq!(bands.get(&Tier::Critical), Some(2));
        assert_eq!(bands.get(&Tier::Warning), Some(1));
    }

    #[test]
    fn test_cli_override_wins_over_dataset_preset() {
        let path = fixtures().join("vendors.json");
        let overrides = ClassificationRule::from_pairs([("Partial", Tier::Critical)]);
        let report = aggregate_dataset(
            &path,
            &ClassificationRule::new(),
            &overrides,
            &FieldOverrides::default(),
        )
        .unwrap();

        assert_eq!(report.result.tier_count(Tier::Critical), 2);
        assert_eq!(report.result.tier_count(Tier::Normal), 1);
    }

    #[test]
    fn test_field_override_changes_category() {
        let path = fixtures().join("vendors.json");
        let fields = FieldOverrides {
            category_field: Some("businessCriticality".to_string()),
            value_field: None,
        };
        let base = rules::preset("criticality").unwrap();
        let report =
            aggregate_dataset(&path, &base, &ClassificationRule::new(), &fields).unwrap();

        assert_eq!(report.result.counts_by_category.get("Critical"), Some(2));
        assert_eq!(report.result.counts_by_category.get("High"), Some(1));
    }

    #[test]
    fn test_aggregate_all_skips_bad_datasets() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let good = temp_dir.path().join("good.json");
        let bad = temp_dir.path().join("bad.json");
        std::fs::write(&good, r#"{"name":"Good","records":[{"status":"x"}]}"#).unwrap();
        std::fs::write(&bad, "not json").unwrap();

        let reports = aggregate_all(
            &[bad.clone(), good],
            &ClassificationRule::new(),
            &ClassificationRule::new(),
            &FieldOverrides::default(),
            true,
        )
        .unwrap();
        assert_eq!(reports.len(), 1);

        let all_bad = aggregate_all(
            &[bad],
            &ClassificationRule::new(),
            &ClassificationRule::new(),
            &FieldOverrides::default(),
            true,
        );
        assert!(all_bad.is_err());
    }

    #[test]
    fn test_tick_line_respects_min_tier() {
        let records = vec![models::Record::new("a", Some(2.0))];
        let result = analysis::aggregate(&records, &ClassificationRule::new());

        let full = tick_line(&result, None);
        assert!(full.contains("🔵 1"));
        assert!(full.contains("avg 2"));

        let filtered = tick_line(&result, Some(Tier::Warning));
        assert!(!filtered.contains("🔵"));
        assert!(filtered.contains("🔴 0"));
    }

    #[test]
    fn test_prepare_config_rejects_bad_file_values() {
        use clap::Parser;

        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("ward.toml");
        std::fs::write(&path, "[feed]\ninterval_ms = 0\n").unwrap();
        let config_arg = path.display().to_string();

        let args =
            Args::try_parse_from(["wardboard", "--data", ".", "--config", &config_arg]).unwrap();
        assert!(prepare_config(&args).is_err());

        let args = Args::try_parse_from([
            "wardboard",
            "--data",
            ".",
            "--config",
            &config_arg,
            "--watch",
            "--interval-ms",
            "5",
        ])
        .unwrap();
        assert_eq!(prepare_config(&args).unwrap().feed.interval_ms, 5);
    }

    #[test]
    fn test_base_and_override_rules() {
        let mut config = Config::default();
        config.aggregation.preset = Some("chemo-status".to_string());
        config.aggregation.default_tier = Tier::Normal;
        config
            .aggregation
            .rules
            .insert("delayed".to_string(), Tier::Warning);

        let base = base_rule(&config).unwrap();
        assert_eq!(base.classify(Some("delayed")), Tier::Critical);
        assert_eq!(base.classify(Some("unknown")), Tier::Normal);

        let args = {
            use clap::Parser;
            Args::try_parse_from(["wardboard", "--data", ".", "--rule", "scheduled=critical"])
                .unwrap()
        };
        let overrides = override_rule(&config, &args).unwrap();
        assert_eq!(overrides.classify(Some("delayed")), Tier::Warning);
        assert_eq!(overrides.classify(Some("scheduled")), Tier::Critical);

        config.aggregation.preset = Some("missing".to_string());
        assert!(base_rule(&config).is_err());
    }
}
