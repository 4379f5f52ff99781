//! Report generation.
//!
//! This module renders aggregation results as Markdown or JSON.

use crate::analysis::{percentage, top_categories};
use crate::config::ReportConfig;
use crate::models::{
    AggregationResult, DatasetReport, NumericSummary, OrderedCounts, Report, ReportMetadata, Tier,
};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &ReportConfig) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Wardboard Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_overview_section(report));

    for dataset in &report.datasets {
        output.push_str(&generate_dataset_section(dataset, options));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Version:** {}\n", metadata.version));
    section.push_str(&format!("- **Datasets:** {}\n", metadata.datasets));
    section.push_str(&format!("- **Records:** {}\n", metadata.records));
    if metadata.warnings > 0 {
        section.push_str(&format!(
            "- **Defaulted Records:** {}\n",
            metadata.warnings
        ));
    }
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Overview](#overview)\n");

    for dataset in &report.datasets {
        toc.push_str(&format!("- [{}](#{})\n", dataset.name, anchor(&dataset.name)));
    }

    toc.push('\n');

    toc
}

/// Generate the cross-dataset tier overview.
fn generate_overview_section(report: &Report) -> String {
    let mut section = String::new();

    section.push_str("## Overview\n\n");

    if report.datasets.is_empty() {
        section.push_str("No datasets were processed.\n\n");
        return section;
    }

    section.push_str("| Dataset | Records |");
    for tier in Tier::ALL {
        section.push_str(&format!(" {} {} |", tier.emoji(), tier));
    }
    section.push('\n');
    section.push_str("|:---|:---:|");
    for _ in Tier::ALL {
        section.push_str(":---:|");
    }
    section.push('\n');

    for dataset in &report.datasets {
        section.push_str(&format!("| {} | {} |", dataset.name, dataset.result.total));
        for tier in Tier::ALL {
            section.push_str(&format!(" {} |", dataset.result.tier_count(tier)));
        }
        section.push('\n');
    }
    section.push('\n');

    section
}

/// Generate the section for one dataset.
fn generate_dataset_section(dataset: &DatasetReport, options: &ReportConfig) -> String {
    let mut section = String::new();
    let result = &dataset.result;

    section.push_str(&format!("## {}\n\n", dataset.name));

    let mut info = vec![format!("Source: `{}`", dataset.source)];
    if let Some(ref screen) = dataset.screen {
        info.push(format!("Screen: {}", screen));
    }
    info.push(format!("Category: `{}`", dataset.category_field));
    if let Some(ref field) = dataset.value_field {
        info.push(format!("Value: `{}`", field));
    }
    info.push(format!("Records: {}", result.total));
    section.push_str(&format!("*{}*\n\n", info.join(" | ")));

    if result.total == 0 {
        section.push_str("No records.\n\n");
        return section;
    }

    section.push_str("### Tiers\n\n");
    section.push_str(&counts_table("Tier", &result.tier_counts, |tier| {
        format!("{} {}", tier.emoji(), tier)
    }));

    section.push_str("### Categories\n\n");
    section.push_str(&category_table(dataset));

    let top = top_categories(&result.counts_by_category, options.top_categories);
    if !top.is_empty() {
        let names: Vec<_> = top
            .iter()
            .map(|(category, count)| format!("{} ({})", category, count))
            .collect();
        section.push_str(&format!("**Most common:** {}\n\n", names.join(", ")));
    }

    if dataset.value_field.is_some() || result.numeric_summary.count > 0 {
        section.push_str("### Numeric Summary\n\n");
        section.push_str(&numeric_table(&result.numeric_summary));
    }

    if options.include_bands {
        if let Some(bands) = dataset.band_counts.as_ref().filter(|b| !b.is_empty()) {
            section.push_str("### Score Bands\n\n");
            section.push_str(&counts_table("Band", bands, |tier| {
                format!("{} {}", tier.emoji(), tier)
            }));
            section.push_str(&format!(
                "*{} of {} records have a score.*\n\n",
                bands.total(),
                result.total
            ));
        }
    }

    if options.include_warnings && !result.warnings.is_empty() {
        section.push_str(&generate_warnings_block(result));
    }

    section
}

/// Category table in first-seen order, with the tier each category maps to.
///
/// Records without a category follow in their own row.
fn category_table(dataset: &DatasetReport) -> String {
    let mut table = String::new();

    table.push_str("| Category | Tier | Count | Share |\n");
    table.push_str("|:---|:---|:---:|:---:|\n");

    let result = &dataset.result;
    for (category, count) in result.counts_by_category.iter() {
        let tier = dataset.rule.classify(Some(category.as_str()));
        table.push_str(&category_row(category, tier, count, result.total));
    }
    if result.uncategorized > 0 {
        table.push_str(&category_row(
            "*(no category)*",
            dataset.rule.default_tier(),
            result.uncategorized,
            result.total,
        ));
    }
    table.push('\n');

    table
}

fn category_row(label: &str, tier: Tier, count: usize, total: usize) -> String {
    let share = percentage(count, total)
        .map(|p| format!("{:.1}%", p))
        .unwrap_or_else(|| "n/a".to_string());

    format!(
        "| {} | {} {} | {} | {} |\n",
        label,
        tier.emoji(),
        tier,
        count,
        share
    )
}

fn counts_table<K, F>(label: &str, counts: &OrderedCounts<K>, render: F) -> String
where
    K: Clone + Eq + std::hash::Hash,
    F: Fn(&K) -> String,
{
    let mut table = String::new();

    table.push_str(&format!("| {} | Count |\n", label));
    table.push_str("|:---|:---:|\n");
    for (key, count) in counts.iter() {
        table.push_str(&format!("| {} | {} |\n", render(key), count));
    }
    table.push('\n');

    table
}

fn numeric_table(summary: &NumericSummary) -> String {
    let mut table = String::new();

    table.push_str("| Count | Sum | Average | Min | Max |\n");
    table.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    table.push_str(&format!(
        "| {} | {} | {} | {} | {} |\n\n",
        summary.count,
        format_number(summary.sum),
        format_optional(summary.average),
        format_optional(summary.min),
        format_optional(summary.max)
    ));

    table
}

fn generate_warnings_block(result: &AggregationResult) -> String {
    let mut block = String::new();

    block.push_str("### Warnings\n\n");
    for warning in &result.warnings {
        block.push_str(&format!("- ⚠️ {}\n", warning));
    }
    block.push('\n');

    block
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by Wardboard*\n");

    footer
}

/// Markdown heading anchor for a title.
fn anchor(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            c if c.is_alphanumeric() || c == '-' || c == '_' => Some(c),
            _ => None,
        })
        .collect()
}

/// Format a number, dropping the fraction for whole values.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

/// Format an optional number, `n/a` when absent.
pub fn format_optional(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_else(|| "n/a".to_string())
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
