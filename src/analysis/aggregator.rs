//! Record aggregation and display statistics.
//!
//! This module turns a list of records and a classification rule into
//! category counts, tier counts and a numeric summary. Every function here
//! is pure: no I/O, no shared state, same input gives the same output.

use crate::models::{
    AggregationResult, ClassificationRule, InvalidRecordError, NumericSummary, OrderedCounts,
    Record, Tier,
};

/// Anything the aggregator can count.
pub trait Aggregatable {
    /// Classification key, `None` when the item has no usable category.
    fn category(&self) -> Option<&str>;

    /// Numeric measure, `None` when absent.
    fn value(&self) -> Option<f64>;
}

impl Aggregatable for Record {
    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    fn value(&self) -> Option<f64> {
        self.value
    }
}

impl<T: Aggregatable + ?Sized> Aggregatable for &T {
    fn category(&self) -> Option<&str> {
        (**self).category()
    }

    fn value(&self) -> Option<f64> {
        (**self).value()
    }
}

/// Aggregate records using each record's own numeric value.
pub fn aggregate<R: Aggregatable>(records: &[R], rule: &ClassificationRule) -> AggregationResult {
    aggregate_with(records, rule, |r| r.value())
}

/// Aggregate records, reading the numeric measure through `selector`.
///
/// Records without a category are counted in `uncategorized`, assigned the
/// rule's default tier and reported in `warnings`.
pub fn aggregate_with<R, F>(
    records: &[R],
    rule: &ClassificationRule,
    selector: F,
) -> AggregationResult
where
    R: Aggregatable,
    F: Fn(&R) -> Option<f64>,
{
    let mut counts_by_category = OrderedCounts::new();
    let mut tier_counts = OrderedCounts::new();
    let mut uncategorized = 0;
    let mut warnings = Vec::new();
    let mut values = Vec::new();

    for (index, record) in records.iter().enumerate() {
        let category = record.category();
        let tier = rule.classify(category);

        match category {
            Some(c) => counts_by_category.increment(c.to_string()),
            None => {
                uncategorized += 1;
                warnings.push(InvalidRecordError { index, tier });
            }
        }
        tier_counts.increment(tier);

        if let Some(v) = selector(record).filter(|v| v.is_finite()) {
            values.push(v);
        }
    }

    AggregationResult {
        total: records.len(),
        counts_by_category,
        uncategorized,
        numeric_summary: summarize(&values),
        tier_counts,
        warnings,
    }
}

/// Numeric summary over finite values.
///
/// `sum` can overflow to infinity for very large inputs; `average` is a
/// running mean and stays finite.
pub fn summarize(values: &[f64]) -> NumericSummary {
    if values.is_empty() {
        return NumericSummary::default();
    }

    let sum: f64 = values.iter().sum();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let average = values
        .iter()
        .enumerate()
        .fold(0.0_f64, |mean, (i, &v)| mean + (v - mean) / (i + 1) as f64);

    NumericSummary {
        sum,
        average: Some(average),
        min: Some(min),
        max: Some(max),
        count: values.len(),
    }
}

/// Count records whose category equals `category` exactly.
#[allow(dead_code)]
pub fn count_where<R: Aggregatable>(records: &[R], category: &str) -> usize {
    records
        .iter()
        .filter(|r| r.category() == Some(category))
        .count()
}

/// `part` as a percentage of `whole`; `None` when `whole` is zero.
pub fn percentage(part: usize, whole: usize) -> Option<f64> {
    if whole == 0 {
        None
    } else {
        Some(part as f64 / whole as f64 * 100.0)
    }
}

/// The `n` most frequent categories, ties kept in first-seen order.
pub fn top_categories(counts: &OrderedCounts<String>, n: usize) -> Vec<(&str, usize)> {
    let mut sorted: Vec<_> = counts.iter().map(|(k, c)| (k.as_str(), c)).collect();
    // Stable sort keeps first-seen order among equal counts
    sorted.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    sorted.truncate(n);
    sorted
}

/// Most severe tier present in a result.
pub fn highest_tier(result: &AggregationResult) -> Option<Tier> {
    result.tier_counts.iter().map(|(tier, _)| *tier).max()
}

/// Number of records at or above `threshold`.
pub fn count_at_or_above(result: &AggregationResult, threshold: Tier) -> usize {
    result
        .tier_counts
        .iter()
        .filter(|(tier, _)| **tier >= threshold)
        .map(|(_, count)| count)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rule() -> ClassificationRule {
        ClassificationRule::from_pairs([("high", Tier::Critical), ("low", Tier::Normal)])
    }

    fn sample_records() -> Vec<Record> {
        vec![
            Record::new("high", Some(10.0)),
            Record::new("high", Some(20.0)),
            Record::new("low", None),
        ]
    }

    #[test]
    fn test_aggregate_worked_example() {
        let result = aggregate(&sample_records(), &sample_rule());

        assert_eq!(result.total, 3);
        assert_eq!(result.counts_by_category.get("high"), Some(2));
        assert_eq!(result.counts_by_category.get("low"), Some(1));
        assert_eq!(result.tier_count(Tier::Critical), 2);
        assert_eq!(result.tier_count(Tier::Normal), 1);

        let summary = &result.numeric_summary;
        assert_eq!(summary.sum, 30.0);
        assert_eq!(summary.average, Some(15.0));
        assert_eq!(summary.min, Some(10.0));
        assert_eq!(summary.max, Some(20.0));
        assert_eq!(summary.count, 2);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_aggregate_empty_input() {
        let result = aggregate::<Record>(&[], &sample_rule());

        assert_eq!(result.total, 0);
        assert!(result.counts_by_category.is_empty());
        assert!(result.tier_counts.is_empty());
        assert_eq!(result.numeric_summary.count, 0);
        assert_eq!(result.numeric_summary.average, None);
    }

    #[test]
    fn test_unmapped_category_falls_to_info() {
        let rule = ClassificationRule::from_pairs([("high", Tier::Critical)]);
        let result = aggregate(&[Record::new("unmapped", None)], &rule);

        assert_eq!(result.tier_count(Tier::Info), 1);
        assert_eq!(result.tier_counts.len(), 1);
    }

    #[test]
    fn test_empty_rule_puts_everything_in_info() {
        let result = aggregate(&sample_records(), &ClassificationRule::new());
        assert_eq!(result.tier_count(Tier::Info), 3);
    }

    #[test]
    fn test_all_null_values_report_no_average() {
        let records = vec![Record::new("a", None), Record::new("b", None)];
        let summary = aggregate(&records, &sample_rule()).numeric_summary;

        assert_eq!(summary.sum, 0.0);
        assert_eq!(summary.average, None);
        assert_eq!(summary.min, None);
        assert_eq!(summary.max, None);
        assert_eq!(summary.count, 0);
    }

    #[test]
    fn test_missing_category_is_defaulted_and_reported() {
        let records = vec![
            Record::new("high", Some(1.0)),
            Record::uncategorized(Some(3.0)),
            Record::new("low", None),
        ];
        let result = aggregate(&records, &sample_rule());

        assert_eq!(result.uncategorized, 1);
        assert_eq!(result.counts_by_category.len(), 2);
        assert_eq!(result.tier_count(Tier::Info), 1);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].index, 1);
        assert_eq!(result.warnings[0].tier, Tier::Info);
        // Still contributes to the numeric summary
        assert_eq!(result.numeric_summary.count, 2);
    }

    #[test]
    fn test_literal_placeholder_category_stays_separate_from_missing() {
        let rule = ClassificationRule::from_pairs([("<missing>", Tier::Critical)]);
        let records = vec![Record::new("<missing>", None), Record::uncategorized(None)];
        let result = aggregate(&records, &rule);

        assert_eq!(result.counts_by_category.len(), 1);
        assert_eq!(result.counts_by_category.get("<missing>"), Some(1));
        assert_eq!(result.uncategorized, 1);
        assert_eq!(result.tier_count(Tier::Critical), 1);
        assert_eq!(result.tier_count(Tier::Info), 1);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].index, 1);
    }

    #[test]
    fn test_average_stays_finite_for_huge_values() {
        let summary = summarize(&[f64::MAX, f64::MAX]);
        assert_eq!(summary.average, Some(f64::MAX));
        assert_eq!(summary.max, Some(f64::MAX));
        assert!(summary.sum.is_infinite());
    }

    #[test]
    fn test_missing_category_uses_rule_default() {
        let rule = sample_rule().with_default(Tier::Warning);
        let result = aggregate(&[Record::uncategorized(None)], &rule);
        assert_eq!(result.tier_count(Tier::Warning), 1);
        assert_eq!(result.warnings[0].tier, Tier::Warning);
    }

    #[test]
    fn test_counts_sum_to_total() {
        let mut records = sample_records();
        records.push(Record::uncategorized(None));
        records.push(Record::new("other", Some(f64::NAN)));

        let result = aggregate(&records, &sample_rule());
        assert_eq!(
            result.counts_by_category.total() + result.uncategorized,
            records.len()
        );
        assert_eq!(result.tier_counts.total(), records.len());
        assert!(result.numeric_summary.count <= records.len());
    }

    #[test]
    fn test_non_finite_values_are_ignored() {
        let records = vec![
            Record::new("a", Some(f64::NAN)),
            Record::new("a", Some(f64::INFINITY)),
            Record::new("a", Some(4.0)),
        ];
        let summary = aggregate(&records, &sample_rule()).numeric_summary;
        assert_eq!(summary.count, 1);
        assert_eq!(summary.sum, 4.0);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let records = sample_records();
        let rule = sample_rule();
        assert_eq!(aggregate(&records, &rule), aggregate(&records, &rule));
    }

    #[test]
    fn test_first_seen_order() {
        let records = vec![
            Record::new("low", None),
            Record::new("high", None),
            Record::new("low", None),
        ];
        let result = aggregate(&records, &sample_rule());

        let categories: Vec<_> = result
            .counts_by_category
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(categories, vec!["low", "high"]);
        let tiers: Vec<_> = result.tier_counts.iter().map(|(t, _)| *t).collect();
        assert_eq!(tiers, vec![Tier::Normal, Tier::Critical]);
    }

    #[test]
    fn test_aggregate_with_selector() {
        struct Vendor {
            compliance: &'static str,
            risk_score: f64,
            critical_findings: u32,
        }

        impl Aggregatable for Vendor {
            fn category(&self) -> Option<&str> {
                Some(self.compliance)
            }

            fn value(&self) -> Option<f64> {
                Some(self.risk_score)
            }
        }

        let vendors = vec![
            Vendor {
                compliance: "Non-Compliant",
                risk_score: 85.0,
                critical_findings: 3,
            },
            Vendor {
                compliance: "Compliant",
                risk_score: 45.0,
                critical_findings: 1,
            },
        ];
        let rule = ClassificationRule::from_pairs([("Non-Compliant", Tier::Critical)]);

        let by_score = aggregate(&vendors, &rule);
        assert_eq!(by_score.numeric_summary.sum, 130.0);

        let by_findings = aggregate_with(&vendors, &rule, |v| Some(v.critical_findings as f64));
        assert_eq!(by_findings.numeric_summary.sum, 4.0);
        assert_eq!(by_findings.numeric_summary.max, Some(3.0));
    }

    #[test]
    fn test_count_where_and_percentage() {
        let records = sample_records();
        assert_eq!(count_where(&records, "high"), 2);
        assert_eq!(count_where(&records, "High"), 0);
        assert_eq!(percentage(1, 4), Some(25.0));
        assert_eq!(percentage(1, 0), None);
    }

    #[test]
    fn test_top_categories() {
        let records = vec![
            Record::new("a", None),
            Record::new("b", None),
            Record::new("b", None),
            Record::new("c", None),
        ];
        let result = aggregate(&records, &sample_rule());
        let top = top_categories(&result.counts_by_category, 2);

        assert_eq!(top, vec![("b", 2), ("a", 1)]);
    }

    #[test]
    fn test_highest_tier_and_threshold_count() {
        let result = aggregate(&sample_records(), &sample_rule());
        assert_eq!(highest_tier(&result), Some(Tier::Critical));
        assert_eq!(count_at_or_above(&result, Tier::Warning), 2);
        assert_eq!(count_at_or_above(&result, Tier::Info), 3);

        let empty = aggregate::<Record>(&[], &sample_rule());
        assert_eq!(highest_tier(&empty), None);
    }
}
