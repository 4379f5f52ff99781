//! Built-in classification presets for the dashboard screens.
//!
//! Each preset is the badge mapping one screen applies to a categorical
//! field. Badge colours translate to tiers as:
//!   red → critical, orange/yellow → warning, green → normal,
//!   blue/purple/gray → info.
//!
//! Keys are matched exactly, so the capitalization here follows the values
//! each screen actually stores.

use crate::analysis::{Band, ScoreBands};
use crate::models::{ClassificationRule, Tier};
use thiserror::Error;

use crate::models::Tier::{Critical, Info, Normal, Warning};

/// Errors raised while resolving rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),

    #[error("unknown band preset '{0}'")]
    UnknownBandPreset(String),

    #[error("invalid rule override '{0}' (expected category=tier)")]
    MalformedOverride(String),

    #[error(transparent)]
    Tier(#[from] crate::models::UnknownTier),
}

/// Pathology case workflow status.
pub const PATHOLOGY_STATUS: &[(&str, Tier)] = &[
    ("received", Info),
    ("processing", Warning),
    ("staining", Info),
    ("reading", Warning),
    ("completed", Normal),
];

/// Pathology case priority.
pub const PATHOLOGY_PRIORITY: &[(&str, Tier)] = &[
    ("stat", Critical),
    ("urgent", Warning),
    ("routine", Normal),
];

/// Chemotherapy schedule status.
pub const CHEMO_STATUS: &[(&str, Tier)] = &[
    ("scheduled", Info),
    ("in-progress", Warning),
    ("completed", Normal),
    ("delayed", Critical),
];

/// Clinical trial and patient-match status.
pub const TRIAL_STATUS: &[(&str, Tier)] = &[
    ("recruiting", Normal),
    ("active", Info),
    ("completed", Info),
    ("eligible", Normal),
    ("screening", Warning),
    ("enrolled", Info),
    ("consenting", Warning),
    ("evaluating", Info),
];

/// Survivorship and treatment-protocol risk level.
pub const SURVIVORSHIP_RISK: &[(&str, Tier)] = &[
    ("low", Normal),
    ("moderate", Warning),
    ("high", Critical),
];

/// Incident severity.
pub const INCIDENT_SEVERITY: &[(&str, Tier)] = &[
    ("Critical", Critical),
    ("High", Warning),
    ("Medium", Warning),
    ("Low", Normal),
];

/// Incident lifecycle status.
pub const INCIDENT_STATUS: &[(&str, Tier)] = &[
    ("Active", Critical),
    ("Investigating", Warning),
    ("Resolved", Normal),
    ("Closed", Info),
];

/// Vendor compliance status.
pub const VENDOR_COMPLIANCE: &[(&str, Tier)] = &[
    ("Compliant", Normal),
    ("Partial", Warning),
    ("Non-Compliant", Critical),
];

/// Business, vendor and regulatory criticality or impact level.
pub const CRITICALITY: &[(&str, Tier)] = &[
    ("Critical", Critical),
    ("High", Warning),
    ("Medium", Warning),
    ("Low", Normal),
];

/// Regulatory change status.
pub const REGULATORY_STATUS: &[(&str, Tier)] = &[
    ("Analyzing", Info),
    ("Planning", Warning),
    ("Implementing", Info),
    ("Compliant", Normal),
    ("In Progress", Info),
    ("Non-Compliant", Critical),
    ("Not Started", Info),
];

/// Privacy impact assessment status.
pub const PRIVACY_STATUS: &[(&str, Tier)] = &[
    ("Completed", Normal),
    ("In Progress", Info),
    ("Under Review", Warning),
    ("Draft", Info),
];

/// Checklist step status (incident response, vendor assessment).
pub const WORKFLOW_STEP: &[(&str, Tier)] = &[
    ("Completed", Normal),
    ("In Progress", Info),
    ("Pending", Info),
];

/// Chemotherapy side-effect grade (CTCAE 0-4), stored as a number.
pub const CHEMO_TOXICITY: &[(&str, Tier)] = &[
    ("0", Normal),
    ("1", Warning),
    ("2", Warning),
    ("3", Critical),
    ("4", Critical),
];

/// Clinical trial phase.
pub const TRIAL_PHASE: &[(&str, Tier)] = &[
    ("Phase I", Critical),
    ("Phase I/II", Warning),
    ("Phase II", Warning),
    ("Phase III", Normal),
    ("Phase IV", Info),
];

/// Survivorship follow-up status.
pub const FOLLOW_UP_STATUS: &[(&str, Tier)] = &[
    ("current", Normal),
    ("upcoming", Info),
    ("overdue", Critical),
];

/// Oncology quality indicator performance against benchmark.
pub const QUALITY_PERFORMANCE: &[(&str, Tier)] = &[
    ("excellent", Normal),
    ("above-average", Info),
    ("average", Warning),
    ("below-average", Critical),
];

/// Care-team member availability.
pub const PROVIDER_AVAILABILITY: &[(&str, Tier)] = &[
    ("Available", Normal),
    ("In Surgery", Warning),
    ("Unavailable", Critical),
];

/// Clinical documentation task priority.
pub const DOCUMENTATION_PRIORITY: &[(&str, Tier)] = &[
    ("urgent", Critical),
    ("high", Warning),
    ("normal", Info),
];

/// Clinical documentation task status.
pub const DOCUMENTATION_STATUS: &[(&str, Tier)] = &[
    ("completed", Normal),
    ("reviewed", Info),
    ("ai-generated", Info),
    ("pending", Info),
];

/// Chronic care protocol status.
pub const CHRONIC_CARE_STATUS: &[(&str, Tier)] = &[
    ("active", Normal),
    ("needs-attention", Warning),
    ("completed", Info),
];

/// Discharge summary urgency.
pub const DISCHARGE_URGENCY: &[(&str, Tier)] = &[
    ("same-day", Critical),
    ("urgent", Warning),
    ("routine", Normal),
];

/// Investigation plan priority.
pub const INVESTIGATION_PRIORITY: &[(&str, Tier)] = &[
    ("urgent", Critical),
    ("high", Warning),
    ("routine", Info),
];

/// Mental health assessment risk level.
pub const MENTAL_HEALTH_RISK: &[(&str, Tier)] = &[
    ("severe", Critical),
    ("high", Critical),
    ("moderate", Warning),
    ("low", Normal),
];

/// Score trend between assessments.
pub const SCORE_TREND: &[(&str, Tier)] = &[
    ("improving", Normal),
    ("stable", Warning),
    ("declining", Critical),
];

/// Ordered test clinical necessity.
pub const TEST_NECESSITY: &[(&str, Tier)] = &[
    ("unnecessary", Critical),
    ("questionable", Warning),
    ("justified", Normal),
];

/// All presets by name.
pub const PRESETS: &[(&str, &[(&str, Tier)])] = &[
    ("pathology-status", PATHOLOGY_STATUS),
    ("pathology-priority", PATHOLOGY_PRIORITY),
    ("chemo-status", CHEMO_STATUS),
    ("trial-status", TRIAL_STATUS),
    ("survivorship-risk", SURVIVORSHIP_RISK),
    ("incident-severity", INCIDENT_SEVERITY),
    ("incident-status", INCIDENT_STATUS),
    ("vendor-compliance", VENDOR_COMPLIANCE),
    ("criticality", CRITICALITY),
    ("regulatory-status", REGULATORY_STATUS),
    ("privacy-status", PRIVACY_STATUS),
    ("workflow-step", WORKFLOW_STEP),
    ("chemo-toxicity", CHEMO_TOXICITY),
    ("trial-phase", TRIAL_PHASE),
    ("follow-up-status", FOLLOW_UP_STATUS),
    ("quality-performance", QUALITY_PERFORMANCE),
    ("provider-availability", PROVIDER_AVAILABILITY),
    ("documentation-priority", DOCUMENTATION_PRIORITY),
    ("documentation-status", DOCUMENTATION_STATUS),
    ("chronic-care-status", CHRONIC_CARE_STATUS),
    ("discharge-urgency", DISCHARGE_URGENCY),
    ("investigation-priority", INVESTIGATION_PRIORITY),
    ("mental-health-risk", MENTAL_HEALTH_RISK),
    ("score-trend", SCORE_TREND),
    ("test-necessity", TEST_NECESSITY),
];

/// Look up a preset by name.
pub fn preset(name: &str) -> Option<ClassificationRule> {
    PRESETS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, pairs)| ClassificationRule::from_pairs(pairs.iter().copied()))
}

/// Look up a preset, failing on unknown names.
pub fn require_preset(name: &str) -> Result<ClassificationRule, RuleError> {
    preset(name).ok_or_else(|| RuleError::UnknownPreset(name.to_string()))
}

/// Names of all presets.
pub fn preset_names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|(name, _)| *name)
}

/// Parse a `category=tier` override.
///
/// Only the last `=` separates category from tier, so categories may
/// themselves contain `=`.
pub fn parse_rule_override(spec: &str) -> Result<(String, Tier), RuleError> {
    let (category, tier) = spec
        .rsplit_once('=')
        .ok_or_else(|| RuleError::MalformedOverride(spec.to_string()))?;

    if category.is_empty() {
        return Err(RuleError::MalformedOverride(spec.to_string()));
    }

    Ok((category.to_string(), tier.trim().parse()?))
}

/// Vendor risk score bands (higher is riskier).
pub fn vendor_risk_bands() -> ScoreBands {
    bands(&[(80.0, Critical), (60.0, Warning), (40.0, Warning)], Normal)
}

/// Quality metric score bands (higher is better).
pub fn quality_score_bands() -> ScoreBands {
    bands(&[(95.0, Normal), (90.0, Info), (85.0, Warning)], Critical)
}

/// Protocol adherence score bands (percent, higher is better).
pub fn adherence_bands() -> ScoreBands {
    bands(&[(90.0, Normal), (70.0, Warning)], Critical)
}

/// Discharge summary completion bands (percent, higher is better).
pub fn completion_bands() -> ScoreBands {
    bands(&[(90.0, Normal), (75.0, Warning)], Critical)
}

/// Survivorship care plan progress bands (percent, higher is better).
pub fn care_plan_progress_bands() -> ScoreBands {
    bands(&[(80.0, Normal), (60.0, Warning)], Critical)
}

/// Protocol phase readiness bands: done, nearly done, not started.
pub fn readiness_bands() -> ScoreBands {
    bands(&[(100.0, Normal), (75.0, Warning)], Info)
}

/// All score band presets by name.
pub const BAND_PRESETS: &[(&str, fn() -> ScoreBands)] = &[
    ("vendor-risk", vendor_risk_bands),
    ("quality-score", quality_score_bands),
    ("protocol-adherence", adherence_bands),
    ("discharge-completion", completion_bands),
    ("care-plan-progress", care_plan_progress_bands),
    ("phase-readiness", readiness_bands),
];

/// Look up score band presets by name.
pub fn band_preset(name: &str) -> Option<ScoreBands> {
    BAND_PRESETS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, build)| build())
}

/// Names of all score band presets.
pub fn band_preset_names() -> impl Iterator<Item = &'static str> {
    BAND_PRESETS.iter().map(|(name, _)| *name)
}

fn bands(thresholds: &[(f64, Tier)], floor: Tier) -> ScoreBands {
    let bands = thresholds
        .iter()
        .map(|&(min, tier)| Band { min, tier })
        .collect();
    ScoreBands::new(bands, floor).expect("built-in bands are non-empty and finite")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_lookup() {
        let rule = preset("pathology-priority").unwrap();
        assert_eq!(rule.classify(Some("stat")), Tier::Critical);
        assert_eq!(rule.classify(Some("routine")), Tier::Normal);
        assert!(preset("nonexistent").is_none());
    }

    #[test]
    fn test_require_preset_error() {
        assert_eq!(
            require_preset("bogus"),
            Err(RuleError::UnknownPreset("bogus".to_string()))
        );
    }

    #[test]
    fn test_presets_are_case_sensitive() {
        let rule = preset("incident-severity").unwrap();
        assert_eq!(rule.classify(Some("Critical")), Tier::Critical);
        assert_eq!(rule.classify(Some("critical")), Tier::Info);
    }

    #[test]
    fn test_preset_names_unique() {
        let names: Vec<_> = preset_names().collect();
        for (i, name) in names.iter().enumerate() {
            assert!(
                !names[i + 1..].contains(name),
                "{name} appears more than once"
            );
        }
    }

    #[test]
    fn test_no_duplicate_keys_within_preset() {
        for (name, pairs) in PRESETS {
            for (i, (key, _)) in pairs.iter().enumerate() {
                assert!(
                    !pairs[i + 1..].iter().any(|(k, _)| k == key),
                    "{key} duplicated in {name}"
                );
            }
        }
    }

    #[test]
    fn test_parse_rule_override() {
        assert_eq!(
            parse_rule_override("Under Review=warning"),
            Ok(("Under Review".to_string(), Tier::Warning))
        );
        assert_eq!(
            parse_rule_override("a=b=critical"),
            Ok(("a=b".to_string(), Tier::Critical))
        );
        assert!(matches!(
            parse_rule_override("no-separator"),
            Err(RuleError::MalformedOverride(_))
        ));
        assert!(matches!(
            parse_rule_override("=critical"),
            Err(RuleError::MalformedOverride(_))
        ));
        assert!(matches!(
            parse_rule_override("stat=severe"),
            Err(RuleError::Tier(_))
        ));
    }

    #[test]
    fn test_band_presets() {
        let risk = vendor_risk_bands();
        assert_eq!(risk.classify(85.0), Tier::Critical);
        assert_eq!(risk.classify(45.0), Tier::Warning);
        assert_eq!(risk.classify(20.0), Tier::Normal);

        let quality = band_preset("quality-score").unwrap();
        assert_eq!(quality.classify(96.0), Tier::Normal);
        assert_eq!(quality.classify(80.0), Tier::Critical);
        assert!(band_preset("unknown").is_none());
    }

    #[test]
    fn test_treatment_protocol_band_presets() {
        let adherence = band_preset("protocol-adherence").unwrap();
        assert_eq!(adherence.classify(90.0), Tier::Normal);
        assert_eq!(adherence.classify(70.0), Tier::Warning);
        assert_eq!(adherence.classify(69.9), Tier::Critical);

        let completion = band_preset("discharge-completion").unwrap();
        assert_eq!(completion.classify(80.0), Tier::Warning);

        let progress = band_preset("care-plan-progress").unwrap();
        assert_eq!(progress.classify(60.0), Tier::Warning);
        assert_eq!(progress.classify(59.0), Tier::Critical);

        let readiness = band_preset("phase-readiness").unwrap();
        assert_eq!(readiness.classify(100.0), Tier::Normal);
        assert_eq!(readiness.classify(50.0), Tier::Info);
    }

    #[test]
    fn test_every_band_preset_resolves() {
        let names: Vec<_> = band_preset_names().collect();
        assert_eq!(names.len(), 6);
        for name in names {
            assert!(band_preset(name).is_some(), "{name} does not resolve");
        }
    }

    #[test]
    fn test_chemo_toxicity_matches_stringified_grades() {
        use crate::dataset::{parse_dataset, project_records};
        use std::path::Path;

        let content = r#"{
            "name": "Side effects",
            "category_field": "severity",
            "preset": "chemo-toxicity",
            "records": [{"severity": 0}, {"severity": 2}, {"severity": 3}, {"severity": 4}]
        }"#;
        let file = parse_dataset(Path::new("effects.json"), content).unwrap();
        let records = project_records(&file);
        let rule = preset("chemo-toxicity").unwrap();
        let result = crate::analysis::aggregate(&records, &rule);

        assert_eq!(result.tier_count(Tier::Normal), 1);
        assert_eq!(result.tier_count(Tier::Warning), 1);
        assert_eq!(result.tier_count(Tier::Critical), 2);
    }

    #[test]
    fn test_treatment_protocol_presets() {
        let discharge = preset("discharge-urgency").unwrap();
        assert_eq!(discharge.classify(Some("same-day")), Tier::Critical);

        let risk = preset("mental-health-risk").unwrap();
        assert_eq!(risk.classify(Some("high")), Tier::Critical);
        assert_eq!(risk.classify(Some("moderate")), Tier::Warning);

        let necessity = preset("test-necessity").unwrap();
        assert_eq!(necessity.classify(Some("justified")), Tier::Normal);

        let phase = preset("trial-phase").unwrap();
        assert_eq!(phase.classify(Some("Phase I/II")), Tier::Warning);
    }
}
