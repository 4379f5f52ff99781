//! Threshold banding for raw scores.
//!
//! Some screens classify a number rather than a category: a vendor risk score
//! of 85 is critical, 65 a warning, 30 normal. `ScoreBands` holds those
//! thresholds as data.

use super::aggregator::Aggregatable;
use crate::models::{OrderedCounts, Tier};
use serde::{Deserialize, Serialize};

/// Errors raised when building score bands.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BandError {
    #[error("score bands need at least one threshold")]
    Empty,

    #[error("band threshold must be a finite number, got {0}")]
    NonFinite(f64),
}

/// One threshold: values `>= min` land in `tier`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    pub tier: Tier,
}

/// Descending thresholds plus the tier for values below all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBands")]
pub struct ScoreBands {
    bands: Vec<Band>,
    floor: Tier,
}

#[derive(Deserialize)]
struct RawBands {
    bands: Vec<Band>,
    #[serde(default)]
    floor: Tier,
}

impl TryFrom<RawBands> for ScoreBands {
    type Error = BandError;

    fn try_from(raw: RawBands) -> Result<Self, Self::Error> {
        ScoreBands::new(raw.bands, raw.floor)
    }
}

impl ScoreBands {
    /// Builds bands, sorting thresholds from highest to lowest.
    pub fn new(mut bands: Vec<Band>, floor: Tier) -> Result<Self, BandError> {
        if bands.is_empty() {
            return Err(BandError::Empty);
        }
        if let Some(bad) = bands.iter().find(|b| !b.min.is_finite()) {
            return Err(BandError::NonFinite(bad.min));
        }

        bands.sort_by(|a, b| b.min.total_cmp(&a.min));
        Ok(Self { bands, floor })
    }

    /// Tier of the first threshold `value` reaches.
    pub fn classify(&self, value: f64) -> Tier {
        self.bands
            .iter()
            .find(|b| value >= b.min)
            .map(|b| b.tier)
            .unwrap_or(self.floor)
    }

    /// Thresholds, highest first.
    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn floor(&self) -> Tier {
        self.floor
    }
}

/// Count records by the band their value falls into.
///
/// Records without a finite value are not counted.
pub fn band_counts<R: Aggregatable>(records: &[R], bands: &ScoreBands) -> OrderedCounts<Tier> {
    let mut counts = OrderedCounts::new();

    for value in records.iter().filter_map(|r| r.value()) {
        if value.is_finite() {
            counts.increment(bands.classify(value));
        }
    }

    counts
}
