//! Aggregation over dashboard records.
//!
//! `aggregator` computes category, tier and numeric summaries; `bands`
//! classifies raw scores by threshold.

pub mod aggregator;
pub mod bands;

pub use aggregator::*;
pub use bands::{band_counts, Band, BandError, ScoreBands};
