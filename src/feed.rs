//! Simulated metrics feed.
//!
//! Dashboards tick their counters on a timer with small random deltas. The
//! feed reproduces that outside the aggregator: every tick it jitters a fresh
//! copy of the snapshot and aggregates it. The snapshot itself is never
//! mutated, and the aggregator keeps no state between ticks.

use crate::analysis::aggregate;
use crate::models::{AggregationResult, ClassificationRule, Record};
use futures::stream::{self, Stream};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::trace;

/// Feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Delay between ticks in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Number of ticks to emit; 0 runs until the consumer stops.
    #[serde(default = "default_ticks")]
    pub ticks: u64,

    /// Largest absolute change applied to a value per tick.
    #[serde(default = "default_max_delta")]
    pub max_delta: u32,

    /// RNG seed for reproducible runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            ticks: default_ticks(),
            max_delta: default_max_delta(),
            seed: None,
        }
    }
}

fn default_interval_ms() -> u64 {
    2000
}

fn default_ticks() -> u64 {
    10
}

fn default_max_delta() -> u32 {
    1
}

/// One feed emission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedTick {
    /// 1-based tick number.
    pub tick: u64,
    /// Aggregation of the jittered snapshot.
    pub result: AggregationResult,
}

struct FeedState {
    snapshot: Vec<Record>,
    rule: ClassificationRule,
    config: FeedConfig,
    rng: StdRng,
    tick: u64,
}

/// Stream of aggregations over jittered copies of `snapshot`.
///
/// The first tick is emitted immediately; later ticks wait `interval_ms`.
pub fn ticks(
    snapshot: Vec<Record>,
    rule: ClassificationRule,
    config: FeedConfig,
) -> impl Stream<Item = FeedTick> {
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let state = FeedState {
        snapshot,
        rule,
        config,
        rng,
        tick: 0,
    };

    stream::unfold(state, |mut state| async move {
        if state.config.ticks > 0 && state.tick >= state.config.ticks {
            return None;
        }

        if state.tick > 0 {
            tokio::time::sleep(Duration::from_millis(state.config.interval_ms)).await;
        }
        state.tick += 1;

        let frame = jitter(&state.snapshot, state.config.max_delta, &mut state.rng);
        let result = aggregate(&frame, &state.rule);
        trace!("Feed tick {}: {} records", state.tick, result.total);

        let tick = FeedTick {
            tick: state.tick,
            result,
        };
        Some((tick, state))
    })
}

/// Copy `records`, moving each value by a random integer in
/// `[-max_delta, max_delta]`, floored at zero.
pub fn jitter<R: Rng>(records: &[Record], max_delta: u32, rng: &mut R) -> Vec<Record> {
    let bound = i64::from(max_delta);

    records
        .iter()
        .map(|record| {
            let mut next = record.clone();
            if let Some(value) = next.value.filter(|v| v.is_finite()) {
                let delta = if bound == 0 {
                    0
                } else {
                    rng.gen_range(-bound..=bound)
                };
                next.value = Some((value + delta as f64).max(0.0));
            }
            next
        })
        .collect()
}
