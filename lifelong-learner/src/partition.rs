//! Sample partitioner
//!
//! Splits a task's `n` samples into index subsets for transformer, voter and decider
//! fitting. Three modes:
//!
//! - **No split**: every role gets the full range `0..n`.
//! - **Reuse** (fractions sum > 1): each subset is drawn independently, with replacement,
//!   from the full range. Subsets may overlap and repeat indices.
//! - **Disjoint** (fractions sum <= 1): transformer indices are drawn from the full range,
//!   voter indices from what the transformer draw left unused, decider indices from what
//!   both left unused. Each draw is with replacement from its pool, so a subset can repeat
//!   an index internally but never shares one with another subset.
//!
//! Each fraction lies in `[0, 1]` and subset sizes are `round(n * fraction)`. In disjoint
//! mode a request larger than its pool is clamped to the pool size; an empty pool yields an
//! empty subset.

use crate::error::{LearnerError, LearnerResult};
use lifelong_common::SplitConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::warn;

/// Fractions of a task's samples allocated to each role
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitSpec {
    pub transformer: f64,
    pub voter: f64,
    pub decider: f64,
}

impl SplitSpec {
    pub fn new(transformer: f64, voter: f64, decider: f64) -> LearnerResult<Self> {
        let split = Self {
            transformer,
            voter,
            decider,
        };
        split.validate()?;
        Ok(split)
    }

    pub fn sum(&self) -> f64 {
        self.transformer + self.voter + self.decider
    }

    /// True when subsets are drawn independently with replacement
    pub fn is_reuse(&self) -> bool {
        self.sum() > 1.0
    }

    pub fn validate(&self) -> LearnerResult<()> {
        for (name, fraction) in [
            ("transformer", self.transformer),
            ("voter", self.voter),
            ("decider", self.decider),
        ] {
            if !(0.0..=1.0).contains(&fraction) {
                return Err(LearnerError::InvalidSplit(format!(
                    "{} fraction must be between 0 and 1, got {}",
                    name, fraction
                )));
            }
        }
        Ok(())
    }
}

impl From<SplitConfig> for SplitSpec {
    fn from(config: SplitConfig) -> Self {
        Self {
            transformer: config.transformer,
            voter: config.voter,
            decider: config.decider,
        }
    }
}

/// Index subsets for the three roles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub transformer: Vec<usize>,
    pub voter: Vec<usize>,
    pub decider: Vec<usize>,
}

impl Partition {
    /// Every role sees every sample
    pub fn full(n: usize) -> Self {
        let all: Vec<usize> = (0..n).collect();
        Self {
            transformer: all.clone(),
            voter: all.clone(),
            decider: all,
        }
    }
}

/// Partition `0..n` according to `split`
pub fn partition_indices<R: Rng + ?Sized>(
    n: usize,
    split: Option<&SplitSpec>,
    rng: &mut R,
) -> LearnerResult<Partition> {
    let split = match split {
        None => return Ok(Partition::full(n)),
        Some(split) => split,
    };
    split.validate()?;

    let all: Vec<usize> = (0..n).collect();

    if split.is_reuse() {
        return Ok(Partition {
            transformer: draw(&all, sample_count(n, split.transformer), rng),
            voter: draw(&all, sample_count(n, split.voter), rng),
            decider: draw(&all, sample_count(n, split.decider), rng),
        });
    }

    let transformer = draw(&all, clamp(n, split.transformer, all.len()), rng);

    let mut used: BTreeSet<usize> = transformer.iter().copied().collect();
    let voter_pool = unused(&all, &used);
    let voter = draw(&voter_pool, clamp(n, split.voter, voter_pool.len()), rng);

    used.extend(voter.iter().copied());
    let decider_pool = unused(&all, &used);
    let decider = draw(&decider_pool, clamp(n, split.decider, decider_pool.len()), rng);

    Ok(Partition {
        transformer,
        voter,
        decider,
    })
}

fn sample_count(n: usize, fraction: f64) -> usize {
    (n as f64 * fraction).round() as usize
}

fn clamp(n: usize, fraction: f64, pool_size: usize) -> usize {
    let requested = sample_count(n, fraction);
    if requested > pool_size {
        warn!(
            "Requested {} samples from a pool of {}, clamping",
            requested, pool_size
        );
        pool_size
    } else {
        requested
    }
}

fn unused(all: &[usize], used: &BTreeSet<usize>) -> Vec<usize> {
    all.iter().copied().filter(|i| !used.contains(i)).collect()
}

/// Draw `count` values from `pool` with replacement
fn draw<R: Rng + ?Sized>(pool: &[usize], count: usize, rng: &mut R) -> Vec<usize> {
    if pool.is_empty() {
        return Vec::new();
    }
    (0..count)
        .map(|_| pool[rng.gen_range(0..pool.len())])
        .collect()
}
