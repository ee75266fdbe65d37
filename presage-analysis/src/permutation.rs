//! Observed excitatory/neutral difference against a shuffled null distribution.

use log::debug;
use presage_core::{AnalysisResult, Category, TrialAggregate};
use rand::Rng;
use rand::seq::SliceRandom;
use statrs::statistics::Statistics;

use crate::error::AnalysisError;

pub const DEFAULT_SHUFFLES: usize = 5_000;

/// Compute `D` and its standardized effect size `ZD`.
///
/// Each shuffle permutes every `Fn`, takes a prefix as long as the number of
/// excitatory trials and scores `sum(prefix) - sum(suffix)`. `ZD` uses the
/// population standard deviation of those scores.
pub fn analyze<R: Rng + ?Sized>(
    aggregates: &[TrialAggregate],
    shuffle_count: usize,
    rng: &mut R,
) -> Result<AnalysisResult, AnalysisError> {
    if shuffle_count == 0 {
        return Err(AnalysisError::InvalidShuffleCount);
    }
    let d: f64 = aggregates
        .iter()
        .map(|a| match a.category {
            Category::Excitatory => a.fn_sum,
            Category::Neutral => -a.fn_sum,
        })
        .sum();
    let excitatory = aggregates
        .iter()
        .filter(|a| a.category == Category::Excitatory)
        .count();

    let mut working: Vec<f64> = aggregates.iter().map(|a| a.fn_sum).collect();
    let mut null = Vec::with_capacity(shuffle_count);
    for _ in 0..shuffle_count {
        working.shuffle(rng);
        let (prefix, suffix) = working.split_at(excitatory);
        null.push(prefix.iter().sum::<f64>() - suffix.iter().sum::<f64>());
    }

    let mean = null.iter().mean();
    let sd = null.iter().population_std_dev();
    debug!("D = {d}, null mean {mean}, population sd {sd} over {shuffle_count} shuffles");
    if sd == 0.0 || !sd.is_finite() {
        return Err(AnalysisError::DegenerateNullDistribution);
    }
    let zd = (d - mean) / sd;
    if !zd.is_finite() {
        return Err(AnalysisError::DegenerateNullDistribution);
    }
    Ok(AnalysisResult { d, zd })
}
