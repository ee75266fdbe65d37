use log::debug;
use presage_core::{Stimulus, StimulusPool};
use presage_rng::{RandomSource, select_index};

use crate::error::ExperimentError;

/// Draw one stimulus uniformly from the whole pool.
pub fn select_stimulus<'p, S: RandomSource + ?Sized>(
    source: &mut S,
    pool: &'p StimulusPool,
) -> Result<&'p Stimulus, ExperimentError> {
    let index = select_index(source, pool.len())?;
    let stimulus = pool.get(index).ok_or_else(|| {
        ExperimentError::Invariant(format!(
            "selector returned index {index} for a pool of {}",
            pool.len()
        ))
    })?;
    debug!("selected {} via {}", stimulus.id, source.name());
    Ok(stimulus)
}
