use presage_core::SessionState;
use presage_rng::RngError;
use thiserror::Error;

use crate::display::DisplayError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("a session needs at least one trial")]
    NoTrials,
    #[error("invalid {name} delay range: min {min} is greater than max {max}")]
    InvalidRange {
        name: &'static str,
        min: u64,
        max: u64,
    },
}

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no random source selected")]
    NoRandomSourceSelected,
    #[error("stimuli missing: {neutral} neutral and {excitatory} excitatory loaded")]
    NoStimuliLoaded { neutral: usize, excitatory: usize },
    #[error(transparent)]
    Rng(#[from] RngError),
    #[error(transparent)]
    Display(#[from] DisplayError),
    #[error("cannot {action} a session that is {state:?}")]
    InvalidState {
        action: &'static str,
        state: SessionState,
    },
    #[error("internal error: {0}")]
    Invariant(String),
}
