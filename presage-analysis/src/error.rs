use presage_core::Channel;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("{channel} is degenerate in trial {trial_id}: {reason}")]
    DegenerateSignal {
        channel: Channel,
        trial_id: usize,
        reason: String,
    },
    #[error("shuffled differences have zero variance")]
    DegenerateNullDistribution,
    #[error("presentiment window is empty; sample rate and pre-screen must be positive")]
    InsufficientWindow,
    #[error("trial records out of order at trial {trial_id}")]
    InvalidTrialOrder { trial_id: usize },
    #[error("shuffle count must be positive")]
    InvalidShuffleCount,
}

impl AnalysisError {
    /// Degeneracy invalidates one channel; everything else halts the analysis.
    pub fn is_degenerate(&self) -> bool {
        matches!(
            self,
            AnalysisError::DegenerateSignal { .. } | AnalysisError::DegenerateNullDistribution
        )
    }
}
