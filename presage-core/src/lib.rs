pub mod phase;
pub mod sample;
pub mod stimulus;
pub mod trial;

pub use phase::{SessionEvent, SessionState, TrialPhase};
pub use sample::{AnalysisResult, Channel, PhysiologicalInstance, PhysiologicalSample, TrialAggregate};
pub use stimulus::{Category, ParseStimulusIdError, Stimulus, StimulusId, StimulusPool};
pub use trial::{TrialDurations, TrialMode, TrialRecord, TrialTimestamps};
