pub mod config;
pub mod display;
pub mod error;
pub mod selector;
pub mod session;
pub mod state;

pub use config::{DelayRange, ExperimentConfig};
pub use display::{ChannelGate, DisplayError, OperatorDecision, OperatorGate, StimulusDisplay};
pub use error::{ConfigError, ExperimentError};
pub use selector::select_stimulus;
pub use session::{InterruptedTrial, Session};
pub use state::TrialScheduler;
