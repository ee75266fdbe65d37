pub mod align;
pub mod error;
pub mod permutation;
pub mod session;

pub use align::{Alignment, align, assign, trim};
pub use error::AnalysisError;
pub use permutation::{DEFAULT_SHUFFLES, analyze};
pub use session::{AnalysisSettings, ChannelAnalysis, InvalidChannel, SessionAnalysis, analyze_session};
