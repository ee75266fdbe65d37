pub mod stop;
pub mod timer;

pub use stop::{StopSignal, StopToken, WaitOutcome, wait};
pub use timer::{CalibrationStats, SessionTimer, Timer, format_clock, wall_clock};
