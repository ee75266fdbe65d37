pub mod client;
pub mod error;
pub mod rate;
pub mod recorder;

pub use client::{NeulogClient, SensorClient, ServerStatus};
pub use error::SensorError;
pub use rate::SampleRate;
pub use recorder::{Recorder, RecordingPlan, SampleBuffer};
