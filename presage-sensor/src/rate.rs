use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SensorError;

/// Sampling rates the Neulog server supports for multi-minute experiments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SampleRate {
    #[default]
    PerSecond20,
    PerSecond10,
    PerSecond5,
    PerSecond2,
    PerSecond1,
}

impl SampleRate {
    pub fn per_second(self) -> u32 {
        match self {
            SampleRate::PerSecond20 => 20,
            SampleRate::PerSecond10 => 10,
            SampleRate::PerSecond5 => 5,
            SampleRate::PerSecond2 => 2,
            SampleRate::PerSecond1 => 1,
        }
    }

    /// Rate code understood by `StartExperiment`.
    pub fn neulog_code(self) -> u8 {
        match self {
            SampleRate::PerSecond20 => 7,
            SampleRate::PerSecond10 => 8,
            SampleRate::PerSecond5 => 9,
            SampleRate::PerSecond2 => 10,
            SampleRate::PerSecond1 => 11,
        }
    }

    /// Spacing between consecutive samples.
    pub fn period_ms(self) -> u64 {
        1_000 / u64::from(self.per_second())
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = SensorError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            20 => SampleRate::PerSecond20,
            10 => SampleRate::PerSecond10,
            5 => SampleRate::PerSecond5,
            2 => SampleRate::PerSecond2,
            1 => SampleRate::PerSecond1,
            other => return Err(SensorError::UnsupportedRate(other)),
        })
    }
}

impl From<SampleRate> for u32 {
    fn from(rate: SampleRate) -> u32 {
        rate.per_second()
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/s", self.per_second())
    }
}
