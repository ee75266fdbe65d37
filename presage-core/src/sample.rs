use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::stimulus::Category;

/// Physiological signal recorded during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    SkinConductance,
    HeartRate,
    Brainwaves,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::SkinConductance, Channel::HeartRate, Channel::Brainwaves];

    pub fn key(self) -> &'static str {
        match self {
            Channel::SkinConductance => "skin-conductance",
            Channel::HeartRate => "heart-rate",
            Channel::Brainwaves => "brainwaves",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Channel::SkinConductance => "Skin conductance",
            Channel::HeartRate => "Heart rate",
            Channel::Brainwaves => "Brainwaves",
        })
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|c| c.key() == s)
            .ok_or_else(|| format!("unknown channel {s:?}"))
    }
}

/// Raw sensor reading stamped on the session clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysiologicalSample {
    pub channel: Channel,
    pub value: f64,
    pub timestamp_ms: u64,
}

/// A sample attributed to a trial, with the trial's baseline statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysiologicalInstance {
    pub trial_id: usize,
    /// 1-based position within the trial.
    pub instance: usize,
    pub sample: PhysiologicalSample,
    /// Mean over the trial's presentiment window.
    pub mean: f64,
    /// Sample standard deviation over the presentiment window.
    pub sd: f64,
    pub z: f64,
    /// `z` minus the z of the trial's first instance.
    pub f: f64,
}

/// Per-trial sum of `f` over the presentiment window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialAggregate {
    pub trial_id: usize,
    pub category: Category,
    pub fn_sum: f64,
}

/// Observed effect and its standardized size against the shuffled null.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub d: f64,
    pub zd: f64,
}
