use presage_core::TrialMode;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Inclusive bounds of a randomized delay, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelayRange {
    pub min: u64,
    pub max: u64,
}

impl DelayRange {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub const fn fixed(secs: u64) -> Self {
        Self::new(secs, secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub trials: usize,
    /// Blank screen shown once before the first trial.
    pub first_screen_secs: u64,
    pub pre_screen_secs: u64,
    pub stimulus_secs: u64,
    pub post_screen_secs: u64,
    /// Only drawn for On-Demand trials after the first.
    pub before_delay: DelayRange,
    /// Drawn after every trial except the last.
    pub after_delay: DelayRange,
    pub mode: TrialMode,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            trials: 45,
            first_screen_secs: 10,
            pre_screen_secs: 3,
            stimulus_secs: 3,
            post_screen_secs: 9,
            before_delay: DelayRange::fixed(0),
            after_delay: DelayRange::new(0, 5),
            mode: TrialMode::FreeRunning,
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trials == 0 {
            return Err(ConfigError::NoTrials);
        }
        for (name, range) in [("before", self.before_delay), ("after", self.after_delay)] {
            if range.min > range.max {
                return Err(ConfigError::InvalidRange {
                    name,
                    min: range.min,
                    max: range.max,
                });
            }
        }
        Ok(())
    }

    /// Pre-screen + stimulus + post-screen.
    pub fn fixed_trial_secs(&self) -> u64 {
        self.pre_screen_secs + self.stimulus_secs + self.post_screen_secs
    }

    /// Upper estimate used to size physiological recording.
    pub fn estimated_session_secs(&self) -> u64 {
        let per_trial = self.fixed_trial_secs() + self.before_delay.max + self.after_delay.max;
        self.first_screen_secs + per_trial * self.trials as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_production_values() {
        let config = ExperimentConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.fixed_trial_secs(), 15);
        // 10 + (15 + 0 + 5) * 45
        assert_eq!(config.estimated_session_secs(), 910);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: ExperimentConfig =
            serde_json::from_str(r#"{"trials": 3, "mode": "on-demand"}"#).unwrap();
        assert_eq!(config.trials, 3);
        assert_eq!(config.mode, TrialMode::OnDemand);
        assert_eq!(config.after_delay, DelayRange::new(0, 5));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let config = ExperimentConfig {
            after_delay: DelayRange::new(4, 2),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRange { name: "after", min: 4, max: 2 })
        ));
        let config = ExperimentConfig {
            trials: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoTrials)));
    }
}
