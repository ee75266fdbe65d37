use serde::{Deserialize, Serialize};

use crate::stimulus::StimulusId;

/// How consecutive trials are paced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrialMode {
    /// Trials follow each other with randomized after delays only.
    #[default]
    FreeRunning,
    /// From the second trial on, the operator confirms each trial and a
    /// randomized before delay precedes it.
    OnDemand,
}

/// Session-clock milliseconds bounding a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialTimestamps {
    pub start_ms: u64,
    pub end_ms: u64,
}

/// Whole-second durations that make up a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialDurations {
    pub before_delay_secs: u64,
    pub after_delay_secs: u64,
    /// pre-screen + stimulus + post-screen + before + after
    pub total_secs: u64,
}

/// One finished trial. Never mutated once the next trial begins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// 1-based.
    pub trial_id: usize,
    pub stimulus: StimulusId,
    pub timestamps: TrialTimestamps,
    pub durations: TrialDurations,
    /// Sum of `durations.total_secs` from the first trial up to this one.
    pub cumulative_onset_secs: u64,
}

impl TrialRecord {
    /// `n{trial_id}`, the label used in exports.
    pub fn label(&self) -> String {
        format!("n{}", self.trial_id)
    }

    /// Half-open window `[start, end)` used to attribute samples.
    pub fn contains(&self, timestamp_ms: u64) -> bool {
        self.timestamps.start_ms <= timestamp_ms && timestamp_ms < self.timestamps.end_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stimulus::Category;

    #[test]
    fn window_is_half_open() {
        let record = TrialRecord {
            trial_id: 2,
            stimulus: StimulusId {
                index: 0,
                category: Category::Neutral,
            },
            timestamps: TrialTimestamps {
                start_ms: 1_000,
                end_ms: 4_000,
            },
            durations: TrialDurations {
                before_delay_secs: 0,
                after_delay_secs: 0,
                total_secs: 3,
            },
            cumulative_onset_secs: 6,
        };
        assert!(record.contains(1_000));
        assert!(record.contains(3_999));
        assert!(!record.contains(4_000));
        assert!(!record.contains(999));
        assert_eq!(record.label(), "n2");
    }
}
