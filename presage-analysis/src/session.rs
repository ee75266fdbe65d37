//! Per-channel analysis of one recorded session.

use std::collections::BTreeSet;

use log::{info, warn};
use presage_core::{AnalysisResult, Channel, PhysiologicalSample, TrialRecord};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::align::{Alignment, align};
use crate::error::AnalysisError;
use crate::permutation::{DEFAULT_SHUFFLES, analyze};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSettings {
    pub sample_rate_per_sec: u32,
    pub pre_screen_secs: u64,
    pub shuffle_count: usize,
}

impl AnalysisSettings {
    pub fn new(sample_rate_per_sec: u32, pre_screen_secs: u64) -> Self {
        Self {
            sample_rate_per_sec,
            pre_screen_secs,
            shuffle_count: DEFAULT_SHUFFLES,
        }
    }

    /// Instances per trial in the presentiment window.
    pub fn window(&self) -> usize {
        self.sample_rate_per_sec as usize * self.pre_screen_secs as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelAnalysis {
    pub channel: Channel,
    pub alignment: Alignment,
    pub result: AnalysisResult,
}

/// A channel left out of the results, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidChannel {
    pub channel: Channel,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionAnalysis {
    pub channels: Vec<ChannelAnalysis>,
    pub invalid: Vec<InvalidChannel>,
}

impl SessionAnalysis {
    pub fn channel(&self, channel: Channel) -> Option<&ChannelAnalysis> {
        self.channels.iter().find(|c| c.channel == channel)
    }
}

/// Align and analyze every channel present in `samples`.
///
/// A degenerate channel is reported in `invalid` and the others carry on.
/// Any other error halts the analysis.
pub fn analyze_session<R: Rng + ?Sized>(
    samples: &[PhysiologicalSample],
    trials: &[TrialRecord],
    settings: &AnalysisSettings,
    rng: &mut R,
) -> Result<SessionAnalysis, AnalysisError> {
    let channels: BTreeSet<Channel> = samples.iter().map(|s| s.channel).collect();
    let mut analysis = SessionAnalysis::default();
    for channel in channels {
        let outcome = align(channel, samples, trials, settings.window()).and_then(|alignment| {
            let result = analyze(&alignment.aggregates, settings.shuffle_count, &mut *rng)?;
            Ok(ChannelAnalysis {
                channel,
                alignment,
                result,
            })
        });
        match outcome {
            Ok(done) => {
                info!(
                    "{channel}: D = {:.4}, ZD = {:.4}",
                    done.result.d, done.result.zd
                );
                analysis.channels.push(done);
            }
            Err(e) if e.is_degenerate() => {
                warn!("{channel} excluded: {e}");
                analysis.invalid.push(InvalidChannel {
                    channel,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }
    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use presage_core::{Category, StimulusId, TrialDurations, TrialTimestamps};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn trial(trial_id: usize, start_ms: u64, category: Category) -> TrialRecord {
        TrialRecord {
            trial_id,
            stimulus: StimulusId {
                index: trial_id - 1,
                category,
            },
            timestamps: TrialTimestamps {
                start_ms,
                end_ms: start_ms + 3_000,
            },
            durations: TrialDurations {
                before_delay_secs: 0,
                after_delay_secs: 0,
                total_secs: 3,
            },
            cumulative_onset_secs: trial_id as u64 * 3,
        }
    }

    fn series(channel: Channel, value: impl Fn(u64) -> f64) -> Vec<PhysiologicalSample> {
        // 2 samples per second over 12 seconds
        (0..24)
            .map(|k| PhysiologicalSample {
                channel,
                value: value(k),
                timestamp_ms: k * 500,
            })
            .collect()
    }

    fn trials() -> Vec<TrialRecord> {
        vec![
            trial(1, 0, Category::Excitatory),
            trial(2, 3_000, Category::Neutral),
            trial(3, 6_000, Category::Excitatory),
            trial(4, 9_000, Category::Neutral),
        ]
    }

    #[test]
    fn constant_channel_is_excluded() {
        let mut samples = series(Channel::SkinConductance, |k| ((k * 5) % 7) as f64);
        samples.extend(series(Channel::HeartRate, |_| 72.0));
        let settings = AnalysisSettings {
            shuffle_count: 200,
            ..AnalysisSettings::new(2, 1)
        };
        let analysis =
            analyze_session(&samples, &trials(), &settings, &mut StdRng::seed_from_u64(11))
                .unwrap();

        assert_eq!(analysis.channels.len(), 1);
        let skin = analysis.channel(Channel::SkinConductance).unwrap();
        assert_eq!(skin.alignment.aggregates.len(), 4);
        assert_eq!(skin.alignment.instances.len(), 24);
        assert!(skin.result.d.is_finite() && skin.result.zd.is_finite());
        assert_eq!(analysis.invalid.len(), 1);
        assert_eq!(analysis.invalid[0].channel, Channel::HeartRate);
    }

    #[test]
    fn zero_window_halts_analysis() {
        let samples = series(Channel::SkinConductance, |k| k as f64);
        let settings = AnalysisSettings::new(2, 0);
        let err = analyze_session(&samples, &trials(), &settings, &mut StdRng::seed_from_u64(1))
            .unwrap_err();
        assert_eq!(err, AnalysisError::InsufficientWindow);
    }

    #[test]
    fn window_is_rate_times_pre_screen() {
        assert_eq!(AnalysisSettings::new(20, 3).window(), 60);
        assert_eq!(AnalysisSettings::new(20, 3).shuffle_count, DEFAULT_SHUFFLES);
    }
}
