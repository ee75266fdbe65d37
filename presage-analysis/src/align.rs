//! Attribution of physiological samples to trials and per-trial scoring.

use log::debug;
use presage_core::{
    Channel, PhysiologicalInstance, PhysiologicalSample, TrialAggregate, TrialRecord,
};
use statrs::statistics::Statistics;

use crate::error::AnalysisError;

/// Scored instances of one channel plus the per-trial `Fn` sums.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Alignment {
    pub instances: Vec<PhysiologicalInstance>,
    pub aggregates: Vec<TrialAggregate>,
}

/// Samples between the first trial's start and the last trial's end, both
/// inclusive, in timestamp order.
pub fn trim(samples: &[PhysiologicalSample], trials: &[TrialRecord]) -> Vec<PhysiologicalSample> {
    let (Some(first), Some(last)) = (trials.first(), trials.last()) else {
        return Vec::new();
    };
    let (from, to) = (first.timestamps.start_ms, last.timestamps.end_ms);
    let mut kept: Vec<PhysiologicalSample> = samples
        .iter()
        .filter(|s| from <= s.timestamp_ms && s.timestamp_ms <= to)
        .copied()
        .collect();
    kept.sort_by_key(|s| s.timestamp_ms);
    kept
}

/// Group time-ordered samples by the trial whose `[start, end)` holds them.
///
/// The result has one entry per trial. Samples between trials, and one that
/// lands exactly on the session end, belong to no trial.
pub fn assign(
    samples: &[PhysiologicalSample],
    trials: &[TrialRecord],
) -> Vec<Vec<PhysiologicalSample>> {
    let mut groups = vec![Vec::new(); trials.len()];
    let mut current = 0;
    for sample in samples {
        while current < trials.len() && sample.timestamp_ms >= trials[current].timestamps.end_ms {
            current += 1;
        }
        if current == trials.len() {
            break;
        }
        if trials[current].contains(sample.timestamp_ms) {
            groups[current].push(*sample);
        }
    }
    groups
}

fn check_order(trials: &[TrialRecord]) -> Result<(), AnalysisError> {
    let mut previous: Option<&TrialRecord> = None;
    for trial in trials {
        let ordered = trial.timestamps.start_ms <= trial.timestamps.end_ms
            && previous.is_none_or(|p| {
                p.trial_id < trial.trial_id && p.timestamps.end_ms <= trial.timestamps.start_ms
            });
        if !ordered {
            return Err(AnalysisError::InvalidTrialOrder {
                trial_id: trial.trial_id,
            });
        }
        previous = Some(trial);
    }
    Ok(())
}

/// Score one channel against the session's trials.
///
/// Mean and sample standard deviation come from the first `window` instances
/// of each trial; every instance gets `z` and `f`, but only the window counts
/// towards `Fn`.
pub fn align(
    channel: Channel,
    samples: &[PhysiologicalSample],
    trials: &[TrialRecord],
    window: usize,
) -> Result<Alignment, AnalysisError> {
    if window == 0 {
        return Err(AnalysisError::InsufficientWindow);
    }
    check_order(trials)?;
    let own: Vec<PhysiologicalSample> = samples
        .iter()
        .filter(|s| s.channel == channel)
        .copied()
        .collect();
    let trimmed = trim(&own, trials);
    debug!(
        "{channel}: {} of {} samples inside the session",
        trimmed.len(),
        own.len()
    );

    let mut alignment = Alignment::default();
    for (trial, group) in trials.iter().zip(assign(&trimmed, trials)) {
        let degenerate = |reason: String| AnalysisError::DegenerateSignal {
            channel,
            trial_id: trial.trial_id,
            reason,
        };
        let values: Vec<f64> = group.iter().map(|s| s.value).collect();
        let baseline = &values[..window.min(values.len())];
        if baseline.len() < 2 {
            return Err(degenerate(format!(
                "{} sample(s) in the presentiment window",
                baseline.len()
            )));
        }
        let mean = baseline.iter().mean();
        let sd = baseline.iter().std_dev();
        if sd == 0.0 || !sd.is_finite() {
            return Err(degenerate("constant signal".into()));
        }

        let z0 = (values[0] - mean) / sd;
        let mut fn_sum = 0.0;
        for (i, sample) in group.iter().enumerate() {
            let z = (sample.value - mean) / sd;
            let f = z - z0;
            if i < baseline.len() {
                fn_sum += f;
            }
            alignment.instances.push(PhysiologicalInstance {
                trial_id: trial.trial_id,
                instance: i + 1,
                sample: *sample,
                mean,
                sd,
                z,
                f,
            });
        }
        alignment.aggregates.push(TrialAggregate {
            trial_id: trial.trial_id,
            category: trial.stimulus.category,
            fn_sum,
        });
    }
    Ok(alignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use presage_core::{Category, StimulusId, TrialDurations, TrialTimestamps};

    fn trial(trial_id: usize, start_ms: u64, end_ms: u64, category: Category) -> TrialRecord {
        TrialRecord {
            trial_id,
            stimulus: StimulusId {
                index: trial_id - 1,
                category,
            },
            timestamps: TrialTimestamps { start_ms, end_ms },
            durations: TrialDurations {
                before_delay_secs: 0,
                after_delay_secs: 0,
                total_secs: (end_ms - start_ms) / 1_000,
            },
            cumulative_onset_secs: 0,
        }
    }

    fn sample(timestamp_ms: u64, value: f64) -> PhysiologicalSample {
        PhysiologicalSample {
            channel: Channel::SkinConductance,
            value,
            timestamp_ms,
        }
    }

    #[test]
    fn trim_keeps_boundaries() {
        let trials = [
            trial(1, 1_000, 2_000, Category::Neutral),
            trial(2, 2_000, 3_000, Category::Excitatory),
        ];
        let samples: Vec<_> = [999, 1_000, 2_500, 3_000, 3_001]
            .into_iter()
            .map(|t| sample(t, 1.0))
            .collect();
        let kept: Vec<u64> = trim(&samples, &trials).iter().map(|s| s.timestamp_ms).collect();
        assert_eq!(kept, [1_000, 2_500, 3_000]);
    }

    #[test]
    fn end_boundary_sample_belongs_to_next_trial() {
        let trials = [
            trial(1, 0, 1_000, Category::Neutral),
            trial(2, 1_000, 2_000, Category::Excitatory),
        ];
        let samples = [sample(500, 1.0), sample(1_000, 2.0), sample(2_000, 3.0)];
        let groups = assign(&samples, &trials);
        assert_eq!(groups[0].len(), 1);
        assert_eq!(groups[1].len(), 1);
        assert_eq!(groups[1][0].timestamp_ms, 1_000);
    }

    #[test]
    fn samples_between_trials_are_dropped() {
        let trials = [
            trial(1, 0, 1_000, Category::Neutral),
            trial(2, 2_000, 3_000, Category::Excitatory),
        ];
        let samples = [sample(900, 1.0), sample(1_500, 2.0), sample(2_100, 3.0)];
        let groups = assign(&samples, &trials);
        assert_eq!(groups.iter().map(Vec::len).collect::<Vec<_>>(), [1, 1]);
    }

    #[test]
    fn window_statistics_only_cover_presentiment() {
        // K = 5 over 10 instances
        let trials = [trial(1, 0, 10_000, Category::Excitatory)];
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0, 200.0, 300.0, 400.0, 500.0];
        let samples: Vec<_> = values
            .iter()
            .enumerate()
            .map(|(i, &v)| sample(i as u64 * 1_000, v))
            .collect();
        let alignment = align(Channel::SkinConductance, &samples, &trials, 5).unwrap();

        assert_eq!(alignment.instances.len(), 10);
        let sd = 2.5f64.sqrt();
        for (i, inst) in alignment.instances.iter().enumerate() {
            assert_eq!(inst.instance, i + 1);
            assert!((inst.mean - 3.0).abs() < 1e-12);
            assert!((inst.sd - sd).abs() < 1e-12);
            assert!((inst.z - (values[i] - 3.0) / sd).abs() < 1e-9);
            assert!((inst.f - (values[i] - 1.0) / sd).abs() < 1e-9);
        }
        // f over the window: (0 + 1 + 2 + 3 + 4) / sd
        let expected = 10.0 / sd;
        assert!((alignment.aggregates[0].fn_sum - expected).abs() < 1e-9);
        assert_eq!(alignment.aggregates[0].category, Category::Excitatory);
    }

    #[test]
    fn align_is_idempotent() {
        let trials = [
            trial(1, 0, 2_000, Category::Neutral),
            trial(2, 2_000, 4_000, Category::Excitatory),
        ];
        let samples: Vec<_> = (0..40)
            .map(|i| sample(i * 100, ((i * 7) % 11) as f64))
            .collect();
        let a = align(Channel::SkinConductance, &samples, &trials, 10).unwrap();
        let b = align(Channel::SkinConductance, &samples, &trials, 10).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn constant_signal_is_degenerate() {
        let trials = [trial(1, 0, 1_000, Category::Neutral)];
        let samples: Vec<_> = (0..10).map(|i| sample(i * 100, 4.2)).collect();
        let err = align(Channel::SkinConductance, &samples, &trials, 5).unwrap_err();
        assert!(err.is_degenerate());
        assert!(matches!(err, AnalysisError::DegenerateSignal { trial_id: 1, .. }));
    }

    #[test]
    fn empty_trial_is_degenerate() {
        let trials = [trial(1, 0, 1_000, Category::Neutral)];
        let err = align(Channel::SkinConductance, &[], &trials, 5).unwrap_err();
        assert!(err.is_degenerate());
    }

    #[test]
    fn overlapping_trials_are_an_invariant_violation() {
        let trials = [
            trial(1, 0, 2_000, Category::Neutral),
            trial(2, 1_000, 3_000, Category::Excitatory),
        ];
        let err = align(Channel::SkinConductance, &[], &trials, 5).unwrap_err();
        assert_eq!(err, AnalysisError::InvalidTrialOrder { trial_id: 2 });
        assert!(!err.is_degenerate());
    }
}
