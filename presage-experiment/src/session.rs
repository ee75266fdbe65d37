use chrono::{DateTime, Local};
use presage_core::{SessionEvent, SessionState, StimulusId, TrialRecord};
use presage_timing::{CalibrationStats, wall_clock};

use crate::error::ExperimentError;

/// Trial that was running when the session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterruptedTrial {
    pub trial_id: usize,
    pub start_ms: u64,
    pub before_delay_secs: u64,
    /// Set once the stimulus has been drawn.
    pub stimulus: Option<StimulusId>,
}

/// Everything one session produced. The scheduler is the only writer.
#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    wall_anchor: DateTime<Local>,
    pub(crate) started_ms: Option<u64>,
    pub(crate) first_onset_ms: Option<u64>,
    pub(crate) finished_ms: Option<u64>,
    trials: Vec<TrialRecord>,
    pub(crate) interrupted: Option<InterruptedTrial>,
    pub(crate) calibration: CalibrationStats,
}

impl Session {
    pub fn new(wall_anchor: DateTime<Local>) -> Self {
        Self {
            state: SessionState::Idle,
            wall_anchor,
            started_ms: None,
            first_onset_ms: None,
            finished_ms: None,
            trials: Vec::new(),
            interrupted: None,
            calibration: CalibrationStats::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn apply(&mut self, event: SessionEvent) -> Result<(), ExperimentError> {
        let action = match event {
            SessionEvent::Start => "start",
            SessionEvent::LastTrialFinished => "complete",
            SessionEvent::Stop => "stop",
        };
        self.state = self
            .state
            .transition(event)
            .ok_or(ExperimentError::InvalidState {
                action,
                state: self.state,
            })?;
        Ok(())
    }

    pub(crate) fn push_trial(&mut self, record: TrialRecord) {
        self.trials.push(record);
    }

    pub fn trials(&self) -> &[TrialRecord] {
        &self.trials
    }

    pub fn interrupted(&self) -> Option<&InterruptedTrial> {
        self.interrupted.as_ref()
    }

    pub fn started_ms(&self) -> Option<u64> {
        self.started_ms
    }

    /// End of the first-screen wait.
    pub fn first_onset_ms(&self) -> Option<u64> {
        self.first_onset_ms
    }

    pub fn finished_ms(&self) -> Option<u64> {
        self.finished_ms
    }

    pub fn calibration(&self) -> CalibrationStats {
        self.calibration
    }

    pub fn wall_anchor(&self) -> DateTime<Local> {
        self.wall_anchor
    }

    pub fn wall_clock(&self, ts: u64) -> DateTime<Local> {
        wall_clock(self.wall_anchor, ts)
    }
}
