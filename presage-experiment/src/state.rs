use std::time::Duration;

use chrono::Local;
use log::{debug, info, warn};
use presage_core::{
    SessionEvent, SessionState, StimulusPool, TrialDurations, TrialMode, TrialPhase, TrialRecord,
    TrialTimestamps,
};
use presage_rng::{RandomSource, RngError, sample_interval};
use presage_timing::{StopToken, Timer, WaitOutcome, wait};

use crate::config::{DelayRange, ExperimentConfig};
use crate::display::{DisplayError, OperatorDecision, OperatorGate, StimulusDisplay};
use crate::error::ExperimentError;
use crate::selector::select_stimulus;
use crate::session::{InterruptedTrial, Session};

/// Why the trial loop ended early.
enum Interrupt {
    Stopped,
    Failed(ExperimentError),
}

impl From<ExperimentError> for Interrupt {
    fn from(e: ExperimentError) -> Self {
        Interrupt::Failed(e)
    }
}

impl From<RngError> for Interrupt {
    fn from(e: RngError) -> Self {
        Interrupt::Failed(e.into())
    }
}

impl From<DisplayError> for Interrupt {
    fn from(e: DisplayError) -> Self {
        Interrupt::Failed(e.into())
    }
}

/// Runs the trials of one session against a display and an operator gate.
///
/// All waits race the stop token, so a stop lands before the next wait
/// starts and cuts short the one in progress.
pub struct TrialScheduler<T, D, G>
where
    T: Timer<Timestamp = u64>,
    D: StimulusDisplay,
    G: OperatorGate,
{
    config: ExperimentConfig,
    pool: StimulusPool,
    source: Option<Box<dyn RandomSource + Send>>,
    timer: T,
    display: D,
    gate: G,
    stop: StopToken,
    session: Session,
}

impl<T, D, G> TrialScheduler<T, D, G>
where
    T: Timer<Timestamp = u64>,
    D: StimulusDisplay,
    G: OperatorGate,
{
    pub fn new(
        config: ExperimentConfig,
        pool: StimulusPool,
        source: Option<Box<dyn RandomSource + Send>>,
        timer: T,
        display: D,
        gate: G,
        stop: StopToken,
    ) -> Self {
        let since_start = chrono::Duration::milliseconds(timer.now() as i64);
        Self {
            config,
            pool,
            source,
            timer,
            display,
            gate,
            stop,
            session: Session::new(Local::now() - since_start),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Run the whole session.
    ///
    /// Configuration problems are reported before the session starts and
    /// leave it `Idle`. A stop request ends it as `Stopped` with `Ok`; a
    /// failure mid-session also ends it as `Stopped` but returns the error.
    /// Recorded trials are kept in both cases.
    pub async fn run(&mut self) -> Result<SessionState, ExperimentError> {
        self.preflight()?;
        self.session.apply(SessionEvent::Start)?;
        self.session.started_ms = Some(self.timer.now());
        info!(
            "session started: {} trial(s), {:?} mode, source {}",
            self.config.trials,
            self.config.mode,
            self.source.as_ref().map_or("none", |s| s.name())
        );

        let outcome = self.run_trials().await;
        self.session.calibration = self.timer.calibration_stats();
        match outcome {
            Ok(()) => {
                self.session.apply(SessionEvent::LastTrialFinished)?;
                info!("session completed with {} trial(s)", self.session.trials().len());
                Ok(SessionState::Completed)
            }
            Err(interrupt) => {
                self.display.close();
                self.session.finished_ms = Some(self.timer.now());
                self.session.apply(SessionEvent::Stop)?;
                match interrupt {
                    Interrupt::Stopped => {
                        info!(
                            "session stopped after {} trial(s)",
                            self.session.trials().len()
                        );
                        Ok(SessionState::Stopped)
                    }
                    Interrupt::Failed(e) => {
                        warn!("session aborted: {e}");
                        Err(e)
                    }
                }
            }
        }
    }

    fn preflight(&self) -> Result<(), ExperimentError> {
        if self.session.state() != SessionState::Idle {
            return Err(ExperimentError::InvalidState {
                action: "start",
                state: self.session.state(),
            });
        }
        self.config.validate()?;
        if !self.pool.is_complete() {
            return Err(ExperimentError::NoStimuliLoaded {
                neutral: self.pool.neutral_count(),
                excitatory: self.pool.excitatory_count(),
            });
        }
        if self.source.is_none() {
            return Err(ExperimentError::NoRandomSourceSelected);
        }
        Ok(())
    }

    async fn run_trials(&mut self) -> Result<(), Interrupt> {
        self.display.show_blank()?;
        self.hold(self.config.first_screen_secs).await?;
        self.session.first_onset_ms = Some(self.timer.now());

        let mut cumulative_onset_secs = 0;
        for trial_id in 1..=self.config.trials {
            let last = trial_id == self.config.trials;
            let record = self.run_trial(trial_id, last, cumulative_onset_secs).await?;
            cumulative_onset_secs = record.cumulative_onset_secs;
            self.session.interrupted = None;
            self.session.push_trial(record);
        }
        Ok(())
    }

    async fn run_trial(
        &mut self,
        trial_id: usize,
        last: bool,
        onset_before: u64,
    ) -> Result<TrialRecord, Interrupt> {
        let start_ms = self.timer.now();
        self.session.interrupted = Some(InterruptedTrial {
            trial_id,
            start_ms,
            before_delay_secs: 0,
            stimulus: None,
        });
        let gated = self.config.mode == TrialMode::OnDemand && trial_id >= 2;
        let mut before_delay_secs = 0;
        let mut after_delay_secs = 0;
        let mut stimulus = None;

        let mut phase = Some(TrialPhase::first(gated));
        while let Some(current) = phase {
            debug!("trial {trial_id}: {current:?}");
            match current {
                TrialPhase::OnDemandGate => self.await_operator(trial_id).await?,
                TrialPhase::BeforeDelay => {
                    before_delay_secs = self.draw_delay(self.config.before_delay)?;
                    if let Some(t) = self.session.interrupted.as_mut() {
                        t.before_delay_secs = before_delay_secs;
                    }
                    self.hold(before_delay_secs).await?;
                }
                TrialPhase::PreScreen => {
                    self.display.show_blank()?;
                    self.hold(self.config.pre_screen_secs).await?;
                }
                TrialPhase::Stimulus => {
                    let source = self
                        .source
                        .as_deref_mut()
                        .ok_or(ExperimentError::NoRandomSourceSelected)?;
                    let picked = select_stimulus(source, &self.pool)?;
                    self.display.show_stimulus(picked)?;
                    stimulus = Some(picked.id);
                    if let Some(t) = self.session.interrupted.as_mut() {
                        t.stimulus = stimulus;
                    }
                    self.hold(self.config.stimulus_secs).await?;
                }
                TrialPhase::PostScreen => {
                    self.display.show_blank()?;
                    self.hold(self.config.post_screen_secs).await?;
                }
                TrialPhase::AfterDelay => {
                    after_delay_secs = self.draw_delay(self.config.after_delay)?;
                    self.hold(after_delay_secs).await?;
                }
            }
            phase = current.next(last);
        }
        if last {
            self.display.close();
        }

        let end_ms = self.timer.now();
        let stimulus = stimulus.ok_or_else(|| {
            ExperimentError::Invariant(format!("trial {trial_id} finished without a stimulus"))
        })?;
        let total_secs = self.config.fixed_trial_secs() + before_delay_secs + after_delay_secs;
        if last {
            self.session.finished_ms = Some(end_ms);
        }
        info!(
            "trial {trial_id}: {stimulus}, before {before_delay_secs}s, after {after_delay_secs}s"
        );
        Ok(TrialRecord {
            trial_id,
            stimulus,
            timestamps: TrialTimestamps { start_ms, end_ms },
            durations: TrialDurations {
                before_delay_secs,
                after_delay_secs,
                total_secs,
            },
            cumulative_onset_secs: onset_before + total_secs,
        })
    }

    fn draw_delay(&mut self, range: DelayRange) -> Result<u64, Interrupt> {
        let source = self
            .source
            .as_deref_mut()
            .ok_or(ExperimentError::NoRandomSourceSelected)?;
        Ok(sample_interval(source, range.min, range.max)?)
    }

    async fn await_operator(&mut self, trial_id: usize) -> Result<(), Interrupt> {
        if self.stop.is_stopped() {
            return Err(Interrupt::Stopped);
        }
        info!("waiting for operator before trial {trial_id}");
        let mut stop = self.stop.clone();
        let decision = tokio::select! {
            biased;
            _ = stop.stopped() => OperatorDecision::Abort,
            decision = self.gate.await_decision(trial_id) => decision,
        };
        match decision {
            OperatorDecision::Continue => Ok(()),
            OperatorDecision::Abort => Err(Interrupt::Stopped),
        }
    }

    async fn hold(&mut self, secs: u64) -> Result<(), Interrupt> {
        match wait(&mut self.timer, Duration::from_secs(secs), &self.stop).await {
            WaitOutcome::Elapsed => Ok(()),
            WaitOutcome::Stopped => Err(Interrupt::Stopped),
        }
    }
}
