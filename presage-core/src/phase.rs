use serde::{Deserialize, Serialize};

/// Lifecycle of a single experiment session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Completed,
    Stopped,
}

/// Inputs that move a session between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Start,
    LastTrialFinished,
    Stop,
}

impl SessionState {
    /// Returns the next state, or `None` when the event is not valid here.
    pub fn transition(self, event: SessionEvent) -> Option<Self> {
        use SessionEvent::*;
        use SessionState::*;
        match (self, event) {
            (Idle, Start) => Some(Running),
            (Running, LastTrialFinished) => Some(Completed),
            (Running, Stop) => Some(Stopped),
            // a stop racing with completion leaves the finished session alone
            (Completed, Stop) => Some(Completed),
            (Stopped, Stop) => Some(Stopped),
            _ => None,
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Stopped)
    }
}

/// Sub-cycle of a running trial, in presentation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialPhase {
    OnDemandGate,
    BeforeDelay,
    PreScreen,
    Stimulus,
    PostScreen,
    AfterDelay,
}

impl TrialPhase {
    /// First phase of a trial. Only On-Demand trials after the first pass the gate.
    pub fn first(gated: bool) -> Self {
        if gated {
            Self::OnDemandGate
        } else {
            Self::PreScreen
        }
    }

    /// Next phase within the same trial; `None` once the trial is over.
    /// The final trial of a session has no after delay.
    pub fn next(self, last_trial: bool) -> Option<Self> {
        use TrialPhase::*;
        match self {
            OnDemandGate => Some(BeforeDelay),
            BeforeDelay => Some(PreScreen),
            PreScreen => Some(Stimulus),
            Stimulus => Some(PostScreen),
            PostScreen if last_trial => None,
            PostScreen => Some(AfterDelay),
            AfterDelay => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_transitions() {
        let s = SessionState::Idle;
        assert_eq!(s.transition(SessionEvent::Stop), None);
        let s = s.transition(SessionEvent::Start).unwrap();
        assert_eq!(s, SessionState::Running);
        assert_eq!(s.transition(SessionEvent::Start), None);
        assert_eq!(
            s.transition(SessionEvent::LastTrialFinished),
            Some(SessionState::Completed)
        );
        assert_eq!(s.transition(SessionEvent::Stop), Some(SessionState::Stopped));
        assert!(SessionState::Stopped.is_finished());
        assert!(!SessionState::Running.is_finished());
    }

    #[test]
    fn trial_phase_walk() {
        let mut phases = vec![TrialPhase::first(true)];
        while let Some(next) = phases.last().unwrap().next(false) {
            phases.push(next);
        }
        assert_eq!(
            phases,
            vec![
                TrialPhase::OnDemandGate,
                TrialPhase::BeforeDelay,
                TrialPhase::PreScreen,
                TrialPhase::Stimulus,
                TrialPhase::PostScreen,
                TrialPhase::AfterDelay,
            ]
        );
        assert_eq!(TrialPhase::PostScreen.next(true), None);
        assert_eq!(TrialPhase::first(false), TrialPhase::PreScreen);
    }
}
