use std::future::Future;

use log::{debug, warn};
use presage_core::Stimulus;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

#[derive(Debug, Error)]
#[error("display failed: {0}")]
pub struct DisplayError(pub String);

/// Where the participant sees the session.
pub trait StimulusDisplay: Send {
    /// Plain background, used for the first screen and around each stimulus.
    fn show_blank(&mut self) -> Result<(), DisplayError>;
    fn show_stimulus(&mut self, stimulus: &Stimulus) -> Result<(), DisplayError>;
    /// Close whatever is open. Must be safe to call more than once.
    fn close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorDecision {
    Continue,
    Abort,
}

/// Operator confirmation between On-Demand trials. May wait indefinitely.
pub trait OperatorGate: Send {
    fn await_decision(&mut self, next_trial: usize) -> impl Future<Output = OperatorDecision> + Send;
}

/// Gate fed from a channel, typically by an input task.
///
/// A closed channel counts as an abort.
pub struct ChannelGate {
    rx: mpsc::Receiver<OperatorDecision>,
    discard_early: bool,
}

impl ChannelGate {
    pub fn new(rx: mpsc::Receiver<OperatorDecision>) -> Self {
        Self {
            rx,
            discard_early: false,
        }
    }

    /// A gate and the sender that drives it.
    pub fn channel(buffer: usize) -> (mpsc::Sender<OperatorDecision>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx))
    }

    /// Only a `Continue` sent while the gate is open starts the next trial.
    /// One typed ahead during the previous trial is dropped; an early
    /// `Abort` still counts.
    pub fn discarding_early_input(mut self) -> Self {
        self.discard_early = true;
        self
    }

    fn drain_early(&mut self, next_trial: usize) -> Option<OperatorDecision> {
        loop {
            match self.rx.try_recv() {
                Ok(OperatorDecision::Continue) => {
                    debug!("dropping continue typed before trial {next_trial} was due")
                }
                Ok(OperatorDecision::Abort) => return Some(OperatorDecision::Abort),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }
}

impl OperatorGate for ChannelGate {
    async fn await_decision(&mut self, next_trial: usize) -> OperatorDecision {
        if self.discard_early {
            if let Some(decision) = self.drain_early(next_trial) {
                return decision;
            }
        }
        match self.rx.recv().await {
            Some(decision) => decision,
            None => {
                warn!("operator input closed before trial {next_trial}, aborting");
                OperatorDecision::Abort
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_gate_relays_then_aborts_when_closed() {
        let (tx, mut gate) = ChannelGate::channel(2);
        tx.send(OperatorDecision::Continue).await.unwrap();
        drop(tx);
        assert_eq!(gate.await_decision(2).await, OperatorDecision::Continue);
        assert_eq!(gate.await_decision(3).await, OperatorDecision::Abort);
    }

    #[tokio::test]
    async fn interactive_gate_ignores_continue_typed_ahead() {
        let (tx, gate) = ChannelGate::channel(4);
        let mut gate = gate.discarding_early_input();
        tx.send(OperatorDecision::Continue).await.unwrap();
        tx.send(OperatorDecision::Continue).await.unwrap();
        let operator = tokio::spawn(async move {
            tokio::task::yield_now().await;
            tx.send(OperatorDecision::Abort).await.unwrap();
        });
        assert_eq!(gate.await_decision(2).await, OperatorDecision::Abort);
        operator.await.unwrap();
    }

    #[tokio::test]
    async fn interactive_gate_honours_early_abort() {
        let (tx, gate) = ChannelGate::channel(4);
        let mut gate = gate.discarding_early_input();
        tx.send(OperatorDecision::Continue).await.unwrap();
        tx.send(OperatorDecision::Abort).await.unwrap();
        assert_eq!(gate.await_decision(2).await, OperatorDecision::Abort);

        let operator = tokio::spawn(async move {
            tokio::task::yield_now().await;
            tx.send(OperatorDecision::Continue).await.unwrap();
        });
        assert_eq!(gate.await_decision(3).await, OperatorDecision::Continue);
        operator.await.unwrap();
    }
}
