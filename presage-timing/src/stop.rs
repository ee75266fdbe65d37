use std::time::Duration;

use tokio::sync::watch;

use crate::timer::Timer;

/// Owner side of the session stop flag.
#[derive(Debug)]
pub struct StopSignal {
    tx: watch::Sender<bool>,
}

/// Cloneable observer of a [`StopSignal`].
#[derive(Debug, Clone)]
pub struct StopToken {
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> StopToken {
        StopToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Idempotent.
    pub fn stop(&self) {
        if !self.tx.send_replace(true) {
            log::info!("stop requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl StopToken {
    /// A token that never fires.
    pub fn never() -> Self {
        StopSignal::new().token()
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once stop has been requested. Pends forever if the signal was
    /// dropped without stopping.
    pub async fn stopped(&mut self) {
        if self.rx.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    Stopped,
}

/// Sleep for `duration` unless stop is requested first.
///
/// A stop that is already pending returns before any time passes. Completed
/// waits are recorded on the timer for calibration.
pub async fn wait<T: Timer>(timer: &mut T, duration: Duration, stop: &StopToken) -> WaitOutcome {
    if stop.is_stopped() {
        return WaitOutcome::Stopped;
    }
    let mut token = stop.clone();
    let begun = tokio::time::Instant::now();
    let elapsed = {
        let sleeper = timer.sleep(duration);
        tokio::select! {
            biased;
            _ = token.stopped() => false,
            _ = sleeper => true,
        }
    };
    if !elapsed {
        return WaitOutcome::Stopped;
    }
    timer.record_wait(duration, begun.elapsed());
    WaitOutcome::Elapsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::SessionTimer;

    #[tokio::test(start_paused = true)]
    async fn wait_elapses_without_stop() {
        let mut timer = SessionTimer::new();
        let outcome = wait(&mut timer, Duration::from_secs(2), &StopToken::never()).await;
        assert_eq!(outcome, WaitOutcome::Elapsed);
        assert_eq!(timer.now(), 2_000);
        assert_eq!(timer.calibration_stats().wait_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_stop_returns_immediately() {
        let mut timer = SessionTimer::new();
        let signal = StopSignal::new();
        signal.stop();
        signal.stop();
        let outcome = wait(&mut timer, Duration::from_secs(5), &signal.token()).await;
        assert_eq!(outcome, WaitOutcome::Stopped);
        assert_eq!(timer.now(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_interrupts_a_running_wait() {
        let mut timer = SessionTimer::new();
        let signal = StopSignal::new();
        let token = signal.token();
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            signal.stop();
        });
        let outcome = wait(&mut timer, Duration::from_secs(10), &token).await;
        assert_eq!(outcome, WaitOutcome::Stopped);
        assert_eq!(timer.now(), 1_000);
        assert_eq!(timer.calibration_stats().wait_count, 0);
        stopper.await.unwrap();
    }
}
