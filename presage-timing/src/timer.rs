use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Session clock used by the scheduler.
pub trait Timer: Clone + Send + Sync {
    type Timestamp: Copy + Send + Sync;
    fn now(&self) -> Self::Timestamp;
    fn sleep(&self, d: Duration) -> impl Future<Output = ()> + Send;
    /// Record how long a wait actually took compared to what was asked for.
    fn record_wait(&mut self, requested: Duration, actual: Duration);
    fn calibration_stats(&self) -> CalibrationStats;
}

/// Overshoot of timed waits, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationStats {
    pub wait_count: usize,
    pub average_overshoot_ms: f64,
    pub jitter_ms: f64,
    pub min_overshoot_ms: f64,
    pub max_overshoot_ms: f64,
}

/// Millisecond clock anchored at session start.
///
/// Runs on `tokio::time::Instant`, so a paused test runtime drives it exactly.
/// Keeps the overshoot of the most recent `max_samples` waits.
#[derive(Debug, Clone)]
pub struct SessionTimer {
    start: Instant,
    overshoots: VecDeque<Duration>,
    max_samples: usize,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(max_samples: usize) -> Self {
        Self {
            start: Instant::now(),
            overshoots: VecDeque::with_capacity(max_samples.min(256)),
            max_samples,
        }
    }
}

impl Default for SessionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Wall-clock time `ts` milliseconds after `anchor`.
pub fn wall_clock(anchor: DateTime<Local>, ts: u64) -> DateTime<Local> {
    let offset = i64::try_from(ts).unwrap_or(i64::MAX);
    anchor + chrono::Duration::milliseconds(offset)
}

/// `HH:MM:SS.mmm`, the format used in trial exports.
pub fn format_clock(time: DateTime<Local>) -> String {
    time.format("%H:%M:%S%.3f").to_string()
}

impl Timer for SessionTimer {
    type Timestamp = u64;

    fn now(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn sleep(&self, d: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(d)
    }

    fn record_wait(&mut self, requested: Duration, actual: Duration) {
        if self.overshoots.len() >= self.max_samples {
            self.overshoots.pop_front();
        }
        self.overshoots.push_back(actual.saturating_sub(requested));
    }

    fn calibration_stats(&self) -> CalibrationStats {
        let times: Vec<f64> = self
            .overshoots
            .iter()
            .map(|d| d.as_secs_f64() * 1_000.0)
            .collect();
        if times.is_empty() {
            return CalibrationStats::default();
        }
        let n = times.len() as f64;
        let avg = times.iter().sum::<f64>() / n;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / n;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        CalibrationStats {
            wait_count: times.len(),
            average_overshoot_ms: avg,
            jitter_ms: var.sqrt(),
            min_overshoot_ms: min,
            max_overshoot_ms: max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn clock_follows_paused_time() {
        let timer = SessionTimer::new();
        assert_eq!(timer.now(), 0);
        timer.sleep(Duration::from_secs(3)).await;
        assert_eq!(timer.now(), 3_000);
    }

    #[test]
    fn calibration_summarises_overshoot() {
        let mut timer = SessionTimer::new();
        assert_eq!(timer.calibration_stats().wait_count, 0);
        timer.record_wait(Duration::from_millis(100), Duration::from_millis(102));
        timer.record_wait(Duration::from_millis(100), Duration::from_millis(104));
        // undershoot counts as zero
        timer.record_wait(Duration::from_millis(100), Duration::from_millis(99));
        let stats = timer.calibration_stats();
        assert_eq!(stats.wait_count, 3);
        assert!((stats.average_overshoot_ms - 2.0).abs() < 1e-9);
        assert_eq!(stats.min_overshoot_ms, 0.0);
        assert!((stats.max_overshoot_ms - 4.0).abs() < 1e-9);
    }

    #[test]
    fn calibration_keeps_the_latest_waits() {
        let mut timer = SessionTimer::with_capacity(2);
        for overshoot in [50, 1, 3] {
            timer.record_wait(Duration::ZERO, Duration::from_millis(overshoot));
        }
        let stats = timer.calibration_stats();
        assert_eq!(stats.wait_count, 2);
        assert!((stats.max_overshoot_ms - 3.0).abs() < 1e-9);
        assert!((stats.min_overshoot_ms - 1.0).abs() < 1e-9);
    }

    #[test]
    fn wall_clock_formats_milliseconds() {
        let anchor = Local::now();
        let later = wall_clock(anchor, 1_500);
        assert_eq!((later - anchor).num_milliseconds(), 1_500);
        assert_eq!(format_clock(later).len(), "00:00:00.000".len());
    }
}
