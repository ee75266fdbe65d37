//! Background collection of physiological samples for one session.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info, warn};
use presage_core::{Channel, PhysiologicalSample};

use crate::client::SensorClient;
use crate::error::SensorError;
use crate::rate::SampleRate;

/// How much to record and how often to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingPlan {
    pub rate: SampleRate,
    /// Estimated session length; the server experiment covers all of it.
    pub session_secs: u64,
    pub poll_interval: Duration,
}

impl RecordingPlan {
    pub fn new(rate: SampleRate, session_secs: u64) -> Self {
        Self {
            rate,
            session_secs,
            poll_interval: Duration::from_secs(9),
        }
    }

    pub fn sample_count(&self) -> u64 {
        self.session_secs * u64::from(self.rate.per_second())
    }

    pub fn poll_rounds(&self) -> u64 {
        self.session_secs / 10
    }
}

/// Append-only per-channel values, written by the polling worker only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Channel>,
    values: Vec<Vec<f64>>,
}

impl SampleBuffer {
    pub fn new(channels: &[Channel]) -> Self {
        Self {
            channels: channels.to_vec(),
            values: vec![Vec::new(); channels.len()],
        }
    }

    /// Take in a full server snapshot, keeping only values not seen yet.
    pub fn merge(&mut self, snapshot: Vec<Vec<f64>>) {
        for (stored, fresh) in self.values.iter_mut().zip(snapshot) {
            if fresh.len() > stored.len() {
                stored.extend_from_slice(&fresh[stored.len()..]);
            }
        }
    }

    pub fn channel_len(&self, channel: Channel) -> usize {
        self.channels
            .iter()
            .position(|&c| c == channel)
            .map_or(0, |i| self.values[i].len())
    }

    /// Sample `k` (0-based) is stamped `start_ms + (k + 1) * period`.
    pub fn to_samples(&self, start_ms: u64, rate: SampleRate) -> Vec<PhysiologicalSample> {
        let period = rate.period_ms();
        self.channels
            .iter()
            .zip(&self.values)
            .flat_map(|(&channel, values)| {
                values
                    .iter()
                    .enumerate()
                    .map(move |(k, &value)| PhysiologicalSample {
                        channel,
                        value,
                        timestamp_ms: start_ms + (k as u64 + 1) * period,
                    })
            })
            .collect()
    }
}

/// Runs a server experiment for the whole session and polls it from a
/// background thread.
///
/// The worker is not cancelled when a session stops early; it finishes its
/// planned rounds on its own and is detached by [`Recorder::finish`].
pub struct Recorder<C: SensorClient + 'static> {
    client: Arc<C>,
    plan: RecordingPlan,
    start_ms: u64,
    buffer: Arc<Mutex<SampleBuffer>>,
    worker: Option<JoinHandle<()>>,
}

impl<C: SensorClient + 'static> Recorder<C> {
    /// `clock` reads the session clock; it is read once the server has
    /// acknowledged the start, and samples are stamped from that instant.
    pub fn start<F>(client: Arc<C>, plan: RecordingPlan, clock: F) -> Result<Self, SensorError>
    where
        F: FnOnce() -> u64,
    {
        // the server refuses to start while a previous experiment runs
        if let Err(e) = client.stop_experiment() {
            debug!("no previous experiment to stop: {e}");
        }
        client.start_experiment(plan.rate, plan.sample_count())?;
        let start_ms = clock();
        let buffer = Arc::new(Mutex::new(SampleBuffer::new(client.channels())));

        let worker = {
            let client = Arc::clone(&client);
            let buffer = Arc::clone(&buffer);
            thread::Builder::new()
                .name("presage-recorder".into())
                .spawn(move || poll(client.as_ref(), &buffer, plan))?
        };
        info!(
            "recording {} for ~{}s from {start_ms} ms, {} poll round(s)",
            plan.rate,
            plan.session_secs,
            plan.poll_rounds()
        );
        Ok(Self {
            client,
            plan,
            start_ms,
            buffer,
            worker: Some(worker),
        })
    }

    pub fn snapshot(&self) -> SampleBuffer {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Final fetch, stop the server experiment and stamp every sample.
    pub fn finish(mut self) -> Result<Vec<PhysiologicalSample>, SensorError> {
        let last = self.client.experiment_samples();
        if let Err(e) = self.client.stop_experiment() {
            warn!("failed to stop sensor experiment: {e}");
        }
        let mut buffer = self.snapshot();
        match last {
            Ok(snapshot) => buffer.merge(snapshot),
            Err(e) => warn!("final sample fetch failed, keeping polled data: {e}"),
        }
        if let Some(worker) = self.worker.take() {
            if worker.is_finished() {
                let _ = worker.join();
            } else {
                debug!("recorder worker still polling, detaching");
            }
        }
        Ok(buffer.to_samples(self.start_ms, self.plan.rate))
    }
}

fn poll<C: SensorClient + ?Sized>(client: &C, buffer: &Mutex<SampleBuffer>, plan: RecordingPlan) {
    for round in 1..=plan.poll_rounds() {
        thread::sleep(plan.poll_interval);
        match client.experiment_samples() {
            Ok(snapshot) => {
                let mut buffer = buffer.lock().unwrap_or_else(PoisonError::into_inner);
                buffer.merge(snapshot);
                let lens: Vec<usize> = buffer.values.iter().map(Vec::len).collect();
                debug!("poll {round}/{}: {lens:?} samples", plan.poll_rounds());
            }
            Err(e) => warn!("poll {round} failed: {e}"),
        }
    }
}
