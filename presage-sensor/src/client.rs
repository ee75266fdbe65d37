use std::time::Duration;

use log::{debug, info};
use presage_core::Channel;
use serde_json::Value;

use crate::error::SensorError;
use crate::rate::SampleRate;

/// What the sensor server reports before a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    Ready,
    /// An experiment is already running on the server.
    Busy,
    Unreachable,
    Other(String),
}

/// Physiological sensor server driven by the recorder.
pub trait SensorClient: Send + Sync {
    fn name(&self) -> &str;
    /// Channels in the order `experiment_samples` returns them.
    fn channels(&self) -> &[Channel];
    fn status(&self) -> ServerStatus;
    fn start_experiment(&self, rate: SampleRate, sample_count: u64) -> Result<(), SensorError>;
    fn stop_experiment(&self) -> Result<(), SensorError>;
    /// Everything recorded so far in the running or last experiment, per channel.
    fn experiment_samples(&self) -> Result<Vec<Vec<f64>>, SensorError>;
}

/// Client for the Neulog HTTP API on localhost.
pub struct NeulogClient {
    port: u16,
    channels: Vec<Channel>,
    sensor_params: String,
    http: reqwest::blocking::Client,
}

const SENSOR_ID: &str = "1";

impl NeulogClient {
    pub fn new(port: u16, channels: &[Channel]) -> Result<Self, SensorError> {
        if channels.is_empty() {
            return Err(SensorError::NoChannels);
        }
        let mut params = Vec::with_capacity(channels.len());
        for &channel in channels {
            params.push(format!("[{}],[{SENSOR_ID}]", sensor_name(channel)?));
        }
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            port,
            channels: channels.to_vec(),
            sensor_params: format!(":{}", params.join(",")),
            http,
        })
    }

    fn url(&self, command: &str, params: &str) -> String {
        format!("http://localhost:{}/NeuLogAPI?{command}{params}", self.port)
    }

    fn request(&self, command: &str, params: &str) -> Result<Value, SensorError> {
        let url = self.url(command, params);
        debug!("GET {url}");
        let body: Value = self.http.get(&url).send()?.error_for_status()?.json()?;
        take_field(body, command)
    }

    fn expect_true(&self, command: &str, params: &str) -> Result<(), SensorError> {
        match self.request(command, params)? {
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(()),
            Value::Bool(true) => Ok(()),
            _ => Err(SensorError::Rejected(command.to_string())),
        }
    }

    /// Give every connected sensor the id used in requests, then put each
    /// channel in the unit the analysis expects. Run before reading values
    /// or starting an experiment.
    pub fn prepare_sensors(&self) -> Result<(), SensorError> {
        self.expect_true("SetSensorsID", &format!(":[{SENSOR_ID}]"))?;
        for &channel in &self.channels {
            self.expect_true("SetSensorRange", &range_params(channel)?)?;
        }
        info!("Neulog sensors ready: {:?}", self.channels);
        Ok(())
    }

    /// Current reading of each channel.
    pub fn sensor_values(&self) -> Result<Vec<f64>, SensorError> {
        let command = "GetSensorValue";
        let value = self.request(command, &self.sensor_params)?;
        numbers(&value, command)
    }

    pub fn server_version(&self) -> Result<String, SensorError> {
        let command = "GetServerVersion";
        match self.request(command, "")? {
            Value::String(s) => Ok(s),
            other => Ok(other.to_string()),
        }
    }
}

impl SensorClient for NeulogClient {
    fn name(&self) -> &str {
        "Neulog"
    }

    fn channels(&self) -> &[Channel] {
        &self.channels
    }

    fn status(&self) -> ServerStatus {
        // the command name is misspelled in the Neulog API
        match self.request("GetSeverStatus", "") {
            Ok(Value::String(s)) => parse_status(&s),
            Ok(other) => ServerStatus::Other(other.to_string()),
            Err(SensorError::Http(e)) if e.is_connect() || e.is_timeout() => {
                ServerStatus::Unreachable
            }
            Err(e) => ServerStatus::Other(e.to_string()),
        }
    }

    fn start_experiment(&self, rate: SampleRate, sample_count: u64) -> Result<(), SensorError> {
        let params = format!(
            "{},[{}],[{sample_count}]",
            self.sensor_params,
            rate.neulog_code()
        );
        self.expect_true("StartExperiment", &params)?;
        info!("Neulog experiment started: {sample_count} samples at {rate}");
        Ok(())
    }

    fn stop_experiment(&self) -> Result<(), SensorError> {
        self.expect_true("StopExperiment", "")
    }

    fn experiment_samples(&self) -> Result<Vec<Vec<f64>>, SensorError> {
        let command = "GetExperimentSamples";
        let value = self.request(command, &self.sensor_params)?;
        let samples = parse_experiment_samples(&value, command)?;
        if samples.len() != self.channels.len() {
            return Err(SensorError::UnexpectedResponse {
                command: command.into(),
                detail: format!(
                    "{} channel(s) returned, {} requested",
                    samples.len(),
                    self.channels.len()
                ),
            });
        }
        Ok(samples)
    }
}

/// Neulog sensor type for a channel.
pub fn sensor_name(channel: Channel) -> Result<&'static str, SensorError> {
    match channel {
        Channel::SkinConductance => Ok("GSR"),
        Channel::HeartRate => Ok("Pulse"),
        Channel::Brainwaves => Err(SensorError::UnsupportedChannel(channel)),
    }
}

/// GSR in microsiemens (range 2), Pulse in BPM (range 1).
fn measurement_range(channel: Channel) -> Result<u8, SensorError> {
    match channel {
        Channel::SkinConductance => Ok(2),
        Channel::HeartRate => Ok(1),
        Channel::Brainwaves => Err(SensorError::UnsupportedChannel(channel)),
    }
}

fn range_params(channel: Channel) -> Result<String, SensorError> {
    Ok(format!(
        ":[{}],[{SENSOR_ID}],[{}]",
        sensor_name(channel)?,
        measurement_range(channel)?
    ))
}

fn parse_status(s: &str) -> ServerStatus {
    match s {
        "Ready" => ServerStatus::Ready,
        "Experiment" => ServerStatus::Busy,
        other => ServerStatus::Other(other.to_string()),
    }
}

fn take_field(body: Value, command: &str) -> Result<Value, SensorError> {
    match body {
        Value::Object(mut map) => {
            map.remove(command)
                .ok_or_else(|| SensorError::UnexpectedResponse {
                    command: command.into(),
                    detail: format!("missing {command:?} field"),
                })
        }
        other => Err(SensorError::UnexpectedResponse {
            command: command.into(),
            detail: format!("expected an object, got {other}"),
        }),
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn numbers(value: &Value, command: &str) -> Result<Vec<f64>, SensorError> {
    let unexpected = |detail: String| SensorError::UnexpectedResponse {
        command: command.into(),
        detail,
    };
    value
        .as_array()
        .ok_or_else(|| unexpected(format!("expected a list, got {value}")))?
        .iter()
        .map(|v| number(v).ok_or_else(|| unexpected(format!("non-numeric value {v}"))))
        .collect()
}

/// Per-channel values with the leading sensor type and id columns removed.
fn parse_experiment_samples(value: &Value, command: &str) -> Result<Vec<Vec<f64>>, SensorError> {
    let lists = value.as_array().ok_or_else(|| SensorError::UnexpectedResponse {
        command: command.into(),
        detail: format!("expected a list of lists, got {value}"),
    })?;
    lists
        .iter()
        .map(|list| {
            let tail: Vec<Value> = list
                .as_array()
                .map(|l| l.iter().skip(2).cloned().collect())
                .unwrap_or_default();
            numbers(&Value::Array(tail), command)
        })
        .collect()
}
