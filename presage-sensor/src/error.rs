use presage_core::Channel;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor server request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response to {command}: {detail}")]
    UnexpectedResponse { command: String, detail: String },
    #[error("sensor server rejected {0}")]
    Rejected(String),
    #[error("{0} has no sensor on this server")]
    UnsupportedChannel(Channel),
    #[error("unsupported sample rate {0}/s, expected one of 20, 10, 5, 2, 1")]
    UnsupportedRate(u32),
    #[error("failed to start recorder thread: {0}")]
    Thread(#[from] std::io::Error),
    #[error("no physiological channels selected")]
    NoChannels,
}
