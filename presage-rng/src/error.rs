use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RngError {
    #[error("invalid range: min {min} is greater than max {max}")]
    InvalidRange { min: u64, max: u64 },
    #[error("cannot select from an empty stimulus pool")]
    EmptyPool,
    #[error("random device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("failed to load REG library {path}: {source}")]
    Library {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("bit string {0:?} does not fit in 64 bits")]
    Overflow(String),
}
