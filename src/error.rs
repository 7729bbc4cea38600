use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A single failed read. Recovered by the sampling loop; never fatal to it.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("{0} is not available")]
    Unavailable(String),

    #[error("drive {0} not found")]
    DriveNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("sampling panicked: {0}")]
    Panicked(String),
}

/// Errors surfaced to whoever builds or drives the stats components.
#[derive(Debug, Error)]
pub enum StatsError {
    #[error("smoothing constant must lie in (0, 1] (received {0})")]
    InvalidSmoothing(f64),

    #[error("window length must be positive (received {0}s)")]
    InvalidWindow(u32),

    #[error("unable to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("{sampler} failed to initialize: {source}")]
    Initialize {
        sampler: &'static str,
        #[source]
        source: SampleError,
    },

    #[error("{sampler} could not spawn its worker thread: {source}")]
    Spawn {
        sampler: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{0} cannot be stopped from its own sampling thread")]
    StopFromSamplingThread(&'static str),

    #[error("{0} lost its sample source after the worker thread panicked")]
    SourceLost(&'static str),

    #[error("{0} worker thread panicked")]
    WorkerPanicked(&'static str),

    #[error("panicked: {0}")]
    Panicked(String),
}

pub type Result<T, E = StatsError> = std::result::Result<T, E>;

/// Renders a `catch_unwind` payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
