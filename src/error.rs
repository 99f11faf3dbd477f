//! Error types for worker-pulse

use thiserror::Error;

/// Errors raised by the collaborators around the estimator and simulator.
///
/// The estimator and simulator themselves are total; these cover config
/// loading, upload parsing, demo export and the background driver.
#[derive(Debug, Error)]
pub enum PulseError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("File too large: {size_bytes} bytes exceeds limit of {limit_bytes} bytes")]
    FileTooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown worker: {0}")]
    UnknownWorker(String),

    #[error("Simulation thread panicked")]
    DriverPanicked,
}
