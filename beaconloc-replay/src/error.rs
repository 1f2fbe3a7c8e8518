use beaconloc_core::PositioningError;
use thiserror::Error;

/// Replay failures
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Positioning error: {0}")]
    Positioning(#[from] PositioningError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Trace line {line}: {reason}")]
    Trace { line: usize, reason: String },
}

/// Result type for replay operations
pub type ReplayResult<T> = Result<T, ReplayError>;
