//! Error types for series validation and classification

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Input validation failures. Any of these rejects the whole series or call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("timestamps must be strictly increasing: point {index} ({current}) is not after {previous}")]
    NonMonotonicTimestamps {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("missing close price at point {index} ({timestamp})")]
    MissingPrice {
        index: usize,
        timestamp: DateTime<Utc>,
    },

    #[error("close price must be positive at point {index}, got {close}")]
    NonPositivePrice { index: usize, close: f64 },

    #[error("volume must be >= 0 at point {index}, got {volume}")]
    NegativeVolume { index: usize, volume: f64 },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Errors surfaced by the classification engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifyError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("insufficient data: need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },
}

pub type ClassifyResult<T> = Result<T, ClassifyError>;
