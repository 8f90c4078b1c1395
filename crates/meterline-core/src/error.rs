//! Error taxonomy shared by the registry, renderer and timer.

use thiserror::Error;

/// Stable error codes (safe to match on in callers and tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Metric name does not match the identifier pattern.
    InvalidName,
    /// Name already registered with a different kind, help or bucket layout.
    DuplicateMetric,
    /// No metric registered under that name.
    UnknownMetric,
    /// Metric exists but is of another kind.
    WrongKind,
    /// Negative or NaN counter delta.
    InvalidDelta,
    /// Non-finite histogram observation.
    InvalidObservation,
    /// Bad label name, duplicated label or reserved label.
    InvalidLabel,
    /// Bucket bounds not finite or not strictly ascending.
    InvalidBuckets,
    /// Exposition could not be produced.
    Render,
}

impl ErrorCode {
    /// String representation used in logs and HTTP bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidName => "INVALID_NAME",
            ErrorCode::DuplicateMetric => "DUPLICATE_METRIC",
            ErrorCode::UnknownMetric => "UNKNOWN_METRIC",
            ErrorCode::WrongKind => "WRONG_KIND",
            ErrorCode::InvalidDelta => "INVALID_DELTA",
            ErrorCode::InvalidObservation => "INVALID_OBSERVATION",
            ErrorCode::InvalidLabel => "INVALID_LABEL",
            ErrorCode::InvalidBuckets => "INVALID_BUCKETS",
            ErrorCode::Render => "RENDER",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Unified error type for the metrics core.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid metric name: {0:?}")]
    InvalidName(String),
    #[error("metric {name} already registered: {reason}")]
    DuplicateMetric { name: String, reason: String },
    #[error("unknown metric: {0}")]
    UnknownMetric(String),
    #[error("metric {name} is a {actual}, not a {expected}")]
    WrongKind {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("invalid delta for counter {name}: {delta}")]
    InvalidDelta { name: String, delta: f64 },
    #[error("invalid observation for histogram {name}: {value}")]
    InvalidObservation { name: String, value: f64 },
    #[error("invalid label: {0}")]
    InvalidLabel(String),
    #[error("invalid buckets: {0}")]
    InvalidBuckets(String),
    #[error("render failed: {0}")]
    Render(String),
}

impl MetricsError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MetricsError::InvalidName(_) => ErrorCode::InvalidName,
            MetricsError::DuplicateMetric { .. } => ErrorCode::DuplicateMetric,
            MetricsError::UnknownMetric(_) => ErrorCode::UnknownMetric,
            MetricsError::WrongKind { .. } => ErrorCode::WrongKind,
            MetricsError::InvalidDelta { .. } => ErrorCode::InvalidDelta,
            MetricsError::InvalidObservation { .. } => ErrorCode::InvalidObservation,
            MetricsError::InvalidLabel(_) => ErrorCode::InvalidLabel,
            MetricsError::InvalidBuckets(_) => ErrorCode::InvalidBuckets,
            MetricsError::Render(_) => ErrorCode::Render,
        }
    }

    /// True for errors raised while recording (as opposed to registering or rendering).
    pub fn is_observation_error(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::UnknownMetric
                | ErrorCode::WrongKind
                | ErrorCode::InvalidDelta
                | ErrorCode::InvalidObservation
                | ErrorCode::InvalidLabel
        )
    }
}

impl From<std::io::Error> for MetricsError {
    fn from(e: std::io::Error) -> Self {
        MetricsError::Render(e.to_string())
    }
}
