//! Exporter error type.

use meterline_core::MetricsError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExporterError>;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("invalid config: {0}")]
    Config(String),
    #[error("unsupported config version: {0}")]
    UnsupportedVersion(u32),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
