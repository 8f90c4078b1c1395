//! Exporter config loader (strict parsing).

pub mod schema;

use std::fs;

use crate::error::{ExporterError, Result};

pub use schema::{ExporterConfig, HttpSection, ProcessSection, ServerSection};

/// Env var naming the config file; falls back to [`DEFAULT_PATH`].
pub const CONFIG_ENV: &str = "METERLINE_CONFIG";
pub const DEFAULT_PATH: &str = "meterline.yaml";

pub fn load_from_file(path: &str) -> Result<ExporterConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| ExporterError::Config(format!("read {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ExporterConfig> {
    let cfg: ExporterConfig = serde_yaml::from_str(s)
        .map_err(|e| ExporterError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Path from `METERLINE_CONFIG`, or `meterline.yaml`.
pub fn config_path() -> String {
    std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_PATH.to_string())
}
