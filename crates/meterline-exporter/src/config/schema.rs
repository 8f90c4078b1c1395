use std::collections::BTreeMap;
use std::net::SocketAddr;

use serde::Deserialize;

use meterline_core::name::is_valid_metric_name;
use meterline_core::{Buckets, LabelSet};

use crate::error::{ExporterError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub process: ProcessSection,

    /// Labels stamped on every rendered series.
    #[serde(default)]
    pub default_labels: BTreeMap<String, String>,

    #[serde(default)]
    pub http: HttpSection,
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(ExporterError::UnsupportedVersion(self.version));
        }
        self.server.validate()?;
        self.process.validate()?;
        self.http.validate()?;
        let labels = self.default_label_set()?;
        if labels.contains("le") {
            return Err(ExporterError::Config("default_labels must not contain \"le\"".into()));
        }
        Ok(())
    }

    pub fn default_label_set(&self) -> Result<LabelSet> {
        let mut set = LabelSet::new();
        for (k, v) in &self.default_labels {
            set.insert(k.as_str(), v.as_str())
                .map_err(|e| ExporterError::Config(format!("default_labels: {e}")))?;
        }
        Ok(set)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            metrics_path: default_metrics_path(),
        }
    }
}

impl ServerSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if !self.metrics_path.starts_with('/') {
            return Err(ExporterError::Config(
                "server.metrics_path must start with '/'".into(),
            ));
        }
        if self.metrics_path == "/healthz" {
            return Err(ExporterError::Config(
                "server.metrics_path collides with /healthz".into(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            ExporterError::Config(format!(
                "server.listen {:?} is not a socket address: {e}",
                self.listen
            ))
        })
    }
}

fn default_listen() -> String {
    "0.0.0.0:9464".into()
}
fn default_metrics_path() -> String {
    "/metrics".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub prefix: String,
}

impl Default for ProcessSection {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: String::new(),
        }
    }
}

impl ProcessSection {
    pub fn validate(&self) -> Result<()> {
        if !self.prefix.is_empty() && !is_valid_metric_name(&format!("{}process", self.prefix)) {
            return Err(ExporterError::Config(format!(
                "process.prefix {:?} does not form valid metric names",
                self.prefix
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpSection {
    /// Instrument every request with count and duration metrics.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Duration buckets in seconds.
    #[serde(default = "Buckets::default_latency")]
    pub buckets: Vec<f64>,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            enabled: true,
            buckets: Buckets::default_latency(),
        }
    }
}

impl HttpSection {
    pub fn validate(&self) -> Result<()> {
        Buckets::validate(self.buckets.clone())
            .map_err(|e| ExporterError::Config(format!("http.buckets: {e}")))?;
        Ok(())
    }
}

fn default_true() -> bool {
    true
}
