//! Shared application state for the exporter.
//!
//! The registry is built once here and handed to every handler through the
//! state. Metric registration happens at boot so configuration mistakes fail
//! fast instead of surfacing at the first request.

use std::sync::Arc;

use meterline_core::{ProcSelfCollector, Registry};

use crate::config::ExporterConfig;
use crate::error::Result;
use crate::obs::http::HttpMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ExporterConfig,
    registry: Registry,
    http: Option<HttpMetrics>,
}

impl AppState {
    /// Build the registry from config and register built-in metrics.
    pub fn new(cfg: ExporterConfig) -> Result<Self> {
        let mut builder = Registry::builder().default_labels(cfg.default_label_set()?)?;
        if cfg.process.enabled {
            let collector = ProcSelfCollector::with_prefix(cfg.process.prefix.clone());
            builder = builder.process_collector(collector);
        }
        Self::with_registry(cfg, builder.build())
    }

    /// Use a caller-built registry (e.g. with a fixed process collector).
    pub fn with_registry(cfg: ExporterConfig, registry: Registry) -> Result<Self> {
        let http = if cfg.http.enabled {
            Some(HttpMetrics::register(&registry, cfg.http.buckets.clone())?)
        } else {
            None
        };
        tracing::debug!(metrics = ?registry.metric_names(), "registry ready");
        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, registry, http }),
        })
    }

    pub fn cfg(&self) -> &ExporterConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn http_metrics(&self) -> Option<&HttpMetrics> {
        self.inner.http.as_ref()
    }
}
