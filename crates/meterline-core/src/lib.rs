//! meterline core: in-process counters and histograms with text exposition.
//!
//! This crate owns the registry, label sets, the renderer for the pull-based
//! text format, scoped timers and process gauges. It carries no transport or
//! runtime dependencies; the HTTP boundary lives in `meterline-exporter`.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Recording on a hot
//! path never fails the caller: see [`Registry`] for the log-and-drop policy.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod error;
pub mod labels;
pub mod metric;
pub mod name;
pub mod process;
pub mod registry;
pub mod render;
pub mod snapshot;
pub mod timer;

pub use error::{ErrorCode, MetricsError, Result};
pub use labels::LabelSet;
pub use metric::{Buckets, MetricKind, MetricType};
pub use process::{ProcSelfCollector, ProcessCollector, StaticCollector};
pub use registry::{Counter, Histogram, Metric, Registry, RegistryBuilder};
pub use render::{encode, render, CONTENT_TYPE};
pub use snapshot::{FamilySnapshot, HistogramSample, Samples, Snapshot};
pub use timer::HistogramTimer;
