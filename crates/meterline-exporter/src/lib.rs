//! meterline exporter library entry.
//!
//! The thin HTTP boundary around `meterline-core`: strict YAML config, shared
//! state owning the registry, the `/metrics` and `/healthz` endpoints and the
//! request-instrumentation middleware. Consumed by the binary (`main.rs`) and
//! by integration tests.

pub mod app_state;
pub mod config;
pub mod error;
pub mod obs;
pub mod ops;
pub mod router;

pub use error::{ExporterError, Result};
