//! Top-level facade crate for meterline.
//!
//! Re-exports the metrics core and the HTTP exporter so users can depend on a single crate.

pub mod core {
    pub use meterline_core::*;
}

pub mod exporter {
    pub use meterline_exporter::*;
}
