//! Request instrumentation.
//!
//! Every request is counted and timed into the registry. Labels stay
//! low-cardinality: method, matched route template and status class.

pub mod http;
