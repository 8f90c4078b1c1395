//! Identifier rules for metric and label names.

use crate::error::{MetricsError, Result};

/// Label reserved for histogram bucket bounds.
pub const BUCKET_LABEL: &str = "le";

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`, excluding the reserved `__` prefix.
pub fn is_valid_label_name(name: &str) -> bool {
    if name.starts_with("__") {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn check_metric_name(name: &str) -> Result<()> {
    if is_valid_metric_name(name) {
        Ok(())
    } else {
        Err(MetricsError::InvalidName(name.to_string()))
    }
}

pub fn check_label_name(name: &str) -> Result<()> {
    if is_valid_label_name(name) {
        Ok(())
    } else {
        Err(MetricsError::InvalidLabel(format!("bad label name {name:?}")))
    }
}
