//! Text exposition format (version 0.0.4).
//!
//! One block per family: `# HELP`, `# TYPE`, then samples. Series inside a
//! family arrive sorted from the snapshot, so output over unchanged state is
//! byte-identical between calls.

use std::io::Write;

use crate::error::{MetricsError, Result};
use crate::labels::{escape_label_value, LabelSet};
use crate::name::BUCKET_LABEL;
use crate::snapshot::{FamilySnapshot, Samples, Snapshot};

/// Content type scrapers expect for this format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Magnitudes from here up are written in exponent form.
const EXPONENT_FROM: f64 = 1e15;

/// Whole numbers without a decimal point, everything else with the shortest
/// round-trip representation. Large magnitudes use exponent notation
/// (`1e200`) instead of a long run of zeros.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else if v.abs() >= EXPONENT_FROM {
        format!("{v:e}")
    } else {
        // `Display` for f64 already drops the trailing `.0` and is round-trip exact.
        format!("{v}")
    }
}

fn escape_help(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\n', "\\n")
}

fn write_labels<W: Write>(w: &mut W, labels: &LabelSet, le: Option<&str>) -> Result<()> {
    if labels.is_empty() && le.is_none() {
        return Ok(());
    }
    w.write_all(b"{")?;
    let mut first = true;
    for (k, v) in labels.iter() {
        if !first {
            w.write_all(b",")?;
        }
        first = false;
        write!(w, "{}=\"{}\"", k, escape_label_value(v))?;
    }
    if let Some(le) = le {
        if !first {
            w.write_all(b",")?;
        }
        write!(w, "{BUCKET_LABEL}=\"{le}\"")?;
    }
    w.write_all(b"}")?;
    Ok(())
}

fn encode_family<W: Write>(w: &mut W, family: &FamilySnapshot) -> Result<()> {
    let name = &family.name;
    writeln!(w, "# HELP {} {}", name, escape_help(&family.help))?;
    writeln!(w, "# TYPE {} {}", name, family.metric_type().as_str())?;

    match &family.samples {
        Samples::Counter(series) | Samples::Gauge(series) => {
            for (labels, value) in series {
                w.write_all(name.as_bytes())?;
                write_labels(w, labels, None)?;
                writeln!(w, " {}", format_value(*value))?;
            }
        }
        Samples::Histogram { bounds, series } => {
            for (labels, h) in series {
                if h.cumulative.len() != bounds.len() {
                    return Err(MetricsError::Render(format!(
                        "histogram {name} has {} bucket counts for {} bounds",
                        h.cumulative.len(),
                        bounds.len()
                    )));
                }
                for (bound, count) in bounds.iter().zip(&h.cumulative) {
                    write!(w, "{name}_bucket")?;
                    write_labels(w, labels, Some(&format_value(*bound)))?;
                    writeln!(w, " {count}")?;
                }
                write!(w, "{name}_bucket")?;
                write_labels(w, labels, Some("+Inf"))?;
                writeln!(w, " {}", h.count)?;

                write!(w, "{name}_sum")?;
                write_labels(w, labels, None)?;
                writeln!(w, " {}", format_value(h.sum))?;

                write!(w, "{name}_count")?;
                write_labels(w, labels, None)?;
                writeln!(w, " {}", h.count)?;
            }
        }
    }
    Ok(())
}

/// Stream a snapshot into `w`.
pub fn encode<W: Write>(snapshot: &Snapshot, w: &mut W) -> Result<()> {
    for family in &snapshot.families {
        encode_family(w, family)?;
    }
    Ok(())
}

/// Render a snapshot to a UTF-8 string.
pub fn render(snapshot: &Snapshot) -> Result<String> {
    let mut buf = Vec::with_capacity(snapshot.families.len() * 128);
    encode(snapshot, &mut buf)?;
    String::from_utf8(buf).map_err(|e| MetricsError::Render(format!("non utf-8 output: {e}")))
}
