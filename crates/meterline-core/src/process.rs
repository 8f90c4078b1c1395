//! Process-level gauges computed at snapshot time.
//!
//! Collectors are swappable so the registry can be tested without touching
//! real OS state. Nothing here accumulates; every call reads fresh values.

use std::fs;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::snapshot::FamilySnapshot;

/// Source of process gauges.
pub trait ProcessCollector: Send + Sync {
    fn collect(&self) -> Vec<FamilySnapshot>;
}

/// Reads `/proc/self` on Linux. Elsewhere, or when a file cannot be read,
/// only the clock-derived gauges are produced.
#[derive(Debug)]
pub struct ProcSelfCollector {
    prefix: String,
    started: Instant,
    start_unix: f64,
}

impl ProcSelfCollector {
    pub fn new() -> Self {
        Self::with_prefix("")
    }

    /// Prepend `prefix` to every gauge name (e.g. `"app_"`).
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        let start_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self {
            prefix: prefix.into(),
            started: Instant::now(),
            start_unix,
        }
    }

    fn name(&self, base: &str) -> String {
        format!("{}{}", self.prefix, base)
    }
}

impl Default for ProcSelfCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessCollector for ProcSelfCollector {
    fn collect(&self) -> Vec<FamilySnapshot> {
        let mut out = vec![
            FamilySnapshot::gauge(
                self.name("process_start_time_seconds"),
                "Start time of the process since unix epoch in seconds.",
                self.start_unix,
            ),
            FamilySnapshot::gauge(
                self.name("process_uptime_seconds"),
                "Seconds since the process started.",
                self.started.elapsed().as_secs_f64(),
            ),
        ];

        match fs::read_to_string("/proc/self/status") {
            Ok(status) => {
                if let Some(kb) = parse_status_kb(&status, "VmRSS") {
                    out.push(FamilySnapshot::gauge(
                        self.name("process_resident_memory_bytes"),
                        "Resident memory size in bytes.",
                        (kb * 1024) as f64,
                    ));
                }
                if let Some(kb) = parse_status_kb(&status, "VmSize") {
                    out.push(FamilySnapshot::gauge(
                        self.name("process_virtual_memory_bytes"),
                        "Virtual memory size in bytes.",
                        (kb * 1024) as f64,
                    ));
                }
            }
            Err(e) => tracing::trace!(error = %e, "process status unavailable"),
        }

        match fs::read_dir("/proc/self/fd") {
            Ok(dir) => out.push(FamilySnapshot::gauge(
                self.name("process_open_fds"),
                "Number of open file descriptors.",
                dir.count() as f64,
            )),
            Err(e) => tracing::trace!(error = %e, "fd listing unavailable"),
        }

        out
    }
}

/// `VmRSS:	  1234 kB` -> `1234`
fn parse_status_kb(status: &str, key: &str) -> Option<u64> {
    status.lines().find_map(|line| {
        let rest = line.strip_prefix(key)?.strip_prefix(':')?;
        rest.split_whitespace().next()?.parse().ok()
    })
}

/// Fixed gauges; used in tests and wherever process state should not leak in.
#[derive(Debug, Clone, Default)]
pub struct StaticCollector {
    gauges: Vec<FamilySnapshot>,
}

impl StaticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gauge(mut self, name: &str, help: &str, value: f64) -> Self {
        self.gauges.push(FamilySnapshot::gauge(name, help, value));
        self
    }
}

impl ProcessCollector for StaticCollector {
    fn collect(&self) -> Vec<FamilySnapshot> {
        self.gauges.clone()
    }
}
