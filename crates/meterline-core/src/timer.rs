//! Scoped duration measurement into a histogram.
//!
//! A [`HistogramTimer`] records exactly once: on the first [`stop`], or on
//! drop if it was never stopped. Drop covers early returns, `?` and unwinding,
//! so a failing operation still reports its duration. A second `stop` is a
//! no-op and returns `None`.
//!
//! [`stop`]: HistogramTimer::stop

use std::time::{Duration, Instant};

use crate::labels::LabelSet;
use crate::registry::Registry;

#[must_use = "a timer records when stopped or dropped; bind it to a variable"]
pub struct HistogramTimer {
    registry: Registry,
    name: String,
    labels: LabelSet,
    start: Instant,
    stopped: bool,
}

impl HistogramTimer {
    pub(crate) fn new(registry: Registry, name: String, labels: LabelSet, start: Instant) -> Self {
        Self {
            registry,
            name,
            labels,
            start,
            stopped: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Observe elapsed seconds with `extra` merged over the base labels.
    ///
    /// Returns the recorded seconds on the first call and `None` afterwards.
    /// Recording goes through the lenient path, so an unknown histogram only
    /// bumps the registry's dropped-observation count.
    pub fn stop(&mut self, extra: &LabelSet) -> Option<f64> {
        if self.stopped {
            tracing::debug!(metric = %self.name, "timer already stopped");
            return None;
        }
        self.stopped = true;
        let secs = self.elapsed().as_secs_f64();
        let labels = self.labels.merged(extra);
        self.registry.histogram_observe(&self.name, &labels, secs);
        Some(secs)
    }

    /// Stop with the base labels only.
    pub fn observe_duration(mut self) -> Option<f64> {
        self.stop(&LabelSet::new())
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        if !self.stopped {
            self.stop(&LabelSet::new());
        }
    }
}
