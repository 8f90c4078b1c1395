//! Metric kinds and their per-series storage.
//!
//! Counters keep an `f64` bit-cast into an `AtomicU64` (CAS add). Histogram
//! series keep buckets, count and sum behind one small mutex so a reader never
//! sees an observation half applied. Series maps are `DashMap`s keyed by the
//! sorted [`LabelSet`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::error::{MetricsError, Result};
use crate::labels::LabelSet;
use crate::snapshot::{FamilySnapshot, HistogramSample, Samples};

/// Type annotation written on the `# TYPE` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
    Histogram,
}

impl MetricType {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
            MetricType::Histogram => "histogram",
        }
    }
}

/// What to register. Gauges are produced by process collectors only.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricKind {
    Counter,
    Histogram { buckets: Vec<f64> },
}

impl MetricKind {
    pub fn histogram(buckets: impl Into<Vec<f64>>) -> Self {
        MetricKind::Histogram {
            buckets: buckets.into(),
        }
    }

    pub fn metric_type(&self) -> MetricType {
        match self {
            MetricKind::Counter => MetricType::Counter,
            MetricKind::Histogram { .. } => MetricType::Histogram,
        }
    }
}

/// Bucket layout helpers.
pub struct Buckets;

impl Buckets {
    /// Conventional request-latency buckets, in seconds.
    pub fn default_latency() -> Vec<f64> {
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    }

    /// Check a layout the way registration does; returns the normalized bounds.
    pub fn validate(bounds: Vec<f64>) -> Result<Vec<f64>> {
        normalize_buckets(bounds)
    }

    /// `count` buckets starting at `start`, each `width` apart.
    pub fn linear(start: f64, width: f64, count: usize) -> Result<Vec<f64>> {
        if count == 0 || width <= 0.0 || !width.is_finite() || !start.is_finite() {
            return Err(MetricsError::InvalidBuckets(format!(
                "linear buckets need count > 0 and finite width > 0 \
                 (start={start}, width={width}, count={count})"
            )));
        }
        generated((0..count).map(|i| start + width * i as f64).collect())
    }

    /// `count` buckets starting at `start`, each `factor` times the previous.
    pub fn exponential(start: f64, factor: f64, count: usize) -> Result<Vec<f64>> {
        if count == 0 || start <= 0.0 || start.is_nan() || factor <= 1.0 || factor.is_nan() {
            return Err(MetricsError::InvalidBuckets(format!(
                "exponential buckets need count > 0, start > 0 and factor > 1 \
                 (start={start}, factor={factor}, count={count})"
            )));
        }
        let mut out = Vec::with_capacity(count);
        let mut b = start;
        for _ in 0..count {
            out.push(b);
            b *= factor;
        }
        generated(out)
    }
}

/// Generated layouts must keep every requested bound: none may overflow to
/// `+Inf` or collapse onto its neighbour.
fn generated(bounds: Vec<f64>) -> Result<Vec<f64>> {
    if let Some(bad) = bounds.iter().find(|b| !b.is_finite()) {
        return Err(MetricsError::InvalidBuckets(format!(
            "generated bound {bad} is not finite"
        )));
    }
    normalize_buckets(bounds)
}

/// Validate bounds: finite, strictly ascending.
/// A trailing `+Inf` is implicit and dropped.
pub(crate) fn normalize_buckets(mut bounds: Vec<f64>) -> Result<Vec<f64>> {
    if bounds.last() == Some(&f64::INFINITY) {
        bounds.pop();
    }
    if let Some(bad) = bounds.iter().find(|b| !b.is_finite()) {
        return Err(MetricsError::InvalidBuckets(format!("bound {bad} is not finite")));
    }
    if let Some(w) = bounds.windows(2).find(|w| w[0] >= w[1]) {
        return Err(MetricsError::InvalidBuckets(format!(
            "bounds must be strictly ascending ({} >= {})",
            w[0], w[1]
        )));
    }
    Ok(bounds)
}

#[derive(Debug, Default)]
pub(crate) struct CounterCell(AtomicU64);

impl CounterCell {
    pub(crate) fn add(&self, delta: f64) {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }

    pub(crate) fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }
}

#[derive(Debug)]
struct HistogramState {
    /// Cumulative: `cumulative[i]` counts observations `<= bounds[i]`.
    cumulative: Vec<u64>,
    count: u64,
    sum: f64,
}

#[derive(Debug)]
pub(crate) struct HistogramCell(Mutex<HistogramState>);

impl HistogramCell {
    fn new(buckets: usize) -> Self {
        Self(Mutex::new(HistogramState {
            cumulative: vec![0; buckets],
            count: 0,
            sum: 0.0,
        }))
    }

    pub(crate) fn observe(&self, bounds: &[f64], value: f64) {
        let mut st = self.0.lock().unwrap_or_else(|e| e.into_inner());
        for (i, &b) in bounds.iter().enumerate() {
            if value <= b {
                st.cumulative[i] += 1;
            }
        }
        st.count += 1;
        st.sum += value;
    }

    pub(crate) fn sample(&self) -> HistogramSample {
        let st = self.0.lock().unwrap_or_else(|e| e.into_inner());
        HistogramSample {
            cumulative: st.cumulative.clone(),
            count: st.count,
            sum: st.sum,
        }
    }
}

#[derive(Debug)]
pub(crate) enum SeriesMap {
    Counter(DashMap<LabelSet, Arc<CounterCell>>),
    Histogram {
        bounds: Vec<f64>,
        series: DashMap<LabelSet, Arc<HistogramCell>>,
    },
}

/// One registered metric: identity plus all of its series.
#[derive(Debug)]
pub(crate) struct MetricFamily {
    pub(crate) name: String,
    pub(crate) help: String,
    pub(crate) kind: MetricKind,
    pub(crate) series: SeriesMap,
}

impl MetricFamily {
    /// `kind` must already be normalized.
    pub(crate) fn new(name: String, help: String, kind: MetricKind) -> Self {
        let series = match &kind {
            MetricKind::Counter => SeriesMap::Counter(DashMap::new()),
            MetricKind::Histogram { buckets } => SeriesMap::Histogram {
                bounds: buckets.clone(),
                series: DashMap::new(),
            },
        };
        Self {
            name,
            help,
            kind,
            series,
        }
    }

    pub(crate) fn metric_type(&self) -> MetricType {
        self.kind.metric_type()
    }

    pub(crate) fn counter_add(&self, labels: &LabelSet, delta: f64) -> Result<()> {
        let SeriesMap::Counter(map) = &self.series else {
            return Err(self.wrong_kind(MetricType::Counter));
        };
        if let Some(cell) = map.get(labels) {
            cell.add(delta);
            return Ok(());
        }
        map.entry(labels.clone()).or_default().add(delta);
        Ok(())
    }

    pub(crate) fn histogram_observe(&self, labels: &LabelSet, value: f64) -> Result<()> {
        let SeriesMap::Histogram { bounds, series } = &self.series else {
            return Err(self.wrong_kind(MetricType::Histogram));
        };
        if labels.contains(crate::name::BUCKET_LABEL) {
            return Err(MetricsError::InvalidLabel(format!(
                "label \"le\" is reserved on histogram {}",
                self.name
            )));
        }
        if let Some(cell) = series.get(labels) {
            cell.observe(bounds, value);
            return Ok(());
        }
        series
            .entry(labels.clone())
            .or_insert_with(|| Arc::new(HistogramCell::new(bounds.len())))
            .observe(bounds, value);
        Ok(())
    }

    fn wrong_kind(&self, expected: MetricType) -> MetricsError {
        MetricsError::WrongKind {
            name: self.name.clone(),
            expected: expected.as_str(),
            actual: self.metric_type().as_str(),
        }
    }

    /// Copy every series. Handles are cloned out of the map first so shard
    /// locks are not held while values are read.
    pub(crate) fn snapshot(&self) -> FamilySnapshot {
        let samples = match &self.series {
            SeriesMap::Counter(map) => {
                let cells: Vec<(LabelSet, Arc<CounterCell>)> = map
                    .iter()
                    .map(|r| (r.key().clone(), Arc::clone(r.value())))
                    .collect();
                let mut out: Vec<(LabelSet, f64)> =
                    cells.into_iter().map(|(l, c)| (l, c.get())).collect();
                out.sort_by(|a, b| a.0.cmp(&b.0));
                Samples::Counter(out)
            }
            SeriesMap::Histogram { bounds, series } => {
                let cells: Vec<(LabelSet, Arc<HistogramCell>)> = series
                    .iter()
                    .map(|r| (r.key().clone(), Arc::clone(r.value())))
                    .collect();
                let mut out: Vec<(LabelSet, HistogramSample)> =
                    cells.into_iter().map(|(l, c)| (l, c.sample())).collect();
                out.sort_by(|a, b| a.0.cmp(&b.0));
                Samples::Histogram {
                    bounds: bounds.clone(),
                    series: out,
                }
            }
        };
        FamilySnapshot {
            name: self.name.clone(),
            help: self.help.clone(),
            samples,
        }
    }
}
