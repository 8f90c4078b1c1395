//! The metrics registry.
//!
//! A `Registry` is an explicit, cheaply clonable handle; construct one at
//! startup and pass it to every call site. Structure (the family list) sits
//! behind an `RwLock` that is only written on registration; series live in
//! per-family `DashMap`s and update without touching that lock.
//!
//! Recording comes in two tiers:
//! - `try_*` methods return the error to the caller.
//! - the plain methods never fail a request: the error is logged at `warn`,
//!   the observation is dropped and [`Registry::dropped_observations`] grows.

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard};
use std::time::Instant;

use dashmap::DashMap;

use crate::error::{MetricsError, Result};
use crate::labels::LabelSet;
use crate::metric::{normalize_buckets, MetricFamily, MetricKind, MetricType};
use crate::name::{check_metric_name, is_valid_metric_name, BUCKET_LABEL};
use crate::process::ProcessCollector;
use crate::render;
use crate::snapshot::{FamilySnapshot, Snapshot};
use crate::timer::HistogramTimer;

#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    families: RwLock<Vec<Arc<MetricFamily>>>,
    index: DashMap<String, Arc<MetricFamily>>,
    default_labels: LabelSet,
    process: Option<Box<dyn ProcessCollector>>,
    dropped: AtomicU64,
}

#[derive(Default)]
pub struct RegistryBuilder {
    default_labels: LabelSet,
    process: Option<Box<dyn ProcessCollector>>,
}

impl RegistryBuilder {
    /// Labels added to every rendered series. `le` is rejected.
    pub fn default_labels(mut self, labels: LabelSet) -> Result<Self> {
        if labels.contains(BUCKET_LABEL) {
            return Err(MetricsError::InvalidLabel(
                "\"le\" cannot be a default label".into(),
            ));
        }
        self.default_labels = labels;
        Ok(self)
    }

    pub fn process_collector(mut self, collector: impl ProcessCollector + 'static) -> Self {
        self.process = Some(Box::new(collector));
        self
    }

    pub fn build(self) -> Registry {
        Registry {
            inner: Arc::new(RegistryInner {
                families: RwLock::new(Vec::new()),
                index: DashMap::new(),
                default_labels: self.default_labels,
                process: self.process,
                dropped: AtomicU64::new(0),
            }),
        }
    }
}

/// Typed handle to a registered counter.
#[derive(Clone)]
pub struct Counter {
    family: Arc<MetricFamily>,
    registry: Registry,
}

impl Counter {
    pub fn name(&self) -> &str {
        &self.family.name
    }

    pub fn inc(&self, labels: &LabelSet) {
        self.inc_by(labels, 1.0);
    }

    /// Lenient increment (log and drop on error).
    pub fn inc_by(&self, labels: &LabelSet, delta: f64) {
        if let Err(e) = self.try_inc_by(labels, delta) {
            self.registry.drop_observation(&self.family.name, e);
        }
    }

    pub fn try_inc_by(&self, labels: &LabelSet, delta: f64) -> Result<()> {
        check_delta(&self.family.name, delta)?;
        self.family.counter_add(&self.registry.series_key(labels), delta)
    }
}

/// Typed handle to a registered histogram.
#[derive(Clone)]
pub struct Histogram {
    family: Arc<MetricFamily>,
    registry: Registry,
}

impl Histogram {
    pub fn name(&self) -> &str {
        &self.family.name
    }

    /// Lenient observe (log and drop on error).
    pub fn observe(&self, labels: &LabelSet, value: f64) {
        if let Err(e) = self.try_observe(labels, value) {
            self.registry.drop_observation(&self.family.name, e);
        }
    }

    pub fn try_observe(&self, labels: &LabelSet, value: f64) -> Result<()> {
        check_observation(&self.family.name, value)?;
        self.family.histogram_observe(&self.registry.series_key(labels), value)
    }

    pub fn start_timer(&self, labels: LabelSet) -> HistogramTimer {
        self.registry.start_timer(&self.family.name, labels)
    }
}

/// Result of [`Registry::register`].
#[derive(Clone)]
pub enum Metric {
    Counter(Counter),
    Histogram(Histogram),
}

impl Metric {
    pub fn name(&self) -> &str {
        match self {
            Metric::Counter(c) => c.name(),
            Metric::Histogram(h) => h.name(),
        }
    }

    pub fn metric_type(&self) -> MetricType {
        match self {
            Metric::Counter(_) => MetricType::Counter,
            Metric::Histogram(_) => MetricType::Histogram,
        }
    }
}

fn check_delta(name: &str, delta: f64) -> Result<()> {
    if delta.is_finite() && delta >= 0.0 {
        Ok(())
    } else {
        Err(MetricsError::InvalidDelta {
            name: name.to_string(),
            delta,
        })
    }
}

fn check_observation(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(MetricsError::InvalidObservation {
            name: name.to_string(),
            value,
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Empty registry without process gauges or default labels.
    pub fn new() -> Self {
        RegistryBuilder::default().build()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    fn families(&self) -> RwLockReadGuard<'_, Vec<Arc<MetricFamily>>> {
        self.inner.families.read().unwrap_or_else(|e| e.into_inner())
    }

    fn lookup(&self, name: &str) -> Result<Arc<MetricFamily>> {
        self.inner
            .index
            .get(name)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| MetricsError::UnknownMetric(name.to_string()))
    }

    /// Stored series identity: registry defaults with the caller's labels on top.
    fn series_key<'a>(&self, labels: &'a LabelSet) -> Cow<'a, LabelSet> {
        let defaults = &self.inner.default_labels;
        if defaults.is_empty() {
            Cow::Borrowed(labels)
        } else {
            Cow::Owned(defaults.merged(labels))
        }
    }

    fn handle(&self, family: Arc<MetricFamily>) -> Metric {
        let registry = self.clone();
        match family.metric_type() {
            MetricType::Histogram => Metric::Histogram(Histogram { family, registry }),
            _ => Metric::Counter(Counter { family, registry }),
        }
    }

    /// Register a metric. Re-registering the same name with the same kind,
    /// help and buckets returns the existing metric.
    pub fn register(&self, name: &str, help: &str, kind: MetricKind) -> Result<Metric> {
        check_metric_name(name)?;
        let kind = match kind {
            MetricKind::Counter => MetricKind::Counter,
            MetricKind::Histogram { buckets } => MetricKind::Histogram {
                buckets: normalize_buckets(buckets)?,
            },
        };

        let mut families = self.inner.families.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = self.inner.index.get(name).map(|r| Arc::clone(r.value())) {
            let reason = if existing.kind.metric_type() != kind.metric_type() {
                Some(format!(
                    "registered as {}, requested {}",
                    existing.metric_type().as_str(),
                    kind.metric_type().as_str()
                ))
            } else if existing.help != help {
                Some("help text differs".to_string())
            } else if existing.kind != kind {
                Some("bucket layout differs".to_string())
            } else {
                None
            };
            return match reason {
                Some(reason) => Err(MetricsError::DuplicateMetric {
                    name: name.to_string(),
                    reason,
                }),
                None => Ok(self.handle(existing)),
            };
        }

        let family = Arc::new(MetricFamily::new(name.to_string(), help.to_string(), kind));
        families.push(Arc::clone(&family));
        self.inner.index.insert(name.to_string(), Arc::clone(&family));
        drop(families);

        tracing::debug!(metric = %name, kind = family.metric_type().as_str(), "metric registered");
        Ok(self.handle(family))
    }

    pub fn register_counter(&self, name: &str, help: &str) -> Result<Counter> {
        match self.register(name, help, MetricKind::Counter)? {
            Metric::Counter(c) => Ok(c),
            Metric::Histogram(_) => Err(MetricsError::WrongKind {
                name: name.to_string(),
                expected: "counter",
                actual: "histogram",
            }),
        }
    }

    pub fn register_histogram(
        &self,
        name: &str,
        help: &str,
        buckets: Vec<f64>,
    ) -> Result<Histogram> {
        match self.register(name, help, MetricKind::histogram(buckets))? {
            Metric::Histogram(h) => Ok(h),
            Metric::Counter(_) => Err(MetricsError::WrongKind {
                name: name.to_string(),
                expected: "histogram",
                actual: "counter",
            }),
        }
    }

    pub fn try_counter_increment(&self, name: &str, labels: &LabelSet, delta: f64) -> Result<()> {
        let family = self.lookup(name)?;
        check_delta(name, delta)?;
        family.counter_add(&self.series_key(labels), delta)
    }

    /// Lenient increment: errors are logged and the observation dropped.
    pub fn counter_increment(&self, name: &str, labels: &LabelSet, delta: f64) {
        if let Err(e) = self.try_counter_increment(name, labels, delta) {
            self.drop_observation(name, e);
        }
    }

    /// `counter_increment` with a delta of 1.
    pub fn inc(&self, name: &str, labels: &LabelSet) {
        self.counter_increment(name, labels, 1.0);
    }

    pub fn try_histogram_observe(&self, name: &str, labels: &LabelSet, value: f64) -> Result<()> {
        let family = self.lookup(name)?;
        check_observation(name, value)?;
        family.histogram_observe(&self.series_key(labels), value)
    }

    /// Lenient observe: errors are logged and the observation dropped.
    pub fn histogram_observe(&self, name: &str, labels: &LabelSet, value: f64) {
        if let Err(e) = self.try_histogram_observe(name, labels, value) {
            self.drop_observation(name, e);
        }
    }

    fn drop_observation(&self, name: &str, err: MetricsError) {
        self.inner.dropped.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            metric = %name,
            code = err.code().as_str(),
            error = %err,
            "observation dropped"
        );
    }

    /// Observations discarded by the lenient recording methods.
    pub fn dropped_observations(&self) -> u64 {
        self.inner.dropped.load(Ordering::Relaxed)
    }

    pub fn default_labels(&self) -> &LabelSet {
        &self.inner.default_labels
    }

    /// Start a timer against histogram `name`.
    pub fn start_timer(&self, name: &str, labels: LabelSet) -> HistogramTimer {
        self.start_timer_at(name, labels, Instant::now())
    }

    /// Start a timer whose clock began at `start`.
    pub fn start_timer_at(&self, name: &str, labels: LabelSet, start: Instant) -> HistogramTimer {
        HistogramTimer::new(self.clone(), name.to_string(), labels, start)
    }

    /// Run `f` and record its duration, however it exits.
    pub fn time<T>(&self, name: &str, labels: LabelSet, f: impl FnOnce() -> T) -> T {
        let _timer = self.start_timer(name, labels);
        f()
    }

    /// Like [`Registry::time`], adding `outcome="ok"` or `outcome="error"`.
    pub fn time_result<T, E>(
        &self,
        name: &str,
        labels: LabelSet,
        f: impl FnOnce() -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E> {
        let mut timer = self.start_timer(name, labels);
        let res = f();
        let outcome = if res.is_ok() { "ok" } else { "error" };
        match LabelSet::new().with("outcome", outcome) {
            Ok(extra) => {
                timer.stop(&extra);
            }
            Err(e) => self.drop_observation(name, e),
        }
        res
    }

    /// Gauges from the configured process collector. Families with invalid
    /// names or names owned by a registered metric are skipped.
    pub fn collect_process_metrics(&self) -> Vec<FamilySnapshot> {
        let Some(collector) = &self.inner.process else {
            return Vec::new();
        };
        collector
            .collect()
            .into_iter()
            .filter(|f| {
                if !is_valid_metric_name(&f.name) {
                    tracing::warn!(metric = %f.name, "process gauge skipped: invalid name");
                    return false;
                }
                if self.inner.index.contains_key(&f.name) {
                    tracing::warn!(
                        metric = %f.name,
                        "process gauge skipped: name already registered"
                    );
                    return false;
                }
                true
            })
            .collect()
    }

    /// Consistent copy of every series plus the process gauges.
    ///
    /// Registered series already carry the default labels (they are applied
    /// when a series is recorded); process gauges get them here.
    pub fn snapshot(&self) -> Snapshot {
        let families: Vec<Arc<MetricFamily>> = self.families().clone();
        let defaults = &self.inner.default_labels;

        let mut out: Vec<FamilySnapshot> = families.iter().map(|f| f.snapshot()).collect();
        out.extend(
            self.collect_process_metrics()
                .into_iter()
                .map(|f| f.with_default_labels(defaults)),
        );
        Snapshot { families: out }
    }

    /// Metric names in registration order.
    pub fn metric_names(&self) -> Vec<String> {
        self.families().iter().map(|f| f.name.clone()).collect()
    }

    pub fn render(&self) -> Result<String> {
        render::render(&self.snapshot())
    }

    /// Render a single registered family.
    pub fn render_metric(&self, name: &str) -> Result<String> {
        let family = self.lookup(name)?;
        let snap = Snapshot {
            families: vec![family.snapshot()],
        };
        render::render(&snap)
    }

    pub fn content_type(&self) -> &'static str {
        render::CONTENT_TYPE
    }
}
