//! Immutable point-in-time copies of registry state.

use crate::labels::LabelSet;
use crate::metric::MetricType;

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSample {
    /// Cumulative bucket counts, index-aligned with the family's bounds.
    pub cumulative: Vec<u64>,
    /// Total observations (the `+Inf` bucket).
    pub count: u64,
    pub sum: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    Counter(Vec<(LabelSet, f64)>),
    Gauge(Vec<(LabelSet, f64)>),
    Histogram {
        bounds: Vec<f64>,
        series: Vec<(LabelSet, HistogramSample)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FamilySnapshot {
    pub name: String,
    pub help: String,
    pub samples: Samples,
}

impl FamilySnapshot {
    /// Single unlabeled gauge, the shape process collectors emit.
    pub fn gauge(name: impl Into<String>, help: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            samples: Samples::Gauge(vec![(LabelSet::new(), value)]),
        }
    }

    pub fn metric_type(&self) -> MetricType {
        match self.samples {
            Samples::Counter(_) => MetricType::Counter,
            Samples::Gauge(_) => MetricType::Gauge,
            Samples::Histogram { .. } => MetricType::Histogram,
        }
    }

    /// Counter or gauge value of one series.
    pub fn value(&self, labels: &LabelSet) -> Option<f64> {
        match &self.samples {
            Samples::Counter(s) | Samples::Gauge(s) => {
                s.iter().find(|(l, _)| l == labels).map(|(_, v)| *v)
            }
            Samples::Histogram { .. } => None,
        }
    }

    pub fn histogram(&self, labels: &LabelSet) -> Option<&HistogramSample> {
        match &self.samples {
            Samples::Histogram { series, .. } => {
                series.iter().find(|(l, _)| l == labels).map(|(_, h)| h)
            }
            _ => None,
        }
    }

    pub fn series_len(&self) -> usize {
        match &self.samples {
            Samples::Counter(s) | Samples::Gauge(s) => s.len(),
            Samples::Histogram { series, .. } => series.len(),
        }
    }

    /// Apply registry-wide labels; labels already on a series win.
    pub(crate) fn with_default_labels(mut self, defaults: &LabelSet) -> Self {
        if defaults.is_empty() {
            return self;
        }
        match &mut self.samples {
            Samples::Counter(s) | Samples::Gauge(s) => {
                for (l, _) in s.iter_mut() {
                    *l = defaults.merged(l);
                }
                s.sort_by(|a, b| a.0.cmp(&b.0));
            }
            Samples::Histogram { series, .. } => {
                for (l, _) in series.iter_mut() {
                    *l = defaults.merged(l);
                }
                series.sort_by(|a, b| a.0.cmp(&b.0));
            }
        }
        self
    }
}

/// Families in registration order, followed by process families.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub families: Vec<FamilySnapshot>,
}

impl Snapshot {
    pub fn family(&self, name: &str) -> Option<&FamilySnapshot> {
        self.families.iter().find(|f| f.name == name)
    }
}
