//! Label sets: the per-series key of a metric.
//!
//! Pairs are kept sorted by label name so two sets built in different orders
//! compare, hash and render identically.

use std::fmt;

use crate::error::{MetricsError, Result};
use crate::name::check_label_name;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelSet {
    pairs: Vec<(String, String)>,
}

impl LabelSet {
    /// The empty set (a metric's unlabeled series).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from borrowed pairs. Duplicate names are rejected.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Result<Self> {
        let mut set = Self::new();
        for (k, v) in pairs {
            if set.insert(*k, *v)?.is_some() {
                return Err(MetricsError::InvalidLabel(format!("duplicate label name {k:?}")));
            }
        }
        Ok(set)
    }

    /// Builder form of [`LabelSet::insert`]; a later value replaces an earlier one.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        self.insert(name, value)?;
        Ok(self)
    }

    /// Insert or replace a label, returning the previous value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Option<String>> {
        let name = name.into();
        check_label_name(&name)?;
        let value = value.into();
        match self.pairs.binary_search_by(|(k, _)| k.as_str().cmp(&name)) {
            Ok(i) => Ok(Some(std::mem::replace(&mut self.pairs[i].1, value))),
            Err(i) => {
                self.pairs.insert(i, (name, value));
                Ok(None)
            }
        }
    }

    /// Union of both sets; `other` wins on conflicting names.
    pub fn merged(&self, other: &LabelSet) -> LabelSet {
        use std::cmp::Ordering;

        let (a, b) = (&self.pairs, &other.pairs);
        let mut pairs = Vec::with_capacity(a.len() + b.len());
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].0.cmp(&b[j].0) {
                Ordering::Less => {
                    pairs.push(a[i].clone());
                    i += 1;
                }
                Ordering::Greater => {
                    pairs.push(b[j].clone());
                    j += 1;
                }
                Ordering::Equal => {
                    pairs.push(b[j].clone());
                    i += 1;
                    j += 1;
                }
            }
        }
        pairs.extend_from_slice(&a[i..]);
        pairs.extend_from_slice(&b[j..]);
        LabelSet { pairs }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .binary_search_by(|(k, _)| k.as_str().cmp(name))
            .ok()
            .map(|i| self.pairs[i].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Escape a label value for the text exposition format.
pub fn escape_label_value(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

impl fmt::Display for LabelSet {
    /// `{a="1",b="2"}`, or nothing for the empty set.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pairs.is_empty() {
            return Ok(());
        }
        f.write_str("{")?;
        for (i, (k, v)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}=\"{}\"", k, escape_label_value(v))?;
        }
        f.write_str("}")
    }
}
