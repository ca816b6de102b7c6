//! Curried views onto `prometheus` metric vectors.

use std::{fmt, sync::Arc};

use prometheus::{IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts};

use super::MetricError;

/// Kind of a registered metric family.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    /// Counter whose zero-valued children are left out of collection.
    LazyCounter,
    Gauge,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Counter => "counter",
            Self::LazyCounter => "lazy counter",
            Self::Gauge => "gauge",
        })
    }
}

/// A labelled `prometheus` vector that [`MetricVec`] can wrap.
pub trait LabelledVec: Clone + Send + Sync + 'static {
    type Metric;

    fn build(name: &str, help: &str, label_names: &[&str]) -> prometheus::Result<Self>;

    /// Child for a full set of label values, in declaration order.
    fn child(&self, values: &[&str]) -> prometheus::Result<Self::Metric>;
}

impl LabelledVec for IntCounterVec {
    type Metric = IntCounter;

    fn build(name: &str, help: &str, label_names: &[&str]) -> prometheus::Result<Self> {
        IntCounterVec::new(Opts::new(name, help), label_names)
    }

    fn child(&self, values: &[&str]) -> prometheus::Result<IntCounter> {
        self.get_metric_with_label_values(values)
    }
}

impl LabelledVec for IntGaugeVec {
    type Metric = IntGauge;

    fn build(name: &str, help: &str, label_names: &[&str]) -> prometheus::Result<Self> {
        IntGaugeVec::new(Opts::new(name, help), label_names)
    }

    fn child(&self, values: &[&str]) -> prometheus::Result<IntGauge> {
        self.get_metric_with_label_values(values)
    }
}

/// A metric family seen through zero or more pre-bound labels.
///
/// Curried views share children with the family they came from, so
/// `vec.curry_with(&[("a", "1")])?.with_label_values(&["2"])` and
/// `vec.with_label_values(&["1", "2"])` return the same metric.
#[derive(Clone)]
pub struct MetricVec<V> {
    name: Arc<str>,
    kind: MetricKind,
    label_names: Arc<[String]>,
    inner: V,
    // One slot per family label; `Some` once curried.
    bound: Vec<Option<String>>,
}

pub type CounterVec = MetricVec<IntCounterVec>;
pub type GaugeVec = MetricVec<IntGaugeVec>;

impl<V: LabelledVec> MetricVec<V> {
    /// An uncurried family. It is only collected once registered.
    pub(crate) fn new(
        name: &str,
        help: &str,
        label_names: &[String],
        kind: MetricKind,
    ) -> Result<Self, MetricError> {
        let names: Vec<&str> = label_names.iter().map(String::as_str).collect();
        let inner = V::build(name, help, &names).map_err(|err| MetricError::prometheus(name, err))?;
        Ok(Self {
            name: Arc::from(name),
            kind,
            label_names: Arc::from(label_names),
            inner,
            bound: vec![None; label_names.len()],
        })
    }

    pub(crate) fn inner(&self) -> &V {
        &self.inner
    }

    pub(crate) fn label_names(&self) -> &[String] {
        &self.label_names
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Labels still to be supplied to [`with_label_values`](Self::with_label_values).
    pub fn free_labels(&self) -> Vec<&str> {
        self.label_names
            .iter()
            .zip(&self.bound)
            .filter(|(_, bound)| bound.is_none())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Return the child for `values`, creating it at zero if needed.
    ///
    /// `values` fill the free labels in declaration order.
    pub fn with_label_values(&self, values: &[&str]) -> Result<V::Metric, MetricError> {
        let free = self.bound.iter().filter(|slot| slot.is_none()).count();
        if values.len() != free {
            return Err(MetricError::Cardinality {
                name: self.name.to_string(),
                expected: free,
                got: values.len(),
            });
        }
        let mut supplied = values.iter().copied();
        let full: Vec<&str> = self
            .bound
            .iter()
            .map(|slot| match slot {
                Some(value) => value.as_str(),
                None => supplied.next().unwrap_or_default(),
            })
            .collect();
        self.inner
            .child(&full)
            .map_err(|err| MetricError::prometheus(&self.name, err))
    }

    /// Bind `labels` and return the narrower view.
    pub fn curry_with(&self, labels: &[(&str, &str)]) -> Result<Self, MetricError> {
        let mut bound = self.bound.clone();
        for (label, value) in labels {
            let index = self
                .label_names
                .iter()
                .position(|name| name == label)
                .ok_or_else(|| MetricError::UnknownLabel {
                    name: self.name.to_string(),
                    label: (*label).to_owned(),
                })?;
            if bound[index].is_some() {
                return Err(MetricError::AlreadyCurried {
                    name: self.name.to_string(),
                    label: (*label).to_owned(),
                });
            }
            bound[index] = Some((*value).to_owned());
        }
        Ok(Self {
            bound,
            ..self.clone()
        })
    }
}

impl<V> fmt::Debug for MetricVec<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricVec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("labels", &self.label_names)
            .field("bound", &self.bound)
            .finish()
    }
}
