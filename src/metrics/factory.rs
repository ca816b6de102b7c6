//! Prefix- and label-scoped creation of metric families.

use std::{fmt, sync::Arc};

use prometheus::{
    Encoder, TextEncoder,
    proto::{MetricFamily, MetricType},
};

use super::{
    Counter, Gauge, MetricError,
    registry::Registry,
    vec::{CounterVec, GaugeVec, LabelledVec, MetricKind, MetricVec},
};

/// Creates metrics whose names start with a common prefix and whose leading
/// labels are fixed.
///
/// Sub-factories made with [`add_or_get_prefix`](Self::add_or_get_prefix)
/// extend both and share the parent's registry; nothing a sub-factory adds can
/// remove or override what its parent fixed. Asking twice for the same full
/// name returns the same family, so two sub-factories that differ only in a
/// fixed label value contribute children to one family.
#[derive(Clone)]
pub struct MetricFactory {
    prefix: String,
    label_names: Vec<String>,
    label_values: Vec<String>,
    registry: Arc<Registry>,
}

impl MetricFactory {
    pub fn new(prefix: &str, label_names: &[&str], label_values: &[&str]) -> Result<Self, MetricError> {
        check_pairs(prefix, label_names, label_values)?;
        Ok(Self {
            prefix: prefix.to_owned(),
            label_names: to_owned(label_names),
            label_values: to_owned(label_values),
            registry: Arc::new(Registry::default()),
        })
    }

    /// Factory with a prefix and no fixed labels.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_owned(),
            label_names: Vec::new(),
            label_values: Vec::new(),
            registry: Arc::new(Registry::default()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn add_or_get_prefix(
        &self,
        prefix: &str,
        label_names: &[&str],
        label_values: &[&str],
    ) -> Result<Self, MetricError> {
        let full_prefix = format!("{}{prefix}", self.prefix);
        check_pairs(&full_prefix, label_names, label_values)?;
        let (names, values) = self.extend_labels(label_names, label_values);
        Ok(Self {
            prefix: full_prefix,
            label_names: names,
            label_values: values,
            registry: Arc::clone(&self.registry),
        })
    }

    pub fn add_or_get_counter(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        label_values: &[&str],
    ) -> Result<Counter, MetricError> {
        check_pairs(name, label_names, label_values)?;
        self.add_or_get_counter_vec(name, help, label_names, label_values)?
            .with_label_values(&[])
    }

    /// Counter family curried with the fixed labels and `leftmost_values`.
    pub fn add_or_get_counter_vec(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        leftmost_values: &[&str],
    ) -> Result<CounterVec, MetricError> {
        self.counter_vec(name, help, label_names, leftmost_values, MetricKind::Counter)
    }

    /// Like [`add_or_get_counter`](Self::add_or_get_counter) but left out of
    /// collection while zero.
    pub fn add_or_get_lazy_counter(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        label_values: &[&str],
    ) -> Result<Counter, MetricError> {
        check_pairs(name, label_names, label_values)?;
        self.add_or_get_lazy_counter_vec(name, help, label_names, label_values)?
            .with_label_values(&[])
    }

    pub fn add_or_get_lazy_counter_vec(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        leftmost_values: &[&str],
    ) -> Result<CounterVec, MetricError> {
        self.counter_vec(name, help, label_names, leftmost_values, MetricKind::LazyCounter)
    }

    pub fn add_or_get_gauge(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        label_values: &[&str],
    ) -> Result<Gauge, MetricError> {
        check_pairs(name, label_names, label_values)?;
        self.add_or_get_gauge_vec(name, help, label_names, label_values)?
            .with_label_values(&[])
    }

    pub fn add_or_get_gauge_vec(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        leftmost_values: &[&str],
    ) -> Result<GaugeVec, MetricError> {
        let full_name = self.full_name(name, label_names, leftmost_values)?;
        let (names, values) = self.extend_labels(label_names, leftmost_values);
        let family = self.registry.gauge_family(&full_name, help, &names)?;
        curry_leftmost(family, &names, &values)
    }

    /// Every non-empty family in the shared registry, sorted by name.
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Prometheus text exposition of [`gather`](Self::gather).
    pub fn render(&self) -> Result<String, MetricError> {
        encode(&self.gather())
    }

    /// Text exposition of the families whose name starts with `prefix`,
    /// optionally without zero-valued samples.
    pub fn render_filtered(&self, prefix: &str, skip_zero: bool) -> Result<String, MetricError> {
        encode(&self.filtered(prefix, skip_zero))
    }

    /// Sum of every sample in the families whose name starts with `prefix`.
    pub fn sum_values(&self, prefix: &str) -> f64 {
        self.filtered(prefix, false)
            .iter()
            .flat_map(|family| {
                let kind = family.get_field_type();
                family.get_metric().iter().map(move |metric| match kind {
                    MetricType::GAUGE => metric.get_gauge().get_value(),
                    _ => metric.get_counter().get_value(),
                })
            })
            .sum()
    }

    fn filtered(&self, prefix: &str, skip_zero: bool) -> Vec<MetricFamily> {
        let mut families: Vec<MetricFamily> = self
            .gather()
            .into_iter()
            .filter(|family| family.get_name().starts_with(prefix))
            .collect();
        if skip_zero {
            for family in &mut families {
                let kind = family.get_field_type();
                let kept: Vec<_> = family
                    .take_metric()
                    .into_iter()
                    .filter(|metric| match kind {
                        MetricType::GAUGE => metric.get_gauge().get_value() != 0.0,
                        _ => metric.get_counter().get_value() != 0.0,
                    })
                    .collect();
                family.set_metric(kept.into());
            }
            families.retain(|family| !family.get_metric().is_empty());
        }
        families
    }

    fn counter_vec(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        leftmost_values: &[&str],
        kind: MetricKind,
    ) -> Result<CounterVec, MetricError> {
        let full_name = self.full_name(name, label_names, leftmost_values)?;
        let (names, values) = self.extend_labels(label_names, leftmost_values);
        let family = self.registry.counter_family(&full_name, help, &names, kind)?;
        curry_leftmost(family, &names, &values)
    }

    fn full_name(
        &self,
        name: &str,
        label_names: &[&str],
        leftmost_values: &[&str],
    ) -> Result<String, MetricError> {
        let full_name = format!("{}{name}", self.prefix);
        if leftmost_values.len() > label_names.len() {
            return Err(MetricError::LabelCount {
                name: full_name,
                names: label_names.len(),
                values: leftmost_values.len(),
            });
        }
        Ok(full_name)
    }

    fn extend_labels(&self, names: &[&str], values: &[&str]) -> (Vec<String>, Vec<String>) {
        let mut all_names = self.label_names.clone();
        all_names.extend(to_owned(names));
        let mut all_values = self.label_values.clone();
        all_values.extend(to_owned(values));
        (all_names, all_values)
    }
}

impl fmt::Display for MetricFactory {
    /// `prefix{name="value",...}` with the fixed labels.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.prefix)?;
        for (i, (name, value)) in self.label_names.iter().zip(&self.label_values).enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{name}=\"{value}\"")?;
        }
        f.write_str("}")
    }
}

impl fmt::Debug for MetricFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetricFactory({self})")
    }
}

fn encode(families: &[MetricFamily]) -> Result<String, MetricError> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(families, &mut buffer)
        .map_err(|err| MetricError::Encode(err.to_string()))?;
    String::from_utf8(buffer).map_err(|err| MetricError::Encode(err.to_string()))
}

fn curry_leftmost<V: LabelledVec>(
    vec: MetricVec<V>,
    names: &[String],
    values: &[String],
) -> Result<MetricVec<V>, MetricError> {
    let labels: Vec<(&str, &str)> = names
        .iter()
        .zip(values)
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();
    vec.curry_with(&labels)
}

fn check_pairs(name: &str, label_names: &[&str], label_values: &[&str]) -> Result<(), MetricError> {
    if label_names.len() == label_values.len() {
        return Ok(());
    }
    Err(MetricError::LabelCount {
        name: name.to_owned(),
        names: label_names.len(),
        values: label_values.len(),
    })
}

fn to_owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}
