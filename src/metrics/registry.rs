//! Name-keyed store shared by a factory and all of its sub-factories.
//!
//! `prometheus::Registry` refuses a second registration of the same name, so
//! the families registered so far are kept here to hand back on repeat
//! requests.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use prometheus::{core::Collector, proto::MetricFamily};

use super::{
    MetricError,
    lazy::LazyCounters,
    vec::{CounterVec, GaugeVec, LabelledVec, MetricKind, MetricVec},
};

enum Registered {
    Counter(CounterVec),
    Gauge(GaugeVec),
}

impl Registered {
    fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(vec) => vec.kind(),
            Self::Gauge(vec) => vec.kind(),
        }
    }
}

#[derive(Default)]
pub(crate) struct Registry {
    inner: prometheus::Registry,
    families: RwLock<BTreeMap<String, Registered>>,
}

impl Registry {
    pub(crate) fn counter_family(
        &self,
        name: &str,
        help: &str,
        label_names: &[String],
        kind: MetricKind,
    ) -> Result<CounterVec, MetricError> {
        let mut families = self.families.write();
        if let Some(existing) = families.get(name) {
            return match existing {
                Registered::Counter(vec) if vec.kind() == kind => {
                    check_labels(vec, label_names).map(|()| vec.clone())
                }
                other => Err(type_conflict(name, other.kind(), kind)),
            };
        }
        let vec = CounterVec::new(name, help, label_names, kind)?;
        let collector: Box<dyn Collector> = match kind {
            MetricKind::LazyCounter => Box::new(LazyCounters::new(vec.inner().clone())),
            _ => Box::new(vec.inner().clone()),
        };
        self.register(name, collector)?;
        families.insert(name.to_owned(), Registered::Counter(vec.clone()));
        Ok(vec)
    }

    pub(crate) fn gauge_family(
        &self,
        name: &str,
        help: &str,
        label_names: &[String],
    ) -> Result<GaugeVec, MetricError> {
        let mut families = self.families.write();
        if let Some(existing) = families.get(name) {
            return match existing {
                Registered::Gauge(vec) => check_labels(vec, label_names).map(|()| vec.clone()),
                other => Err(type_conflict(name, other.kind(), MetricKind::Gauge)),
            };
        }
        let vec = GaugeVec::new(name, help, label_names, MetricKind::Gauge)?;
        self.register(name, Box::new(vec.inner().clone()))?;
        families.insert(name.to_owned(), Registered::Gauge(vec.clone()));
        Ok(vec)
    }

    /// Every family with at least one sample, sorted by name.
    pub(crate) fn gather(&self) -> Vec<MetricFamily> {
        self.inner.gather()
    }

    fn register(&self, name: &str, collector: Box<dyn Collector>) -> Result<(), MetricError> {
        self.inner
            .register(collector)
            .map_err(|err| MetricError::prometheus(name, err))
    }
}

fn check_labels<V: LabelledVec>(vec: &MetricVec<V>, requested: &[String]) -> Result<(), MetricError> {
    if vec.label_names() == requested {
        return Ok(());
    }
    Err(MetricError::LabelConflict {
        name: vec.name().to_owned(),
        existing: vec.label_names().join(","),
        requested: requested.join(","),
    })
}

fn type_conflict(name: &str, existing: MetricKind, requested: MetricKind) -> MetricError {
    MetricError::TypeConflict {
        name: name.to_owned(),
        existing,
        requested,
    }
}
