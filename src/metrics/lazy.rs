//! Collector that hides counters until they are first incremented.

use prometheus::{
    IntCounterVec,
    core::{Collector, Desc},
    proto::MetricFamily,
};

pub(crate) struct LazyCounters {
    inner: IntCounterVec,
}

impl LazyCounters {
    pub(crate) fn new(inner: IntCounterVec) -> Self {
        Self { inner }
    }
}

impl Collector for LazyCounters {
    fn desc(&self) -> Vec<&Desc> {
        self.inner.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut families = self.inner.collect();
        for family in &mut families {
            let kept: Vec<_> = family
                .take_metric()
                .into_iter()
                .filter(|metric| metric.get_counter().get_value() != 0.0)
                .collect();
            family.set_metric(kept.into());
        }
        families
    }
}
