//! Prometheus metrics scoped by name prefix and fixed labels.
//!
//! Families are created through a [`MetricFactory`], which scopes names by
//! prefix and pins leading label values. Vectors can be curried further with
//! [`MetricVec::curry_with`]. Storage, collection and the text format come
//! from the `prometheus` crate.

mod factory;
mod lazy;
mod registry;
mod vec;

use thiserror::Error;

pub use factory::MetricFactory;
pub use prometheus::{IntCounter as Counter, IntGauge as Gauge};
pub use vec::{CounterVec, GaugeVec, LabelledVec, MetricKind, MetricVec};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MetricError {
    #[error("{name}: expected {expected} label values, got {got}")]
    Cardinality {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("{name}: {values} label values given for {names} label names")]
    LabelCount {
        name: String,
        names: usize,
        values: usize,
    },
    #[error("{name}: unknown label '{label}'")]
    UnknownLabel { name: String, label: String },
    #[error("{name}: label '{label}' is already curried")]
    AlreadyCurried { name: String, label: String },
    #[error("{name}: already registered as {existing}, requested {requested}")]
    TypeConflict {
        name: String,
        existing: MetricKind,
        requested: MetricKind,
    },
    #[error("{name}: already registered with labels [{existing}], requested [{requested}]")]
    LabelConflict {
        name: String,
        existing: String,
        requested: String,
    },
    /// Rejected by the `prometheus` crate (invalid name, empty help, ...).
    #[error("{name}: {message}")]
    Prometheus { name: String, message: String },
    #[error("text encoding failed: {0}")]
    Encode(String),
}

impl MetricError {
    pub(crate) fn prometheus(name: &str, err: prometheus::Error) -> Self {
        Self::Prometheus {
            name: name.to_owned(),
            message: err.to_string(),
        }
    }
}
