//! In-memory sinks that accumulate records and diagnostics for assertions.
//!
//! Shared across test modules so that each one does not need its own copy of
//! the same boilerplate.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    diagnostics::{DiagnosticSink, Diagnostics},
    hook::Hook,
    level::LogLevel,
    log_record::LogRecord,
};

/// Hook that stores every record it receives for later inspection.
#[derive(Clone)]
pub struct CollectingHook {
    levels: Vec<LogLevel>,
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl Default for CollectingHook {
    fn default() -> Self {
        Self::with_levels(&LogLevel::ALL)
    }
}

impl CollectingHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_levels(levels: &[LogLevel]) -> Self {
        Self {
            levels: levels.to_vec(),
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Return a snapshot of all records received so far.
    pub fn collected(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .map(|record| record.message.clone())
            .collect()
    }
}

impl Hook for CollectingHook {
    fn levels(&self) -> &[LogLevel] {
        &self.levels
    }

    fn fire(&self, record: &LogRecord) {
        self.records.lock().push(record.clone());
    }
}

/// Diagnostic sink keeping every message.
#[derive(Clone, Default)]
pub struct CollectingSink {
    messages: Arc<Mutex<Vec<String>>>,
}

impl CollectingSink {
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics::new(self.clone())
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.messages
            .lock()
            .iter()
            .filter(|message| message.contains(needle))
            .count()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, message: &str) {
        self.messages.lock().push(message.to_owned());
    }
}
