//! Side channel for failures inside the logging pipeline itself.
//!
//! Hooks cannot report their own connectivity problems through the logger
//! they serve without risking recursion, so they report to a
//! [`DiagnosticSink`] instead. The default sink writes to stderr.

use std::{
    fmt,
    io::{self, Write},
    sync::Arc,
};

/// Receives diagnostics about dropped records and transport failures.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, message: &str);
}

/// Writes each diagnostic as one line on stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn report(&self, message: &str) {
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{message}");
    }
}

/// Cloneable handle to a diagnostic sink.
#[derive(Clone)]
pub struct Diagnostics {
    sink: Arc<dyn DiagnosticSink>,
}

impl Diagnostics {
    pub fn new<S>(sink: S) -> Self
    where
        S: DiagnosticSink + 'static,
    {
        Self {
            sink: Arc::new(sink),
        }
    }

    pub fn from_arc(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { sink }
    }

    pub fn report(&self, message: impl AsRef<str>) {
        self.sink.report(message.as_ref());
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(StderrSink)
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Diagnostics(<dyn DiagnosticSink>)")
    }
}
