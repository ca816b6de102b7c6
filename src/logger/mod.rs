//! Structured logger with hooks, per-level counters and an exit chain.
//!
//! A [`Logger`] is a cheap handle: clones and sub-loggers created with
//! [`Logger::with_field`] share one [`LoggerCore`] holding the level,
//! formatter, output, hooks and exit chain. Each handle carries its own
//! fields and the counters for its component.
//!
//! Emission happens on the calling thread. Hooks that accept the record's
//! level fire first, then the formatted line is written to the output.

mod writer;


use std::{
    fmt,
    fs::OpenOptions,
    io::{self, Write},
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::{
    diagnostics::Diagnostics,
    exit::ExitCoordinator,
    formatter::{Formatter, SharedFormatter, TextFormatter, format_fields},
    hook::Hook,
    level::LogLevel,
    log_record::{Fields, LABEL_COMPONENT, LogRecord, value_to_text},
    metrics::{Counter, CounterVec, MetricFactory},
    structured_error::StructuredError,
    upstream::{self, ShutdownHandle, UpstreamConfig, UpstreamError, UpstreamHook},
};

pub use writer::LogWriter;

/// Name of the counter family tracking log calls.
pub const LOGS_TOTAL: &str = "logger_logs_total";
/// Component label used for records logged without a component.
pub const ROOT_COMPONENT: &str = "(root)";

// `None` when the factory refused the log counter family.
type LevelCounters = [Option<Counter>; LogLevel::ALL.len()];

/// State shared by a root logger and every handle derived from it.
pub(crate) struct LoggerCore {
    level: AtomicU8,
    formatter: RwLock<SharedFormatter>,
    output: Mutex<Box<dyn Write + Send>>,
    hooks: RwLock<Vec<Arc<dyn Hook>>>,
    exit: Arc<ExitCoordinator>,
    metrics: MetricFactory,
    logs_total: Option<CounterVec>,
    upstream: UpstreamConfig,
    diagnostics: Diagnostics,
}

/// Everything needed to assemble a [`LoggerCore`].
pub(crate) struct CoreParts {
    pub(crate) level: LogLevel,
    pub(crate) formatter: SharedFormatter,
    pub(crate) output: Box<dyn Write + Send>,
    pub(crate) exit: Arc<ExitCoordinator>,
    pub(crate) metrics: MetricFactory,
    pub(crate) upstream: UpstreamConfig,
    pub(crate) diagnostics: Diagnostics,
}

impl Default for CoreParts {
    fn default() -> Self {
        let diagnostics = Diagnostics::default();
        Self {
            level: LogLevel::Info,
            formatter: SharedFormatter::new(TextFormatter),
            output: Box::new(io::stderr()),
            exit: Arc::new(ExitCoordinator::new(diagnostics.clone())),
            metrics: MetricFactory::with_prefix(""),
            upstream: UpstreamConfig::default(),
            diagnostics,
        }
    }
}

impl LoggerCore {
    fn new(parts: CoreParts) -> Self {
        let logs_total = parts
            .metrics
            .add_or_get_lazy_counter_vec(
                LOGS_TOTAL,
                "Numbers of logs including warnings",
                &[LABEL_COMPONENT, "level"],
                &[],
            )
            .map_err(|err| {
                parts
                    .diagnostics
                    .report(format!("logger: log calls will not be counted: {err}"));
            })
            .ok();
        Self {
            level: AtomicU8::new(parts.level.index() as u8),
            formatter: RwLock::new(parts.formatter),
            output: Mutex::new(parts.output),
            hooks: RwLock::new(Vec::new()),
            exit: parts.exit,
            metrics: parts.metrics,
            logs_total,
            upstream: parts.upstream,
            diagnostics: parts.diagnostics,
        }
    }

    fn level(&self) -> LogLevel {
        LogLevel::from_index(self.level.load(Ordering::Relaxed))
    }

    fn counters_for(&self, component: &str) -> Arc<LevelCounters> {
        Arc::new(LogLevel::ALL.map(|level| {
            self.logs_total
                .as_ref()
                .and_then(|vec| vec.with_label_values(&[component, level.as_str()]).ok())
        }))
    }

    fn dispatch(&self, record: &LogRecord) {
        // Hooks may block; fire them from a snapshot rather than under the lock.
        let hooks = self.hooks.read().clone();
        for hook in hooks.iter().filter(|hook| hook.accepts(record.level)) {
            hook.fire(record);
        }
        let line = self.formatter.read().format(record);
        let mut output = self.output.lock();
        if let Err(err) = writeln!(output, "{line}").and_then(|()| output.flush()) {
            self.diagnostics
                .report(format!("logger: failed to write output: {err}"));
        }
    }
}

/// Handle for emitting structured log records.
#[derive(Clone)]
pub struct Logger {
    core: Arc<LoggerCore>,
    fields: Arc<Fields>,
    counters: Arc<LevelCounters>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Root logger at `info`, writing text lines to stderr.
    pub fn new() -> Self {
        Self::from_parts(CoreParts::default())
    }

    pub fn builder() -> crate::config::LoggerBuilder {
        crate::config::LoggerBuilder::new()
    }

    /// Root logger configured from `LOG_LEVEL`, `LOG_COLOR`, `LOG_FORMAT` and
    /// `LOG_UPSTREAM`.
    pub fn from_env() -> Result<Self, crate::config::ConfigError> {
        crate::config::LoggerBuilder::from_env()?.build()
    }

    pub(crate) fn from_parts(parts: CoreParts) -> Self {
        let core = Arc::new(LoggerCore::new(parts));
        let counters = core.counters_for(ROOT_COMPONENT);
        Self {
            core,
            fields: Arc::new(Fields::new()),
            counters,
        }
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn component(&self) -> Option<String> {
        self.fields.get(LABEL_COMPONENT).map(value_to_text)
    }

    pub fn level(&self) -> LogLevel {
        self.core.level()
    }

    pub fn set_level(&self, level: LogLevel) {
        self.core.level.store(level.index() as u8, Ordering::Relaxed);
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level.is_enabled_for(self.level())
    }

    pub fn set_formatter<F>(&self, formatter: F)
    where
        F: Formatter + 'static,
    {
        *self.core.formatter.write() = SharedFormatter::new(formatter);
    }

    pub fn set_output<W>(&self, output: W)
    where
        W: Write + Send + 'static,
    {
        *self.core.output.lock() = Box::new(output);
    }

    /// Append to `path`, creating it if needed.
    pub fn set_output_file(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        self.set_output(file);
        Ok(())
    }

    pub fn add_hook<H>(&self, hook: H)
    where
        H: Hook + 'static,
    {
        self.add_shared_hook(Arc::new(hook));
    }

    pub fn add_shared_hook(&self, hook: Arc<dyn Hook>) {
        self.core.hooks.write().push(hook);
    }

    /// Forward records to the collector at `endpoint`.
    ///
    /// Loopback addresses get an unbuffered hook. Anything else gets a
    /// buffered hook whose worker is stopped by the exit chain; its shutdown
    /// handle is returned.
    pub fn set_upstream_endpoint(
        &self,
        endpoint: &str,
    ) -> Result<Option<ShutdownHandle>, UpstreamError> {
        let hook = upstream::hook_for_endpoint(endpoint, self.core.upstream.clone())?;
        Ok(self.set_upstream_hook(hook))
    }

    pub(crate) fn set_upstream_hook(&self, hook: UpstreamHook) -> Option<ShutdownHandle> {
        let handle = hook.shutdown_handle();
        if let UpstreamHook::Buffered(buffered) = &hook {
            self.core.exit.register(buffered.exit_handler());
        }
        self.add_hook(hook);
        handle
    }

    /// Settings used for hooks created by
    /// [`set_upstream_endpoint`](Self::set_upstream_endpoint).
    pub fn upstream_config(&self) -> &UpstreamConfig {
        &self.core.upstream
    }

    /// Run `handler` on exit, ahead of every handler registered so far.
    pub fn at_exit<F>(&self, handler: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.core.exit.defer(handler);
    }

    pub fn exit_coordinator(&self) -> Arc<ExitCoordinator> {
        Arc::clone(&self.core.exit)
    }

    /// Run the exit chain and terminate the process.
    pub fn exit(&self, code: i32) -> ! {
        self.core.exit.exit(code)
    }

    /// Registry holding this logger's counters.
    pub fn metrics(&self) -> &MetricFactory {
        &self.core.metrics
    }

    /// Sub-logger with `key` set. Setting `component` also moves the
    /// sub-logger's counts to that component.
    pub fn with_field(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut fields = Fields::new();
        fields.insert(key.into(), value.into());
        self.with_fields(fields)
    }

    pub fn with_fields(&self, fields: Fields) -> Self {
        let counters = match fields.get(LABEL_COMPONENT) {
            Some(component) => self.core.counters_for(&value_to_text(component)),
            None => Arc::clone(&self.counters),
        };
        let mut merged = (*self.fields).clone();
        merged.extend(fields);
        Self {
            core: Arc::clone(&self.core),
            fields: Arc::new(merged),
            counters,
        }
    }

    /// Emit `message` at `level`.
    ///
    /// Unlike [`panic`](Self::panic) and [`fatal`](Self::fatal) this only
    /// records the event; the caller keeps running.
    pub fn log(&self, level: LogLevel, message: impl fmt::Display) {
        self.emit(level, message, None);
    }

    /// Emit `message` with `extra` merged over this logger's fields for this
    /// record only. A `component` in `extra` does not move the count.
    pub(crate) fn log_with_fields(&self, level: LogLevel, message: impl fmt::Display, extra: &Fields) {
        self.emit(level, message, Some(extra));
    }

    /// Emit `err` at `level`, merging the error's fields over the logger's.
    pub fn log_error(&self, level: LogLevel, err: &StructuredError) {
        self.log_with_fields(level, err.inner(), err.fields());
    }

    /// Emit at `panic` and then panic with the message.
    pub fn panic(&self, message: impl fmt::Display) -> ! {
        let message = message.to_string();
        self.emit(LogLevel::Panic, &message, None);
        panic!("{message}")
    }

    /// Emit at `fatal`, run the exit chain and exit with status 1.
    pub fn fatal(&self, message: impl fmt::Display) -> ! {
        self.emit(LogLevel::Fatal, message, None);
        self.exit(1)
    }

    pub fn error(&self, message: impl fmt::Display) {
        self.log(LogLevel::Error, message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        self.log(LogLevel::Warn, message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.log(LogLevel::Debug, message);
    }

    pub fn trace(&self, message: impl fmt::Display) {
        self.log(LogLevel::Trace, message);
    }

    /// Render `message` with the logger's context, e.g.
    /// `[Engine] dirname=test starting`.
    pub fn sprint(&self, message: impl fmt::Display) -> String {
        sprint_with(&self.fields, &message.to_string())
    }

    /// Error carrying this logger's fields and `message`.
    pub fn eprint(&self, message: impl fmt::Display) -> StructuredError {
        StructuredError::new(&self.fields, message.to_string())
    }

    /// Wrap `err` with this logger's fields.
    pub fn ewrap<E>(&self, err: E) -> StructuredError
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        StructuredError::new(&self.fields, err)
    }

    /// `io::Write` adapter that logs every write at `level`.
    pub fn writer(&self, level: LogLevel) -> LogWriter {
        LogWriter::new(self.clone(), level)
    }

    fn emit(&self, level: LogLevel, message: impl fmt::Display, extra: Option<&Fields>) {
        if let Some(counter) = &self.counters[level.index()] {
            counter.inc();
        }
        if !self.is_enabled(level) {
            return;
        }
        let fields = match extra {
            Some(extra) if !extra.is_empty() => {
                let mut merged = (*self.fields).clone();
                merged.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
                merged
            }
            _ => (*self.fields).clone(),
        };
        self.core
            .dispatch(&LogRecord::with_fields(level, message.to_string(), fields));
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("fields", &self.fields)
            .finish()
    }
}

/// `[component] k=v message`, leaving out whichever parts are empty.
pub(crate) fn sprint_with(fields: &Fields, message: &str) -> String {
    let mut parts = Vec::with_capacity(3);
    if let Some(component) = fields.get(LABEL_COMPONENT) {
        parts.push(format!("[{}]", value_to_text(component)));
    }
    let formatted = format_fields(fields);
    if !formatted.is_empty() {
        parts.push(formatted);
    }
    if !message.is_empty() {
        parts.push(message.to_owned());
    }
    parts.join(" ")
}
