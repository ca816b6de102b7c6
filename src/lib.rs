//! Structured logging with forwarding to a remote collector.
//!
//! A [`Logger`] writes formatted lines to its output and fires attached
//! [`Hook`]s. The [`upstream`] hooks forward records as JSON lines over TCP,
//! either from a buffered worker thread or directly on the calling thread for
//! loopback collectors. Log calls are counted per component and level in a
//! [`metrics`] registry.

mod logging_macros;
pub mod config;
mod diagnostics;
mod exit;
pub mod formatter;
mod hook;
mod level;
mod log_record;
mod logger;
pub mod metrics;
mod rate_limited_warner;
mod structured_error;
pub mod upstream;

#[cfg(feature = "log-compat")]
pub mod log_compat;
#[cfg(feature = "tracing-compat")]
pub mod tracing_compat;

#[cfg(test)]
mod test_utils;

pub use config::{ColorMode, ConfigError, LoggerBuilder, LoggerConfig, OutputFormat};
pub use diagnostics::{DiagnosticSink, Diagnostics, StderrSink};
pub use exit::ExitCoordinator;
pub use formatter::{Formatter, SharedFormatter};
pub use hook::Hook;
pub use level::{LevelParseError, LogLevel};
pub use log_record::{Fields, LABEL_COMPONENT, LogRecord};
pub use logger::{LOGS_TOTAL, LogWriter, Logger, ROOT_COMPONENT};
pub use rate_limited_warner::{DEFAULT_WARN_INTERVAL, RateLimitedWarner};
pub use structured_error::{LABEL_ERROR_COMPONENT, StructuredError};
pub use upstream::{
    BufferedUpstreamHook, OverflowPolicy, RetryInterval, ShutdownHandle, UnbufferedUpstreamHook,
    UpstreamConfig, UpstreamEndpoint, UpstreamError, UpstreamHook,
};
