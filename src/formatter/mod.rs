//! Formatter implementations.
//!
//! Provides the core [`Formatter`] trait, a cloneable [`SharedFormatter`]
//! wrapper, and the three built-in layouts: [`JsonFormatter`] (the upstream
//! wire format), [`TextFormatter`] (logfmt-style key/value lines), and
//! [`ConsoleFormatter`] (coloured terminal output).

use std::{fmt, sync::Arc};

use chrono::{DateTime, SecondsFormat, TimeZone};

use crate::log_record::LogRecord;

mod console;
mod json;
mod text;

pub use console::ConsoleFormatter;
pub use json::JsonFormatter;
pub use text::{TextFormatter, format_fields};

/// Trait for formatting log records into strings.
///
/// Implementors must be thread-safe (`Send + Sync`) so a formatter can be
/// shared between every clone of a logger.
pub trait Formatter: Send + Sync {
    /// Format a log record into a single line without a trailing newline.
    fn format(&self, record: &LogRecord) -> String;
}

/// Shared formatter trait object used by loggers and builders.
#[derive(Clone)]
pub struct SharedFormatter {
    inner: Arc<dyn Formatter>,
}

impl SharedFormatter {
    /// Create a shared formatter from an owned formatter implementation.
    pub fn new<F>(formatter: F) -> Self
    where
        F: Formatter + 'static,
    {
        Self {
            inner: Arc::new(formatter),
        }
    }

    /// Format a log record using the wrapped formatter instance.
    pub fn format(&self, record: &LogRecord) -> String {
        self.inner.format(record)
    }
}

impl fmt::Debug for SharedFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedFormatter(<dyn Formatter>)")
    }
}

impl Formatter for SharedFormatter {
    fn format(&self, record: &LogRecord) -> String {
        self.inner.format(record)
    }
}

/// RFC 3339 with millisecond precision, e.g. `2021-03-04T05:06:07.089Z`.
pub fn format_timestamp<Tz>(timestamp: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use static_assertions::assert_impl_all;

    #[test]
    fn shared_formatter_is_send_sync() {
        assert_impl_all!(SharedFormatter: Send, Sync);
    }

    #[test]
    fn timestamps_carry_milliseconds() {
        let ts = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap()
            + chrono::Duration::milliseconds(89);
        assert_eq!(format_timestamp(&ts), "2021-03-04T05:06:07.089Z");
    }
}
