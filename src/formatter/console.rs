//! Coloured console layout with a plain-text fallback.

use chrono::Local;

use super::{Formatter, SharedFormatter, format_fields, format_timestamp};
use crate::{
    level::LogLevel,
    log_record::{LABEL_COMPONENT, LogRecord, value_to_text},
};

const SHORT_TIMESTAMP: &str = "%H:%M:%S%.3f";

const ANSI_RESET: &str = "\x1b[0m";
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_DIMMED: &str = "\x1b[2m";
const ANSI_ITALIC: &str = "\x1b[3m";
const ANSI_UNDERLINE: &str = "\x1b[4m";
const ANSI_RED: &str = "\x1b[31m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_MAGENTA: &str = "\x1b[35m";
const ANSI_WHITE: &str = "\x1b[37m";

/// Human-oriented formatter for terminals.
///
/// When `colored` is false the formatter delegates to `fallback`, or to a
/// built-in layout such as
/// `2020-07-10T17:44:36.286+03:00 INFO  [Engine] starting dirname=test`.
#[derive(Clone, Debug)]
pub struct ConsoleFormatter {
    colored: bool,
    fallback: Option<SharedFormatter>,
}

impl ConsoleFormatter {
    pub fn new(colored: bool, fallback: Option<SharedFormatter>) -> Self {
        Self { colored, fallback }
    }

    pub fn is_colored(&self) -> bool {
        self.colored
    }

    fn format_plain(&self, record: &LogRecord) -> String {
        let component = record
            .component()
            .map(|c| format!(" [{c}]"))
            .unwrap_or_default();
        let mut tail = format_fields(&record.fields);
        if !tail.is_empty() {
            tail.insert(0, ' ');
        }
        let timestamp = format_timestamp(&record.timestamp.with_timezone(&Local));
        format!(
            "{timestamp:<29} {:<5}{component} {}{tail}",
            level_label(record.level),
            record.message
        )
    }

    fn format_colored(&self, record: &LogRecord) -> String {
        let color = level_color(record.level);
        let local = record.timestamp.with_timezone(&Local);
        let head = format!(
            "{:<12} {:<5}",
            local.format(SHORT_TIMESTAMP).to_string(),
            level_label(record.level)
        );
        let mut out = ansi(&head, &[color, ANSI_BOLD]);
        if let Some(component) = record.component() {
            out.push(' ');
            out.push_str(&ansi(&component, &[color, ANSI_UNDERLINE]));
        }
        out.push(' ');
        out.push_str(&ansi(&record.message, &[color]));
        for (key, value) in &record.fields {
            if key == LABEL_COMPONENT {
                continue;
            }
            out.push(' ');
            out.push_str(&ansi(&format!("{key}="), &[color, ANSI_ITALIC, ANSI_DIMMED]));
            out.push_str(&ansi(&value_to_text(value), &[color, ANSI_ITALIC]));
        }
        out
    }
}

impl Formatter for ConsoleFormatter {
    fn format(&self, record: &LogRecord) -> String {
        if self.colored {
            return self.format_colored(record);
        }
        match &self.fallback {
            Some(fallback) => fallback.format(record),
            None => self.format_plain(record),
        }
    }
}

fn level_label(level: LogLevel) -> String {
    level.as_str().to_ascii_uppercase()
}

fn level_color(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace | LogLevel::Debug => ANSI_WHITE,
        LogLevel::Info => ANSI_YELLOW,
        LogLevel::Warn => ANSI_MAGENTA,
        LogLevel::Error | LogLevel::Fatal | LogLevel::Panic => ANSI_RED,
    }
}

fn ansi(text: &str, formats: &[&str]) -> String {
    let mut out = formats.concat();
    out.push_str(text);
    out.push_str(ANSI_RESET);
    out
}
