//! Log record representation.
//!
//! A [`LogRecord`] captures a single log event: when it happened, how severe
//! it is, the message, and the structured fields inherited from the logger
//! that produced it. Records are built once on the calling thread and are
//! never mutated after being handed to hooks or formatters.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::level::LogLevel;

/// Field naming the component that emitted a record.
pub const LABEL_COMPONENT: &str = "component";

/// Structured key/value pairs attached to a record, ordered by key.
pub type Fields = BTreeMap<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub struct LogRecord {
    /// Time the record was created.
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub fields: Fields,
}

impl LogRecord {
    /// Construct a record stamped with the current time and no fields.
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            fields: Fields::new(),
        }
    }

    /// Construct a record carrying the given fields.
    pub fn with_fields(level: LogLevel, message: impl Into<String>, fields: Fields) -> Self {
        Self {
            fields,
            ..Self::new(level, message)
        }
    }

    /// Replace the timestamp; used where the event time is known upfront.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The `component` field rendered as text, if present.
    pub fn component(&self) -> Option<String> {
        self.fields.get(LABEL_COMPONENT).map(value_to_text)
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.level, self.message)
    }
}

/// Render a field value the way it reads in text output: strings verbatim,
/// everything else as compact JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
