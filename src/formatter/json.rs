//! JSON layout shared by file output and upstream forwarding.

use std::collections::BTreeMap;

use serde_json::Value;

use super::{Formatter, format_timestamp};
use crate::log_record::LogRecord;

const KEY_TIME: &str = "timestamp";
const KEY_LEVEL: &str = "level";
const KEY_MESSAGE: &str = "message";

/// Formats records as a single JSON object per line.
///
/// Keys are sorted. Fields clashing with `timestamp`, `level` or `message`
/// are renamed to `fields.<key>` so the reserved keys always hold record data.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    /// Serialise `record`, surfacing encoder failures to the caller.
    pub fn try_format(&self, record: &LogRecord) -> serde_json::Result<String> {
        let mut object: BTreeMap<String, &Value> = BTreeMap::new();
        for (key, value) in &record.fields {
            match key.as_str() {
                KEY_TIME | KEY_LEVEL | KEY_MESSAGE => {
                    object.insert(format!("fields.{key}"), value);
                }
                _ => {
                    object.insert(key.clone(), value);
                }
            }
        }
        let timestamp = Value::String(format_timestamp(&record.timestamp));
        let level = Value::String(record.level.as_str().to_owned());
        let message = Value::String(record.message.clone());
        object.insert(KEY_TIME.to_owned(), &timestamp);
        object.insert(KEY_LEVEL.to_owned(), &level);
        object.insert(KEY_MESSAGE.to_owned(), &message);
        serde_json::to_string(&object)
    }
}

impl Formatter for JsonFormatter {
    /// Returns an empty string when the record cannot be encoded; callers
    /// skip empty lines.
    fn format(&self, record: &LogRecord) -> String {
        self.try_format(record).unwrap_or_default()
    }
}
