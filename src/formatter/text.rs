//! Key/value text layout.

use std::fmt::Write as _;

use super::{Formatter, format_timestamp};
use crate::log_record::{Fields, LABEL_COMPONENT, LogRecord, value_to_text};

/// Formats records as `time="..." level=info msg="..." key=value`.
///
/// Fields follow the three fixed keys in key order. Values containing
/// anything outside `[A-Za-z0-9-._/@^+]` are quoted and escaped.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let mut out = String::with_capacity(64 + record.message.len());
        append_pair(&mut out, "time", &format_timestamp(&record.timestamp));
        out.push(' ');
        append_pair(&mut out, "level", record.level.as_str());
        out.push(' ');
        append_pair(&mut out, "msg", &record.message);
        for (key, value) in &record.fields {
            out.push(' ');
            match key.as_str() {
                "time" | "level" | "msg" => {
                    append_pair(&mut out, &format!("fields.{key}"), &value_to_text(value))
                }
                _ => append_pair(&mut out, key, &value_to_text(value)),
            }
        }
        out
    }
}

fn append_pair(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push('=');
    if needs_quoting(value) {
        out.push_str(&quote(value));
    } else {
        out.push_str(value);
    }
}

fn needs_quoting(text: &str) -> bool {
    !text.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '.' | '_' | '/' | '@' | '^' | '+')
    })
}

fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{text}\""))
}

/// Format every field except `component` as `key=value`, sorted by key.
///
/// Values containing a space are wrapped in double quotes with `\` and `"`
/// escaped, e.g. `name=Foo action="bar 1"`.
pub fn format_fields(fields: &Fields) -> String {
    let mut out = String::new();
    for (key, value) in fields {
        if key == LABEL_COMPONENT {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        let text = value_to_text(value);
        if text.contains(' ') {
            let escaped = text.replace('\\', "\\\\").replace('"', "\\\"");
            let _ = write!(out, "{key}=\"{escaped}\"");
        } else {
            let _ = write!(out, "{key}={text}");
        }
    }
    out
}
