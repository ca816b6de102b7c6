//! Wire encoding for upstream collectors: one JSON object per line.

use crate::{formatter::JsonFormatter, level::LogLevel, log_record::LogRecord};

/// A record already encoded for the wire, waiting in the buffered queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct QueuedLine {
    pub(crate) level: LogLevel,
    pub(crate) line: String,
}

/// Encode `record` without its trailing newline. `Ok(None)` means there is
/// nothing to send.
pub(crate) fn serialise_record(record: &LogRecord) -> serde_json::Result<Option<QueuedLine>> {
    let encoded = JsonFormatter.try_format(record)?;
    let line = encoded.trim_end_matches('\n');
    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(QueuedLine {
        level: record.level,
        line: line.to_owned(),
    }))
}
