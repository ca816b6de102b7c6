use crate::{level::LogLevel, log_record::LogRecord};

/// Sink attached to a [`Logger`](crate::Logger) that receives every record at
/// one of its [`levels`](Hook::levels).
///
/// `fire` is called on the logging thread before the record is written to the
/// logger's own output. Implementations must not report failures back to the
/// caller; anything that goes wrong belongs on a diagnostic channel.
pub trait Hook: Send + Sync {
    /// Levels this hook wants to see.
    fn levels(&self) -> &[LogLevel];

    fn fire(&self, record: &LogRecord);

    fn accepts(&self, level: LogLevel) -> bool {
        self.levels().contains(&level)
    }
}

impl<H: Hook + ?Sized> Hook for std::sync::Arc<H> {
    fn levels(&self) -> &[LogLevel] {
        (**self).levels()
    }

    fn fire(&self, record: &LogRecord) {
        (**self).fire(record)
    }
}
