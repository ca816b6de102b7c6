//! `io::Write` adapter over a [`Logger`].

use std::io;

use super::Logger;
use crate::level::LogLevel;

/// Logs each write as one record at a fixed level.
///
/// Invalid UTF-8 is replaced and a single trailing newline is dropped, so a
/// `writeln!` produces a record without an empty tail. Writing at `panic` or
/// `fatal` behaves like the matching [`Logger`] method.
#[derive(Clone, Debug)]
pub struct LogWriter {
    logger: Logger,
    level: LogLevel,
}

impl LogWriter {
    pub fn new(logger: Logger, level: LogLevel) -> Self {
        Self { logger, level }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }
}

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        let message = text.strip_suffix('\n').unwrap_or(&text);
        match self.level {
            LogLevel::Panic => self.logger.panic(message),
            LogLevel::Fatal => self.logger.fatal(message),
            level => self.logger.log(level, message),
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
