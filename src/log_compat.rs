//! Compatibility bridge for the Rust `log` crate.
//!
//! [`LogBridge`] implements `log::Log` and forwards records to a [`Logger`],
//! using each record's target as the `component` field so that counts and
//! hook output are attributed to the module that logged.

use std::{borrow::Cow, collections::HashMap};

use log::{Metadata, Record, SetLoggerError};
use parking_lot::RwLock;

use crate::{level::LogLevel, log_record::LABEL_COMPONENT, logger::Logger};

/// Adapter implementing the Rust `log::Log` trait.
pub struct LogBridge {
    logger: Logger,
    // Sub-logger per target so counters are resolved once.
    targets: RwLock<HashMap<String, Logger>>,
}

impl LogBridge {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            targets: RwLock::new(HashMap::new()),
        }
    }

    fn logger_for(&self, target: &str) -> Logger {
        if target.is_empty() {
            return self.logger.clone();
        }
        let component = normalise_target(target);
        if let Some(logger) = self.targets.read().get(component.as_ref()) {
            return logger.clone();
        }
        self.targets
            .write()
            .entry(component.into_owned())
            .or_insert_with_key(|component| {
                self.logger.with_field(LABEL_COMPONENT, component.as_str())
            })
            .clone()
    }
}

fn normalise_target(target: &str) -> Cow<'_, str> {
    if target.contains("::") {
        Cow::Owned(target.replace("::", "."))
    } else {
        Cow::Borrowed(target)
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.logger.is_enabled(LogLevel::from(metadata.level()))
    }

    fn log(&self, record: &Record<'_>) {
        // Disabled records still reach the logger so they are counted.
        self.logger_for(record.target())
            .log(LogLevel::from(record.level()), record.args());
    }

    fn flush(&self) {}
}

/// Install `logger` as the global `log` logger.
///
/// Fails if another global logger is already set. The `log` crate's max level
/// is set to `trace` so the logger's own threshold decides what is written.
pub fn install(logger: Logger) -> Result<(), SetLoggerError> {
    log::set_boxed_logger(Box::new(LogBridge::new(logger)))?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
