//! Bridge from `tracing` events to a [`Logger`].

use std::{collections::HashMap, fmt, sync::Arc};

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{Layer, layer::Context};

use crate::{
    level::LogLevel,
    log_record::{Fields, LABEL_COMPONENT, value_to_text},
    logger::Logger,
};

/// `tracing_subscriber` layer that logs every event through a [`Logger`].
///
/// The event's `message` becomes the record message and its other fields
/// become record fields. Events without a `component` field are attributed
/// to their target.
#[derive(Clone, Debug)]
pub struct LoggerLayer {
    logger: Logger,
    // Sub-logger per component so counters are resolved once.
    components: Arc<RwLock<HashMap<String, Logger>>>,
}

impl LoggerLayer {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            components: Arc::default(),
        }
    }

    fn logger_for(&self, component: &str) -> Logger {
        if let Some(logger) = self.components.read().get(component) {
            return logger.clone();
        }
        self.components
            .write()
            .entry(component.to_owned())
            .or_insert_with_key(|component| {
                self.logger.with_field(LABEL_COMPONENT, component.as_str())
            })
            .clone()
    }
}

impl<S> Layer<S> for LoggerLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        let mut fields = visitor.fields;
        let component = match fields.remove(LABEL_COMPONENT) {
            Some(value) => value_to_text(&value),
            None => metadata.target().to_owned(),
        };
        self.logger_for(&component).log_with_fields(
            map_level(*metadata.level()),
            visitor.message,
            &fields,
        );
    }
}

fn map_level(level: Level) -> LogLevel {
    if level == Level::ERROR {
        LogLevel::Error
    } else if level == Level::WARN {
        LogLevel::Warn
    } else if level == Level::INFO {
        LogLevel::Info
    } else if level == Level::DEBUG {
        LogLevel::Debug
    } else {
        LogLevel::Trace
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    fields: Fields,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
        } else {
            self.fields.insert(field.name().to_owned(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::from(format!("{value:?}")));
    }
}
