//! Log sinks
//!
//! `LogSinks` is a `tracing_subscriber` layer holding a list of registered
//! observers. Every log record produced anywhere in the process is turned
//! into a `LogEvent` and handed to each sink through `LogSink::emit`.
//!
//! Sinks are called on whatever thread produced the record, so an
//! implementation should only hand the event off (e.g. push it on a channel).

use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

/// One structured log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub level: Level,
    pub target: String,
    pub message: String,
}

impl LogEvent {
    pub fn new(level: Level, target: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            target: target.into(),
            message: message.into(),
        }
    }
}

/// Receiver of log records.
pub trait LogSink: Send + Sync {
    fn emit(&self, event: &LogEvent);
}

/// Registry of sinks, usable as a tracing layer.
#[derive(Clone, Default)]
pub struct LogSinks {
    sinks: Arc<RwLock<Vec<Arc<dyn LogSink>>>>,
}

impl LogSinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, sink: Arc<dyn LogSink>) {
        let mut sinks = match self.sinks.write() {
            Ok(sinks) => sinks,
            Err(poisoned) => poisoned.into_inner(),
        };
        sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        match self.sinks.read() {
            Ok(sinks) => sinks.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hands `event` to every registered sink.
    pub fn dispatch(&self, event: &LogEvent) {
        let sinks = match self.sinks.read() {
            Ok(sinks) => sinks,
            Err(poisoned) => poisoned.into_inner(),
        };
        for sink in sinks.iter() {
            sink.emit(event);
        }
    }
}

impl fmt::Debug for LogSinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSinks")
            .field("sinks", &self.len())
            .finish()
    }
}

impl<S: Subscriber> Layer<S> for LogSinks {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if self.is_empty() {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let metadata = event.metadata();
        self.dispatch(&LogEvent {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message: visitor.finish(),
        });
    }
}

/// Collects the `message` field plus any structured fields as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.join(" ")
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}
