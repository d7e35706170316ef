//! Shared plumbing: logging initialisation, the log sink registry that lets
//! components observe every log record in the process, and timestamp helpers.

pub mod logging;
pub mod sink;
pub mod time;

pub use sink::{LogEvent, LogSink, LogSinks};

#[cfg(test)]
mod tests {
    use super::logging;
    use super::sink::{LogEvent, LogSink, LogSinks};
    use std::sync::{Arc, Mutex};
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<LogEvent>>,
    }

    impl LogSink for Recorder {
        fn emit(&self, event: &LogEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn logging_init_accepts_levels() {
        // Should not panic
        logging::init("info", LogSinks::new());
        logging::init("debug", LogSinks::new());
        logging::init("warn", LogSinks::new());
    }

    #[test]
    fn iso_timestamps_carry_milliseconds() {
        use chrono::TimeZone;
        let t = chrono::Utc
            .with_ymd_and_hms(2024, 5, 1, 12, 0, 0)
            .unwrap()
            + chrono::Duration::milliseconds(123);
        let text = super::time::iso_millis(&t);
        assert_eq!(text, "2024-05-01T12:00:00.123+00:00");
        assert_eq!(super::time::parse_iso(&text), Some(t));
        assert_eq!(super::time::parse_iso("yesterday"), None);
    }

    #[test]
    fn parse_level_defaults_to_info() {
        assert_eq!(logging::parse_level("WARNING"), Level::WARN);
        assert_eq!(logging::parse_level("error"), Level::ERROR);
        assert_eq!(logging::parse_level("bogus"), Level::INFO);
    }

    #[test]
    fn sinks_receive_structured_events() {
        let sinks = LogSinks::new();
        let recorder = Arc::new(Recorder::default());
        sinks.register(recorder.clone());
        assert_eq!(sinks.len(), 1);

        let subscriber = tracing_subscriber::registry().with(sinks);
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(target: "sfp", "SFP disconnected");
            tracing::error!(target: "mqtt", code = 5, "Broker refused connection");
        });

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            LogEvent::new(Level::WARN, "sfp", "SFP disconnected")
        );
        assert_eq!(events[1].level, Level::ERROR);
        assert_eq!(events[1].message, "Broker refused connection code=5");
    }
}
