//! In-process stand-ins for the network side, shared by unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::bus::error::BusError;
use crate::bus::frame::{InboundSender, inbound_queue};
use crate::bus::network::{ConnAck, ConnectRequest, Network};
use crate::bus::MessageBus;
use crate::transport::message::ClientMessage;
use crate::utils::sink::{LogEvent, LogSink, LogSinks};

/// What the fake network has seen.
#[derive(Debug, Default)]
pub struct Wire {
    pub connects: Vec<ConnectRequest>,
    pub sent: Vec<ClientMessage>,
    /// Scripted connect outcomes; an empty script accepts.
    pub script: VecDeque<Result<ConnAck, BusError>>,
}

impl Wire {
    pub fn published(&self) -> Vec<(String, String, bool)> {
        self.sent
            .iter()
            .filter_map(|m| match m {
                ClientMessage::Publish {
                    topic,
                    payload,
                    retain,
                } => Some((topic.clone(), payload.clone(), *retain)),
                _ => None,
            })
            .collect()
    }

    pub fn published_on(&self, topic: &str) -> Vec<String> {
        self.published()
            .into_iter()
            .filter(|(t, _, _)| t == topic)
            .map(|(_, p, _)| p)
            .collect()
    }

    pub fn subscriptions(&self) -> Vec<String> {
        self.sent
            .iter()
            .filter_map(|m| match m {
                ClientMessage::Subscribe { topic } => Some(topic.clone()),
                _ => None,
            })
            .collect()
    }
}

pub struct LoopbackNetwork {
    pub wire: Arc<Mutex<Wire>>,
}

impl Network for LoopbackNetwork {
    fn connect(&mut self, request: ConnectRequest) -> Result<ConnAck, BusError> {
        let mut wire = self.wire.lock().unwrap();
        wire.connects.push(request);
        wire.script
            .pop_front()
            .unwrap_or(Ok(ConnAck { return_code: 0 }))
    }

    fn send(&mut self, msg: ClientMessage) -> Result<(), BusError> {
        self.wire.lock().unwrap().sent.push(msg);
        Ok(())
    }
}

/// A bus wired to a loopback network: returns the bus, the wire it writes
/// to, and the producer half of its inbound queue.
pub fn loopback_bus<C>() -> (MessageBus<C>, Arc<Mutex<Wire>>, InboundSender) {
    let (sender, queue) = inbound_queue();
    let wire = Arc::new(Mutex::new(Wire::default()));
    let network = LoopbackNetwork { wire: wire.clone() };
    let bus = MessageBus::new(Box::new(network), queue, Duration::from_millis(50));
    (bus, wire, sender)
}

/// Records every log event seen while installed.
#[derive(Default)]
pub struct Recorder {
    pub events: Mutex<Vec<LogEvent>>,
}

impl LogSink for Recorder {
    fn emit(&self, event: &LogEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

impl Recorder {
    pub fn at(&self, level: tracing::Level) -> Vec<LogEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }
}

/// Runs `f` with a scoped subscriber feeding a `Recorder`.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, Arc<Recorder>) {
    use tracing_subscriber::layer::SubscriberExt;

    let recorder = Arc::new(Recorder::default());
    let sinks = LogSinks::new();
    sinks.register(recorder.clone());
    let subscriber = tracing_subscriber::registry().with(sinks);
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, recorder)
}
