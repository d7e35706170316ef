//! Inbound frames and the queue that carries them from the network thread to
//! the tick thread.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::bus::error::FrameError;

/// Decoded payload handed to topic handlers.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// One inbound message: a topic and its raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Items produced by the network side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Frame(Frame),
    /// The session numbered `session` ended.
    Disconnected { session: u64 },
}

/// Producer half of the inbound queue. Cheap to clone, never blocks.
#[derive(Debug, Clone)]
pub struct InboundSender {
    tx: UnboundedSender<Inbound>,
}

impl InboundSender {
    /// Enqueues a frame regardless of topic; routing happens on the tick side.
    pub fn on_inbound_frame(&self, frame: Frame) {
        let _ = self.tx.send(Inbound::Frame(frame));
    }

    pub fn on_disconnect(&self, session: u64) {
        let _ = self.tx.send(Inbound::Disconnected { session });
    }
}

/// Consumer half of the inbound queue.
#[derive(Debug)]
pub struct InboundQueue {
    rx: UnboundedReceiver<Inbound>,
}

impl InboundQueue {
    /// Takes the oldest item, if any.
    pub fn pop(&mut self) -> Option<Inbound> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Creates a connected sender/queue pair.
pub fn inbound_queue() -> (InboundSender, InboundQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InboundSender { tx }, InboundQueue { rx })
}

/// UTF-8 text → JSON → object.
pub fn decode(payload: &[u8]) -> Result<JsonObject, FrameError> {
    let text = std::str::from_utf8(payload)?;
    match serde_json::from_str::<serde_json::Value>(text)? {
        serde_json::Value::Object(object) => Ok(object),
        _ => Err(FrameError::NotAnObject),
    }
}

/// Fetches a required string field from a decoded payload.
pub fn required_str<'a>(object: &'a JsonObject, key: &str) -> Result<&'a str, FrameError> {
    object
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| FrameError::MissingField(key.to_string()))
}
