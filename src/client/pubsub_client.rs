//! Broker-side client representation
//!
//! `Client` models one WebSocket connection to the broker. It holds the
//! sending side of the per-connection channel, the identity announced in
//! `connect`, and the last-will registered with it.

use tokio::sync::mpsc::UnboundedSender;
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::transport::message::{ServerMessage, Will};

#[derive(Debug)]
pub struct Client {
    /// Connection id, unique per socket.
    pub id: String,
    pub sender: UnboundedSender<WsMessage>,
    /// Identity from `connect`; `None` until the client has connected.
    pub client_id: Option<String>,
    pub will: Option<Will>,
}

impl Client {
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id: format!("conn-{}", Uuid::new_v4()),
            sender,
            client_id: None,
            will: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.client_id.is_some()
    }

    /// Queues `msg` for the connection. Returns false if the send loop is gone.
    pub fn send(&self, msg: &ServerMessage) -> bool {
        match serde_json::to_string(msg) {
            Ok(json) => self.sender.send(WsMessage::text(json)).is_ok(),
            Err(e) => {
                tracing::error!("Failed to serialize message for {}: {e}", self.id);
                false
            }
        }
    }
}
