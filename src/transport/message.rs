//! Wire protocol between bus clients and the broker.
//!
//! Every WebSocket text frame carries one JSON object tagged by `type`.
//! Payloads are opaque strings; the status topics put JSON text in them.

use serde::{Deserialize, Serialize};

/// Connection accepted.
pub const CONNACK_ACCEPTED: u8 = 0;
/// Empty or otherwise unusable client identifier.
pub const CONNACK_IDENTIFIER_REJECTED: u8 = 2;

/// Message the broker publishes on a client's behalf when its connection
/// ends without a `disconnect`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Will {
    pub topic: String,
    pub payload: String,
    #[serde(default)]
    pub retain: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "connect")]
    Connect {
        client_id: String,
        will: Option<Will>,
    },
    #[serde(rename = "subscribe")]
    Subscribe { topic: String },
    #[serde(rename = "unsubscribe")]
    Unsubscribe { topic: String },
    #[serde(rename = "publish")]
    Publish {
        topic: String,
        payload: String,
        #[serde(default)]
        retain: bool,
    },
    #[serde(rename = "disconnect")]
    Disconnect {},
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "conn_ack")]
    ConnAck { return_code: u8 },
    #[serde(rename = "message")]
    Message {
        topic: String,
        payload: String,
        timestamp: i64,
    },
    #[serde(rename = "error")]
    Error { message: String },
}
