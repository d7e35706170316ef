//! Message bus
//!
//! `MessageBus` wraps the broker connection for a single-threaded, ticked
//! control loop:
//! - the network thread only enqueues inbound frames
//! - `tick()` takes at most one item off the queue, decodes it and calls the
//!   topic's handler, so a burst of traffic cannot starve other components
//! - `publish` is best-effort and at-most-once: while disconnected it is a
//!   silent no-op
//! - each topic has exactly one handler; registering twice, or removing a
//!   topic that was never registered, is a logic bug and panics
//!
//! Handlers receive a caller-chosen context `C` alongside the payload, which
//! lets the owner of the bus hand them its own state without sharing it.

pub mod error;
pub mod frame;
pub mod network;
pub mod registry;

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub use error::{BusError, FrameError, RegistryError};
pub use frame::{Frame, Inbound, InboundQueue, InboundSender, JsonObject, inbound_queue};
pub use network::{ConnAck, ConnectRequest, Network, WsNetwork};
pub use registry::{Handler, TopicRegistry};

use crate::config::UNKNOWN_MAC;
use crate::transport::message::{CONNACK_ACCEPTED, ClientMessage, Will};
use crate::utils::time::iso_millis;

/// Status topics shared by every node.
pub mod topics {
    pub const DISCOVERY: &str = "/status/discovery";
    pub const INFO: &str = "/status/info";
    pub const WARNINGS: &str = "/status/warnings";
    pub const ERRORS: &str = "/status/errors";
}

/// Who this node is on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub mac_address: String,
    pub node_name: String,
}

impl NodeIdentity {
    pub fn new(mac_address: impl Into<String>, node_name: impl Into<String>) -> Self {
        Self {
            mac_address: mac_address.into(),
            node_name: node_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryStatus {
    Connected,
    Disconnected,
}

/// Payload published on `/status/discovery`.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryPayload<'a> {
    pub mac_address: &'a str,
    pub node_name: &'a str,
    pub status: DiscoveryStatus,
    pub time: String,
}

impl<'a> DiscoveryPayload<'a> {
    pub fn new(identity: &'a NodeIdentity, status: DiscoveryStatus) -> Self {
        Self {
            mac_address: &identity.mac_address,
            node_name: &identity.node_name,
            status,
            time: iso_millis(&Utc::now()),
        }
    }
}

pub struct MessageBus<C> {
    network: Box<dyn Network>,
    inbound: InboundQueue,
    registry: TopicRegistry<C>,
    identity: Option<NodeIdentity>,
    broker: Option<(String, u16)>,
    connect_timeout: Duration,
    connected: bool,
    session: u64,
    instance: Uuid,
}

impl<C> MessageBus<C> {
    pub fn new(network: Box<dyn Network>, inbound: InboundQueue, connect_timeout: Duration) -> Self {
        Self {
            network,
            inbound,
            registry: TopicRegistry::new(),
            identity: None,
            broker: None,
            connect_timeout,
            connected: false,
            session: 0,
            instance: Uuid::new_v4(),
        }
    }

    /// Starts a WebSocket network thread and wraps it.
    pub fn over_websocket(connect_timeout: Duration) -> std::io::Result<Self> {
        let (sender, queue) = inbound_queue();
        let network = WsNetwork::start(sender)?;
        Ok(Self::new(Box::new(network), queue, connect_timeout))
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn identity(&self) -> Option<&NodeIdentity> {
        self.identity.as_ref()
    }

    pub fn pending(&self) -> usize {
        self.inbound.len()
    }

    pub fn registered_topics(&self) -> Vec<String> {
        self.registry.topics()
    }

    /// Opens a session with a last-will announcing this node as
    /// disconnected. Blocks for at most the connect timeout; failures are
    /// returned, never retried here.
    pub fn connect(&mut self, host: &str, port: u16, identity: &NodeIdentity) -> Result<(), BusError> {
        self.connected = false;
        self.session += 1;
        self.identity = Some(identity.clone());
        self.broker = Some((host.to_string(), port));

        let will = Will {
            topic: topics::DISCOVERY.to_string(),
            payload: serde_json::to_string(&DiscoveryPayload::new(
                identity,
                DiscoveryStatus::Disconnected,
            ))?,
            retain: true,
        };

        let ack = self.network.connect(ConnectRequest {
            host: host.to_string(),
            port,
            client_id: self.client_id(identity),
            will,
            timeout: self.connect_timeout,
            session: self.session,
        })?;
        self.on_connect_ack(ack)
    }

    /// The MAC address, or for nodes without one a per-process id, so that
    /// they do not take over each other's sessions.
    pub fn client_id(&self, identity: &NodeIdentity) -> String {
        if identity.mac_address == UNKNOWN_MAC {
            format!("{}-{}", identity.node_name, self.instance)
        } else {
            identity.mac_address.clone()
        }
    }

    /// Completes a session: announces the node and restores the broker-side
    /// subscriptions of every registered topic.
    pub fn on_connect_ack(&mut self, ack: ConnAck) -> Result<(), BusError> {
        if ack.return_code != CONNACK_ACCEPTED {
            self.connected = false;
            return Err(BusError::BrokerConnection {
                reason: format!("broker refused connection (return code {})", ack.return_code),
                return_code: Some(ack.return_code),
            });
        }

        self.connected = true;
        match &self.broker {
            Some((host, port)) => info!("Successfully connected to broker at {host}:{port}"),
            None => info!("Successfully connected to broker"),
        }

        if let Some(identity) = self.identity.clone() {
            let payload = DiscoveryPayload::new(&identity, DiscoveryStatus::Connected);
            if let Err(e) = self.send_json(topics::DISCOVERY, &payload, true) {
                warn!("Failed to announce connection: {e}");
            }
        }

        for topic in self.registry.topics() {
            if let Err(e) = self.network.send(ClientMessage::Subscribe {
                topic: topic.clone(),
            }) {
                error!("Failed to restore subscription to {topic}: {e}");
            }
        }
        Ok(())
    }

    /// Marks the bus disconnected. Reconnecting is up to the caller.
    pub fn on_disconnect(&mut self) {
        if self.connected {
            info!("Disconnected from broker");
        }
        self.connected = false;
    }

    /// Registers the single handler for `topic`.
    ///
    /// # Panics
    /// If `topic` already has a handler.
    pub fn subscribe<F>(&mut self, topic: &str, handler: F) -> Result<(), BusError>
    where
        F: FnMut(&mut C, &JsonObject) -> Result<(), FrameError> + 'static,
    {
        if self.registry.contains(topic) {
            panic!("{}", RegistryError::AlreadyRegistered(topic.to_string()));
        }

        if !self.connected {
            error!("Failed to subscribe to topic {topic}: not connected");
            return Err(BusError::Subscribe {
                topic: topic.to_string(),
                reason: "not connected".to_string(),
            });
        }

        if let Err(e) = self.network.send(ClientMessage::Subscribe {
            topic: topic.to_string(),
        }) {
            error!("Failed to subscribe to topic {topic}: {e}");
            return Err(BusError::Subscribe {
                topic: topic.to_string(),
                reason: e.to_string(),
            });
        }

        self.registry
            .insert(topic, Box::new(handler))
            .unwrap_or_else(|e| panic!("{e}"));
        info!("Subscribed to topic: {topic}");
        Ok(())
    }

    /// Drops the handler for `topic`.
    ///
    /// # Panics
    /// If `topic` has no handler.
    pub fn unsubscribe(&mut self, topic: &str) -> Result<(), BusError> {
        if !self.registry.contains(topic) {
            panic!("{}", RegistryError::NotRegistered(topic.to_string()));
        }

        if !self.connected {
            error!("Failed to unsubscribe from topic {topic}: not connected");
            return Err(BusError::Unsubscribe {
                topic: topic.to_string(),
                reason: "not connected".to_string(),
            });
        }

        if let Err(e) = self.network.send(ClientMessage::Unsubscribe {
            topic: topic.to_string(),
        }) {
            error!("Failed to unsubscribe from topic {topic}: {e}");
            return Err(BusError::Unsubscribe {
                topic: topic.to_string(),
                reason: e.to_string(),
            });
        }

        if let Err(e) = self.registry.remove(topic) {
            panic!("{e}");
        }
        info!("Unsubscribed from topic: {topic}");
        Ok(())
    }

    /// Best-effort publish. Dropped silently while disconnected.
    pub fn publish(&mut self, topic: &str, payload: &str) {
        self.send(topic, payload, false);
    }

    /// Serializes `payload` and publishes it.
    pub fn publish_json<T: Serialize>(&mut self, topic: &str, payload: &T) -> Result<(), BusError> {
        self.send_json(topic, payload, false)
    }

    fn send_json<T: Serialize>(&mut self, topic: &str, payload: &T, retain: bool) -> Result<(), BusError> {
        let text = serde_json::to_string(payload)?;
        self.send(topic, &text, retain);
        Ok(())
    }

    fn send(&mut self, topic: &str, payload: &str, retain: bool) {
        if !self.connected {
            return;
        }
        debug!("Publishing: [{topic}] {payload}");
        if let Err(e) = self.network.send(ClientMessage::Publish {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retain,
        }) {
            debug!("Publish to {topic} dropped: {e}");
        }
    }

    /// Processes at most one inbound item. Returns whether one was taken.
    pub fn tick(&mut self, ctx: &mut C) -> bool {
        let Some(item) = self.inbound.pop() else {
            return false;
        };

        match item {
            Inbound::Frame(frame) => {
                if let Err(e) = self.dispatch(ctx, &frame) {
                    warn!("Discarded message on {}: {e}", frame.topic);
                }
            }
            Inbound::Disconnected { session } if session == self.session => self.on_disconnect(),
            Inbound::Disconnected { session } => {
                debug!("Ignoring end of stale session {session}");
            }
        }
        true
    }

    fn dispatch(&mut self, ctx: &mut C, frame: &Frame) -> Result<(), FrameError> {
        let object = frame::decode(&frame.payload)?;
        debug!("Received: [{}] {:?}", frame.topic, object);

        let handler = self
            .registry
            .get_mut(&frame.topic)
            .ok_or_else(|| FrameError::Unroutable(frame.topic.clone()))?;
        handler(ctx, &object)
    }
}

#[cfg(test)]
pub(crate) mod testing;
