//! Broker engine
//!
//! In-memory router behind the WebSocket transport:
//! - tracks connections, their announced identity and last-will
//! - manages topics, subscriber sets and one retained message per topic
//! - publishes a connection's last-will when it goes away without a
//!   `disconnect`, so the fleet learns about unclean exits
//!
//! The API is synchronous and meant to sit behind `Arc<Mutex<Broker>>`.
//! Delivery is at-most-once: a message for a connection whose send loop has
//! closed is dropped.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::broker::message::Message;
use crate::broker::topic::{SubscriberId, Topic};
use crate::client::Client;
use crate::transport::message::{
    CONNACK_ACCEPTED, CONNACK_IDENTIFIER_REJECTED, ServerMessage, Will,
};

#[derive(Debug, Default)]
pub struct Broker {
    pub topics: HashMap<String, Topic>,
    pub clients: HashMap<SubscriberId, Client>,
}

impl Broker {
    pub fn new() -> Self {
        Self {
            topics: HashMap::new(),
            clients: HashMap::new(),
        }
    }

    pub fn register_client(&mut self, client: Client) {
        self.clients.insert(client.id.clone(), client);
    }

    pub fn remove_client(&mut self, conn_id: &SubscriberId) -> Option<Client> {
        self.clients.remove(conn_id)
    }

    /// Handles `connect` for a registered connection and answers with a
    /// `conn_ack`. Returns the return code sent.
    ///
    /// A second connection announcing an identity that is already connected
    /// takes over: the older connection is dropped uncleanly (its will fires).
    pub fn connect(&mut self, conn_id: &SubscriberId, client_id: &str, will: Option<Will>) -> u8 {
        let return_code = if client_id.trim().is_empty() {
            CONNACK_IDENTIFIER_REJECTED
        } else {
            CONNACK_ACCEPTED
        };

        if return_code == CONNACK_ACCEPTED {
            let previous: Vec<SubscriberId> = self
                .clients
                .values()
                .filter(|c| c.id != *conn_id && c.client_id.as_deref() == Some(client_id))
                .map(|c| c.id.clone())
                .collect();
            for old in previous {
                info!("{client_id} reconnected, dropping stale connection {old}");
                self.cleanup_client(&old);
            }
        }

        let Some(client) = self.clients.get_mut(conn_id) else {
            warn!("connect from unknown connection {conn_id}");
            return return_code;
        };

        if return_code == CONNACK_ACCEPTED {
            client.client_id = Some(client_id.to_string());
            client.will = will;
            info!("{conn_id} connected as {client_id}");
        } else {
            warn!("{conn_id} rejected: empty client id");
        }
        client.send(&ServerMessage::ConnAck { return_code });
        return_code
    }

    /// Subscribes a connection to a topic, creating the topic on demand, and
    /// replays the retained message to it.
    pub fn subscribe(&mut self, topic: &str, subscriber: SubscriberId) {
        let topic = self
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(topic));

        topic.subscribe(subscriber.clone());

        if let (Some(retained), Some(client)) = (&topic.retained, self.clients.get(&subscriber)) {
            client.send(&ServerMessage::Message {
                topic: retained.topic.clone(),
                payload: retained.payload.clone(),
                timestamp: retained.timestamp,
            });
        }
    }

    pub fn unsubscribe(&mut self, topic: &str, subscriber: &SubscriberId) {
        if let Some(t) = self.topics.get_mut(topic) {
            t.unsubscribe(subscriber);
            if t.is_idle() {
                self.topics.remove(topic);
            }
        }
    }

    /// Routes a message to the topic's subscribers. Returns how many
    /// connections it was queued for.
    pub fn publish(&mut self, mut msg: Message) -> usize {
        msg.timestamp = chrono::Utc::now().timestamp_millis();

        if msg.retain {
            self.topics
                .entry(msg.topic.clone())
                .or_insert_with(|| Topic::new(&msg.topic))
                .retain(&msg);
        }

        let Some(topic) = self.topics.get(&msg.topic) else {
            debug!("No subscribers for topic '{}'", msg.topic);
            return 0;
        };

        let outgoing = ServerMessage::Message {
            topic: msg.topic.clone(),
            payload: msg.payload.clone(),
            timestamp: msg.timestamp,
        };

        let mut delivered = 0;
        for sub_id in &topic.subscribers {
            match self.clients.get(sub_id) {
                Some(client) if client.send(&outgoing) => delivered += 1,
                Some(_) => debug!("Failed to send to {sub_id}"),
                None => debug!("No client registered with id: {sub_id}"),
            }
        }
        delivered
    }

    /// Graceful disconnect: the will is discarded before cleanup.
    pub fn disconnect(&mut self, conn_id: &SubscriberId) {
        if let Some(client) = self.clients.get_mut(conn_id) {
            client.will = None;
        }
        self.cleanup_client(conn_id);
    }

    /// Removes a connection and its subscriptions, publishing its will if it
    /// still has one.
    pub fn cleanup_client(&mut self, conn_id: &SubscriberId) {
        let Some(client) = self.remove_client(conn_id) else {
            return;
        };

        for topic in self.topics.values_mut() {
            topic.unsubscribe(conn_id);
        }
        self.topics.retain(|_, t| !t.is_idle());

        if let Some(will) = client.will {
            info!(
                "Publishing last-will of {} on {}",
                client.client_id.as_deref().unwrap_or(conn_id.as_str()),
                will.topic
            );
            self.publish(Message {
                topic: will.topic,
                payload: will.payload,
                timestamp: 0,
                retain: will.retain,
            });
        }

        debug!("Cleaned up client {conn_id}");
    }
}
