use std::collections::HashSet;

use crate::broker::message::Message;

/// Connection identifier assigned by the transport.
pub type SubscriberId = String;

/// A topic: its current subscribers and the retained message, if any.
#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    pub subscribers: HashSet<SubscriberId>,
    pub retained: Option<Message>,
}

impl Topic {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: HashSet::new(),
            retained: None,
        }
    }

    /// Adds the subscriber. Returns false if it was already subscribed.
    pub fn subscribe(&mut self, id: SubscriberId) -> bool {
        self.subscribers.insert(id)
    }

    pub fn unsubscribe(&mut self, id: &SubscriberId) -> bool {
        self.subscribers.remove(id)
    }

    /// Stores `msg` as the retained value, or clears it for an empty payload.
    pub fn retain(&mut self, msg: &Message) {
        if msg.payload.is_empty() {
            self.retained = None;
        } else {
            self.retained = Some(msg.clone());
        }
    }

    /// A topic with no subscribers and nothing retained can be dropped.
    pub fn is_idle(&self) -> bool {
        self.subscribers.is_empty() && self.retained.is_none()
    }
}
