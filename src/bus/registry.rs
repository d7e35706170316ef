use std::collections::HashMap;
use std::fmt;

use crate::bus::error::{FrameError, RegistryError};
use crate::bus::frame::JsonObject;

/// Topic handler. Receives the dispatch context and the decoded payload.
pub type Handler<C> = Box<dyn FnMut(&mut C, &JsonObject) -> Result<(), FrameError>>;

/// Exactly one handler per topic.
pub struct TopicRegistry<C> {
    handlers: HashMap<String, Handler<C>>,
}

impl<C> TopicRegistry<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers `handler`; fails without touching the registry if the topic
    /// already has one.
    pub fn insert(&mut self, topic: &str, handler: Handler<C>) -> Result<(), RegistryError> {
        if self.handlers.contains_key(topic) {
            return Err(RegistryError::AlreadyRegistered(topic.to_string()));
        }
        self.handlers.insert(topic.to_string(), handler);
        Ok(())
    }

    /// Removes the topic's handler; fails without touching the registry if
    /// there is none.
    pub fn remove(&mut self, topic: &str) -> Result<Handler<C>, RegistryError> {
        self.handlers
            .remove(topic)
            .ok_or_else(|| RegistryError::NotRegistered(topic.to_string()))
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.handlers.contains_key(topic)
    }

    pub fn get_mut(&mut self, topic: &str) -> Option<&mut Handler<C>> {
        self.handlers.get_mut(topic)
    }

    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.handlers.keys().cloned().collect();
        topics.sort();
        topics
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<C> Default for TopicRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for TopicRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicRegistry")
            .field("topics", &self.topics())
            .finish()
    }
}
