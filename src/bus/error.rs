use thiserror::Error;

/// Failures of the bus connection itself.
#[derive(Error, Debug)]
pub enum BusError {
    /// Broker unreachable, timed out, or refused the session.
    #[error("broker connection failed: {reason}")]
    BrokerConnection {
        reason: String,
        /// Return code reported by the broker, when it answered at all.
        return_code: Option<u8>,
    },

    #[error("failed to subscribe to topic {topic}: {reason}")]
    Subscribe { topic: String, reason: String },

    #[error("failed to unsubscribe from topic {topic}: {reason}")]
    Unsubscribe { topic: String, reason: String },

    /// The network thread is gone.
    #[error("network thread stopped")]
    NetworkStopped,

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

impl BusError {
    pub fn connection(reason: impl Into<String>) -> Self {
        BusError::BrokerConnection {
            reason: reason.into(),
            return_code: None,
        }
    }
}

/// Reasons an inbound frame is discarded.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("malformed message: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("message contains invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("message is not a JSON object")]
    NotAnObject,

    #[error("message was not complete, expected key: {0}")]
    MissingField(String),

    #[error("no handler registered for topic {0}")]
    Unroutable(String),
}

/// Topic registry misuse. These indicate a logic bug in the caller.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("topic {0} already has a handler registered")]
    AlreadyRegistered(String),

    #[error("topic {0} has no handler registered")]
    NotRegistered(String),
}
