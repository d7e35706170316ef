use serde::{Deserialize, Serialize};

/// A message routed by the broker.
///
/// - `timestamp`: milliseconds since UNIX epoch, set by the broker on publish
/// - `retain`: keep as the topic's last known value; an empty retained
///   payload clears it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub topic: String,
    pub payload: String,
    pub timestamp: i64,
    pub retain: bool,
}
