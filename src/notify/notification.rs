use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::bus::frame::{JsonObject, required_str};
use crate::bus::{FrameError, topics};
use crate::utils::time::{parse_iso, serialize_millis};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Topic notifications of this severity are published on.
    pub fn topic(self) -> &'static str {
        match self {
            Severity::Info => topics::INFO,
            Severity::Warning => topics::WARNINGS,
            Severity::Error => topics::ERRORS,
        }
    }

    /// Warnings and errors are kept in memory and written to disk; info is
    /// only forwarded.
    pub fn is_retained(self) -> bool {
        !matches!(self, Severity::Info)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// One status report from some node. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    #[serde(skip)]
    pub severity: Severity,
    pub mac_address: String,
    pub node_name: String,
    pub category: String,
    pub message: String,
    #[serde(rename = "time", serialize_with = "serialize_millis")]
    pub created: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        severity: Severity,
        mac_address: &str,
        node_name: &str,
        category: &str,
        message: &str,
    ) -> Self {
        Self {
            severity,
            mac_address: mac_address.to_string(),
            node_name: node_name.to_string(),
            category: category.to_string(),
            message: message.to_string(),
            created: Utc::now(),
        }
    }

    /// Builds a notification from a payload received on the bus.
    ///
    /// `node_name`, `category` and `message` are required. The sender's
    /// `time` is kept when it parses, otherwise the arrival time is used.
    pub fn from_remote(severity: Severity, object: &JsonObject) -> Result<Self, FrameError> {
        let node_name = required_str(object, "node_name")?;
        let category = required_str(object, "category")?;
        let message = required_str(object, "message")?;
        let mac_address = object
            .get("mac_address")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        let mut notification = Self::new(severity, mac_address, node_name, category, message);
        if let Some(time) = object.get("time").and_then(|v| v.as_str()).and_then(parse_iso) {
            notification.created = time;
        }
        Ok(notification)
    }
}
