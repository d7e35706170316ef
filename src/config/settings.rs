use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration for a node.
///
/// Every component receives the section it needs through its constructor;
/// nothing reads configuration globally.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub node: NodeSettings,
    pub broker: BrokerSettings,
    pub indicator: IndicatorSettings,
    pub storage: StorageSettings,
    pub scheduler: SchedulerSettings,
}

/// Identity of this node on the bus.
///
/// An empty `mac_address` means "read it from `interface`".
#[derive(Debug, Deserialize, Clone)]
pub struct NodeSettings {
    pub name: String,
    pub mac_address: String,
    pub interface: String,
}

/// Where the broker lives and how long to wait for it.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub connect_timeout_secs: u64,
    /// Host the broker inside this process (the fleet's hub node does).
    pub embedded: bool,
    /// Address the embedded broker binds to.
    pub bind_host: String,
}

/// Status LED pin pair and blink rate.
#[derive(Debug, Deserialize, Clone)]
pub struct IndicatorSettings {
    pub red_pin: u8,
    pub green_pin: u8,
    pub blink_period_ms: u64,
}

/// Notification log location.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageSettings {
    pub log_folder: String,
    pub preferred_mount: String,
}

/// Tick loop timing.
#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerSettings {
    pub tick_period_ms: u64,
    pub retry_backoff_secs: u64,
}

impl BrokerSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

impl IndicatorSettings {
    pub fn blink_period(&self) -> Duration {
        Duration::from_millis(self.blink_period_ms)
    }
}

impl SchedulerSettings {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_secs)
    }
}

/// Partial configuration loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub node: Option<PartialNodeSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub indicator: Option<PartialIndicatorSettings>,
    pub storage: Option<PartialStorageSettings>,
    pub scheduler: Option<PartialSchedulerSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialNodeSettings {
    pub name: Option<String>,
    pub mac_address: Option<String>,
    pub interface: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub connect_timeout_secs: Option<u64>,
    pub embedded: Option<bool>,
    pub bind_host: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialIndicatorSettings {
    pub red_pin: Option<u8>,
    pub green_pin: Option<u8>,
    pub blink_period_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialStorageSettings {
    pub log_folder: Option<String>,
    pub preferred_mount: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialSchedulerSettings {
    pub tick_period_ms: Option<u64>,
    pub retry_backoff_secs: Option<u64>,
}

/// Defaults for the primary timing reference card.
impl Default for Settings {
    fn default() -> Self {
        Self {
            node: NodeSettings {
                name: "Timing Reference - Primary".to_string(),
                mac_address: String::new(),
                interface: "eth0".to_string(),
            },
            broker: BrokerSettings {
                host: "127.0.0.1".to_string(),
                port: 1883,
                connect_timeout_secs: 5,
                embedded: true,
                bind_host: "0.0.0.0".to_string(),
            },
            indicator: IndicatorSettings {
                red_pin: 10,
                green_pin: 11,
                blink_period_ms: 1000,
            },
            storage: StorageSettings {
                log_folder: "logs".to_string(),
                preferred_mount: "/mnt/media/nvme".to_string(),
            },
            scheduler: SchedulerSettings {
                tick_period_ms: 100,
                retry_backoff_secs: 5,
            },
        }
    }
}
