mod settings;

use std::fs;
use std::path::Path;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};
use tracing::warn;

pub use settings::{
    BrokerSettings, IndicatorSettings, NodeSettings, SchedulerSettings, Settings, StorageSettings,
};

/// Placeholder used when no hardware address can be found.
pub const UNKNOWN_MAC: &str = "00:00:00:00:00:00";

/// Loads the configuration from `config/default.*` and `FABRIC_*` environment
/// variables, merged over `Settings::default()`.
///
/// Nested keys use a double underscore, e.g. `FABRIC_BROKER__PORT=1884`.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("FABRIC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    Ok(merge(partial, Settings::default()))
}

fn merge(partial: PartialSettings, default: Settings) -> Settings {
    let node = partial.node.as_ref();
    let broker = partial.broker.as_ref();
    let indicator = partial.indicator.as_ref();
    let storage = partial.storage.as_ref();
    let scheduler = partial.scheduler.as_ref();

    Settings {
        node: NodeSettings {
            name: node
                .and_then(|n| n.name.clone())
                .unwrap_or(default.node.name),
            mac_address: node
                .and_then(|n| n.mac_address.clone())
                .unwrap_or(default.node.mac_address),
            interface: node
                .and_then(|n| n.interface.clone())
                .unwrap_or(default.node.interface),
        },
        broker: BrokerSettings {
            host: broker
                .and_then(|b| b.host.clone())
                .unwrap_or(default.broker.host),
            port: broker
                .and_then(|b| b.port)
                .unwrap_or(default.broker.port),
            connect_timeout_secs: broker
                .and_then(|b| b.connect_timeout_secs)
                .unwrap_or(default.broker.connect_timeout_secs),
            embedded: broker
                .and_then(|b| b.embedded)
                .unwrap_or(default.broker.embedded),
            bind_host: broker
                .and_then(|b| b.bind_host.clone())
                .unwrap_or(default.broker.bind_host),
        },
        indicator: IndicatorSettings {
            red_pin: indicator
                .and_then(|i| i.red_pin)
                .unwrap_or(default.indicator.red_pin),
            green_pin: indicator
                .and_then(|i| i.green_pin)
                .unwrap_or(default.indicator.green_pin),
            blink_period_ms: indicator
                .and_then(|i| i.blink_period_ms)
                .unwrap_or(default.indicator.blink_period_ms),
        },
        storage: StorageSettings {
            log_folder: storage
                .and_then(|s| s.log_folder.clone())
                .unwrap_or(default.storage.log_folder),
            preferred_mount: storage
                .and_then(|s| s.preferred_mount.clone())
                .unwrap_or(default.storage.preferred_mount),
        },
        scheduler: SchedulerSettings {
            tick_period_ms: scheduler
                .and_then(|s| s.tick_period_ms)
                .unwrap_or(default.scheduler.tick_period_ms),
            retry_backoff_secs: scheduler
                .and_then(|s| s.retry_backoff_secs)
                .unwrap_or(default.scheduler.retry_backoff_secs),
        },
    }
}

/// Returns the configured MAC address, or reads it from
/// `/sys/class/net/<interface>/address`.
pub fn resolve_mac_address(node: &NodeSettings) -> String {
    resolve_mac_address_in(node, Path::new("/sys/class/net"))
}

pub(crate) fn resolve_mac_address_in(node: &NodeSettings, sysfs_net: &Path) -> String {
    if !node.mac_address.trim().is_empty() {
        return node.mac_address.trim().to_string();
    }

    let path = sysfs_net.join(&node.interface).join("address");
    match fs::read_to_string(&path) {
        Ok(addr) if !addr.trim().is_empty() => addr.trim().to_uppercase(),
        Ok(_) => {
            warn!("Empty hardware address in {}", path.display());
            UNKNOWN_MAC.to_string()
        }
        Err(e) => {
            warn!("Could not read hardware address from {}: {e}", path.display());
            UNKNOWN_MAC.to_string()
        }
    }
}

#[cfg(test)]
mod tests;
