use super::settings::Settings;
use super::{NodeSettings, UNKNOWN_MAC, load_config, resolve_mac_address_in};
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.node.name, "Timing Reference - Primary");
    assert_eq!(settings.broker.host, "127.0.0.1");
    assert_eq!(settings.broker.port, 1883);
    assert_eq!(settings.broker.connect_timeout_secs, 5);
    assert_eq!(settings.indicator.red_pin, 10);
    assert_eq!(settings.indicator.green_pin, 11);
    assert_eq!(settings.indicator.blink_period_ms, 1000);
    assert_eq!(settings.scheduler.tick_period_ms, 100);
    assert_eq!(settings.scheduler.retry_backoff_secs, 5);
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    fs::create_dir_all("config").expect("create config dir");
    let toml = r#"
        [node]
        name = "Timing Reference - Aux"
        mac_address = "01:23:45:67:89:A0"

        [broker]
        host = "sdr-pnt"
        port = 1884
        embedded = false

        [indicator]
        blink_period_ms = 500
    "#;
    fs::write("config/default.toml", toml).expect("write config file");

    let cfg = load_config();
    env::set_current_dir(orig).expect("restore cwd");
    let cfg = cfg.expect("load_config failed");

    assert_eq!(cfg.node.name, "Timing Reference - Aux");
    assert_eq!(cfg.node.mac_address, "01:23:45:67:89:A0");
    assert_eq!(cfg.broker.host, "sdr-pnt");
    assert_eq!(cfg.broker.port, 1884);
    assert!(!cfg.broker.embedded);
    assert_eq!(cfg.indicator.blink_period_ms, 500);
    // untouched sections keep their defaults
    assert_eq!(cfg.indicator.red_pin, 10);
    assert_eq!(cfg.storage.log_folder, "logs");
}

#[test]
#[serial]
fn load_config_from_environment() {
    temp_env::with_vars(
        [
            ("FABRIC_BROKER__PORT", Some("1999")),
            ("FABRIC_SCHEDULER__RETRY_BACKOFF_SECS", Some("2")),
        ],
        || {
            let cfg = load_config().expect("load_config failed");
            assert_eq!(cfg.broker.port, 1999);
            assert_eq!(cfg.scheduler.retry_backoff_secs, 2);
            assert_eq!(cfg.broker.host, "127.0.0.1");
        },
    );
}

fn node(mac: &str) -> NodeSettings {
    NodeSettings {
        name: "test node".to_string(),
        mac_address: mac.to_string(),
        interface: "eth0".to_string(),
    }
}

#[test]
fn configured_mac_address_wins() {
    let tmp = TempDir::new().unwrap();
    assert_eq!(
        resolve_mac_address_in(&node(" 01:23:45:67:89:A0 "), tmp.path()),
        "01:23:45:67:89:A0"
    );
}

#[test]
fn mac_address_read_from_sysfs() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("eth0")).unwrap();
    fs::write(tmp.path().join("eth0").join("address"), "dc:a6:32:01:02:03\n").unwrap();

    assert_eq!(resolve_mac_address_in(&node(""), tmp.path()), "DC:A6:32:01:02:03");
}

#[test]
fn missing_interface_falls_back_to_placeholder() {
    let tmp = TempDir::new().unwrap();
    assert_eq!(resolve_mac_address_in(&node(""), tmp.path()), UNKNOWN_MAC);
}
