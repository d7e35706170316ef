//! Fleet-wide notification center
//!
//! The `NotificationCenter` turns log records into notifications, keeps the
//! warnings and errors of every node sharing the bus, writes them to disk,
//! publishes its own node's notifications and drives the status light.
//!
//! Remote notifications are recorded but never published again: the bus
//! handlers for `/status/warnings` and `/status/errors` only get the
//! `Ledger`, not the bus.

pub mod error;
pub mod indicator;
pub mod notification;
pub mod sink;
pub mod store;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{Level, debug, error};

pub use error::NotifyError;
pub use indicator::{Channel, StatusIndicator};
pub use notification::{Notification, Severity};
pub use sink::CenterSink;
pub use store::NotificationStore;

use crate::bus::{BusError, FrameError, JsonObject, MessageBus, NodeIdentity, topics};
use crate::config::{Settings, StorageSettings};
use crate::utils::sink::{LogEvent, LogSink};

/// Retained notifications and where they are written.
#[derive(Debug, Default)]
pub struct Ledger {
    warnings: Vec<Notification>,
    errors: Vec<Notification>,
    store: Option<NotificationStore>,
}

impl Ledger {
    pub fn warnings(&self) -> &[Notification] {
        &self.warnings
    }

    pub fn errors(&self) -> &[Notification] {
        &self.errors
    }

    pub fn store(&self) -> Option<&NotificationStore> {
        self.store.as_ref()
    }

    /// Persists and keeps a warning or error. Info is ignored.
    pub fn record(&mut self, notification: Notification) {
        if !notification.severity.is_retained() {
            return;
        }
        if let Some(store) = &self.store {
            store.append(&notification);
        }
        match notification.severity {
            Severity::Warning => self.warnings.push(notification),
            Severity::Error => self.errors.push(notification),
            Severity::Info => {}
        }
    }

    /// Records a notification received on the bus. The broker echoes this
    /// node's own broadcasts back; those are already recorded.
    fn ingest(
        &mut self,
        own: &NodeIdentity,
        severity: Severity,
        object: &JsonObject,
    ) -> Result<(), FrameError> {
        let notification = Notification::from_remote(severity, object)?;
        if notification.mac_address == own.mac_address && notification.node_name == own.node_name {
            debug!("Ignoring echo of own {severity}: {}", notification.message);
            return Ok(());
        }
        debug!(
            "Received {severity} from {}: {}",
            notification.node_name, notification.message
        );
        self.record(notification);
        Ok(())
    }
}

pub struct NotificationCenter<I: StatusIndicator> {
    identity: NodeIdentity,
    broker: (String, u16),
    storage: StorageSettings,
    blink_period: Duration,
    retry_backoff: Duration,

    bus: MessageBus<Ledger>,
    ledger: Ledger,
    indicator: I,

    sink: Arc<CenterSink>,
    events: UnboundedReceiver<LogEvent>,

    started: bool,
    retry_at: Option<Instant>,
    blink: bool,
    last_toggle: Instant,
}

impl<I: StatusIndicator> NotificationCenter<I> {
    /// Cheap: stores configuration only. Nothing touches the disk or the
    /// network until `start`.
    pub fn create(
        settings: &Settings,
        identity: NodeIdentity,
        bus: MessageBus<Ledger>,
        indicator: I,
    ) -> Self {
        let (sink, events) = CenterSink::channel();
        Self {
            identity,
            broker: (settings.broker.host.clone(), settings.broker.port),
            storage: settings.storage.clone(),
            blink_period: settings.indicator.blink_period(),
            retry_backoff: settings.scheduler.retry_backoff(),
            bus,
            ledger: Ledger::default(),
            indicator,
            sink: Arc::new(sink),
            events,
            started: false,
            retry_at: None,
            blink: false,
            last_toggle: Instant::now(),
        }
    }

    /// The sink to register with the process logger.
    pub fn sink(&self) -> Arc<dyn LogSink> {
        self.sink.clone()
    }

    /// Prepares storage, then connects to the broker, retrying forever with a
    /// fixed backoff. The red channel stays on while the broker is
    /// unreachable.
    pub fn start(&mut self) -> Result<(), NotifyError> {
        if self.started {
            return Ok(());
        }

        let folder = store::resolve_storage(&self.storage)?;
        self.ledger.store = Some(NotificationStore::new(&folder));

        let (host, port) = self.broker.clone();
        loop {
            self.drain_events();
            match self.bus.connect(&host, port, &self.identity) {
                Ok(()) => break,
                Err(e @ BusError::BrokerConnection { .. }) => {
                    self.indicator.write(Channel::Red, true);
                    error!(
                        "Failed to connect to broker at {host}:{port}: {e}. Retrying in {}s",
                        self.retry_backoff.as_secs()
                    );
                    std::thread::sleep(self.retry_backoff);
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.indicator.write(Channel::Red, false);
        self.ledger.errors.clear();

        if !self.bus.registered_topics().iter().any(|t| t == topics::WARNINGS) {
            let own = self.identity.clone();
            self.bus.subscribe(topics::WARNINGS, move |ledger: &mut Ledger, object: &JsonObject| {
                ledger.ingest(&own, Severity::Warning, object)
            })?;
        }
        if !self.bus.registered_topics().iter().any(|t| t == topics::ERRORS) {
            let own = self.identity.clone();
            self.bus.subscribe(topics::ERRORS, move |ledger: &mut Ledger, object: &JsonObject| {
                ledger.ingest(&own, Severity::Error, object)
            })?;
        }

        self.started = true;
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Routes a log record by level, tagged with this node's identity.
    pub fn emit(&mut self, event: &LogEvent) {
        let mac = self.identity.mac_address.clone();
        let name = self.identity.node_name.clone();
        if event.level == Level::ERROR {
            self.add_error(&mac, &name, &event.target, &event.message, true);
        } else if event.level == Level::WARN {
            self.add_warning(&mac, &name, &event.target, &event.message, true);
        } else {
            self.add_info(&mac, &name, &event.target, &event.message, true);
        }
    }

    /// Info is forwarded only, never kept.
    pub fn add_info(
        &mut self,
        mac_address: &str,
        node_name: &str,
        category: &str,
        message: &str,
        broadcast: bool,
    ) {
        self.add(Severity::Info, mac_address, node_name, category, message, broadcast);
    }

    pub fn add_warning(
        &mut self,
        mac_address: &str,
        node_name: &str,
        category: &str,
        message: &str,
        broadcast: bool,
    ) {
        self.add(Severity::Warning, mac_address, node_name, category, message, broadcast);
    }

    pub fn add_error(
        &mut self,
        mac_address: &str,
        node_name: &str,
        category: &str,
        message: &str,
        broadcast: bool,
    ) {
        self.add(Severity::Error, mac_address, node_name, category, message, broadcast);
    }

    fn add(
        &mut self,
        severity: Severity,
        mac_address: &str,
        node_name: &str,
        category: &str,
        message: &str,
        broadcast: bool,
    ) {
        let notification = Notification::new(severity, mac_address, node_name, category, message);
        let payload = serde_json::to_string(&notification);

        // written to disk before it goes out
        self.ledger.record(notification);

        if broadcast && self.bus.is_connected() {
            match payload {
                Ok(payload) => self.bus.publish(severity.topic(), &payload),
                Err(e) => debug!("Dropping unserializable {severity}: {e}"),
            }
        }
    }

    /// Whether this node has reported a warning. Other nodes' warnings do
    /// not count.
    pub fn has_warnings(&self) -> bool {
        self.ledger
            .warnings
            .iter()
            .any(|n| n.node_name == self.identity.node_name)
    }

    /// Whether this node has reported an error.
    pub fn has_errors(&self) -> bool {
        self.ledger
            .errors
            .iter()
            .any(|n| n.node_name == self.identity.node_name)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn bus(&self) -> &MessageBus<Ledger> {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut MessageBus<Ledger> {
        &mut self.bus
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    /// Starts on first use, then dispatches one bus frame, reconnects a lost
    /// broker connection, turns pending log records into notifications and
    /// updates the status light.
    ///
    /// A failed start is retried after one backoff period. Once started, a
    /// lost connection gets one attempt per backoff period, so a tick blocks
    /// for at most one connect timeout.
    pub fn tick(&mut self) {
        if !self.started {
            if self.retry_at.is_some_and(|at| Instant::now() < at) {
                self.drain_events();
                return;
            }
            if let Err(e) = self.start() {
                error!("Notification center failed to start: {e}");
                self.retry_at = Some(Instant::now() + self.retry_backoff);
                self.indicator.write(Channel::Red, true);
                self.drain_events();
                return;
            }
            self.retry_at = None;
        }

        self.bus.tick(&mut self.ledger);
        self.maintain_connection();
        self.drain_events();
        self.update_indicator();
    }

    fn maintain_connection(&mut self) {
        if self.bus.is_connected() {
            self.retry_at = None;
            return;
        }

        let now = Instant::now();
        match self.retry_at {
            None => self.retry_at = Some(now + self.retry_backoff),
            Some(at) if now >= at => {
                self.retry_at = Some(now + self.retry_backoff);
                self.reconnect();
            }
            Some(_) => {}
        }
    }

    /// One connect attempt. Subscriptions are restored by the bus.
    fn reconnect(&mut self) {
        let (host, port) = self.broker.clone();
        match self.bus.connect(&host, port, &self.identity) {
            Ok(()) => {
                self.retry_at = None;
                self.ledger.errors.clear();
            }
            Err(e) => error!(
                "Failed to reconnect to broker at {host}:{port}: {e}. Retrying in {}s",
                self.retry_backoff.as_secs()
            ),
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.emit(&event);
        }
    }

    fn update_indicator(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_toggle) <= self.blink_period / 2 {
            return;
        }
        self.last_toggle = now;
        self.blink = !self.blink;

        if self.has_errors() || !self.bus.is_connected() {
            self.indicator.write(Channel::Green, false);
            self.indicator.write(Channel::Red, self.blink);
        } else if self.has_warnings() {
            self.indicator.write(Channel::Green, self.blink);
            self.indicator.write(Channel::Red, self.blink);
        } else {
            self.indicator.write(Channel::Green, true);
            self.indicator.write(Channel::Red, false);
        }
    }
}
