//! Optical link supervision.
//!
//! `LinkStateMachine` polls a `Transceiver` once per `tick()` and walks it
//! through presence and fault states. A transceiver that fails to identify
//! itself, or that reports a TX fault, stays parked until it is physically
//! removed.

pub mod transceiver;

use std::fmt;

use tracing::{debug, error, info, warn};

pub use transceiver::{Transceiver, TransceiverInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Querying,
    Invalid,
    Active,
    TxFault,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LinkState::Disconnected => "disconnected",
            LinkState::Querying => "querying",
            LinkState::Invalid => "invalid",
            LinkState::Active => "active",
            LinkState::TxFault => "tx fault",
        };
        f.write_str(name)
    }
}

pub struct LinkStateMachine<T: Transceiver> {
    device: T,
    state: LinkState,
    info: Option<TransceiverInfo>,
}

impl<T: Transceiver> LinkStateMachine<T> {
    /// Takes ownership of the device and makes sure the transmitter is off.
    pub fn new(mut device: T) -> Self {
        device.disable_tx();
        Self {
            device,
            state: LinkState::Disconnected,
            info: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Identification read when the current transceiver was inserted.
    pub fn info(&self) -> Option<&TransceiverInfo> {
        self.info.as_ref()
    }

    pub fn device(&self) -> &T {
        &self.device
    }

    /// Advances the machine by one step.
    pub fn tick(&mut self) {
        self.state = match self.state {
            LinkState::Disconnected => self.in_disconnected(),
            LinkState::Querying => self.in_querying(),
            LinkState::Invalid => self.in_invalid(),
            LinkState::Active => self.in_active(),
            LinkState::TxFault => self.in_tx_fault(),
        };
    }

    fn in_disconnected(&mut self) -> LinkState {
        if self.device.present() {
            debug!("Transceiver inserted, attempting to read data");
            return LinkState::Querying;
        }
        LinkState::Disconnected
    }

    fn in_querying(&mut self) -> LinkState {
        match self.device.read_info() {
            Some(info) => {
                info!("Read transceiver info: {info}");
                self.info = Some(info);
                self.device.enable_tx();
                LinkState::Active
            }
            None => {
                warn!("Failed to read valid transceiver info");
                LinkState::Invalid
            }
        }
    }

    fn in_invalid(&mut self) -> LinkState {
        if !self.device.present() {
            warn!("Transceiver disconnected");
            return LinkState::Disconnected;
        }
        LinkState::Invalid
    }

    fn in_active(&mut self) -> LinkState {
        if !self.device.present() {
            self.device.disable_tx();
            self.info = None;
            warn!("Transceiver disconnected");
            return LinkState::Disconnected;
        }
        if self.device.tx_fault() {
            self.device.disable_tx();
            error!("Transceiver reported TX fault");
            return LinkState::TxFault;
        }
        LinkState::Active
    }

    fn in_tx_fault(&mut self) -> LinkState {
        if !self.device.present() {
            self.info = None;
            info!("Transceiver disconnected");
            return LinkState::Disconnected;
        }
        LinkState::TxFault
    }
}

impl<T: Transceiver> Drop for LinkStateMachine<T> {
    fn drop(&mut self) {
        self.device.disable_tx();
    }
}

#[cfg(test)]
mod tests;
