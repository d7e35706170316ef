use std::fmt;

use serde::Serialize;

/// Identification block read from a transceiver's EEPROM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransceiverInfo {
    pub vendor_name: String,
    pub part_number: String,
    pub serial_number: String,
}

impl fmt::Display for TransceiverInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (s/n {})",
            self.vendor_name, self.part_number, self.serial_number
        )
    }
}

/// Synchronous access to a pluggable optical transceiver.
pub trait Transceiver {
    /// Module-present signal.
    fn present(&self) -> bool;

    /// TX fault signal.
    fn tx_fault(&self) -> bool;

    /// Reads the identification block; `None` if the read fails or the
    /// contents are not valid.
    fn read_info(&mut self) -> Option<TransceiverInfo>;

    fn enable_tx(&mut self);

    fn disable_tx(&mut self);
}
