//! Stand-ins for the board drivers, used when the binary runs without
//! hardware access.

use tracing::debug;

use crate::config::IndicatorSettings;
use crate::link::{Transceiver, TransceiverInfo};
use crate::notify::{Channel, StatusIndicator};

/// A cage with nothing plugged in.
#[derive(Debug, Default)]
pub struct NullTransceiver {
    tx_enabled: bool,
}

impl NullTransceiver {
    pub fn tx_enabled(&self) -> bool {
        self.tx_enabled
    }
}

impl Transceiver for NullTransceiver {
    fn present(&self) -> bool {
        false
    }

    fn tx_fault(&self) -> bool {
        false
    }

    fn read_info(&mut self) -> Option<TransceiverInfo> {
        None
    }

    fn enable_tx(&mut self) {
        self.tx_enabled = true;
    }

    fn disable_tx(&mut self) {
        self.tx_enabled = false;
    }
}

/// Status light that only traces pin changes.
#[derive(Debug)]
pub struct LogIndicator {
    red_pin: u8,
    green_pin: u8,
    red: bool,
    green: bool,
}

impl LogIndicator {
    pub fn new(settings: &IndicatorSettings) -> Self {
        Self {
            red_pin: settings.red_pin,
            green_pin: settings.green_pin,
            red: false,
            green: false,
        }
    }

    pub fn state(&self, channel: Channel) -> bool {
        match channel {
            Channel::Red => self.red,
            Channel::Green => self.green,
        }
    }
}

impl StatusIndicator for LogIndicator {
    fn write(&mut self, channel: Channel, on: bool) {
        let (pin, current) = match channel {
            Channel::Red => (self.red_pin, &mut self.red),
            Channel::Green => (self.green_pin, &mut self.green),
        };
        if *current != on {
            debug!("Status pin {pin} ({channel:?}) -> {}", if on { "on" } else { "off" });
            *current = on;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LogIndicator, NullTransceiver};
    use crate::config::Settings;
    use crate::link::{LinkState, LinkStateMachine};
    use crate::notify::{Channel, StatusIndicator};

    #[test]
    fn test_empty_cage_stays_disconnected() {
        let mut link = LinkStateMachine::new(NullTransceiver::default());
        for _ in 0..3 {
            link.tick();
        }
        assert_eq!(link.state(), LinkState::Disconnected);
        assert!(!link.device().tx_enabled());
    }

    #[test]
    fn test_log_indicator_tracks_channels() {
        let mut leds = LogIndicator::new(&Settings::default().indicator);
        leds.write(Channel::Green, true);
        leds.write(Channel::Red, false);
        assert!(leds.state(Channel::Green));
        assert!(!leds.state(Channel::Red));
    }
}
