/// The two LEDs of the status indicator. Both on reads as amber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
}

/// Two-channel status light.
pub trait StatusIndicator {
    fn write(&mut self, channel: Channel, on: bool);
}
