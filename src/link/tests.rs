use std::cell::RefCell;
use std::rc::Rc;

use super::{LinkState, LinkStateMachine, Transceiver, TransceiverInfo};

#[derive(Debug, Default)]
struct Signals {
    present: bool,
    tx_fault: bool,
    readable: bool,
    tx_enabled: bool,
    reads: usize,
}

/// Transceiver whose signals are driven by the test.
#[derive(Clone, Default)]
struct FakeTransceiver {
    signals: Rc<RefCell<Signals>>,
}

impl FakeTransceiver {
    fn set(&self, f: impl FnOnce(&mut Signals)) {
        f(&mut self.signals.borrow_mut());
    }

    fn tx_enabled(&self) -> bool {
        self.signals.borrow().tx_enabled
    }

    fn reads(&self) -> usize {
        self.signals.borrow().reads
    }
}

impl Transceiver for FakeTransceiver {
    fn present(&self) -> bool {
        self.signals.borrow().present
    }

    fn tx_fault(&self) -> bool {
        self.signals.borrow().tx_fault
    }

    fn read_info(&mut self) -> Option<TransceiverInfo> {
        let mut signals = self.signals.borrow_mut();
        signals.reads += 1;
        signals.readable.then(|| TransceiverInfo {
            vendor_name: "FINISAR CORP.".to_string(),
            part_number: "FTLF8519P3BNL".to_string(),
            serial_number: "PQL3K9B".to_string(),
        })
    }

    fn enable_tx(&mut self) {
        self.signals.borrow_mut().tx_enabled = true;
    }

    fn disable_tx(&mut self) {
        self.signals.borrow_mut().tx_enabled = false;
    }
}

fn machine() -> (LinkStateMachine<FakeTransceiver>, FakeTransceiver) {
    let device = FakeTransceiver::default();
    device.set(|s| s.tx_enabled = true);
    let handle = device.clone();
    (LinkStateMachine::new(device), handle)
}

#[test]
fn test_starts_disconnected_with_tx_off() {
    let (mut link, device) = machine();
    assert_eq!(link.state(), LinkState::Disconnected);
    assert!(!device.tx_enabled());

    link.tick();
    assert_eq!(link.state(), LinkState::Disconnected);
    assert_eq!(device.reads(), 0);
}

#[test]
fn test_insert_fault_remove_sequence() {
    let (mut link, device) = machine();

    device.set(|s| {
        s.present = true;
        s.readable = true;
    });
    link.tick();
    assert_eq!(link.state(), LinkState::Querying);
    assert!(!device.tx_enabled());

    link.tick();
    assert_eq!(link.state(), LinkState::Active);
    assert!(device.tx_enabled());
    assert_eq!(link.info().map(|i| i.part_number.as_str()), Some("FTLF8519P3BNL"));

    link.tick();
    assert_eq!(link.state(), LinkState::Active);

    device.set(|s| s.tx_fault = true);
    link.tick();
    assert_eq!(link.state(), LinkState::TxFault);
    assert!(!device.tx_enabled());

    // the fault never clears on its own
    device.set(|s| s.tx_fault = false);
    link.tick();
    assert_eq!(link.state(), LinkState::TxFault);
    assert!(!device.tx_enabled());

    device.set(|s| s.present = false);
    link.tick();
    assert_eq!(link.state(), LinkState::Disconnected);
    assert!(link.info().is_none());
}

#[test]
fn test_failed_read_parks_in_invalid() {
    let (mut link, device) = machine();
    device.set(|s| s.present = true);

    link.tick();
    link.tick();
    assert_eq!(link.state(), LinkState::Invalid);
    assert_eq!(device.reads(), 1);

    // a readable module is not re-read until it is reinserted
    device.set(|s| s.readable = true);
    for _ in 0..5 {
        link.tick();
        assert_eq!(link.state(), LinkState::Invalid);
    }
    assert_eq!(device.reads(), 1);
    assert!(!device.tx_enabled());

    device.set(|s| s.present = false);
    link.tick();
    assert_eq!(link.state(), LinkState::Disconnected);

    device.set(|s| s.present = true);
    link.tick();
    link.tick();
    assert_eq!(link.state(), LinkState::Active);
    assert_eq!(device.reads(), 2);
}

#[test]
fn test_removal_while_active_disables_tx() {
    let (mut link, device) = machine();
    device.set(|s| {
        s.present = true;
        s.readable = true;
    });
    link.tick();
    link.tick();
    assert!(device.tx_enabled());

    device.set(|s| s.present = false);
    link.tick();
    assert_eq!(link.state(), LinkState::Disconnected);
    assert!(!device.tx_enabled());
    assert!(link.info().is_none());
}

#[test]
fn test_drop_disables_tx() {
    let (mut link, device) = machine();
    device.set(|s| {
        s.present = true;
        s.readable = true;
    });
    link.tick();
    link.tick();
    assert!(device.tx_enabled());

    drop(link);
    assert!(!device.tx_enabled());
}

#[test]
fn test_state_display() {
    assert_eq!(LinkState::TxFault.to_string(), "tx fault");
    assert_eq!(LinkState::Active.to_string(), "active");
}
