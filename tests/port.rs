mod common;

use common::MemoryBackend;
use midi_osc_bridge::port::{MidiInputPort, MidiOutputPort};
use midi_osc_bridge::{DeviceRegistry, Error, PortDirection};
use parking_lot::Mutex;
use std::sync::Arc;

#[test]
fn test_input_port_delivers_label_and_bytes() {
    let backend = MemoryBackend::new(&["Keys"], &[]);
    let registry = Arc::new(DeviceRegistry::new(backend.clone(), PortDirection::Input));
    let received = Arc::new(Mutex::new(Vec::new()));

    let port = {
        let received = Arc::clone(&received);
        MidiInputPort::open(&registry, "Keys", move |label, _, bytes| {
            received.lock().push((label.clone(), bytes.to_vec()));
        })
        .unwrap()
    };
    assert!(port.is_open());
    assert!(!port.is_virtual());

    backend.inject("Keys", &[0xB0, 1, 2]);
    let received = received.lock();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].0, port.label());
    assert_eq!(received[0].1, vec![0xB0, 1, 2]);
}

#[test]
fn test_check_valid_detects_moved_device() {
    let backend = MemoryBackend::new(&["A", "B"], &[]);
    let registry = Arc::new(DeviceRegistry::new(backend.clone(), PortDirection::Input));
    let port = MidiInputPort::open(&registry, "B", |_, _, _| {}).unwrap();
    assert!(port.check_valid());

    backend.set_inputs(&["B"]);
    assert!(!port.check_valid());

    backend.set_inputs(&["C", "A"]);
    assert!(!port.check_valid());

    backend.set_inputs(&["A", "B", "C"]);
    assert!(port.check_valid());
}

#[test]
fn test_close_is_idempotent() {
    let backend = MemoryBackend::new(&["A"], &[]);
    let registry = Arc::new(DeviceRegistry::new(backend.clone(), PortDirection::Input));
    let mut port = MidiInputPort::open(&registry, "A", |_, _, _| {}).unwrap();

    port.close();
    port.close();
    drop(port);
    assert_eq!(backend.closes(), 1);
    assert!(!backend.inject("A", &[0xF8]));
}

#[test]
fn test_open_missing_device() {
    let backend = MemoryBackend::new(&["A"], &["Out"]);
    let inputs = Arc::new(DeviceRegistry::new(backend.clone(), PortDirection::Input));
    let outputs = DeviceRegistry::new(backend.clone(), PortDirection::Output);

    assert!(matches!(
        MidiInputPort::open(&inputs, "Out", |_, _, _| {}),
        Err(Error::DeviceNotFound(_))
    ));
    assert!(matches!(
        MidiOutputPort::open(&outputs, "A"),
        Err(Error::DeviceNotFound(_))
    ));
}

#[test]
fn test_output_port_send_after_close_fails() {
    let backend = MemoryBackend::new(&[], &["Out"]);
    let registry = DeviceRegistry::new(backend.clone(), PortDirection::Output);
    let mut port = MidiOutputPort::open(&registry, "Out").unwrap();

    port.send(&[0x90, 60, 1]).unwrap();
    port.close();
    assert!(port.send(&[0x80, 60, 0]).is_err());
    assert_eq!(backend.sent(), vec![("Out".to_string(), vec![0x90, 60, 1])]);
}
