//! MIDI→OSC bridge: keeps the selected inputs open and feeds them to the
//! translator.

use crate::config::PortSelection;
use crate::error::{Error, Result};
use crate::hotplug::{wait_tick, HotplugSupervisor};
use crate::midi_to_osc::MidiInProcessor;
use crate::osc::heartbeat_message;
use crate::port::MidiInputPort;
use crate::registry::DeviceRegistry;
use log::{error, info, warn};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

pub const HEARTBEAT_ADDR: &str = "/midi/heartbeat";

pub struct MidiToOscBridge {
    registry: Arc<DeviceRegistry>,
    selection: PortSelection,
    processor: MidiInProcessor,
    inputs: Vec<MidiInputPort>,
    virtual_input: Option<MidiInputPort>,
}

impl MidiToOscBridge {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        selection: PortSelection,
        processor: MidiInProcessor,
    ) -> Self {
        Self {
            registry,
            selection,
            processor,
            inputs: Vec::new(),
            virtual_input: None,
        }
    }

    /// Creates the virtual input. Unlike hardware ports, failing here is an
    /// error for the caller.
    pub fn open_virtual(&mut self, name: &str) -> Result<()> {
        let processor = self.processor.clone();
        let port = MidiInputPort::open_virtual(&self.registry, name, move |label, stamp, bytes| {
            processor.on_midi(label, stamp, bytes)
        })?;
        self.virtual_input = Some(port);
        Ok(())
    }

    /// Closes every hardware input, then reopens the selection against a
    /// fresh enumeration. Ports that cannot be opened are skipped. Returns
    /// the number of open hardware inputs.
    pub fn rebuild(&mut self) -> usize {
        // old handles are fully closed before anything is reopened
        for mut port in self.inputs.drain(..) {
            port.close();
        }

        let available = match self.registry.enumerate() {
            Ok(names) => names,
            Err(e) => {
                error!("Failed to enumerate MIDI inputs: {e}");
                return 0;
            }
        };

        for name in self.selection.names_to_open(&available) {
            info!("Opening input: {name}");
            let processor = self.processor.clone();
            match MidiInputPort::open(&self.registry, &name, move |label, stamp, bytes| {
                processor.on_midi(label, stamp, bytes)
            }) {
                Ok(port) => self.inputs.push(port),
                Err(Error::DeviceNotFound(_)) => warn!("The device {name} does not exist"),
                Err(e) => error!("Failed to open MIDI input {name}: {e}"),
            }
        }
        self.inputs.len()
    }

    /// Open ports, hardware first, then the virtual one.
    pub fn ports(&self) -> impl Iterator<Item = &MidiInputPort> {
        self.inputs.iter().chain(self.virtual_input.iter())
    }

    pub fn send_heartbeat(&self) {
        let message = heartbeat_message(
            HEARTBEAT_ADDR,
            self.ports().map(|p| (p.sticky_id(), p.name())),
        );
        self.processor.broadcast(message);
    }

    /// Polls for hot-plug every `interval` until `shutdown` is set.
    pub fn run(&mut self, interval: Duration, heartbeat: bool, shutdown: &AtomicBool) -> Result<()> {
        let mut supervisor = HotplugSupervisor::new(Arc::clone(&self.registry));
        while wait_tick(interval, shutdown) {
            if let Err(e) = supervisor.tick(|_| {
                self.rebuild();
            }) {
                error!("Failed to rescan MIDI inputs: {e}");
            }
            if heartbeat {
                self.send_heartbeat();
            }
        }
        info!("Shutting down");
        Ok(())
    }
}
