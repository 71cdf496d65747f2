//! OSC→MIDI bridge: a receive loop on the calling thread and a hot-plug
//! thread that rebuilds the output set and wakes the receive loop.

use crate::config::PortSelection;
use crate::error::{Error, Result};
use crate::hotplug::{wait_tick, HotplugSupervisor};
use crate::osc::{heartbeat_message, Interrupter, OscReceiver, OscSender, Received};
use crate::osc_to_midi::{OscInProcessor, SharedOutputs};
use crate::port::MidiOutputPort;
use crate::registry::DeviceRegistry;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const HEARTBEAT_ADDR: &str = "/o2m/heartbeat";

/// Pause after a socket error so a persistent failure does not spin the loop.
pub const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Clone)]
pub struct OscToMidiBridge {
    registry: Arc<DeviceRegistry>,
    selection: PortSelection,
    outputs: SharedOutputs,
}

impl OscToMidiBridge {
    pub fn new(registry: Arc<DeviceRegistry>, selection: PortSelection) -> Self {
        Self {
            registry,
            selection,
            outputs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn processor(&self) -> OscInProcessor {
        OscInProcessor::new(Arc::clone(&self.outputs))
    }

    /// Replaces the whole output set. The lock is held throughout, so no
    /// message is dispatched against a half-built set.
    pub fn rebuild(&self) -> usize {
        let mut outputs = self.outputs.lock();
        for mut port in outputs.drain(..) {
            port.close();
        }

        let available = match self.registry.enumerate() {
            Ok(names) => names,
            Err(e) => {
                error!("Failed to enumerate MIDI outputs: {e}");
                return 0;
            }
        };

        let mut fresh = Vec::new();
        for name in self.selection.names_to_open(&available) {
            info!("Opening output: {name}");
            match MidiOutputPort::open(&self.registry, &name) {
                Ok(port) => fresh.push(port),
                Err(Error::DeviceNotFound(_)) => warn!("The device {name} does not exist"),
                Err(e) => error!("Failed to open MIDI output {name}: {e}"),
            }
        }
        *outputs = fresh;
        outputs.len()
    }

    pub fn heartbeat(&self) -> rosc::OscMessage {
        let outputs = self.outputs.lock();
        heartbeat_message(
            HEARTBEAT_ADDR,
            outputs.iter().map(|p| (p.sticky_id(), p.name())),
        )
    }

    /// Serves `receiver` until `shutdown` is set.
    ///
    /// The hot-plug thread ticks every `interval`, and wakes the receive loop
    /// on every tick so shutdown and device changes are seen promptly.
    pub fn run(
        &self,
        mut receiver: OscReceiver,
        interval: Duration,
        heartbeat: Option<OscSender>,
        shutdown: Arc<AtomicBool>,
    ) -> Result<()> {
        let interrupter = receiver.interrupter()?;
        let poller = {
            let bridge = self.clone();
            let shutdown = Arc::clone(&shutdown);
            thread::Builder::new()
                .name("o2m-hotplug".to_string())
                .spawn(move || bridge.poll_loop(interval, heartbeat, interrupter, &shutdown))?
        };

        let processor = self.processor();
        while !shutdown.load(Ordering::SeqCst) {
            match receiver.receive() {
                Ok(Received::Packet(packet, from)) => {
                    debug!("packet from {from}");
                    processor.handle_packet(&packet);
                }
                Ok(Received::Interrupted) => {}
                Err(e) => {
                    if let Some(pause) = receive_error_backoff(&e) {
                        thread::sleep(pause);
                    }
                }
            }
        }

        info!("Shutting down");
        if poller.join().is_err() {
            error!("Hot-plug thread panicked");
        }
        Ok(())
    }

    fn poll_loop(
        &self,
        interval: Duration,
        heartbeat: Option<OscSender>,
        interrupter: Interrupter,
        shutdown: &AtomicBool,
    ) {
        let mut supervisor = HotplugSupervisor::new(Arc::clone(&self.registry));

        while wait_tick(interval, shutdown) {
            if let Err(e) = supervisor.tick(|_| {
                self.rebuild();
            }) {
                error!("Failed to rescan MIDI outputs: {e}");
            }
            if let Some(sender) = &heartbeat {
                sender.send_message(self.heartbeat());
            }
            interrupter.interrupt();
        }
        // let the receive loop observe the shutdown flag
        interrupter.interrupt();
    }
}

/// Logs a receive failure and returns how long to wait before the next
/// receive. Undecodable packets need no pause; socket errors do.
fn receive_error_backoff(error: &Error) -> Option<Duration> {
    match error {
        Error::Osc(e) => {
            warn!("Discarding undecodable OSC packet: {e}");
            None
        }
        e => {
            error!("Error receiving OSC: {e}");
            Some(RECEIVE_ERROR_BACKOFF)
        }
    }
}
