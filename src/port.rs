//! Open MIDI ports. Each port owns exactly one driver handle.

use crate::backend::{InputConnection, InputHandler, OutputConnection};
use crate::error::{Error, Result};
use crate::registry::{DeviceRegistry, PortIdentity};
use log::info;
use std::sync::Arc;

/// Name and sticky id of a port, as published over OSC.
///
/// Handed to input callbacks by value, so a callback never holds on to the
/// port that feeds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortLabel {
    pub name: String,
    pub sticky_id: u32,
}

impl From<&PortIdentity> for PortLabel {
    fn from(identity: &PortIdentity) -> Self {
        Self {
            name: identity.display_name.clone(),
            sticky_id: identity.sticky_id,
        }
    }
}

pub struct MidiInputPort {
    identity: PortIdentity,
    registry: Arc<DeviceRegistry>,
    connection: Option<Box<dyn InputConnection>>,
}

impl MidiInputPort {
    /// Resolves `name` and opens it. `on_message` receives the port label
    /// along with each message.
    pub fn open<F>(registry: &Arc<DeviceRegistry>, name: &str, on_message: F) -> Result<Self>
    where
        F: FnMut(&PortLabel, u64, &[u8]) + Send + 'static,
    {
        let identity = registry.resolve(name)?;
        let index = identity
            .driver_index
            .ok_or_else(|| Error::DeviceNotFound(name.to_string()))?;
        let handler = bind_label(&identity, on_message);
        let connection = registry.backend().open_input(index, name, handler)?;
        info!(
            "Opened MIDI input {} (id {}, index {})",
            name, identity.sticky_id, index
        );

        Ok(Self {
            identity,
            registry: Arc::clone(registry),
            connection: Some(connection),
        })
    }

    /// Creates a virtual input that other applications can write to.
    pub fn open_virtual<F>(registry: &Arc<DeviceRegistry>, name: &str, on_message: F) -> Result<Self>
    where
        F: FnMut(&PortLabel, u64, &[u8]) + Send + 'static,
    {
        let identity = registry.virtual_identity(name);
        let handler = bind_label(&identity, on_message);
        let connection = registry.backend().create_virtual_input(name, handler)?;
        info!("Created virtual MIDI input {} (id {})", name, identity.sticky_id);

        Ok(Self {
            identity,
            registry: Arc::clone(registry),
            connection: Some(connection),
        })
    }

    pub fn name(&self) -> &str {
        &self.identity.display_name
    }

    pub fn sticky_id(&self) -> u32 {
        self.identity.sticky_id
    }

    pub fn label(&self) -> PortLabel {
        PortLabel::from(&self.identity)
    }

    pub fn is_virtual(&self) -> bool {
        self.identity.driver_index.is_none()
    }

    pub fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    /// Checks whether the driver index this port was opened at still refers
    /// to a device with the same name.
    pub fn check_valid(&self) -> bool {
        let Some(index) = self.identity.driver_index else {
            return true;
        };
        match self.registry.enumerate() {
            Ok(names) => names.get(index).is_some_and(|n| *n == self.identity.display_name),
            Err(_) => false,
        }
    }

    /// Stops callback delivery and releases the handle. Idempotent.
    pub fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            info!("Closed MIDI input {}", self.identity.display_name);
        }
    }
}

impl Drop for MidiInputPort {
    fn drop(&mut self) {
        self.close();
    }
}

pub struct MidiOutputPort {
    identity: PortIdentity,
    connection: Option<Box<dyn OutputConnection>>,
}

impl MidiOutputPort {
    pub fn open(registry: &DeviceRegistry, name: &str) -> Result<Self> {
        let identity = registry.resolve(name)?;
        let index = identity
            .driver_index
            .ok_or_else(|| Error::DeviceNotFound(name.to_string()))?;
        let connection = registry.backend().open_output(index, name)?;
        info!(
            "Opened MIDI output {} (id {}, index {})",
            name, identity.sticky_id, index
        );

        Ok(Self {
            identity,
            connection: Some(connection),
        })
    }

    pub fn name(&self) -> &str {
        &self.identity.display_name
    }

    pub fn sticky_id(&self) -> u32 {
        self.identity.sticky_id
    }

    pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
        match self.connection.as_mut() {
            Some(connection) => connection.send(bytes),
            None => Err(Error::Midi(format!(
                "output {} is closed",
                self.identity.display_name
            ))),
        }
    }

    pub fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
            info!("Closed MIDI output {}", self.identity.display_name);
        }
    }
}

impl Drop for MidiOutputPort {
    fn drop(&mut self) {
        self.close();
    }
}

fn bind_label<F>(identity: &PortIdentity, mut on_message: F) -> InputHandler
where
    F: FnMut(&PortLabel, u64, &[u8]) + Send + 'static,
{
    let label = PortLabel::from(identity);
    Box::new(move |stamp, bytes| on_message(&label, stamp, bytes))
}
