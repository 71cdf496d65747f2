//! Stable identities for hot-pluggable MIDI ports.
//!
//! Drivers renumber ports whenever a device comes or goes, so the bridge
//! never publishes a driver index. Instead every display name gets a sticky
//! id the first time it is seen, and keeps it for the life of the process.

use crate::backend::{MidiBackend, PortDirection};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Where a port name currently lives, and the id it is published under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortIdentity {
    pub display_name: String,
    /// Only valid until the next enumeration. `None` for virtual ports.
    pub driver_index: Option<usize>,
    pub sticky_id: u32,
}

#[derive(Default)]
struct RegistryState {
    snapshot: Vec<String>,
    sticky_ids: HashMap<String, u32>,
    next_sticky_id: u32,
}

/// Name/id tables for one direction (inputs or outputs) of the driver.
///
/// Shared between the hot-plug loop and whatever opens ports; the tables
/// are behind a mutex, the backend is only read.
pub struct DeviceRegistry {
    backend: Arc<dyn MidiBackend>,
    direction: PortDirection,
    state: Mutex<RegistryState>,
}

impl DeviceRegistry {
    pub fn new(backend: Arc<dyn MidiBackend>, direction: PortDirection) -> Self {
        Self {
            backend,
            direction,
            state: Mutex::new(RegistryState::default()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn MidiBackend> {
        &self.backend
    }

    /// Re-enumerates the driver and returns the names in index order.
    pub fn enumerate(&self) -> Result<Vec<String>> {
        let names = self.direction.names(self.backend.as_ref())?;
        self.state.lock().snapshot = names.clone();
        Ok(names)
    }

    /// Returns the sticky id for `name`, allocating the next one if the name
    /// has never been seen.
    pub fn sticky_id_for(&self, name: &str) -> u32 {
        let mut state = self.state.lock();
        if let Some(&id) = state.sticky_ids.get(name) {
            return id;
        }
        let id = state.next_sticky_id;
        state.next_sticky_id += 1;
        state.sticky_ids.insert(name.to_string(), id);
        id
    }

    /// Refreshes the snapshot and looks `name` up in it.
    pub fn driver_index_for(&self, name: &str) -> Result<usize> {
        self.enumerate()?
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| Error::DeviceNotFound(name.to_string()))
    }

    pub fn resolve(&self, name: &str) -> Result<PortIdentity> {
        let driver_index = self.driver_index_for(name)?;
        Ok(PortIdentity {
            display_name: name.to_string(),
            driver_index: Some(driver_index),
            sticky_id: self.sticky_id_for(name),
        })
    }

    /// Identity for a port the process creates itself.
    pub fn virtual_identity(&self, name: &str) -> PortIdentity {
        PortIdentity {
            display_name: name.to_string(),
            driver_index: None,
            sticky_id: self.sticky_id_for(name),
        }
    }

    /// The names seen by the most recent enumeration.
    pub fn snapshot(&self) -> Vec<String> {
        self.state.lock().snapshot.clone()
    }
}
