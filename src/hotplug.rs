//! Polling hot-plug detection.

use crate::error::Result;
use crate::registry::DeviceRegistry;
use log::info;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

const SHUTDOWN_CHECK: Duration = Duration::from_millis(50);

/// Sleeps for `interval` unless `shutdown` gets set first. Returns `false`
/// on shutdown.
pub fn wait_tick(interval: Duration, shutdown: &AtomicBool) -> bool {
    let deadline = Instant::now() + interval;
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(SHUTDOWN_CHECK));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotplugState {
    Stable,
    Rescanning,
}

/// Tracks the last device list seen by a registry and reports changes.
pub struct HotplugSupervisor {
    registry: Arc<DeviceRegistry>,
    last_seen: BTreeSet<String>,
    state: HotplugState,
}

impl HotplugSupervisor {
    /// Starts from the registry's last enumeration, i.e. the list the open
    /// ports were built from, so a device that appears in between is still
    /// seen as a change.
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        let last_seen = registry.snapshot().into_iter().collect();
        Self {
            registry,
            last_seen,
            state: HotplugState::Stable,
        }
    }

    pub fn state(&self) -> HotplugState {
        self.state
    }

    /// Re-enumerates; when the set of names differs from the cached one,
    /// runs `rebuild` with the new list and caches it. Returns whether a
    /// rebuild happened.
    pub fn tick<F>(&mut self, rebuild: F) -> Result<bool>
    where
        F: FnOnce(&[String]),
    {
        let names = self.registry.enumerate()?;
        let current: BTreeSet<String> = names.iter().cloned().collect();
        if current == self.last_seen {
            return Ok(false);
        }

        self.state = HotplugState::Rescanning;
        info!("MIDI device list changed, found {} devices", names.len());
        for (i, name) in names.iter().enumerate() {
            info!("   ({i}): {name}");
        }
        rebuild(&names);
        self.last_seen = current;
        self.state = HotplugState::Stable;
        Ok(true)
    }
}
