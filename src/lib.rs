//! Bidirectional MIDI ↔ OSC bridge.
//!
//! `m2o` watches MIDI inputs and sends one OSC message per MIDI message;
//! `o2m` listens for OSC and writes MIDI to every open output. Both survive
//! devices being plugged and unplugged while they run.

pub mod backend;
pub mod config;
pub mod error;
pub mod hotplug;
pub mod m2o;
pub mod message;
pub mod midi_to_osc;
pub mod o2m;
pub mod osc;
pub mod osc_to_midi;
pub mod port;
pub mod registry;

pub use backend::{MidiBackend, MidirBackend, PortDirection};
pub use error::{Error, Result};
pub use registry::{DeviceRegistry, PortIdentity};
