//! Platform MIDI capability layer.
//!
//! The bridge only needs four things from the driver: list port names, open
//! an input with a callback, open an output, and create a virtual input. The
//! [`MidiBackend`] trait captures exactly that, so the registry and the
//! bridges can run against `midir` in production and an in-memory backend in
//! tests.

use crate::error::{Error, Result};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

/// Callback invoked by the driver for every incoming MIDI message.
///
/// Arguments are the driver timestamp in microseconds and the raw bytes.
pub type InputHandler = Box<dyn FnMut(u64, &[u8]) + Send + 'static>;

/// An open input connection. Dropping it also closes it.
pub trait InputConnection: Send {
    fn close(self: Box<Self>);
}

/// An open output connection. Dropping it also closes it.
pub trait OutputConnection: Send {
    fn send(&mut self, bytes: &[u8]) -> Result<()>;
    fn close(self: Box<Self>);
}

pub trait MidiBackend: Send + Sync + 'static {
    /// Input port names, in driver index order.
    fn input_names(&self) -> Result<Vec<String>>;

    /// Output port names, in driver index order.
    fn output_names(&self) -> Result<Vec<String>>;

    /// Opens the input at `index`, which must still be called `name`.
    fn open_input(
        &self,
        index: usize,
        name: &str,
        handler: InputHandler,
    ) -> Result<Box<dyn InputConnection>>;

    fn create_virtual_input(
        &self,
        name: &str,
        handler: InputHandler,
    ) -> Result<Box<dyn InputConnection>>;

    /// Opens the output at `index`, which must still be called `name`.
    fn open_output(&self, index: usize, name: &str) -> Result<Box<dyn OutputConnection>>;
}

/// Which side of the driver a registry or port belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    pub fn names(self, backend: &dyn MidiBackend) -> Result<Vec<String>> {
        match self {
            PortDirection::Input => backend.input_names(),
            PortDirection::Output => backend.output_names(),
        }
    }
}

/// [`MidiBackend`] over `midir`.
///
/// Every call creates a fresh `midir` client, so the port list always
/// reflects the devices present right now.
pub struct MidirBackend {
    client_name: String,
}

impl MidirBackend {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    fn input_client(&self) -> Result<MidiInput> {
        let mut midi_in = MidiInput::new(&self.client_name)?;
        // sysex, timing and active sensing must all reach the translator
        midi_in.ignore(Ignore::None);
        Ok(midi_in)
    }
}

impl MidiBackend for MidirBackend {
    fn input_names(&self) -> Result<Vec<String>> {
        let midi_in = self.input_client()?;
        midi_in
            .ports()
            .iter()
            .map(|p| midi_in.port_name(p).map_err(Error::from))
            .collect()
    }

    fn output_names(&self) -> Result<Vec<String>> {
        let midi_out = MidiOutput::new(&self.client_name)?;
        midi_out
            .ports()
            .iter()
            .map(|p| midi_out.port_name(p).map_err(Error::from))
            .collect()
    }

    fn open_input(
        &self,
        index: usize,
        name: &str,
        mut handler: InputHandler,
    ) -> Result<Box<dyn InputConnection>> {
        let midi_in = self.input_client()?;
        let ports = midi_in.ports();
        let port = ports
            .get(index)
            .filter(|p| midi_in.port_name(p).map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| Error::DeviceNotFound(name.to_string()))?
            .clone();

        let conn = midi_in.connect(
            &port,
            &self.client_name,
            move |stamp, bytes, _| handler(stamp, bytes),
            (),
        )?;
        Ok(Box::new(MidirInput(conn)))
    }

    #[cfg(unix)]
    fn create_virtual_input(
        &self,
        name: &str,
        mut handler: InputHandler,
    ) -> Result<Box<dyn InputConnection>> {
        use midir::os::unix::VirtualInput;

        let midi_in = self.input_client()?;
        let conn = midi_in.create_virtual(name, move |stamp, bytes, _| handler(stamp, bytes), ())?;
        Ok(Box::new(MidirInput(conn)))
    }

    #[cfg(not(unix))]
    fn create_virtual_input(
        &self,
        name: &str,
        _handler: InputHandler,
    ) -> Result<Box<dyn InputConnection>> {
        Err(Error::Midi(format!(
            "virtual input {name} is not supported on this platform"
        )))
    }

    fn open_output(&self, index: usize, name: &str) -> Result<Box<dyn OutputConnection>> {
        let midi_out = MidiOutput::new(&self.client_name)?;
        let ports = midi_out.ports();
        let port = ports
            .get(index)
            .filter(|p| midi_out.port_name(p).map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| Error::DeviceNotFound(name.to_string()))?
            .clone();

        let conn = midi_out.connect(&port, &self.client_name)?;
        Ok(Box::new(MidirOutput(conn)))
    }
}

struct MidirInput(MidiInputConnection<()>);

impl InputConnection for MidirInput {
    fn close(self: Box<Self>) {
        let _ = self.0.close();
    }
}

struct MidirOutput(MidiOutputConnection);

impl OutputConnection for MidirOutput {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.0.send(bytes)?;
        Ok(())
    }

    fn close(self: Box<Self>) {
        let _ = self.0.close();
    }
}
