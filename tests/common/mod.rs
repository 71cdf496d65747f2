//! In-memory MIDI backend for driving the bridges without hardware.

#![allow(dead_code)]

use midi_osc_bridge::backend::{InputConnection, InputHandler, MidiBackend, OutputConnection};
use midi_osc_bridge::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Shared {
    handlers: Mutex<HashMap<String, InputHandler>>,
    sent: Mutex<Vec<(String, Vec<u8>)>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
}

#[derive(Default)]
pub struct MemoryBackend {
    inputs: Mutex<Vec<String>>,
    outputs: Mutex<Vec<String>>,
    shared: Arc<Shared>,
}

impl MemoryBackend {
    pub fn new(inputs: &[&str], outputs: &[&str]) -> Arc<Self> {
        let backend = Self::default();
        backend.set_inputs(inputs);
        backend.set_outputs(outputs);
        Arc::new(backend)
    }

    pub fn set_inputs(&self, names: &[&str]) {
        *self.inputs.lock() = names.iter().map(|s| s.to_string()).collect();
    }

    pub fn set_outputs(&self, names: &[&str]) {
        *self.outputs.lock() = names.iter().map(|s| s.to_string()).collect();
    }

    /// Delivers `bytes` as if the device called `name` produced them.
    pub fn inject(&self, name: &str, bytes: &[u8]) -> bool {
        match self.shared.handlers.lock().get_mut(name) {
            Some(handler) => {
                handler(0, bytes);
                true
            }
            None => false,
        }
    }

    pub fn is_input_open(&self, name: &str) -> bool {
        self.shared.handlers.lock().contains_key(name)
    }

    pub fn sent(&self) -> Vec<(String, Vec<u8>)> {
        self.shared.sent.lock().clone()
    }

    pub fn clear_sent(&self) {
        self.shared.sent.lock().clear();
    }

    pub fn opens(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    fn check(list: &Mutex<Vec<String>>, index: usize, name: &str) -> Result<()> {
        match list.lock().get(index) {
            Some(n) if n == name => Ok(()),
            _ => Err(Error::DeviceNotFound(name.to_string())),
        }
    }

    fn attach(&self, name: &str, handler: InputHandler) -> Box<dyn InputConnection> {
        self.shared
            .handlers
            .lock()
            .insert(name.to_string(), handler);
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        Box::new(MemoryInput {
            name: name.to_string(),
            shared: Arc::clone(&self.shared),
        })
    }
}

impl MidiBackend for MemoryBackend {
    fn input_names(&self) -> Result<Vec<String>> {
        Ok(self.inputs.lock().clone())
    }

    fn output_names(&self) -> Result<Vec<String>> {
        Ok(self.outputs.lock().clone())
    }

    fn open_input(
        &self,
        index: usize,
        name: &str,
        handler: InputHandler,
    ) -> Result<Box<dyn InputConnection>> {
        Self::check(&self.inputs, index, name)?;
        Ok(self.attach(name, handler))
    }

    fn create_virtual_input(
        &self,
        name: &str,
        handler: InputHandler,
    ) -> Result<Box<dyn InputConnection>> {
        if name.is_empty() {
            return Err(Error::Midi("empty virtual port name".into()));
        }
        Ok(self.attach(name, handler))
    }

    fn open_output(&self, index: usize, name: &str) -> Result<Box<dyn OutputConnection>> {
        Self::check(&self.outputs, index, name)?;
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryOutput {
            name: name.to_string(),
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct MemoryInput {
    name: String,
    shared: Arc<Shared>,
}

impl InputConnection for MemoryInput {
    fn close(self: Box<Self>) {
        self.shared.handlers.lock().remove(&self.name);
        self.shared.closes.fetch_add(1, Ordering::SeqCst);
    }
}

struct MemoryOutput {
    name: String,
    shared: Arc<Shared>,
}

impl OutputConnection for MemoryOutput {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.shared
            .sent
            .lock()
            .push((self.name.clone(), bytes.to_vec()));
        Ok(())
    }

    fn close(self: Box<Self>) {
        self.shared.closes.fetch_add(1, Ordering::SeqCst);
    }
}
