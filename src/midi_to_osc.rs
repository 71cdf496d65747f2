//! MIDI→OSC translation.

use crate::message::{classify, MessageType};
use crate::osc::{osc_name, OscSender};
use crate::port::PortLabel;
use log::{debug, log_enabled, warn, Level};
use rosc::{OscMessage, OscType};
use std::sync::Arc;

/// Address template with `$n` (port name), `$i` (sticky id), `$c` (channel)
/// and `$m` (message type) placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OscTemplate(String);

impl OscTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Substitutes `$m`, `$c`, `$i` then `$n`, collapses repeated slashes and
    /// drops one trailing slash. A missing channel substitutes as empty.
    pub fn render(
        &self,
        name: &str,
        sticky_id: u32,
        channel: Option<u8>,
        message_type: &str,
    ) -> String {
        let channel = channel.map(|c| c.to_string()).unwrap_or_default();
        let substituted = self
            .0
            .replace("$m", message_type)
            .replace("$c", &channel)
            .replace("$i", &sticky_id.to_string())
            .replace("$n", name);

        let mut path = String::with_capacity(substituted.len());
        for c in substituted.chars() {
            if c == '/' && path.ends_with('/') {
                continue;
            }
            path.push(c);
        }
        if path.len() > 1 && path.ends_with('/') {
            path.pop();
        }
        path
    }
}

/// Turns raw MIDI bytes from one port into an OSC message.
#[derive(Debug, Clone, Default)]
pub struct MidiToOscTranslator {
    template: Option<OscTemplate>,
    raw: bool,
}

impl MidiToOscTranslator {
    pub fn new(template: Option<OscTemplate>, raw: bool) -> Self {
        Self { template, raw }
    }

    /// Returns `None` only for an empty message; anything else is forwarded,
    /// even when its length does not match its type.
    pub fn translate(&self, port: &PortLabel, bytes: &[u8]) -> Option<OscMessage> {
        let Some(&status) = bytes.first() else {
            warn!("Discarding empty MIDI message from {}", port.name);
            return None;
        };

        let class = classify(status);
        let message_type = class.message_type();
        let mut forwarded = bytes.len();
        match message_type.expected_len() {
            Some(expected) if expected != bytes.len() => warn!(
                "{} from {} has {} bytes, expected {}; forwarding as received",
                message_type,
                port.name,
                bytes.len(),
                expected
            ),
            None if message_type == MessageType::Sysex && !self.raw => {
                // the end-of-sysex marker is not forwarded
                if bytes.len() > 1 && bytes[bytes.len() - 1] == 0xF7 {
                    forwarded -= 1;
                }
            }
            _ => {}
        }

        let name = osc_name(&port.name);
        let addr = match &self.template {
            Some(template) => {
                template.render(&name, port.sticky_id, class.channel(), message_type.as_str())
            }
            None => match class.channel() {
                Some(channel) => format!("/midi/{}/{}/{}", port.sticky_id, channel, message_type),
                None => format!("/midi/{}/{}", port.sticky_id, message_type),
            },
        };

        let mut args = vec![OscType::Int(port.sticky_id as i32), OscType::String(name)];
        if self.raw {
            args.push(OscType::Blob(bytes.to_vec()));
        } else {
            args.extend(bytes[1..forwarded].iter().map(|&b| OscType::Int(b as i32)));
        }

        Some(OscMessage { addr, args })
    }
}

/// Callback side of the MIDI→OSC bridge: one per open input port.
///
/// Cloned into the driver callback; holds the translator and the shared
/// destination list, never the port itself.
#[derive(Clone)]
pub struct MidiInProcessor {
    translator: Arc<MidiToOscTranslator>,
    destinations: Arc<Vec<OscSender>>,
}

impl MidiInProcessor {
    pub fn new(translator: Arc<MidiToOscTranslator>, destinations: Arc<Vec<OscSender>>) -> Self {
        Self {
            translator,
            destinations,
        }
    }

    pub fn on_midi(&self, port: &PortLabel, _stamp: u64, bytes: &[u8]) {
        if log_enabled!(Level::Debug) {
            debug!("received MIDI message from {}: {}", port.name, dump_midi(bytes));
        }

        let Some(message) = self.translator.translate(port, bytes) else {
            return;
        };
        debug!("prepared OSC: [{}] -> {:?}", message.addr, message.args);

        self.broadcast(message);
    }

    /// Sends `message` to every configured destination.
    pub fn broadcast(&self, message: OscMessage) {
        let packet = rosc::OscPacket::Message(message);
        for destination in self.destinations.iter() {
            destination.send_packet(&packet);
        }
    }
}

fn dump_midi(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("[{b:02x}]")).collect()
}
