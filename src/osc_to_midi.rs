//! OSC→MIDI translation.
//!
//! Inbound addresses look like `/<device>/<command>`. The device segment is
//! parsed but every message goes to every open output.

use crate::error::{Error, Result};
use crate::port::MidiOutputPort;
use log::{debug, error, warn};
use parking_lot::Mutex;
use rosc::{OscMessage, OscPacket, OscType};
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Raw,
    NoteOn,
    NoteOff,
    ControlChange,
    PitchBend,
    ChannelPressure,
    PolyPressure,
    ProgramChange,
    Clock,
    Start,
    Continue,
    Stop,
    ActiveSense,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "raw" => Command::Raw,
            "note_on" => Command::NoteOn,
            "note_off" => Command::NoteOff,
            "control_change" => Command::ControlChange,
            "pitch_bend" => Command::PitchBend,
            "channel_pressure" => Command::ChannelPressure,
            "poly_pressure" => Command::PolyPressure,
            "program_change" => Command::ProgramChange,
            "clock" => Command::Clock,
            "start" => Command::Start,
            "continue" => Command::Continue,
            "stop" => Command::Stop,
            "active_sense" => Command::ActiveSense,
            other => return Err(Error::Malformed(format!("unknown command {other}"))),
        })
    }
}

/// Splits `/<device>/<command>`; both segments are `[A-Za-z0-9_]+`.
pub fn parse_address(addr: &str) -> Option<(&str, &str)> {
    let rest = addr.strip_prefix('/')?;
    let (device, command) = rest.split_once('/')?;
    let valid = |s: &str| {
        !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
    };
    (valid(device) && valid(command)).then_some((device, command))
}

/// Decodes one OSC message into the MIDI bytes it describes.
pub fn translate(message: &OscMessage) -> Result<Vec<u8>> {
    let (_device, command) = parse_address(&message.addr).ok_or_else(|| {
        Error::Malformed(format!(
            "address {} does not match /<device>/<command>",
            message.addr
        ))
    })?;
    let command: Command = command.parse()?;
    let args = &message.args;

    match command {
        Command::Raw => raw_bytes(args),
        Command::NoteOn => {
            let [channel, note, velocity] = ints::<3>(args)?;
            Ok(vec![0x90 | channel_nibble(channel)?, data(note), data(velocity)])
        }
        Command::NoteOff => {
            let [channel, note, velocity] = ints::<3>(args)?;
            Ok(vec![0x80 | channel_nibble(channel)?, data(note), data(velocity)])
        }
        Command::ControlChange => {
            let [channel, controller, value] = ints::<3>(args)?;
            Ok(vec![0xB0 | channel_nibble(channel)?, data(controller), data(value)])
        }
        Command::PitchBend => {
            let [channel, value] = ints::<2>(args)?;
            let value = value.clamp(0, 0x3FFF);
            Ok(vec![
                0xE0 | channel_nibble(channel)?,
                (value & 0x7F) as u8,
                ((value >> 7) & 0x7F) as u8,
            ])
        }
        Command::ChannelPressure => {
            let [channel, value] = ints::<2>(args)?;
            Ok(vec![0xD0 | channel_nibble(channel)?, data(value)])
        }
        Command::PolyPressure => {
            let [channel, note, value] = ints::<3>(args)?;
            Ok(vec![0xA0 | channel_nibble(channel)?, data(note), data(value)])
        }
        Command::ProgramChange => {
            let [channel, program] = ints::<2>(args)?;
            Ok(vec![0xC0 | channel_nibble(channel)?, data(program)])
        }
        Command::Clock => realtime(args, 0xF8),
        Command::Start => realtime(args, 0xFA),
        Command::Continue => realtime(args, 0xFB),
        Command::Stop => realtime(args, 0xFC),
        Command::ActiveSense => realtime(args, 0xFE),
    }
}

fn raw_bytes(args: &[OscType]) -> Result<Vec<u8>> {
    let bytes = match args {
        [OscType::Blob(blob)] => blob.clone(),
        _ => args
            .iter()
            .map(|arg| match arg {
                OscType::Int(v) => Ok(*v as u8),
                other => Err(Error::Malformed(format!("raw expects int32 bytes, got {other:?}"))),
            })
            .collect::<Result<Vec<u8>>>()?,
    };
    if bytes.is_empty() {
        return Err(Error::Malformed("raw message has no bytes".into()));
    }
    Ok(bytes)
}

fn realtime(args: &[OscType], status: u8) -> Result<Vec<u8>> {
    if !args.is_empty() {
        return Err(Error::Malformed(format!(
            "expected no arguments, got {}",
            args.len()
        )));
    }
    Ok(vec![status])
}

fn ints<const N: usize>(args: &[OscType]) -> Result<[i32; N]> {
    if args.len() != N {
        return Err(Error::Malformed(format!(
            "expected {N} int32 arguments, got {}",
            args.len()
        )));
    }
    let mut out = [0; N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = match arg {
            OscType::Int(v) => *v,
            other => return Err(Error::Malformed(format!("expected int32, got {other:?}"))),
        };
    }
    Ok(out)
}

/// Channels are 1-16 on the wire.
fn channel_nibble(channel: i32) -> Result<u8> {
    if (1..=16).contains(&channel) {
        Ok((channel - 1) as u8)
    } else {
        Err(Error::Malformed(format!("channel {channel} out of range 1-16")))
    }
}

fn data(value: i32) -> u8 {
    (value & 0x7F) as u8
}

/// Open MIDI outputs shared between the receive loop and the hot-plug thread.
pub type SharedOutputs = Arc<Mutex<Vec<MidiOutputPort>>>;

/// Receive side of the OSC→MIDI bridge.
pub struct OscInProcessor {
    outputs: SharedOutputs,
}

impl OscInProcessor {
    pub fn new(outputs: SharedOutputs) -> Self {
        Self { outputs }
    }

    /// Handles a packet; bundles are unpacked recursively. Malformed messages
    /// are logged and skipped without affecting their siblings.
    pub fn handle_packet(&self, packet: &OscPacket) {
        match packet {
            OscPacket::Message(message) => self.handle_message(message),
            OscPacket::Bundle(bundle) => {
                for inner in &bundle.content {
                    self.handle_packet(inner);
                }
            }
        }
    }

    pub fn handle_message(&self, message: &OscMessage) {
        debug!("received OSC message {} {:?}", message.addr, message.args);
        let bytes = match translate(message) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Discarding OSC message {}: {e}", message.addr);
                return;
            }
        };

        let mut outputs = self.outputs.lock();
        for output in outputs.iter_mut() {
            debug!("sending MIDI {:02x?} to {}", bytes, output.name());
            if let Err(e) = output.send(&bytes) {
                error!("Failed to send MIDI to {}: {e}", output.name());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(addr: &str, args: Vec<OscType>) -> OscMessage {
        OscMessage {
            addr: addr.to_string(),
            args,
        }
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("/Keys_1/note_on"), Some(("Keys_1", "note_on")));
        assert_eq!(parse_address("/note_on"), None);
        assert_eq!(parse_address("/a b/note_on"), None);
        assert_eq!(parse_address("/a/b/c"), None);
        assert_eq!(parse_address("a/note_on"), None);
    }

    #[test]
    fn test_note_on() {
        let bytes = translate(&msg(
            "/anyDevice/note_on",
            vec![OscType::Int(1), OscType::Int(60), OscType::Int(100)],
        ))
        .unwrap();
        assert_eq!(bytes, vec![0x90, 60, 100]);
    }

    #[test]
    fn test_arity_mismatch_is_malformed() {
        let result = translate(&msg(
            "/anyDevice/note_on",
            vec![OscType::Int(1), OscType::Int(60)],
        ));
        assert!(matches!(result, Err(Error::Malformed(_))));
    }

    #[test]
    fn test_wrong_type_is_malformed() {
        let result = translate(&msg(
            "/dev/program_change",
            vec![OscType::Int(1), OscType::Float(3.0)],
        ));
        assert!(matches!(result, Err(Error::Malformed(_))));
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        let result = translate(&msg("/dev/Note_On", vec![]));
        assert!(matches!(result, Err(Error::Malformed(_))));
    }

    #[test]
    fn test_pitch_bend_splits_fourteen_bits() {
        let bytes = translate(&msg(
            "/dev/pitch_bend",
            vec![OscType::Int(16), OscType::Int(8192)],
        ))
        .unwrap();
        assert_eq!(bytes, vec![0xEF, 0x00, 0x40]);
    }

    #[test]
    fn test_raw_blob_and_ints() {
        let blob = translate(&msg(
            "/dev/raw",
            vec![OscType::Blob(vec![0xF0, 0x7E, 0xF7])],
        ))
        .unwrap();
        assert_eq!(blob, vec![0xF0, 0x7E, 0xF7]);

        let ints = translate(&msg(
            "/dev/raw",
            vec![OscType::Int(0x1B0), OscType::Int(7), OscType::Int(127)],
        ))
        .unwrap();
        assert_eq!(ints, vec![0xB0, 7, 127]);
    }

    #[test]
    fn test_realtime_commands() {
        assert_eq!(translate(&msg("/d/clock", vec![])).unwrap(), vec![0xF8]);
        assert_eq!(translate(&msg("/d/start", vec![])).unwrap(), vec![0xFA]);
        assert_eq!(translate(&msg("/d/continue", vec![])).unwrap(), vec![0xFB]);
        assert_eq!(translate(&msg("/d/stop", vec![])).unwrap(), vec![0xFC]);
        assert_eq!(translate(&msg("/d/active_sense", vec![])).unwrap(), vec![0xFE]);
        assert!(translate(&msg("/d/stop", vec![OscType::Int(1)])).is_err());
    }

    #[test]
    fn test_channel_out_of_range() {
        let result = translate(&msg(
            "/d/control_change",
            vec![OscType::Int(0), OscType::Int(7), OscType::Int(1)],
        ));
        assert!(matches!(result, Err(Error::Malformed(_))));
    }
}
