//! Error type shared by the MIDI and OSC halves of the bridge.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("MIDI device not found: {0}")]
    DeviceNotFound(String),

    #[error("MIDI error: {0}")]
    Midi(String),

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("OSC codec error: {0}")]
    Osc(String),

    #[error("malformed OSC message: {0}")]
    Malformed(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<rosc::OscError> for Error {
    fn from(e: rosc::OscError) -> Self {
        Error::Osc(format!("{e:?}"))
    }
}

impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::Midi(e.to_string())
    }
}

impl From<midir::PortInfoError> for Error {
    fn from(e: midir::PortInfoError) -> Self {
        Error::Midi(e.to_string())
    }
}

impl From<midir::SendError> for Error {
    fn from(e: midir::SendError) -> Self {
        Error::Midi(e.to_string())
    }
}

impl From<midir::ConnectError<midir::MidiInput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        Error::Midi(e.to_string())
    }
}

impl From<midir::ConnectError<midir::MidiOutput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiOutput>) -> Self {
        Error::Midi(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
