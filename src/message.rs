//! MIDI status-byte taxonomy.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    NoteOff,
    NoteOn,
    PolyphonicKeyPressure,
    ControlChange,
    ProgramChange,
    ChannelPressure,
    PitchBendChange,
    Sysex,
    SyscommonMtc,
    SyscommonSongPosition,
    SyscommonSongSelect,
    SyscommonUndefined,
    SyscommonTuneRequest,
    SysrtTimingTick,
    SysrtUndefined,
    SysrtStartSong,
    SysrtContinueSong,
    SysrtStopSong,
    SysrtActiveSensing,
    Unknown,
}

impl MessageType {
    /// Name used in OSC addresses.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::NoteOff => "note_off",
            MessageType::NoteOn => "note_on",
            MessageType::PolyphonicKeyPressure => "polyphonic_key_pressure",
            MessageType::ControlChange => "control_change",
            MessageType::ProgramChange => "program_change",
            MessageType::ChannelPressure => "channel_pressure",
            MessageType::PitchBendChange => "pitch_bend_change",
            MessageType::Sysex => "sysex",
            MessageType::SyscommonMtc => "syscommon_MTC",
            MessageType::SyscommonSongPosition => "syscommon_song_position",
            MessageType::SyscommonSongSelect => "syscommon_song_select",
            MessageType::SyscommonUndefined => "syscommon_undefined",
            MessageType::SyscommonTuneRequest => "syscommon_tune_request",
            MessageType::SysrtTimingTick => "sysrt_timing_tick",
            MessageType::SysrtUndefined => "sysrt_undefined",
            MessageType::SysrtStartSong => "sysrt_start_song",
            MessageType::SysrtContinueSong => "sysrt_continue_song",
            MessageType::SysrtStopSong => "sysrt_stop_song",
            MessageType::SysrtActiveSensing => "sysrt_active_sensing",
            MessageType::Unknown => "unknown_message",
        }
    }

    /// Byte count including the status byte, or `None` when it varies.
    pub fn expected_len(self) -> Option<usize> {
        match self {
            MessageType::NoteOff
            | MessageType::NoteOn
            | MessageType::PolyphonicKeyPressure
            | MessageType::ControlChange
            | MessageType::PitchBendChange
            | MessageType::SyscommonSongPosition => Some(3),
            MessageType::ProgramChange
            | MessageType::ChannelPressure
            | MessageType::SyscommonMtc
            | MessageType::SyscommonSongSelect => Some(2),
            MessageType::SyscommonUndefined
            | MessageType::SyscommonTuneRequest
            | MessageType::SysrtTimingTick
            | MessageType::SysrtUndefined
            | MessageType::SysrtStartSong
            | MessageType::SysrtContinueSong
            | MessageType::SysrtStopSong
            | MessageType::SysrtActiveSensing => Some(1),
            MessageType::Sysex | MessageType::Unknown => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    ChannelVoice { kind: MessageType, channel: u8 },
    SystemCommon(MessageType),
    SystemRealtime(MessageType),
    Unknown,
}

impl Classification {
    pub fn message_type(self) -> MessageType {
        match self {
            Classification::ChannelVoice { kind, .. }
            | Classification::SystemCommon(kind)
            | Classification::SystemRealtime(kind) => kind,
            Classification::Unknown => MessageType::Unknown,
        }
    }

    pub fn channel(self) -> Option<u8> {
        match self {
            Classification::ChannelVoice { channel, .. } => Some(channel),
            _ => None,
        }
    }
}

/// Classifies a message by its status byte.
pub fn classify(status: u8) -> Classification {
    if status & 0xF0 != 0xF0 {
        let channel = status & 0x0F;
        let kind = match status & 0xF0 {
            0x80 => MessageType::NoteOff,
            0x90 => MessageType::NoteOn,
            0xA0 => MessageType::PolyphonicKeyPressure,
            0xB0 => MessageType::ControlChange,
            0xC0 => MessageType::ProgramChange,
            0xD0 => MessageType::ChannelPressure,
            0xE0 => MessageType::PitchBendChange,
            // data byte in status position
            _ => return Classification::Unknown,
        };
        return Classification::ChannelVoice { kind, channel };
    }

    match status {
        0xF0 => Classification::SystemCommon(MessageType::Sysex),
        0xF1 => Classification::SystemCommon(MessageType::SyscommonMtc),
        0xF2 => Classification::SystemCommon(MessageType::SyscommonSongPosition),
        0xF3 => Classification::SystemCommon(MessageType::SyscommonSongSelect),
        0xF4 | 0xF5 => Classification::SystemCommon(MessageType::SyscommonUndefined),
        0xF6 => Classification::SystemCommon(MessageType::SyscommonTuneRequest),
        0xF8 => Classification::SystemRealtime(MessageType::SysrtTimingTick),
        0xF9 | 0xFD => Classification::SystemRealtime(MessageType::SysrtUndefined),
        0xFA => Classification::SystemRealtime(MessageType::SysrtStartSong),
        0xFB => Classification::SystemRealtime(MessageType::SysrtContinueSong),
        0xFC => Classification::SystemRealtime(MessageType::SysrtStopSong),
        0xFE => Classification::SystemRealtime(MessageType::SysrtActiveSensing),
        _ => Classification::Unknown,
    }
}
