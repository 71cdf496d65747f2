//! Command-line options for the `m2o` and `o2m` binaries.

use clap::Parser;
use env_logger::Env;

pub const DEFAULT_OSC_OUT_PORT: u16 = 57120;
pub const DEFAULT_OSC_IN_PORT: u16 = 57200;

/// Forward MIDI input ports to OSC over UDP.
#[derive(Parser, Debug, Clone)]
#[command(name = "m2o", version, about)]
pub struct M2oOptions {
    /// List input MIDI devices and exit
    #[arg(long)]
    pub list: bool,

    /// MIDI input device (default: all), can be given multiple times
    #[arg(short = 'i', long = "midiin", value_name = "NAME")]
    pub midi_inputs: Vec<String>,

    /// Create a virtual MIDI input with this name
    #[arg(short = 'v', long = "virtualin", value_name = "NAME")]
    pub virtual_input: Option<String>,

    /// OSC destination host
    #[arg(short = 'O', long = "oschost", default_value = "127.0.0.1")]
    pub osc_host: String,

    /// OSC destination port (default: 57120), can be given multiple times
    #[arg(short = 'o', long = "oscout", value_name = "PORT")]
    pub osc_ports: Vec<u16>,

    /// OSC address template ($n: port name, $i: port id, $c: channel, $m: message type)
    #[arg(short = 't', long = "osctemplate")]
    pub osc_template: Option<String>,

    /// Send the raw MIDI bytes as a blob instead of one int per data byte
    #[arg(short = 'r', long = "oscrawmidimessage")]
    pub raw: bool,

    /// Send /midi/heartbeat with the open ports every second
    #[arg(short = 'H', long)]
    pub heartbeat: bool,

    /// Monitor level: 1 logs MIDI and OSC traffic, 2 also dumps UDP datagrams
    #[arg(short = 'm', long, default_value_t = 0, num_args = 0..=1, default_missing_value = "1")]
    pub monitor: u8,
}

impl M2oOptions {
    pub fn osc_ports(&self) -> Vec<u16> {
        if self.osc_ports.is_empty() {
            vec![DEFAULT_OSC_OUT_PORT]
        } else {
            self.osc_ports.clone()
        }
    }

    pub fn selection(&self) -> PortSelection {
        PortSelection::from_names(&self.midi_inputs, self.virtual_input.is_some())
    }
}

/// Forward OSC messages to MIDI output ports.
#[derive(Parser, Debug, Clone)]
#[command(name = "o2m", version, about)]
pub struct O2mOptions {
    /// List output MIDI devices and exit
    #[arg(long)]
    pub list: bool,

    /// MIDI output device (default: all), can be given multiple times
    #[arg(short = 'o', long = "midiout", value_name = "NAME")]
    pub midi_outputs: Vec<String>,

    /// OSC port to listen on
    #[arg(short = 'i', long = "oscport", default_value_t = DEFAULT_OSC_IN_PORT)]
    pub osc_port: u16,

    /// Send /o2m/heartbeat with the open ports every second
    #[arg(short = 'H', long)]
    pub heartbeat: bool,

    /// Heartbeat destination host
    #[arg(short = 'O', long = "oschost", default_value = "127.0.0.1")]
    pub osc_host: String,

    /// Heartbeat destination port
    #[arg(long = "heartbeat-port", default_value_t = DEFAULT_OSC_OUT_PORT)]
    pub heartbeat_port: u16,

    /// Monitor level: 1 logs OSC and MIDI traffic, 2 also dumps UDP datagrams
    #[arg(short = 'm', long, default_value_t = 0, num_args = 0..=1, default_missing_value = "1")]
    pub monitor: u8,
}

impl O2mOptions {
    pub fn selection(&self) -> PortSelection {
        PortSelection::from_names(&self.midi_outputs, false)
    }
}

/// Which driver ports a bridge keeps open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortSelection {
    /// Whatever the driver currently lists.
    All,
    Named(Vec<String>),
}

impl PortSelection {
    /// No names means all ports, unless a virtual port replaces them.
    pub fn from_names(names: &[String], has_virtual: bool) -> Self {
        if names.is_empty() && !has_virtual {
            PortSelection::All
        } else {
            PortSelection::Named(names.to_vec())
        }
    }

    pub fn names_to_open(&self, available: &[String]) -> Vec<String> {
        match self {
            PortSelection::All => available.to_vec(),
            PortSelection::Named(names) => names.clone(),
        }
    }
}

/// Installs `env_logger`; `RUST_LOG` overrides the monitor level.
pub fn init_logging(monitor: u8) {
    let level = match monitor {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();
}
