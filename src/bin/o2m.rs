use clap::Parser;
use log::info;
use midi_osc_bridge::config::{init_logging, O2mOptions};
use midi_osc_bridge::hotplug::POLL_INTERVAL;
use midi_osc_bridge::o2m::OscToMidiBridge;
use midi_osc_bridge::osc::{OscReceiver, OscSender};
use midi_osc_bridge::{DeviceRegistry, MidirBackend, PortDirection};
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn Error>> {
    let opts = O2mOptions::parse();
    init_logging(opts.monitor);

    let backend = Arc::new(MidirBackend::new("o2m"));
    let registry = Arc::new(DeviceRegistry::new(backend, PortDirection::Output));

    if opts.list {
        let outputs = registry.enumerate()?;
        println!("Found {} MIDI outputs.", outputs.len());
        for (i, name) in outputs.iter().enumerate() {
            println!("   ({}): {}", i, name);
        }
        return Ok(());
    }

    let bridge = OscToMidiBridge::new(Arc::clone(&registry), opts.selection());
    bridge.rebuild();

    let receiver = OscReceiver::bind(opts.osc_port)?;
    info!("Listening for OSC on {}", receiver.local_addr()?);

    let heartbeat = if opts.heartbeat {
        Some(OscSender::new(&opts.osc_host, opts.heartbeat_port)?)
    } else {
        None
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        let interrupter = receiver.interrupter()?;
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::SeqCst);
            interrupter.interrupt();
        })?;
    }

    bridge.run(receiver, POLL_INTERVAL, heartbeat, shutdown)?;
    Ok(())
}
