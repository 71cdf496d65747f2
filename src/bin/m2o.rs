use clap::Parser;
use log::{error, info};
use midi_osc_bridge::config::{init_logging, M2oOptions};
use midi_osc_bridge::hotplug::POLL_INTERVAL;
use midi_osc_bridge::m2o::MidiToOscBridge;
use midi_osc_bridge::midi_to_osc::{MidiInProcessor, MidiToOscTranslator, OscTemplate};
use midi_osc_bridge::osc::OscSender;
use midi_osc_bridge::{DeviceRegistry, MidirBackend, PortDirection};
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn Error>> {
    let opts = M2oOptions::parse();
    init_logging(opts.monitor);

    let backend = Arc::new(MidirBackend::new("m2o"));
    let registry = Arc::new(DeviceRegistry::new(backend, PortDirection::Input));

    if opts.list {
        let inputs = registry.enumerate()?;
        println!("Found {} MIDI inputs.", inputs.len());
        for (i, name) in inputs.iter().enumerate() {
            println!("   ({}): {}", i, name);
        }
        return Ok(());
    }

    let mut destinations = Vec::new();
    for port in opts.osc_ports() {
        let sender = OscSender::new(&opts.osc_host, port)?;
        info!("Sending OSC to {}", sender.destination());
        destinations.push(sender);
    }

    let translator = MidiToOscTranslator::new(opts.osc_template.clone().map(OscTemplate::new), opts.raw);
    let processor = MidiInProcessor::new(Arc::new(translator), Arc::new(destinations));
    let mut bridge = MidiToOscBridge::new(Arc::clone(&registry), opts.selection(), processor);

    if let Some(name) = &opts.virtual_input {
        if let Err(e) = bridge.open_virtual(name) {
            error!("Could not create virtual input {}: {}", name, e);
            return Err(e.into());
        }
    }
    bridge.rebuild();

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst))?;
    }

    bridge.run(POLL_INTERVAL, opts.heartbeat, &shutdown)?;
    Ok(())
}
