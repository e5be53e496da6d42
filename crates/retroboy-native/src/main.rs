use anyhow::Context;
use retroboy_host::runtime;
use retroboy_host::{HostCommand, HostConfig, HostEvent, ToneCore};
use std::io::BufRead;
use std::path::Path;

const HELP: &str = "Commands: play, pause, resume, reset, load, quit";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Optional JSON config as the first argument
    let config = match std::env::args().nth(1) {
        Some(path) => HostConfig::load(Path::new(&path))?,
        None => HostConfig::default(),
    };

    log::debug!("Config: {:?}", config);
    let tone = config.tone.clone();
    let host = runtime::spawn(move || ToneCore::new(tone), &config)?;

    let events = host.events();
    let printer = std::thread::Builder::new()
        .name("events".into())
        .spawn(move || {
            for event in events.iter() {
                match event {
                    HostEvent::Loaded(metadata) => println!("Loaded \"{}\"", metadata.title),
                    HostEvent::StatusChanged(status) => println!("Status: {status:?}"),
                    HostEvent::ResetDeferred => println!("Reset pending"),
                    HostEvent::Halted(reason) => println!("Halted: {reason}"),
                    HostEvent::Rejected(reason) => println!("Rejected: {reason}"),
                    HostEvent::Stopped(stats) => println!("{stats:#?}"),
                }
            }
        })
        .context("Failed to spawn the event printer")?;

    let load = || HostCommand::Load {
        rom: Vec::new(),
        settings: config.settings.clone(),
    };
    host.send(load());
    println!("{HELP}");

    for line in std::io::stdin().lock().lines() {
        let line = line.context("Failed to read stdin")?;
        let command = match line.trim() {
            "play" => HostCommand::Play,
            "pause" => HostCommand::Pause,
            "resume" => HostCommand::Resume,
            "reset" => HostCommand::Reset,
            // A reset drops the cartridge
            "load" => load(),
            "quit" | "exit" => break,
            "" => continue,
            other => {
                println!("Unknown command '{other}'. {HELP}");
                continue;
            }
        };
        host.send(command);
    }

    host.shutdown()?;
    // Ends once the scheduler thread has dropped its sender
    printer
        .join()
        .map_err(|_| anyhow::anyhow!("Event printer panicked"))
}
