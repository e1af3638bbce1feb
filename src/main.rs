//! Host simulator. Stands in for the watch platform: platform callbacks are
//! read as JSON lines from stdin, and frames are drawn to an in-memory
//! display (optionally dumped to disk).

use anyhow::Context;
use embedded_graphics::geometry::Size;
use log::{error, info, warn, LevelFilter};
use std::{
    io::{self, BufRead},
    sync::mpsc::{self, Sender},
    thread,
    time::Duration,
};
use weatherface::{
    config::Config,
    engine::Engine,
    icon::IconSet,
    mock_display::MockDisplay,
    peer::{PeerChannel, PutDataRequest},
    runner::{HostEvent, Runner},
};

/// The platform sends a time tick once a minute
const TIME_TICK_INTERVAL: Duration = Duration::from_secs(60);

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_module("weatherface", LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = Config::load_or_default();
    let (sender, receiver) = mpsc::channel();

    let ctrlc_sender = sender.clone();
    ctrlc::set_handler(move || {
        // If the loop is already gone there's nothing left to stop
        let _ = ctrlc_sender.send(HostEvent::Destroy);
    })
    .context("Error setting Ctrl-C handler")?;

    let peer = LoopbackPeer {
        events: sender.clone(),
        connected: false,
    };
    let engine =
        Engine::new(&config, IconSet::placeholder(config.icon_size), peer);
    info!("Watch face style: {:?}", engine.style());
    let display = MockDisplay::new(Size::new(config.width, config.height));
    let mut runner = Runner::new(engine, display, config.frame_path);

    // Connect before reading stdin, so piped weather isn't dropped
    runner.show();
    read_stdin(sender.clone());
    tick_time(sender);

    println!("Reading host events from stdin, Ctrl-c to exit...");
    runner.run(receiver);
    Ok(())
}

/// Peer channel with nobody on the other end. Connecting always succeeds,
/// and outbound items are only logged. Weather comes in through stdin.
struct LoopbackPeer {
    events: Sender<HostEvent>,
    connected: bool,
}

impl LoopbackPeer {
    fn send(&self, event: HostEvent) {
        if self.events.send(event).is_err() {
            warn!("Event loop closed, dropping peer event");
        }
    }
}

impl PeerChannel for LoopbackPeer {
    fn connect(&mut self) {
        if !self.connected {
            self.connected = true;
            self.send(HostEvent::Connected);
        }
    }

    fn disconnect(&mut self) {
        info!("Peer channel disconnected");
        self.connected = false;
    }

    fn add_listener(&mut self) {
        info!("Peer listener added");
    }

    fn remove_listener(&mut self) {
        info!("Peer listener removed");
    }

    fn put_data_item(&mut self, request: PutDataRequest) -> anyhow::Result<()> {
        let json = serde_json::to_string(&request)
            .context("Error serializing data item")?;
        info!("Sending data item: {json}");
        Ok(())
    }
}

/// Spawn a thread that forwards host events from stdin, one JSON object per
/// line
fn read_stdin(sender: Sender<HostEvent>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    error!("Error reading stdin: {err}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HostEvent>(&line) {
                Ok(event) => {
                    if sender.send(event).is_err() {
                        break;
                    }
                }
                Err(err) => error!("Invalid host event `{line}`: {err}"),
            }
        }
    });
}

/// Spawn a thread that plays the platform's once-a-minute time tick
fn tick_time(sender: Sender<HostEvent>) {
    thread::spawn(move || loop {
        thread::sleep(TIME_TICK_INTERVAL);
        if sender.send(HostEvent::TimeTick).is_err() {
            break;
        }
    });
}
