//! The host loop. The runner owns the engine and feeds it events one at a
//! time, on a single thread, waking up for the interactive timer whenever no
//! event arrives first.

use crate::{
    engine::{Engine, TapType},
    mock_display::MockDisplay,
    peer::{DataEvent, PeerChannel},
};
use chrono::{FixedOffset, Utc};
use log::{error, info, trace, warn};
use serde::Deserialize;
use std::{
    path::PathBuf,
    sync::mpsc::{Receiver, RecvTimeoutError},
    time::Instant,
};

/// A platform callback, as delivered to the runner. Deserializes from
/// `{"event": "<name>", ...fields}`
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    PropertiesChanged {
        low_bit_ambient: bool,
    },
    TimeTick,
    AmbientModeChanged {
        ambient: bool,
    },
    Tap {
        #[serde(default)]
        tap_type: TapType,
        #[serde(default)]
        x: i32,
        #[serde(default)]
        y: i32,
    },
    VisibilityChanged {
        visible: bool,
    },
    TimeZoneChanged {
        /// Seconds east of UTC. Omit to re-read the system zone
        #[serde(default)]
        offset_seconds: Option<i32>,
    },
    Connected,
    ConnectionSuspended {
        #[serde(default)]
        cause: i32,
    },
    ConnectionFailed {
        #[serde(default)]
        reason: String,
    },
    DataChanged {
        events: Vec<DataEvent>,
    },
    Destroy,
}

pub struct Runner<P> {
    engine: Engine<P>,
    display: MockDisplay,
    /// Dump each frame here, if set
    frame_path: Option<PathBuf>,
}

impl<P: PeerChannel> Runner<P> {
    pub fn new(
        engine: Engine<P>,
        display: MockDisplay,
        frame_path: Option<PathBuf>,
    ) -> Self {
        Self {
            engine,
            display,
            frame_path,
        }
    }

    pub fn engine(&self) -> &Engine<P> {
        &self.engine
    }

    pub fn display(&self) -> &MockDisplay {
        &self.display
    }

    /// Make the face visible and draw the first frame. Call this before
    /// anything else can send events, so the peer's `Connected` is queued
    /// ahead of them.
    pub fn show(&mut self) {
        self.dispatch(HostEvent::VisibilityChanged { visible: true });
        if self.engine.take_invalidated() {
            self.draw();
        }
    }

    /// Process events until [HostEvent::Destroy] arrives or every sender
    /// hangs up
    pub fn run(mut self, events: Receiver<HostEvent>) -> Self {
        info!("Starting watch face loop");
        loop {
            let event = match self.engine.next_update() {
                Some(deadline) => {
                    let timeout =
                        deadline.saturating_duration_since(Instant::now());
                    match events.recv_timeout(timeout) {
                        Ok(event) => Some(event),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match events.recv() {
                    Ok(event) => Some(event),
                    Err(_) => break,
                },
            };

            match event {
                Some(HostEvent::Destroy) => {
                    self.engine.on_destroy();
                    break;
                }
                Some(event) => self.dispatch(event),
                None => self.engine.handle_update_time_message(Utc::now()),
            }

            if self.engine.take_invalidated() {
                self.draw();
            }
        }
        info!("Watch face loop finished");
        self
    }

    /// Hand one event to the matching engine callback
    pub fn dispatch(&mut self, event: HostEvent) {
        trace!("Dispatching {event:?}");
        let engine = &mut self.engine;
        match event {
            HostEvent::PropertiesChanged { low_bit_ambient } => {
                engine.on_properties_changed(low_bit_ambient)
            }
            HostEvent::TimeTick => engine.on_time_tick(),
            HostEvent::AmbientModeChanged { ambient } => {
                engine.on_ambient_mode_changed(ambient)
            }
            HostEvent::Tap { tap_type, x, y } => {
                engine.on_tap_command(tap_type, x, y)
            }
            HostEvent::VisibilityChanged { visible } => {
                engine.on_visibility_changed(visible)
            }
            HostEvent::TimeZoneChanged { offset_seconds } => {
                let offset = offset_seconds.and_then(|seconds| {
                    let offset = FixedOffset::east_opt(seconds);
                    if offset.is_none() {
                        warn!(
                            "Invalid time zone offset {seconds}s, \
                            using system zone"
                        );
                    }
                    offset
                });
                engine.on_time_zone_changed(offset)
            }
            HostEvent::Connected => engine.on_connected(),
            HostEvent::ConnectionSuspended { cause } => {
                engine.on_connection_suspended(cause)
            }
            HostEvent::ConnectionFailed { reason } => {
                engine.on_connection_failed(&reason)
            }
            HostEvent::DataChanged { events } => {
                engine.on_data_changed(&events)
            }
            HostEvent::Destroy => engine.on_destroy(),
        }
    }

    /// Draw a frame. Failures are logged and the loop carries on
    fn draw(&mut self) {
        if let Err(err) = self.engine.on_draw(&mut self.display) {
            error!("Error drawing frame: {err:?}");
            return;
        }
        if let Some(path) = &self.frame_path {
            if let Err(err) = self.display.write_ppm(path) {
                error!("Error saving frame: {err:?}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config, engine::Connection, icon::IconSet, peer::PutDataRequest,
    };
    use embedded_graphics::{geometry::Size, pixelcolor::Rgb888, prelude::Point};
    use std::sync::mpsc::{self, Sender};

    #[derive(Default)]
    struct NullPeer;

    impl PeerChannel for NullPeer {
        fn connect(&mut self) {}

        fn disconnect(&mut self) {}

        fn add_listener(&mut self) {}

        fn remove_listener(&mut self) {}

        fn put_data_item(&mut self, _: PutDataRequest) -> anyhow::Result<()> {
            Ok(())
        }
    }

    /// Answers every connect right away, through the event queue
    struct QueuePeer {
        events: Sender<HostEvent>,
    }

    impl PeerChannel for QueuePeer {
        fn connect(&mut self) {
            self.events.send(HostEvent::Connected).unwrap();
        }

        fn disconnect(&mut self) {}

        fn add_listener(&mut self) {}

        fn remove_listener(&mut self) {}

        fn put_data_item(&mut self, _: PutDataRequest) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn runner() -> Runner<NullPeer> {
        let config = Config::default();
        Runner::new(
            Engine::new(&config, IconSet::placeholder(64), NullPeer),
            MockDisplay::new(Size::new(config.width, config.height)),
            None,
        )
    }

    fn parse(json: &str) -> HostEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_events() {
        assert_eq!(
            parse(r#"{"event": "ambient_mode_changed", "ambient": true}"#),
            HostEvent::AmbientModeChanged { ambient: true }
        );
        assert_eq!(
            parse(r#"{"event": "tap"}"#),
            HostEvent::Tap {
                tap_type: TapType::Tap,
                x: 0,
                y: 0
            }
        );
        assert_eq!(
            parse(
                r#"{"event": "time_zone_changed", "offset_seconds": -18000}"#
            ),
            HostEvent::TimeZoneChanged {
                offset_seconds: Some(-18000)
            }
        );
        let HostEvent::DataChanged { events } = parse(
            r#"{"event": "data_changed", "events": [
                {"path": "/wx", "data": {"weather_id": 800, "min": "7", "max": "16"}}
            ]}"#,
        ) else {
            panic!("Expected data_changed");
        };
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data.get_int("weather_id").unwrap(), 800);
    }

    #[test]
    fn test_run_until_destroy() {
        let (sender, receiver) = mpsc::channel();
        for json in [
            r#"{"event": "visibility_changed", "visible": true}"#,
            r#"{"event": "connected"}"#,
            r#"{"event": "data_changed", "events": [
                {"path": "/wx", "data": {"weather_id": 800, "min": "7", "max": "16"}}
            ]}"#,
            r#"{"event": "destroy"}"#,
        ] {
            sender.send(parse(json)).unwrap();
        }

        let runner = runner().run(receiver);
        let engine = runner.engine();
        assert_eq!(engine.snapshot().unwrap().condition_code, 800);
        assert_eq!(engine.connection(), Connection::Disconnected);
        assert!(!engine.is_timer_running());

        // Last frame had the clear-sky gradient
        let palette = Config::default().palette;
        assert_eq!(
            runner.display().pixel(Point::new(0, 0)),
            Some(Rgb888::from(palette.dark_sky_blue))
        );
    }

    #[test]
    fn test_run_stops_when_senders_hang_up() {
        let (sender, receiver) = mpsc::channel();
        sender
            .send(HostEvent::VisibilityChanged { visible: true })
            .unwrap();
        drop(sender);
        let runner = runner().run(receiver);
        assert!(runner.engine().is_timer_running());
    }

    #[test]
    fn test_weather_sent_right_after_show() {
        let (sender, receiver) = mpsc::channel();
        let config = Config::default();
        let peer = QueuePeer {
            events: sender.clone(),
        };
        let mut runner = Runner::new(
            Engine::new(&config, IconSet::placeholder(64), peer),
            MockDisplay::new(Size::new(config.width, config.height)),
            None,
        );
        runner.show();
        assert_eq!(runner.engine().connection(), Connection::Disconnected);

        // The host starts talking as soon as the face is up
        sender
            .send(parse(
                r#"{"event": "data_changed", "events": [
                    {"path": "/wx", "data": {"weather_id": 800, "min": "7", "max": "16"}}
                ]}"#,
            ))
            .unwrap();
        sender.send(HostEvent::Destroy).unwrap();

        let runner = runner.run(receiver);
        assert_eq!(runner.engine().snapshot().unwrap().condition_code, 800);
    }
}
