//! The watch face engine. The host platform calls one method per callback,
//! always from the same thread, and asks us to draw whenever
//! [Engine::take_invalidated] says something changed.

use crate::{
    clock::{Clock, ClockTime},
    config::Config,
    icon::IconSet,
    peer::{DataEvent, DataEventKind, PeerChannel, PutDataRequest, WEATHER_PATH},
    render::{DisplayMode, Frame, Renderer, Scene, TapTint},
    weather::WeatherSnapshot,
};
use chrono::{DateTime, FixedOffset, TimeZone};
use embedded_graphics::{
    geometry::Size,
    pixelcolor::Rgb888,
    prelude::DrawTarget,
};
use log::{debug, error, info, trace, warn};
use serde::Deserialize;
use std::{
    fmt::Debug,
    time::{Duration, Instant},
};

/// Redraw cadence while interactive. Once a second, to advance the second hand
pub const INTERACTIVE_UPDATE_RATE: Duration = Duration::from_secs(1);

/// Visibility axis of the engine state
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DisplayState {
    Hidden,
    VisibleAmbient,
    VisibleInteractive,
}

/// Connectivity axis of the engine state
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Connection {
    #[default]
    Disconnected,
    Connected,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TapType {
    /// Finger went down
    Touch,
    /// The user started some other gesture
    TouchCancel,
    /// Finger went down and came back up
    #[default]
    Tap,
}

/// Counts completed taps. Each one flips the flat background tint
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TapState {
    count: u32,
}

impl TapState {
    pub fn tap(&mut self) {
        self.count = self.count.wrapping_add(1);
    }

    pub fn tint(&self) -> TapTint {
        if self.count % 2 == 0 {
            TapTint::Primary
        } else {
            TapTint::Secondary
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PeekMode {
    Short,
    Variable,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BackgroundVisibility {
    Interruptive,
    Persistent,
}

/// How the face wants the system to treat it. Handed to the platform once,
/// at creation
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct WatchFaceStyle {
    pub card_peek_mode: PeekMode,
    pub background_visibility: BackgroundVisibility,
    pub show_system_ui_time: bool,
    pub accepts_tap_events: bool,
}

pub struct Engine<P> {
    peer: P,
    renderer: Renderer,
    clock: Clock,

    visible: bool,
    ambient: bool,
    /// Device supports fewer bits per color in ambient mode. When set, we
    /// disable anti-aliasing in ambient mode.
    low_bit_ambient: bool,
    connection: Connection,
    /// Subscribed to peer data events
    listening: bool,
    /// Listening for time zone changes. Only while visible
    time_zone_receiver: bool,
    taps: TapState,
    /// Latest weather, `None` until the phone sends some
    snapshot: Option<WeatherSnapshot>,

    /// A redraw has been requested since the last draw
    invalidated: bool,
    /// When the interactive timer fires next. `None` while stopped
    next_update: Option<Instant>,
}

impl<P: PeerChannel> Engine<P> {
    pub const STYLE: WatchFaceStyle = WatchFaceStyle {
        card_peek_mode: PeekMode::Short,
        background_visibility: BackgroundVisibility::Interruptive,
        show_system_ui_time: false,
        accepts_tap_events: true,
    };

    /// Create the engine. The face starts hidden and disconnected; the host
    /// should register [Self::style] with the platform.
    pub fn new(config: &Config, icons: IconSet, peer: P) -> Self {
        info!("Creating watch face engine");
        Self {
            peer,
            renderer: Renderer::new(config, icons),
            clock: Clock::local(),
            visible: false,
            ambient: false,
            low_bit_ambient: false,
            connection: Connection::Disconnected,
            listening: false,
            time_zone_receiver: false,
            taps: TapState::default(),
            snapshot: None,
            invalidated: false,
            next_update: None,
        }
    }

    pub fn style(&self) -> WatchFaceStyle {
        Self::STYLE
    }

    pub fn display_state(&self) -> DisplayState {
        match (self.visible, self.ambient) {
            (false, _) => DisplayState::Hidden,
            (true, true) => DisplayState::VisibleAmbient,
            (true, false) => DisplayState::VisibleInteractive,
        }
    }

    pub fn connection(&self) -> Connection {
        self.connection
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn taps(&self) -> TapState {
        self.taps
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn peer(&self) -> &P {
        &self.peer
    }

    pub fn mode(&self) -> DisplayMode {
        if self.ambient {
            DisplayMode::Ambient
        } else {
            DisplayMode::Interactive
        }
    }

    /// When the interactive timer wants [Self::handle_update_time_message]
    /// called next. `None` while the timer is stopped
    pub fn next_update(&self) -> Option<Instant> {
        self.next_update
    }

    pub fn is_timer_running(&self) -> bool {
        self.next_update.is_some()
    }

    /// Check and clear the redraw request
    pub fn take_invalidated(&mut self) -> bool {
        std::mem::take(&mut self.invalidated)
    }

    fn invalidate(&mut self) {
        self.invalidated = true;
    }

    pub fn on_destroy(&mut self) {
        info!("Destroying watch face engine");
        self.next_update = None;
        self.disconnect();
    }

    pub fn on_properties_changed(&mut self, low_bit_ambient: bool) {
        debug!("Properties changed: low_bit_ambient={low_bit_ambient}");
        self.low_bit_ambient = low_bit_ambient;
    }

    /// Called by the platform once a minute, mostly for ambient mode
    pub fn on_time_tick(&mut self) {
        trace!("Time tick");
        self.invalidate();
    }

    pub fn on_ambient_mode_changed(&mut self, ambient: bool) {
        if self.ambient != ambient {
            debug!("Ambient mode changed: {ambient}");
            self.ambient = ambient;
            self.invalidate();
        }
        // Whether the timer should run depends on visibility as well
        self.update_timer();
    }

    /// Completed taps flip the flat background tint. This does nothing
    /// visible once weather arrives, because the gradient takes over.
    pub fn on_tap_command(&mut self, tap_type: TapType, x: i32, y: i32) {
        trace!("Tap command {tap_type:?} at ({x}, {y})");
        match tap_type {
            TapType::Touch | TapType::TouchCancel => {}
            TapType::Tap => self.taps.tap(),
        }
        self.invalidate();
    }

    pub fn on_visibility_changed(&mut self, visible: bool) {
        debug!("Visibility changed: {visible}");
        self.visible = visible;
        if visible {
            self.register_time_zone_receiver();
            self.peer.connect();
            // The zone may have changed while we weren't listening
            self.clock.set_time_zone(None);
        } else {
            self.unregister_time_zone_receiver();
            self.disconnect();
        }
        self.update_timer();
    }

    /// Time zone broadcast. `None` means "re-read the system zone"
    pub fn on_time_zone_changed(&mut self, offset: Option<FixedOffset>) {
        if !self.time_zone_receiver {
            trace!("Ignoring time zone change while hidden");
            return;
        }
        self.clock.set_time_zone(offset);
    }

    pub fn on_connected(&mut self) {
        if self.connection == Connection::Connected {
            trace!("Already connected");
            return;
        }
        // A connect requested before we were hidden can land late
        if !self.visible {
            debug!("Peer channel connected while hidden, disconnecting");
            self.peer.disconnect();
            return;
        }
        debug!("Peer channel connected");
        self.connection = Connection::Connected;
        self.peer.add_listener();
        self.listening = true;
        if self.snapshot.is_none() {
            self.send_bump();
        }
    }

    pub fn on_connection_suspended(&mut self, cause: i32) {
        debug!("Peer channel connection suspended: {cause}");
        self.connection = Connection::Disconnected;
        self.listening = false;
    }

    pub fn on_connection_failed(&mut self, reason: &str) {
        debug!("Peer channel connection failed: {reason}");
        self.connection = Connection::Disconnected;
        self.listening = false;
    }

    /// Handle a batch of data change events from the phone
    pub fn on_data_changed(&mut self, events: &[DataEvent]) {
        debug!("Data changed: {} event(s)", events.len());
        if !self.listening {
            trace!("Not listening, dropping data events");
            return;
        }

        for event in events {
            if event.kind != DataEventKind::Changed
                || event.path != WEATHER_PATH
            {
                trace!("Ignoring {:?} event for {}", event.kind, event.path);
                continue;
            }

            let palette = self.renderer.palette();
            match WeatherSnapshot::decode(&event.data, palette) {
                Ok(snapshot) => {
                    info!(
                        "New weather: code {} (low {}, high {})",
                        snapshot.condition_code, snapshot.low, snapshot.high
                    );
                    // Replace, never merge
                    self.snapshot = Some(snapshot);
                    self.invalidate();
                }
                Err(err) => warn!(
                    "Ignoring malformed weather payload {}: {err:?}",
                    event.data
                ),
            }
        }
    }

    /// Interactive timer fired. Redraw, then re-arm for the next second
    /// boundary if we should still be ticking
    pub fn handle_update_time_message<Tz: TimeZone>(
        &mut self,
        now: DateTime<Tz>,
    ) {
        self.invalidate();
        self.next_update = self.should_timer_be_running().then(|| {
            Instant::now() + interactive_delay(now.timestamp_subsec_millis())
        });
    }

    /// Lay out the current frame
    pub fn scene(&self, time: ClockTime, size: Size) -> Scene {
        let frame = Frame {
            time,
            mode: self.mode(),
            snapshot: self.snapshot.as_ref(),
            tap_tint: self.taps.tint(),
            low_bit_ambient: self.low_bit_ambient,
        };
        self.renderer.render(&frame, size)
    }

    /// Draw the current time onto the target
    pub fn on_draw<D>(&mut self, target: &mut D) -> anyhow::Result<()>
    where
        D: DrawTarget<Color = Rgb888>,
        D::Error: Debug,
    {
        self.invalidated = false;
        let scene = self.scene(self.clock.time(), target.bounding_box().size);
        self.renderer.draw(&scene, target)
    }

    fn should_timer_be_running(&self) -> bool {
        self.display_state() == DisplayState::VisibleInteractive
    }

    /// Start the timer if it should be running, or stop it if not. Starting
    /// fires immediately.
    fn update_timer(&mut self) {
        self.next_update =
            self.should_timer_be_running().then(Instant::now);
    }

    fn register_time_zone_receiver(&mut self) {
        if !self.time_zone_receiver {
            trace!("Registering time zone receiver");
            self.time_zone_receiver = true;
        }
    }

    fn unregister_time_zone_receiver(&mut self) {
        if self.time_zone_receiver {
            trace!("Unregistering time zone receiver");
            self.time_zone_receiver = false;
        }
    }

    /// Drop the listener and the connection, if we have one
    fn disconnect(&mut self) {
        if self.connection == Connection::Connected {
            if self.listening {
                self.peer.remove_listener();
                self.listening = false;
            }
            self.peer.disconnect();
            self.connection = Connection::Disconnected;
        }
    }

    /// Nudge the phone to push weather. Failures are logged, never retried
    fn send_bump(&mut self) {
        let request = PutDataRequest::bump(self.clock.now());
        debug!("Sending bump {}", request.data);
        if let Err(err) = self.peer.put_data_item(request) {
            error!("Error sending bump: {err:?}");
        }
    }
}

/// Time until the next whole second, given the current sub-second millis
pub fn interactive_delay(subsec_millis: u32) -> Duration {
    let rate = INTERACTIVE_UPDATE_RATE.as_millis() as u32;
    Duration::from_millis((rate - subsec_millis % rate) as u64)
}
