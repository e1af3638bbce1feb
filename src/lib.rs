//! Analog watch face that shows weather pushed from a paired phone.
//!
//! The [engine::Engine] takes platform callbacks one at a time, keeps the
//! latest [weather::WeatherSnapshot], and draws frames through
//! [render::Renderer] onto any `embedded-graphics` RGB target.

pub mod clock;
pub mod config;
pub mod engine;
pub mod icon;
pub mod mock_display;
pub mod peer;
pub mod render;
pub mod runner;
pub mod util;
pub mod weather;
