use crate::util::Color;
use anyhow::Context;
use log::{error, info};
use serde::Deserialize;
use std::{fs::File, path::PathBuf};

/// Runtime configuration, loaded from a JSON file next to the binary
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Display width, in pixels
    pub width: u32,
    /// Display height, in pixels
    pub height: u32,
    /// Stroke width of all three hands
    pub hand_stroke: u32,
    /// Edge length of the placeholder weather art generated by the simulator
    pub icon_size: u32,
    /// If set, every drawn frame is dumped here as a binary PPM
    pub frame_path: Option<PathBuf>,
    pub palette: Palette,
}

impl Config {
    const PATH: &'static str = "./config.json";

    /// Load config from [Self::PATH]
    pub fn load() -> anyhow::Result<Self> {
        info!("Loading config from `{}`", Self::PATH);
        let file = File::open(Self::PATH).with_context(|| {
            format!("Error opening config file {}", Self::PATH)
        })?;
        serde_json::from_reader(file)
            .context(format!("Error parsing config file {}", Self::PATH))
    }

    /// Load config, falling back to the default if anything goes wrong
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(err) => {
                error!("Error loading config, using defaults: {err:?}");
                Self::default()
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: 320,
            height: 320,
            hand_stroke: 5,
            icon_size: 144,
            frame_path: None,
            palette: Palette::default(),
        }
    }
}

/// Every named color the face uses
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// Flat tint with an even tap count
    pub background: Color,
    /// Flat tint with an odd tap count
    pub background2: Color,
    pub hands: Color,
    pub high_text: Color,
    pub low_text: Color,
    pub dark_storm: Color,
    pub light_storm: Color,
    pub dark_sky_blue: Color,
    pub light_sky_blue: Color,
    pub dark_gray: Color,
    pub light_gray: Color,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: Color::BLACK,
            background2: Color::from(0x303f9f),
            hands: Color::WHITE,
            high_text: Color::WHITE,
            low_text: Color::from(0xe0e0e0),
            dark_storm: Color::from(0x37474f),
            light_storm: Color::from(0x90a4ae),
            dark_sky_blue: Color::from(0x0288d1),
            light_sky_blue: Color::from(0x81d4fa),
            dark_gray: Color::from(0x424242),
            light_gray: Color::from(0xbdbdbd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config: Config = serde_json::from_str(
            r##"{"width": 400, "palette": {"hands": "#ff0000"}}"##,
        )
        .unwrap();
        assert_eq!(config.width, 400);
        assert_eq!(config.height, 320);
        assert_eq!(config.palette.hands, Color::new(0xff, 0, 0));
        assert_eq!(config.palette.dark_gray, Palette::default().dark_gray);
        assert_eq!(config.frame_path, None);
    }
}
