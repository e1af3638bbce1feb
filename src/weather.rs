use crate::{
    config::Palette,
    peer::DataMap,
    util::Color,
};
use anyhow::Context;
use std::ops::RangeInclusive;

/// Payload keys. These have to match what the phone app sends.
pub const WEATHER_ID: &str = "weather_id";
pub const MIN: &str = "min";
pub const MAX: &str = "max";

/// Weather art, one per condition group
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum WeatherIcon {
    Storm,
    LightRain,
    Rain,
    Snow,
    Fog,
    Clear,
    LightClouds,
    Clouds,
}

impl WeatherIcon {
    pub const ALL: &'static [Self] = &[
        Self::Storm,
        Self::LightRain,
        Self::Rain,
        Self::Snow,
        Self::Fog,
        Self::Clear,
        Self::LightClouds,
        Self::Clouds,
    ];

    /// Asset name, e.g. for looking up art files
    pub fn name(self) -> &'static str {
        match self {
            Self::Storm => "art_storm",
            Self::LightRain => "art_light_rain",
            Self::Rain => "art_rain",
            Self::Snow => "art_snow",
            Self::Fog => "art_fog",
            Self::Clear => "art_clear",
            Self::LightClouds => "art_light_clouds",
            Self::Clouds => "art_clouds",
        }
    }
}

/// Family of background gradient, resolved to real colors by the palette
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Backdrop {
    Storm,
    SkyBlue,
    Gray,
}

/// The two ends of the background gradient
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BackgroundColors {
    pub dark: Color,
    pub light: Color,
}

impl Palette {
    pub fn backdrop(&self, backdrop: Backdrop) -> BackgroundColors {
        let (dark, light) = match backdrop {
            Backdrop::Storm => (self.dark_storm, self.light_storm),
            Backdrop::SkyBlue => (self.dark_sky_blue, self.light_sky_blue),
            Backdrop::Gray => (self.dark_gray, self.light_gray),
        };
        BackgroundColors { dark, light }
    }
}

/// OpenWeatherMap condition code ranges, checked in order. First match wins.
/// https://openweathermap.org/weather-conditions
static CONDITIONS: &[(RangeInclusive<i32>, WeatherIcon, Backdrop)] = &[
    (200..=232, WeatherIcon::Storm, Backdrop::Storm),
    (300..=321, WeatherIcon::LightRain, Backdrop::SkyBlue),
    (500..=504, WeatherIcon::Rain, Backdrop::Gray),
    (511..=511, WeatherIcon::Snow, Backdrop::Gray),
    (520..=531, WeatherIcon::Rain, Backdrop::Gray),
    (600..=622, WeatherIcon::Snow, Backdrop::Gray),
    (701..=761, WeatherIcon::Fog, Backdrop::Gray),
    // 761 is already claimed by fog above
    (761..=761, WeatherIcon::Storm, Backdrop::Storm),
    (781..=781, WeatherIcon::Storm, Backdrop::Storm),
    (800..=800, WeatherIcon::Clear, Backdrop::SkyBlue),
    (801..=801, WeatherIcon::LightClouds, Backdrop::SkyBlue),
    (802..=804, WeatherIcon::Clouds, Backdrop::Gray),
];

/// Look up art and background for a condition code. `None` if the code isn't
/// in any known range.
pub fn condition(code: i32) -> Option<(WeatherIcon, Backdrop)> {
    CONDITIONS
        .iter()
        .find(|(range, _, _)| range.contains(&code))
        .map(|&(_, icon, backdrop)| (icon, backdrop))
}

/// The latest weather received from the phone. Always replaced as a whole.
#[derive(Clone, Debug, PartialEq)]
pub struct WeatherSnapshot {
    pub condition_code: i32,
    pub low: String,
    pub high: String,
    /// `None` for unrecognized codes
    pub icon: Option<WeatherIcon>,
    /// `None` for unrecognized codes
    pub colors: Option<BackgroundColors>,
}

impl WeatherSnapshot {
    pub fn new(
        condition_code: i32,
        low: impl Into<String>,
        high: impl Into<String>,
        palette: &Palette,
    ) -> Self {
        let condition = condition(condition_code);
        Self {
            condition_code,
            low: low.into(),
            high: high.into(),
            icon: condition.map(|(icon, _)| icon),
            colors: condition.map(|(_, backdrop)| palette.backdrop(backdrop)),
        }
    }

    /// Decode a `/wx` payload. All three fields are required.
    pub fn decode(data: &DataMap, palette: &Palette) -> anyhow::Result<Self> {
        let code = data.get_int(WEATHER_ID)?;
        let code = i32::try_from(code)
            .with_context(|| format!("Condition code {code} out of range"))?;
        Ok(Self::new(
            code,
            data.get_string(MIN)?,
            data.get_string(MAX)?,
            palette,
        ))
    }

    /// Whether this snapshot has art and colors to draw
    pub fn is_recognized(&self) -> bool {
        self.icon.is_some() && self.colors.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(code: i64, min: &str, max: &str) -> DataMap {
        let mut data = DataMap::new();
        data.put_int(WEATHER_ID, code);
        data.put_string(MIN, min);
        data.put_string(MAX, max);
        data
    }

    #[test]
    fn test_condition_table() {
        assert_eq!(condition(200), Some((WeatherIcon::Storm, Backdrop::Storm)));
        assert_eq!(condition(232), Some((WeatherIcon::Storm, Backdrop::Storm)));
        assert_eq!(
            condition(310),
            Some((WeatherIcon::LightRain, Backdrop::SkyBlue))
        );
        assert_eq!(condition(502), Some((WeatherIcon::Rain, Backdrop::Gray)));
        assert_eq!(condition(511), Some((WeatherIcon::Snow, Backdrop::Gray)));
        assert_eq!(condition(522), Some((WeatherIcon::Rain, Backdrop::Gray)));
        assert_eq!(condition(601), Some((WeatherIcon::Snow, Backdrop::Gray)));
        assert_eq!(condition(741), Some((WeatherIcon::Fog, Backdrop::Gray)));
        assert_eq!(condition(761), Some((WeatherIcon::Fog, Backdrop::Gray)));
        assert_eq!(condition(781), Some((WeatherIcon::Storm, Backdrop::Storm)));
        assert_eq!(
            condition(801),
            Some((WeatherIcon::LightClouds, Backdrop::SkyBlue))
        );
        assert_eq!(condition(804), Some((WeatherIcon::Clouds, Backdrop::Gray)));
    }

    #[test]
    fn test_unrecognized_codes() {
        for code in [-1, 0, 199, 233, 505, 510, 512, 700, 771, 805, 999] {
            assert_eq!(condition(code), None, "code {code}");
        }
    }

    #[test]
    fn test_clear() {
        let palette = Palette::default();
        let data = payload(800, "8", "19");
        let snapshot = WeatherSnapshot::decode(&data, &palette).unwrap();
        assert_eq!(snapshot.icon, Some(WeatherIcon::Clear));
        assert_eq!(
            snapshot.colors,
            Some(BackgroundColors {
                dark: palette.dark_sky_blue,
                light: palette.light_sky_blue,
            })
        );
        assert_eq!(snapshot.low, "8");
        assert_eq!(snapshot.high, "19");
    }

    #[test]
    fn test_snow() {
        let palette = Palette::default();
        let snapshot = WeatherSnapshot::new(511, "-3", "1", &palette);
        assert_eq!(snapshot.icon, Some(WeatherIcon::Snow));
        assert_eq!(
            snapshot.colors,
            Some(BackgroundColors {
                dark: palette.dark_gray,
                light: palette.light_gray,
            })
        );
    }

    #[test]
    fn test_unrecognized_snapshot() {
        let snapshot =
            WeatherSnapshot::new(999, "1", "2", &Palette::default());
        assert_eq!(snapshot.icon, None);
        assert_eq!(snapshot.colors, None);
        assert!(!snapshot.is_recognized());
    }

    #[test]
    fn test_decode_malformed() {
        let palette = Palette::default();
        let mut data = payload(800, "1", "2");
        data.put_string(WEATHER_ID, "800");
        assert!(WeatherSnapshot::decode(&data, &palette).is_err());

        let mut data = DataMap::new();
        data.put_int(WEATHER_ID, 800);
        data.put_string(MAX, "2");
        assert!(WeatherSnapshot::decode(&data, &palette).is_err());

        let data = payload(i64::MAX, "1", "2");
        assert!(WeatherSnapshot::decode(&data, &palette).is_err());
    }
}
