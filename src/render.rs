//! Turn the clock and weather state into a [Scene], then draw that scene
//! onto any RGB draw target.

use crate::{
    clock::ClockTime,
    config::{Config, Palette},
    icon::IconSet,
    util::Color,
    weather::{BackgroundColors, WeatherIcon, WeatherSnapshot},
};
use anyhow::anyhow;
use embedded_graphics::{
    geometry::{Point, Size},
    pixelcolor::{Rgb888, RgbColor},
    prelude::{DrawTarget, Primitive},
    primitives::{
        Circle, Line, PrimitiveStyle, PrimitiveStyleBuilder, Rectangle,
    },
    text::{Alignment, Text},
    Drawable,
};
use log::trace;
use std::fmt::Debug;
use u8g2_fonts::{fonts, U8g2TextStyle};

/// How far each hand stops short of the edge, measured from the horizontal
/// center. The hour hand is the shortest, the second hand the longest.
const HOUR_INSET: f32 = 80.0;
const MINUTE_INSET: f32 = 40.0;
const SECOND_INSET: f32 = 20.0;

/// Label baselines, as multiples of the vertical center
const HIGH_LABEL_Y: f32 = 1.5;
const LOW_LABEL_Y: f32 = 1.75;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum DisplayMode {
    #[default]
    Interactive,
    /// Low-power mode. Black background, hour and minute hands only
    Ambient,
}

/// Which of the two flat background tints is selected by tapping
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum TapTint {
    #[default]
    Primary,
    Secondary,
}

impl Palette {
    pub fn tint(&self, tint: TapTint) -> Color {
        match tint {
            TapTint::Primary => self.background,
            TapTint::Secondary => self.background2,
        }
    }
}

/// Everything that goes into a single frame
#[derive(Copy, Clone, Debug)]
pub struct Frame<'a> {
    pub time: ClockTime,
    pub mode: DisplayMode,
    pub snapshot: Option<&'a WeatherSnapshot>,
    pub tap_tint: TapTint,
    /// Device only supports a few bits per color in ambient mode
    pub low_bit_ambient: bool,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Background {
    Black,
    Flat(Color),
    /// Dark at the top, light at the bottom
    Gradient(BackgroundColors),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Hand {
    Hour,
    Minute,
    Second,
}

/// A straight stroke from the center of the face
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HandStroke {
    pub hand: Hand,
    /// Radians clockwise from 12 o'clock
    pub angle: f32,
    pub length: f32,
    pub center: (f32, f32),
    pub tip: (f32, f32),
}

impl HandStroke {
    fn new(hand: Hand, angle: f32, length: f32, (cx, cy): (f32, f32)) -> Self {
        Self {
            hand,
            angle,
            length,
            center: (cx, cy),
            tip: (cx + angle.sin() * length, cy - angle.cos() * length),
        }
    }
}

/// Proxy for font sizes, so a scene can be compared and logged without
/// dragging font renderers along
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FontSize {
    /// High temperature, ~60px
    Large,
    /// Low temperature, ~40px
    Medium,
}

/// Horizontally centered text. `origin` is on the baseline
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub text: String,
    pub origin: Point,
    pub font_size: FontSize,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeatherArt {
    /// Icon and where it lands, already scaled. `None` if we have no bitmap
    /// for this icon
    pub icon: Option<(WeatherIcon, Rectangle)>,
    pub high: Label,
    pub low: Label,
}

/// Everything to draw for one frame, in paint order
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub size: Size,
    pub background: Background,
    pub weather: Option<WeatherArt>,
    pub hands: Vec<HandStroke>,
    pub hand_color: Color,
    pub hand_stroke: u32,
    /// Hosts with an anti-aliasing rasterizer should honor this. Our
    /// embedded-graphics path never anti-aliases.
    pub anti_alias: bool,
}

impl Scene {
    pub fn hand(&self, hand: Hand) -> Option<&HandStroke> {
        self.hands.iter().find(|stroke| stroke.hand == hand)
    }
}

/// Builds and draws scenes
pub struct Renderer {
    palette: Palette,
    icons: IconSet,
    hand_stroke: u32,
}

impl Renderer {
    pub fn new(config: &Config, icons: IconSet) -> Self {
        Self {
            palette: config.palette.clone(),
            icons,
            hand_stroke: config.hand_stroke,
        }
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Lay out a frame for a display of the given size
    pub fn render(&self, frame: &Frame, size: Size) -> Scene {
        // Center on the whole screen, ignoring any insets, so round faces
        // with a flat "chin" still line up
        let center = (size.width as f32 / 2.0, size.height as f32 / 2.0);
        let (cx, _) = center;
        let time = frame.time;

        let minute = HandStroke::new(
            Hand::Minute,
            time.minute_angle(),
            cx - MINUTE_INSET,
            center,
        );
        let hour = HandStroke::new(
            Hand::Hour,
            time.hour_angle(),
            cx - HOUR_INSET,
            center,
        );

        let mut scene = Scene {
            size,
            background: Background::Black,
            weather: None,
            hands: Vec::with_capacity(3),
            hand_color: self.palette.hands,
            hand_stroke: self.hand_stroke,
            anti_alias: true,
        };

        match frame.mode {
            DisplayMode::Ambient => {
                scene.anti_alias = !frame.low_bit_ambient;
            }
            DisplayMode::Interactive => {
                // Weather only takes over when we know how to draw it
                let recognized = frame
                    .snapshot
                    .filter(|snapshot| snapshot.is_recognized());
                match recognized {
                    Some(snapshot) => {
                        // Recognized snapshots always carry colors
                        if let Some(colors) = snapshot.colors {
                            scene.background = Background::Gradient(colors);
                        }
                        scene.weather =
                            Some(self.weather_art(snapshot, center));
                    }
                    None => {
                        scene.background =
                            Background::Flat(self.palette.tint(frame.tap_tint));
                    }
                }
                scene.hands.push(HandStroke::new(
                    Hand::Second,
                    time.second_angle(),
                    cx - SECOND_INSET,
                    center,
                ));
            }
        }

        scene.hands.push(minute);
        scene.hands.push(hour);
        scene
    }

    fn weather_art(
        &self,
        snapshot: &WeatherSnapshot,
        (cx, cy): (f32, f32),
    ) -> WeatherArt {
        let icon = snapshot.icon.and_then(|icon| {
            let bitmap = self.icons.get(icon)?;
            let size = bitmap.fit_within(cx.min(cy) as u32);
            let top_left = Point::new(
                (cx - size.width as f32 / 2.0) as i32,
                (cy - size.height as f32) as i32,
            );
            Some((icon, Rectangle::new(top_left, size)))
        });

        WeatherArt {
            icon,
            high: Label {
                text: snapshot.high.clone(),
                origin: Point::new(cx as i32, (cy * HIGH_LABEL_Y) as i32),
                font_size: FontSize::Large,
                color: self.palette.high_text,
            },
            low: Label {
                text: snapshot.low.clone(),
                origin: Point::new(cx as i32, (cy * LOW_LABEL_Y) as i32),
                font_size: FontSize::Medium,
                color: self.palette.low_text,
            },
        }
    }

    /// Paint a scene onto the target
    pub fn draw<D>(&self, scene: &Scene, target: &mut D) -> anyhow::Result<()>
    where
        D: DrawTarget<Color = Rgb888>,
        D::Error: Debug,
    {
        trace!("Drawing scene {scene:?}");
        self.draw_background(scene, target).map_err(map_error)?;

        if let Some(weather) = &scene.weather {
            if let Some((icon, area)) = weather.icon {
                if let Some(bitmap) = self.icons.get(icon) {
                    bitmap
                        .scaled(area.size)
                        .draw_at(area.top_left, target)
                        .map_err(map_error)?;
                }
            }
            draw_label(&weather.high, target).map_err(map_error)?;
            draw_label(&weather.low, target).map_err(map_error)?;
        }

        let color: Rgb888 = scene.hand_color.into();
        let style = PrimitiveStyleBuilder::new()
            .stroke_color(color)
            .stroke_width(scene.hand_stroke)
            .build();
        for hand in &scene.hands {
            let start = to_point(hand.center);
            let end = to_point(hand.tip);
            Line::new(start, end)
                .into_styled(style)
                .draw(target)
                .map_err(map_error)?;
            // Round off the tip
            Circle::with_center(end, scene.hand_stroke)
                .into_styled(PrimitiveStyle::with_fill(color))
                .draw(target)
                .map_err(map_error)?;
        }
        Ok(())
    }

    fn draw_background<D>(
        &self,
        scene: &Scene,
        target: &mut D,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        match scene.background {
            Background::Black => target.clear(Rgb888::BLACK),
            Background::Flat(color) => target.clear(color.into()),
            Background::Gradient(BackgroundColors { dark, light }) => {
                let rows = scene.size.height;
                let last = rows.saturating_sub(1).max(1) as f32;
                for y in 0..rows {
                    let color = dark.lerp(light, y as f32 / last);
                    target.fill_solid(
                        &Rectangle::new(
                            Point::new(0, y as i32),
                            Size::new(scene.size.width, 1),
                        ),
                        color.into(),
                    )?;
                }
                Ok(())
            }
        }
    }
}

fn draw_label<D>(label: &Label, target: &mut D) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let color: Rgb888 = label.color.into();
    let style = match label.font_size {
        FontSize::Large => {
            U8g2TextStyle::new(fonts::u8g2_font_logisoso58_tf, color)
        }
        FontSize::Medium => {
            U8g2TextStyle::new(fonts::u8g2_font_logisoso38_tf, color)
        }
    };
    Text::with_alignment(&label.text, label.origin, style, Alignment::Center)
        .draw(target)?;
    Ok(())
}

fn to_point((x, y): (f32, f32)) -> Point {
    Point::new(x.round() as i32, y.round() as i32)
}

/// Draw target errors don't have to implement Error, so we have to map
/// manually
fn map_error<E: Debug>(error: E) -> anyhow::Error {
    anyhow!("{error:?}")
}
