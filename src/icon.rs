//! Decoded weather art. Decoding image files belongs to the host, so the
//! host hands us ready-made bitmaps in an [IconSet].

use crate::weather::WeatherIcon;
use embedded_graphics::{
    pixelcolor::{Rgb888, RgbColor},
    prelude::{DrawTarget, OriginDimensions, Point, Primitive, Size},
    primitives::{
        Circle, Ellipse, Line, PrimitiveStyle, Rectangle, Triangle,
    },
    Drawable, Pixel,
};
use itertools::iproduct;
use std::{collections::HashMap, convert::Infallible};

/// An RGB bitmap with per-pixel transparency
#[derive(Clone, Debug, PartialEq)]
pub struct IconBitmap {
    size: Size,
    /// Row-major. `None` is transparent
    pixels: Vec<Option<Rgb888>>,
}

impl IconBitmap {
    /// Fully transparent bitmap
    pub fn new(size: Size) -> Self {
        Self {
            size,
            pixels: vec![None; (size.width * size.height) as usize],
        }
    }

    /// Build from row-major pixels. Returns `None` if the pixel count doesn't
    /// match the size
    pub fn from_pixels(
        size: Size,
        pixels: Vec<Option<Rgb888>>,
    ) -> Option<Self> {
        (pixels.len() == (size.width * size.height) as usize)
            .then_some(Self { size, pixels })
    }

    pub fn pixel(&self, point: Point) -> Option<Rgb888> {
        let x = u32::try_from(point.x).ok()?;
        let y = u32::try_from(point.y).ok()?;
        if x < self.size.width && y < self.size.height {
            self.pixels[(y * self.size.width + x) as usize]
        } else {
            None
        }
    }

    /// Size this bitmap should be drawn at so neither side exceeds `limit`.
    /// Only ever shrinks, and keeps the aspect ratio.
    pub fn fit_within(&self, limit: u32) -> Size {
        let longest = self.size.width.max(self.size.height);
        if longest <= limit || longest == 0 {
            return self.size;
        }
        let scale = limit as f32 / longest as f32;
        let side =
            |length: u32| ((length as f32 * scale).round() as u32).max(1);
        Size::new(side(self.size.width), side(self.size.height))
    }

    /// Nearest-neighbour resample, no filtering
    pub fn scaled(&self, size: Size) -> Self {
        if size == self.size {
            return self.clone();
        }
        let pixels = iproduct!(0..size.height, 0..size.width)
            .map(|(y, x)| {
                let src_x = x * self.size.width / size.width;
                let src_y = y * self.size.height / size.height;
                self.pixels[(src_y * self.size.width + src_x) as usize]
            })
            .collect();
        Self { size, pixels }
    }

    /// Draw with the top-left corner at `origin`, skipping transparent pixels
    pub fn draw_at<D>(
        &self,
        origin: Point,
        target: &mut D,
    ) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let pixels = iproduct!(0..self.size.height, 0..self.size.width)
            .zip(&self.pixels)
            .filter_map(|((y, x), color)| {
                color.map(|color| {
                    Pixel(origin + Point::new(x as i32, y as i32), color)
                })
            });
        target.draw_iter(pixels)
    }
}

impl OriginDimensions for IconBitmap {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for IconBitmap {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let area = Rectangle::new(Point::zero(), self.size);
        for Pixel(point, color) in pixels {
            if area.contains(point) {
                let (x, y) = (point.x as u32, point.y as u32);
                self.pixels[(y * self.size.width + x) as usize] = Some(color);
            }
        }
        Ok(())
    }
}

/// Bitmaps for each [WeatherIcon]. Missing entries just aren't drawn
#[derive(Clone, Debug, Default)]
pub struct IconSet {
    icons: HashMap<WeatherIcon, IconBitmap>,
}

impl IconSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, icon: WeatherIcon, bitmap: IconBitmap) {
        self.icons.insert(icon, bitmap);
    }

    pub fn get(&self, icon: WeatherIcon) -> Option<&IconBitmap> {
        self.icons.get(&icon)
    }

    /// Simple flat art for every icon, drawn with primitives. Used when the
    /// host has no real artwork to give us.
    pub fn placeholder(size: u32) -> Self {
        let mut set = Self::new();
        for &icon in WeatherIcon::ALL {
            let mut bitmap = IconBitmap::new(Size::new(size, size));
            draw_placeholder(icon, size as i32, &mut bitmap);
            set.insert(icon, bitmap);
        }
        set
    }
}

const SUN: Rgb888 = Rgb888::new(0xff, 0xc1, 0x07);
const CLOUD: Rgb888 = Rgb888::new(0xec, 0xef, 0xf1);
const DARK_CLOUD: Rgb888 = Rgb888::new(0x78, 0x90, 0x9c);
const DROP: Rgb888 = Rgb888::new(0x4f, 0xc3, 0xf7);

fn draw_placeholder(icon: WeatherIcon, s: i32, bitmap: &mut IconBitmap) {
    // Drawing into a bitmap can't fail
    let _ = match icon {
        WeatherIcon::Clear => sun(bitmap, Point::new(s / 2, s / 2), s * 3 / 4),
        WeatherIcon::LightClouds => {
            sun(bitmap, Point::new(s * 3 / 8, s * 3 / 8), s / 2)
                .and_then(|_| cloud(bitmap, s, CLOUD))
        }
        WeatherIcon::Clouds => cloud(bitmap, s, DARK_CLOUD)
            .and_then(|_| cloud(bitmap, s * 7 / 8, CLOUD)),
        WeatherIcon::LightRain => {
            cloud(bitmap, s, CLOUD).and_then(|_| streaks(bitmap, s, 2))
        }
        WeatherIcon::Rain => {
            cloud(bitmap, s, DARK_CLOUD).and_then(|_| streaks(bitmap, s, 4))
        }
        WeatherIcon::Snow => {
            cloud(bitmap, s, CLOUD).and_then(|_| flakes(bitmap, s))
        }
        WeatherIcon::Fog => fog(bitmap, s),
        WeatherIcon::Storm => {
            cloud(bitmap, s, DARK_CLOUD).and_then(|_| bolt(bitmap, s))
        }
    };
}

fn sun(
    bitmap: &mut IconBitmap,
    center: Point,
    diameter: i32,
) -> Result<(), Infallible> {
    Circle::with_center(center, diameter as u32)
        .into_styled(PrimitiveStyle::with_fill(SUN))
        .draw(bitmap)
}

/// A cloud sitting in the middle band of an `s`-sized icon
fn cloud(
    bitmap: &mut IconBitmap,
    s: i32,
    color: Rgb888,
) -> Result<(), Infallible> {
    let style = PrimitiveStyle::with_fill(color);
    let body = Size::new((s * 3 / 4) as u32, (s / 3) as u32);
    Ellipse::new(Point::new(s / 8, s * 3 / 8), body)
        .into_styled(style)
        .draw(bitmap)?;
    Circle::new(Point::new(s * 3 / 8, s / 4), (s * 3 / 8) as u32)
        .into_styled(style)
        .draw(bitmap)
}

fn streaks(
    bitmap: &mut IconBitmap,
    s: i32,
    count: i32,
) -> Result<(), Infallible> {
    let style = PrimitiveStyle::with_stroke(DROP, (s / 24).max(1) as u32);
    for i in 0..count {
        let x = s / 4 + i * s / (2 * count);
        Line::new(Point::new(x + s / 16, s * 3 / 4), Point::new(x, s * 15 / 16))
            .into_styled(style)
            .draw(bitmap)?;
    }
    Ok(())
}

fn flakes(bitmap: &mut IconBitmap, s: i32) -> Result<(), Infallible> {
    let style = PrimitiveStyle::with_fill(Rgb888::WHITE);
    for i in 0..3 {
        let center = Point::new(s / 4 + i * s / 4, s * 13 / 16);
        Circle::with_center(center, (s / 10) as u32)
            .into_styled(style)
            .draw(bitmap)?;
    }
    Ok(())
}

fn fog(bitmap: &mut IconBitmap, s: i32) -> Result<(), Infallible> {
    let style = PrimitiveStyle::with_fill(CLOUD);
    for i in 0..3 {
        Rectangle::new(
            Point::new(s / 8 + (i % 2) * s / 16, s / 4 + i * s / 5),
            Size::new((s * 11 / 16) as u32, (s / 10) as u32),
        )
        .into_styled(style)
        .draw(bitmap)?;
    }
    Ok(())
}

fn bolt(bitmap: &mut IconBitmap, s: i32) -> Result<(), Infallible> {
    Triangle::new(
        Point::new(s / 2, s * 5 / 8),
        Point::new(s * 3 / 8, s * 7 / 8),
        Point::new(s * 5 / 8, s * 3 / 4),
    )
    .into_styled(PrimitiveStyle::with_fill(SUN))
    .draw(bitmap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_within() {
        let bitmap = IconBitmap::new(Size::new(200, 100));
        assert_eq!(bitmap.fit_within(200), Size::new(200, 100));
        assert_eq!(bitmap.fit_within(250), Size::new(200, 100));
        assert_eq!(bitmap.fit_within(100), Size::new(100, 50));

        let tall = IconBitmap::new(Size::new(30, 120));
        assert_eq!(tall.fit_within(60), Size::new(15, 60));
    }

    #[test]
    fn test_scaled() {
        let red = Some(Rgb888::RED);
        let blue = Some(Rgb888::BLUE);
        let pixels = vec![red, None, None, blue];
        let bitmap = IconBitmap::from_pixels(Size::new(2, 2), pixels).unwrap();
        let scaled = bitmap.scaled(Size::new(4, 4));
        assert_eq!(scaled.size(), Size::new(4, 4));
        assert_eq!(scaled.pixel(Point::new(1, 1)), red);
        assert_eq!(scaled.pixel(Point::new(2, 1)), None);
        assert_eq!(scaled.pixel(Point::new(3, 3)), blue);

        let shrunk = scaled.scaled(Size::new(2, 2));
        assert_eq!(shrunk, bitmap);
    }

    #[test]
    fn test_from_pixels_wrong_length() {
        assert!(
            IconBitmap::from_pixels(Size::new(2, 2), vec![None; 3]).is_none()
        );
    }

    #[test]
    fn test_placeholder_covers_all_icons() {
        let set = IconSet::placeholder(48);
        for &icon in WeatherIcon::ALL {
            let bitmap = set.get(icon).unwrap();
            assert_eq!(bitmap.size(), Size::new(48, 48), "{}", icon.name());
            assert!(
                bitmap.pixels.iter().any(Option::is_some),
                "{} is blank",
                icon.name()
            );
        }
    }
}
