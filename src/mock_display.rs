use anyhow::Context;
use embedded_graphics::{
    pixelcolor::{Rgb888, RgbColor},
    prelude::{DrawTarget, OriginDimensions, Point, Size},
    Pixel,
};
use log::trace;
use std::{
    convert::Infallible,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// In-memory display, to allow running the face on machines without a real
/// screen (and to check what got drawn in tests)
#[derive(Clone, Debug)]
pub struct MockDisplay {
    size: Size,
    pixels: Vec<Rgb888>,
}

impl MockDisplay {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            pixels: vec![Rgb888::BLACK; (size.width * size.height) as usize],
        }
    }

    /// Color at a point, or `None` if it's off screen
    pub fn pixel(&self, point: Point) -> Option<Rgb888> {
        self.index(point).map(|i| self.pixels[i])
    }

    fn index(&self, point: Point) -> Option<usize> {
        let x = u32::try_from(point.x).ok()?;
        let y = u32::try_from(point.y).ok()?;
        if x < self.size.width && y < self.size.height {
            Some((y * self.size.width + x) as usize)
        } else {
            None
        }
    }

    /// Dump the frame as a binary PPM (P6) image
    pub fn write_ppm(&self, path: &Path) -> anyhow::Result<()> {
        trace!("Writing frame to {}", path.display());
        let file = File::create(path)
            .with_context(|| format!("Error creating {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        write!(writer, "P6\n{} {}\n255\n", self.size.width, self.size.height)?;
        for pixel in &self.pixels {
            writer.write_all(&[pixel.r(), pixel.g(), pixel.b()])?;
        }
        writer
            .flush()
            .with_context(|| format!("Error writing {}", path.display()))
    }
}

impl OriginDimensions for MockDisplay {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for MockDisplay {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let Some(i) = self.index(point) {
                self.pixels[i] = color;
            }
        }
        Ok(())
    }
}
