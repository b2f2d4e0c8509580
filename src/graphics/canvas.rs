use anyhow::{Context, Result};
use glam::Vec2;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::{Raster, Rgb, Surface};

/// Software surface backed by a [`Raster`].
pub struct Canvas {
    raster: Raster,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            raster: Raster::new(width, height, Rgb::BLACK),
        }
    }

    /// Reallocate at a new size. Contents are lost.
    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != self.raster.size() {
            self.raster = Raster::new(width, height, Rgb::BLACK);
        }
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        self.raster.get(x, y)
    }

    fn plot(&mut self, x: f32, y: f32, color: Rgb) {
        let (x, y) = (x.round(), y.round());
        if x >= 0.0 && y >= 0.0 {
            self.raster.set(x as u32, y as u32, color);
        }
    }

    /// Write the canvas as a binary PPM (P6) image.
    pub fn write_ppm<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        write!(writer, "P6\n{} {}\n255\n", self.raster.width(), self.raster.height())?;
        for pixel in self.raster.pixels() {
            writer.write_all(&[pixel.r, pixel.g, pixel.b])?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl Surface for Canvas {
    fn size(&self) -> (u32, u32) {
        self.raster.size()
    }

    fn clear(&mut self, color: Rgb) {
        self.raster.fill(color);
    }

    fn stroke_segment(&mut self, from: Vec2, to: Vec2, color: Rgb) {
        if !from.is_finite() || !to.is_finite() {
            return;
        }

        let delta = to - from;
        let steps = delta.x.abs().max(delta.y.abs()).ceil().max(1.0);
        // keep pathological coordinates from turning into huge loops
        let steps = steps.min((self.raster.width() + self.raster.height()) as f32 * 4.0 + 1.0);
        let step = delta / steps;

        let mut point = from;
        for _ in 0..=steps as u32 {
            self.plot(point.x, point.y, color);
            point += step;
        }
    }

    fn fill_rect(&mut self, origin: Vec2, size: Vec2, color: Rgb) {
        if !origin.is_finite() || !size.is_finite() {
            return;
        }

        let min = origin.min(origin + size).round().max(Vec2::ZERO);
        let max = origin.max(origin + size).round();
        let (width, height) = self.raster.size();
        let x_end = (max.x.max(0.0) as u32).min(width);
        let y_end = (max.y.max(0.0) as u32).min(height);

        for y in min.y as u32..y_end {
            for x in min.x as u32..x_end {
                self.raster.set(x, y, color);
            }
        }
    }

    fn put_raster(&mut self, raster: &Raster) {
        let width = raster.width().min(self.raster.width()) as usize;
        let height = raster.height().min(self.raster.height());
        for y in 0..height {
            self.raster.row_mut(y)[..width].copy_from_slice(&raster.row(y)[..width]);
        }
    }
}
