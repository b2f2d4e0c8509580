use glam::Vec2;

use super::{Raster, Rgb};

/// Drawing primitives the renderer needs from its output target.
///
/// Coordinates are in pixels with the origin at the top-left corner. The
/// surface owner resizes it between passes; the renderer reads `size` at the
/// start of every pass.
pub trait Surface {
    fn size(&self) -> (u32, u32);

    fn clear(&mut self, color: Rgb);

    fn stroke_segment(&mut self, from: Vec2, to: Vec2, color: Rgb);

    /// Stroke consecutive points in one colour.
    fn stroke_polyline(&mut self, points: &[Vec2], color: Rgb) {
        for pair in points.windows(2) {
            self.stroke_segment(pair[0], pair[1], color);
        }
    }

    /// Fill the axis-aligned rectangle spanning `origin` to `origin + size`;
    /// negative extents are allowed.
    fn fill_rect(&mut self, origin: Vec2, size: Vec2, color: Rgb);

    /// Copy a raster onto the surface, anchored at the top-left corner.
    fn put_raster(&mut self, raster: &Raster);
}
