use super::Rgb;

/// Owned row-major pixel buffer, top row first.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl Raster {
    pub fn new(width: u32, height: u32, fill: Rgb) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }

    pub fn fill(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Rgb> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Out-of-bounds writes are dropped.
    pub fn set(&mut self, x: u32, y: u32, color: Rgb) {
        if let Some(i) = self.index(x, y) {
            self.pixels[i] = color;
        }
    }

    pub fn row(&self, y: u32) -> &[Rgb] {
        let start = y as usize * self.width as usize;
        &self.pixels[start..start + self.width as usize]
    }

    pub fn row_mut(&mut self, y: u32) -> &mut [Rgb] {
        let start = y as usize * self.width as usize;
        &mut self.pixels[start..start + self.width as usize]
    }

    /// Move every row up by one, dropping the top row and filling the
    /// bottom row with `fill`.
    pub fn scroll_up(&mut self, fill: Rgb) {
        if self.height == 0 {
            return;
        }

        let width = self.width as usize;
        self.pixels.copy_within(width.., 0);
        let bottom = self.height - 1;
        self.row_mut(bottom).fill(fill);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Rgb = Rgb::new(1, 0, 0);
    const B: Rgb = Rgb::new(2, 0, 0);
    const BG: Rgb = Rgb::BLACK;

    #[test]
    fn test_scroll_up_discards_top_row() {
        let mut raster = Raster::new(2, 3, BG);
        raster.row_mut(0).fill(A);
        raster.row_mut(2).fill(B);

        raster.scroll_up(BG);
        assert_eq!(raster.row(0), &[BG, BG]);
        assert_eq!(raster.row(1), &[B, B]);
        assert_eq!(raster.row(2), &[BG, BG]);
    }

    #[test]
    fn test_out_of_bounds_access() {
        let mut raster = Raster::new(2, 2, BG);
        raster.set(5, 0, A);
        assert_eq!(raster.get(5, 0), None);
        assert!(raster.pixels().iter().all(|&p| p == BG));
    }

    #[test]
    fn test_empty_raster_scrolls() {
        let mut raster = Raster::new(0, 0, BG);
        raster.scroll_up(A);
        assert!(raster.pixels().is_empty());
    }
}
