use super::{Raster, Rgb};

/// Scrolling spectrogram history the size of the drawing surface. Each
/// pushed row becomes the bottom row; older rows move up one per push.
/// Rows scrolled in from below and short rows are padded with the
/// background the history was created with.
#[derive(Debug, Clone)]
pub struct WaterfallHistory {
    raster: Raster,
    background: Rgb,
}

impl WaterfallHistory {
    pub fn new(width: u32, height: u32, background: Rgb) -> Self {
        Self {
            raster: Raster::new(width, height, background),
            background,
        }
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    pub fn size(&self) -> (u32, u32) {
        self.raster.size()
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    /// Scroll up by one row and write `row` as the new bottom row. A short
    /// row leaves the remainder as background; a long one is clipped.
    pub fn push_row(&mut self, row: &[Rgb]) {
        let (width, height) = self.raster.size();
        if height == 0 {
            return;
        }

        self.raster.scroll_up(self.background);
        let bottom = self.raster.row_mut(height - 1);
        let len = row.len().min(width as usize);
        bottom[..len].copy_from_slice(&row[..len]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BG: Rgb = Rgb::BLACK;

    fn shade(i: u8) -> Rgb {
        Rgb::new(i, i, i)
    }

    #[test]
    fn test_rows_scroll_one_per_push() {
        let mut history = WaterfallHistory::new(3, 4, BG);
        for k in 1..=3u8 {
            history.push_row(&[shade(k); 3]);
        }

        let raster = history.raster();
        assert_eq!(raster.row(3), &[shade(3); 3]);
        assert_eq!(raster.row(2), &[shade(2); 3]);
        assert_eq!(raster.row(1), &[shade(1); 3]);
        assert_eq!(raster.row(0), &[BG; 3]);

        // the oldest row falls off the top
        history.push_row(&[shade(4); 3]);
        history.push_row(&[shade(5); 3]);
        assert_eq!(history.raster().row(0), &[shade(2); 3]);
    }

    #[test]
    fn test_short_row_is_padded_with_background() {
        let mut history = WaterfallHistory::new(3, 1, BG);
        history.push_row(&[shade(7)]);
        assert_eq!(history.raster().row(0), &[shade(7), BG, BG]);
    }
}
