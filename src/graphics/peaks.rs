/// Falling peak markers for the bar display, one per bar.
#[derive(Debug, Clone)]
pub struct PeakTracker {
    peaks: Vec<f32>,
    decay: f32,
}

impl PeakTracker {
    pub fn new(bar_count: usize, decay: f32) -> Self {
        Self {
            peaks: vec![0.0; bar_count],
            decay: decay.clamp(0.0, 1.0),
        }
    }

    pub fn peaks(&self) -> &[f32] {
        &self.peaks
    }

    /// Fold in this frame's bar heights. A bar at or above its peak lifts
    /// the peak to it; otherwise the peak decays, never below the bar.
    /// A change in bar count starts over from zero.
    pub fn update(&mut self, heights: &[f32]) {
        if heights.len() != self.peaks.len() {
            self.peaks = vec![0.0; heights.len()];
        }

        for (peak, &height) in self.peaks.iter_mut().zip(heights) {
            let height = height.max(0.0);
            *peak = if height >= *peak {
                height
            } else {
                (*peak * self.decay).max(height)
            };
        }
    }
}
