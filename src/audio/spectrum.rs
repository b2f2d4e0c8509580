use rustfft::{num_complex::Complex, FftPlanner};
use std::sync::Arc;

/// Byte-valued magnitude spectrum, shaped like a browser analyser node:
/// Hann window, magnitudes normalised by the window length, exponential
/// smoothing between windows, then a decibel range mapped onto 0..=255.
pub struct Spectrum {
    fft_size: usize,
    fft: Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
}

impl Spectrum {
    pub const DEFAULT_SMOOTHING: f32 = 0.8;
    pub const DEFAULT_MIN_DB: f32 = -100.0;
    pub const DEFAULT_MAX_DB: f32 = -30.0;

    pub fn new(fft_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Self {
            fft_size,
            fft,
            window: Self::hann_window(fft_size),
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            smoothed: vec![0.0; fft_size / 2],
            smoothing: Self::DEFAULT_SMOOTHING,
            min_db: Self::DEFAULT_MIN_DB,
            max_db: Self::DEFAULT_MAX_DB,
        }
    }

    /// Smoothing constant in [0, 1); 0 disables averaging across windows.
    pub fn with_smoothing(mut self, smoothing: f32) -> Self {
        self.smoothing = smoothing.clamp(0.0, 0.99);
        self
    }

    fn hann_window(size: usize) -> Vec<f32> {
        if size < 2 {
            return vec![1.0; size];
        }

        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect()
    }

    /// Transform one window of float samples and write `fft_size / 2` bytes.
    pub fn process(&mut self, samples: &[f32], out: &mut [u8]) {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = samples.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.buffer);

        let scale = 1.0 / self.fft_size as f32;
        let range = self.max_db - self.min_db;

        for (i, byte) in out.iter_mut().enumerate().take(self.smoothed.len()) {
            let magnitude = self.buffer[i].norm() * scale;
            let smoothed = self.smoothing * self.smoothed[i] + (1.0 - self.smoothing) * magnitude;
            self.smoothed[i] = smoothed;

            let db = 20.0 * smoothed.max(1e-12).log10();
            *byte = (255.0 * (db - self.min_db) / range).clamp(0.0, 255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin() * 0.8)
            .collect()
    }

    #[test]
    fn test_silence_maps_to_zero() {
        let mut spectrum = Spectrum::new(256);
        let mut out = vec![255u8; 128];
        spectrum.process(&vec![0.0; 256], &mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_tone_peaks_at_expected_bin() {
        let sample_rate = 8192.0;
        let mut spectrum = Spectrum::new(1024).with_smoothing(0.0);
        let mut out = vec![0u8; 512];
        // 8 Hz per bin, so 1000 Hz lands on bin 125
        spectrum.process(&sine(1000.0, sample_rate, 1024), &mut out);

        let peak_bin = out
            .iter()
            .enumerate()
            .max_by_key(|(_, &b)| b)
            .map(|(i, _)| i)
            .unwrap();
        assert!((124..=126).contains(&peak_bin), "peak at bin {}", peak_bin);
        assert_eq!(out[peak_bin], 255);
        assert!(out[400] < out[peak_bin]);
    }

    #[test]
    fn test_smoothing_carries_energy_over() {
        let mut spectrum = Spectrum::new(256);
        let mut out = vec![0u8; 128];
        spectrum.process(&sine(1000.0, 8000.0, 256), &mut out);
        spectrum.process(&vec![0.0; 256], &mut out);
        assert!(out.iter().any(|&b| b > 0));
    }
}
