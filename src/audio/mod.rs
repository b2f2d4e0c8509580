pub mod source;
pub mod spectrum;
pub mod tone;
pub mod wav;
#[cfg(feature = "mic")]
pub mod capture;
pub mod pitch;
pub mod loudness;

pub use source::SampleSource;
pub use spectrum::Spectrum;
pub use tone::{ToneSource, Waveform};
pub use wav::WavSource;
#[cfg(feature = "mic")]
pub use capture::MicSource;
pub use pitch::{PitchEstimate, PitchEstimator};
pub use loudness::{LoudnessMeter, LoudnessReading};

/// Byte value representing zero amplitude in a time-domain buffer.
pub const SAMPLE_MIDPOINT: f32 = 128.0;

pub const DEFAULT_FFT_SIZE: usize = 2048;
pub const DEFAULT_SAMPLE_RATE: f32 = 44100.0;

/// One analysis cycle worth of samples, as handed out by a [`SampleSource`].
///
/// `time_domain` holds `fft_size` unsigned bytes centred on 128 and
/// `frequency_domain` holds `fft_size / 2` magnitude bytes, lowest bin first.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub sample_rate: f32,
    pub time_domain: Vec<u8>,
    pub frequency_domain: Vec<u8>,
}

impl AudioFrame {
    pub fn new(fft_size: usize, sample_rate: f32) -> Self {
        Self {
            sample_rate,
            time_domain: vec![SAMPLE_MIDPOINT as u8; fft_size],
            frequency_domain: vec![0; fft_size / 2],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.time_domain.len()
    }

    /// Refill both buffers from `source`, reallocating only when the source
    /// has been reconfigured to a different window size.
    pub fn fill_from(&mut self, source: &mut dyn SampleSource) {
        let fft_size = source.fft_size();
        if fft_size != self.fft_size() {
            log::info!("Sample source window changed: {} -> {}", self.fft_size(), fft_size);
            *self = Self::new(fft_size, source.sample_rate());
        }

        self.sample_rate = source.sample_rate();
        source.read_time_domain(&mut self.time_domain);
        source.read_frequency_domain(&mut self.frequency_domain);
    }
}

impl Default for AudioFrame {
    fn default() -> Self {
        Self::new(DEFAULT_FFT_SIZE, DEFAULT_SAMPLE_RATE)
    }
}

/// Map a time-domain byte onto [-1, 1).
#[inline]
pub fn centered(sample: u8) -> f32 {
    sample as f32 / SAMPLE_MIDPOINT - 1.0
}

/// Root mean square of the centred signal. Empty input counts as silence.
pub fn rms(time_domain: &[u8]) -> f32 {
    if time_domain.is_empty() {
        return 0.0;
    }

    let sum_sq: f32 = time_domain.iter().map(|&s| centered(s).powi(2)).sum();
    (sum_sq / time_domain.len() as f32).sqrt()
}

/// Quantize float samples in [-1, 1] to centred bytes.
pub fn quantize(samples: &[f32], out: &mut [u8]) {
    for (byte, &sample) in out.iter_mut().zip(samples) {
        *byte = (SAMPLE_MIDPOINT * (1.0 + sample)).round().clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_range() {
        assert_eq!(centered(128), 0.0);
        assert_eq!(centered(0), -1.0);
        assert!((centered(255) - 0.9921875).abs() < 1e-6);
    }

    #[test]
    fn test_rms_of_silence_and_empty() {
        assert_eq!(rms(&[128; 64]), 0.0);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_quantize_clamps() {
        let mut out = [0u8; 4];
        quantize(&[0.0, 1.5, -2.0, 0.5], &mut out);
        assert_eq!(out, [128, 255, 0, 192]);
    }

    #[test]
    fn test_fill_from_follows_source_size() {
        let mut source = ToneSource::new(440.0, 8000.0, 256);
        let mut frame = AudioFrame::default();
        frame.fill_from(&mut source);
        assert_eq!(frame.time_domain.len(), 256);
        assert_eq!(frame.frequency_domain.len(), 128);
        assert_eq!(frame.sample_rate, 8000.0);
    }
}
