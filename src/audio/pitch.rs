use std::fmt;

use super::{centered, rms};
use crate::settings::AnalysisConfig;

/// Fundamental frequency estimate for one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PitchEstimate {
    /// Strictly positive, finite frequency in Hz.
    Hz(f32),
    /// Silence, noise or a degenerate autocorrelation.
    Indeterminate,
}

impl PitchEstimate {
    /// Build an estimate, mapping anything non-finite or non-positive to
    /// `Indeterminate`.
    pub fn from_hz(hz: f32) -> Self {
        if hz.is_finite() && hz > 0.0 {
            PitchEstimate::Hz(hz)
        } else {
            PitchEstimate::Indeterminate
        }
    }

    pub fn hz(self) -> Option<f32> {
        match self {
            PitchEstimate::Hz(hz) => Some(hz),
            PitchEstimate::Indeterminate => None,
        }
    }

    pub fn is_indeterminate(self) -> bool {
        matches!(self, PitchEstimate::Indeterminate)
    }
}

impl fmt::Display for PitchEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PitchEstimate::Hz(hz) => write!(f, "{:.0} Hz", hz),
            PitchEstimate::Indeterminate => write!(f, "-- Hz"),
        }
    }
}

/// Autocorrelation pitch detector with zero-crossing trimmed windows.
///
/// The correlation is computed directly in O(L²); `L` is at most one
/// analysis window and the estimator runs once per display frame.
#[derive(Debug, Clone)]
pub struct PitchEstimator {
    silence_rms: f32,
    zero_crossing_threshold: f32,
    interpolate_peak: bool,
}

impl Default for PitchEstimator {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl PitchEstimator {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            silence_rms: config.silence_rms,
            zero_crossing_threshold: config.zero_crossing_threshold,
            interpolate_peak: config.interpolate_peak,
        }
    }

    pub fn estimate(&self, time_domain: &[u8], sample_rate: f32) -> PitchEstimate {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return PitchEstimate::Indeterminate;
        }

        if rms(time_domain) < self.silence_rms {
            return PitchEstimate::Indeterminate;
        }

        let (r1, r2) = self.trim_window(time_domain);
        if r2 <= r1 {
            return PitchEstimate::Indeterminate;
        }

        let trimmed: Vec<f32> = time_domain[r1..r2].iter().map(|&s| centered(s)).collect();
        let correlation = autocorrelate(&trimmed);

        match self.peak_lag(&correlation) {
            Some(lag) => PitchEstimate::from_hz(sample_rate / lag),
            None => PitchEstimate::Indeterminate,
        }
    }

    /// Bounds `[r1, r2)` of the analysis window, each placed at the first
    /// near-zero sample found scanning inwards from its end of the buffer.
    fn trim_window(&self, time_domain: &[u8]) -> (usize, usize) {
        let n = time_domain.len();
        let half = n / 2;
        let near_zero = |s: u8| centered(s).abs() < self.zero_crossing_threshold;

        let r1 = (0..half).find(|&i| near_zero(time_domain[i])).unwrap_or(0);
        let r2 = (1..half)
            .map(|i| n - i)
            .find(|&i| near_zero(time_domain[i]))
            .unwrap_or(n.saturating_sub(1));

        (r1, r2)
    }

    /// Lag of the strongest correlation after the zero-lag lobe, optionally
    /// refined by a parabola through its neighbours.
    fn peak_lag(&self, correlation: &[f32]) -> Option<f32> {
        let len = correlation.len();
        if len < 3 {
            return None;
        }

        let mut d = 0;
        while d < len - 1 && correlation[d] > correlation[d + 1] {
            d += 1;
        }
        if d >= len - 1 {
            return None;
        }

        let mut max_value = f32::NEG_INFINITY;
        let mut max_pos = None;
        for (i, &value) in correlation.iter().enumerate().skip(d) {
            if value > max_value {
                max_value = value;
                max_pos = Some(i);
            }
        }

        let max_pos = max_pos.filter(|&pos| pos > 0)?;
        let mut lag = max_pos as f32;

        if self.interpolate_peak && max_pos + 1 < len {
            let x1 = correlation[max_pos - 1];
            let x2 = correlation[max_pos];
            let x3 = correlation[max_pos + 1];
            let a = (x1 + x3 - 2.0 * x2) / 2.0;
            let b = (x3 - x1) / 2.0;
            if a != 0.0 {
                let shift = -b / (2.0 * a);
                if shift.is_finite() && shift.abs() <= 1.0 {
                    lag += shift;
                }
            }
        }

        (lag > 0.0 && lag.is_finite()).then_some(lag)
    }
}

/// Unnormalised autocorrelation for every lag in `[0, len)`.
fn autocorrelate(signal: &[f32]) -> Vec<f32> {
    let len = signal.len();
    (0..len)
        .map(|lag| {
            signal[..len - lag]
                .iter()
                .zip(&signal[lag..])
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect()
}

/// Estimate with the default thresholds.
pub fn estimate(time_domain: &[u8], sample_rate: f32) -> PitchEstimate {
    PitchEstimator::default().estimate(time_domain, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tone::{tone_bytes, Waveform};

    const SAMPLE_RATE: f32 = 44100.0;
    const SIZE: usize = 2048;

    fn assert_close(estimate: PitchEstimate, expected: f32, tolerance: f32) {
        let hz = estimate.hz().unwrap_or_else(|| panic!("no pitch for {} Hz", expected));
        let error = (hz - expected).abs() / expected;
        assert!(error <= tolerance, "expected {} Hz, got {} Hz ({:.2}%)", expected, hz, error * 100.0);
    }

    #[test]
    fn test_sine_accuracy_across_musical_range() {
        for &freq in &[80.0, 110.0, 196.0, 261.63, 440.0, 659.25, 880.0, 1000.0] {
            let bytes = tone_bytes(Waveform::Sine, freq, SAMPLE_RATE, 0.8, SIZE);
            assert_close(estimate(&bytes, SAMPLE_RATE), freq, 0.02);
        }
    }

    #[test]
    fn test_a440_within_a_few_hz() {
        let bytes = tone_bytes(Waveform::Sine, 440.0, SAMPLE_RATE, 0.8, SIZE);
        let hz = estimate(&bytes, SAMPLE_RATE).hz().unwrap();
        assert!((hz - 440.0).abs() < 4.0, "got {}", hz);
    }

    #[test]
    fn test_default_estimate_is_rate_over_whole_lag() {
        for &freq in &[110.0, 261.63, 440.0, 880.0] {
            let bytes = tone_bytes(Waveform::Sine, freq, SAMPLE_RATE, 0.8, SIZE);
            let hz = estimate(&bytes, SAMPLE_RATE).hz().unwrap();
            let lag = SAMPLE_RATE / hz;
            assert!((lag - lag.round()).abs() < 1e-3, "{} Hz gave lag {}", freq, lag);
        }

        // A440 peaks at lag 100
        let bytes = tone_bytes(Waveform::Sine, 440.0, SAMPLE_RATE, 0.8, SIZE);
        assert_eq!(estimate(&bytes, SAMPLE_RATE), PitchEstimate::Hz(441.0));
    }

    #[test]
    fn test_interpolation_refines_between_lags() {
        let config = AnalysisConfig {
            interpolate_peak: true,
            ..AnalysisConfig::default()
        };
        let estimator = PitchEstimator::from_config(&config);
        let bytes = tone_bytes(Waveform::Sine, 440.0, SAMPLE_RATE, 0.8, SIZE);
        let hz = estimator.estimate(&bytes, SAMPLE_RATE).hz().unwrap();
        assert!((hz - 440.0).abs() < 0.5, "got {}", hz);
        assert_close(estimator.estimate(&bytes, SAMPLE_RATE), 440.0, 0.02);
    }

    #[test]
    fn test_square_wave_fundamental() {
        let bytes = tone_bytes(Waveform::Square, 220.0, SAMPLE_RATE, 0.8, SIZE);
        assert_close(estimate(&bytes, SAMPLE_RATE), 220.0, 0.02);
    }

    #[test]
    fn test_silence_is_indeterminate() {
        assert_eq!(estimate(&[128; SIZE], SAMPLE_RATE), PitchEstimate::Indeterminate);
    }

    #[test]
    fn test_noise_floor_is_indeterminate() {
        // +/-1 LSB dither stays below the silence threshold
        let bytes: Vec<u8> = (0..SIZE).map(|i| if i % 3 == 0 { 129 } else { 128 }).collect();
        assert_eq!(estimate(&bytes, SAMPLE_RATE), PitchEstimate::Indeterminate);
    }

    #[test]
    fn test_degenerate_inputs_never_produce_non_finite_values() {
        assert!(estimate(&[], SAMPLE_RATE).is_indeterminate());
        assert!(estimate(&[0], SAMPLE_RATE).is_indeterminate());
        assert!(estimate(&[0, 255], SAMPLE_RATE).is_indeterminate());

        let bytes = tone_bytes(Waveform::Sine, 440.0, SAMPLE_RATE, 0.8, SIZE);
        assert!(estimate(&bytes, 0.0).is_indeterminate());
        assert!(estimate(&bytes, f32::NAN).is_indeterminate());
        assert!(estimate(&bytes, f32::INFINITY).is_indeterminate());

        // a DC offset correlates less at every lag, so no dip is ever found
        let offset = vec![200u8; SIZE];
        assert_eq!(estimate(&offset, SAMPLE_RATE), PitchEstimate::Indeterminate);
    }

    #[test]
    fn test_estimate_is_idempotent() {
        let bytes = tone_bytes(Waveform::Sine, 330.0, SAMPLE_RATE, 0.6, SIZE);
        let estimator = PitchEstimator::default();
        assert_eq!(estimator.estimate(&bytes, SAMPLE_RATE), estimator.estimate(&bytes, SAMPLE_RATE));
    }

    #[test]
    fn test_from_hz_guards() {
        assert_eq!(PitchEstimate::from_hz(f32::NAN), PitchEstimate::Indeterminate);
        assert_eq!(PitchEstimate::from_hz(-3.0), PitchEstimate::Indeterminate);
        assert_eq!(PitchEstimate::from_hz(f32::INFINITY), PitchEstimate::Indeterminate);
        assert_eq!(PitchEstimate::from_hz(440.0).to_string(), "440 Hz");
        assert_eq!(PitchEstimate::Indeterminate.to_string(), "-- Hz");
    }

    #[test]
    fn test_autocorrelation_zero_lag_is_energy() {
        let correlation = autocorrelate(&[1.0, -1.0, 1.0, -1.0]);
        assert_eq!(correlation, vec![4.0, -3.0, 2.0, -1.0]);
    }
}
