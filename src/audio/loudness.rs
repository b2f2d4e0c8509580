use super::rms;
use crate::settings::AnalysisConfig;

/// Floor applied to the RMS before taking the logarithm.
const RMS_FLOOR: f32 = 1e-8;

/// Normalized loudness for one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessReading {
    /// 0 = silence floor, 100 = full scale.
    pub level: f32,
    /// Level in dBFS before normalization (never -inf).
    pub db: f32,
    pub overload: bool,
}

#[derive(Debug, Clone)]
pub struct LoudnessMeter {
    overload_level: f32,
}

impl Default for LoudnessMeter {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

impl LoudnessMeter {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            overload_level: config.overload_level,
        }
    }

    /// Map the window's RMS from -100..0 dB onto 0..100.
    pub fn measure(&self, time_domain: &[u8]) -> LoudnessReading {
        let db = 20.0 * rms(time_domain).max(RMS_FLOOR).log10();
        let level = (db + 100.0).clamp(0.0, 100.0);

        LoudnessReading {
            level,
            db,
            overload: level > self.overload_level,
        }
    }
}

pub fn measure(time_domain: &[u8]) -> LoudnessReading {
    LoudnessMeter::default().measure(time_domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::tone::{tone_bytes, Waveform};

    #[test]
    fn test_silence_reads_floor() {
        let reading = measure(&[128; 2048]);
        assert_eq!(reading.level, 0.0);
        assert!(reading.db.is_finite());
        assert!(!reading.overload);
    }

    #[test]
    fn test_full_scale_square_overloads() {
        let bytes: Vec<u8> = (0..2048).map(|i| if i % 2 == 0 { 0 } else { 255 }).collect();
        let reading = measure(&bytes);
        assert!(reading.level > 99.0, "level {}", reading.level);
        assert!(reading.overload);
    }

    #[test]
    fn test_quiet_sine_stays_below_overload() {
        // amplitude 0.1 -> rms ~0.071 -> about -23 dB
        let bytes = tone_bytes(Waveform::Sine, 440.0, 44100.0, 0.1, 2048);
        let reading = measure(&bytes);
        assert!((reading.level - 77.0).abs() < 1.5, "level {}", reading.level);
        assert!(!reading.overload);
    }

    #[test]
    fn test_overload_threshold_is_configurable() {
        let config = AnalysisConfig {
            overload_level: 70.0,
            ..AnalysisConfig::default()
        };
        let bytes = tone_bytes(Waveform::Sine, 440.0, 44100.0, 0.1, 2048);
        assert!(LoudnessMeter::from_config(&config).measure(&bytes).overload);
    }

    #[test]
    fn test_measure_is_idempotent() {
        let bytes = tone_bytes(Waveform::Square, 100.0, 8000.0, 0.5, 512);
        assert_eq!(measure(&bytes), measure(&bytes));
    }
}
