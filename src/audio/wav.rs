use anyhow::{Context, Result};
use log::info;
use std::path::Path;

use super::{quantize, SampleSource, Spectrum};

/// Looping WAV file source. Channels are mixed to mono on load; each
/// time-domain read advances the play position by one display frame.
pub struct WavSource {
    samples: Vec<f32>,
    sample_rate: f32,
    position: usize,
    hop: usize,
    window: Vec<f32>,
    spectrum: Spectrum,
}

impl WavSource {
    pub fn open<P: AsRef<Path>>(path: P, fft_size: usize, frame_rate: f32) -> Result<Self> {
        let path = path.as_ref();
        let reader = hound::WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file {}", path.display()))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .context("Failed to decode float samples")?,
            hound::SampleFormat::Int => {
                let full_scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / full_scale))
                    .collect::<Result<_, _>>()
                    .context("Failed to decode integer samples")?
            }
        };

        let samples: Vec<f32> = interleaved
            .chunks_exact(channels)
            .map(|chunk| chunk.iter().sum::<f32>() / channels as f32)
            .collect();

        if samples.is_empty() {
            anyhow::bail!("WAV file {} contains no samples", path.display());
        }

        let sample_rate = spec.sample_rate as f32;
        info!(
            "Loaded {}: {} frames, {} channel(s) at {} Hz",
            path.display(),
            samples.len(),
            channels,
            spec.sample_rate
        );

        Ok(Self {
            samples,
            sample_rate,
            position: 0,
            hop: Self::hop_for(sample_rate, frame_rate),
            window: vec![0.0; fft_size],
            spectrum: Spectrum::new(fft_size),
        })
    }

    fn hop_for(sample_rate: f32, frame_rate: f32) -> usize {
        if frame_rate > 0.0 && frame_rate.is_finite() {
            ((sample_rate / frame_rate).round() as usize).max(1)
        } else {
            1
        }
    }

    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate
    }
}

impl SampleSource for WavSource {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn fft_size(&self) -> usize {
        self.window.len()
    }

    fn read_time_domain(&mut self, out: &mut [u8]) {
        let len = self.samples.len();
        for (i, sample) in self.window.iter_mut().enumerate() {
            *sample = self.samples[(self.position + i) % len];
        }
        self.position = (self.position + self.hop) % len;
        quantize(&self.window, out);
    }

    fn read_frequency_domain(&mut self, out: &mut [u8]) {
        self.spectrum.process(&self.window, out);
    }

    fn source_type(&self) -> &'static str {
        "wav"
    }
}
