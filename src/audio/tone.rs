use super::{quantize, SampleSource, Spectrum};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
}

impl Waveform {
    fn value(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => (2.0 * std::f32::consts::PI * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }
}

/// Render `len` centred bytes of a periodic waveform starting at phase zero.
pub fn tone_bytes(waveform: Waveform, frequency: f32, sample_rate: f32, amplitude: f32, len: usize) -> Vec<u8> {
    let samples: Vec<f32> = (0..len)
        .map(|i| {
            let phase = (frequency * i as f32 / sample_rate).fract();
            waveform.value(phase) * amplitude
        })
        .collect();

    let mut bytes = vec![0u8; len];
    quantize(&samples, &mut bytes);
    bytes
}

/// Synthetic source producing a continuous tone; each time-domain read
/// advances the phase by one window.
pub struct ToneSource {
    waveform: Waveform,
    frequency: f32,
    amplitude: f32,
    sample_rate: f32,
    phase: f32,
    window: Vec<f32>,
    spectrum: Spectrum,
}

impl ToneSource {
    pub fn new(frequency: f32, sample_rate: f32, fft_size: usize) -> Self {
        Self {
            waveform: Waveform::Sine,
            frequency,
            amplitude: 0.8,
            sample_rate,
            phase: 0.0,
            window: vec![0.0; fft_size],
            spectrum: Spectrum::new(fft_size),
        }
    }

    pub fn with_waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = waveform;
        self
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }
}

impl SampleSource for ToneSource {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn fft_size(&self) -> usize {
        self.window.len()
    }

    fn read_time_domain(&mut self, out: &mut [u8]) {
        let step = self.frequency / self.sample_rate;
        for sample in self.window.iter_mut() {
            *sample = self.waveform.value(self.phase) * self.amplitude;
            self.phase = (self.phase + step).fract();
        }
        quantize(&self.window, out);
    }

    fn read_frequency_domain(&mut self, out: &mut [u8]) {
        self.spectrum.process(&self.window, out);
    }

    fn source_type(&self) -> &'static str {
        "tone"
    }
}
