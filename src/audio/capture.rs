use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Stream;
use crossbeam_channel::Receiver;
use log::{info, warn};
use std::collections::VecDeque;

use super::{quantize, SampleSource, Spectrum};

/// Live mono input from the host's default capture device.
///
/// The device callback mixes each buffer down to mono and hands it over a
/// channel; reads keep only the newest `fft_size` samples.
pub struct MicSource {
    // dropping the stream stops capture
    _stream: Stream,
    chunks: Receiver<Vec<f32>>,
    history: VecDeque<f32>,
    sample_rate: f32,
    window: Vec<f32>,
    spectrum: Spectrum,
}

impl MicSource {
    pub fn open(fft_size: usize) -> Result<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .context("No default input device")?;
        let stream_config: cpal::StreamConfig = device
            .default_input_config()
            .context("Input device has no usable default configuration")?
            .into();

        let channels = usize::from(stream_config.channels.max(1));
        let sample_rate = stream_config.sample_rate.0 as f32;
        info!(
            "Capturing from {} ({} ch, {} Hz)",
            device.name().unwrap_or_else(|_| "unnamed device".into()),
            channels,
            stream_config.sample_rate.0
        );

        let (sender, chunks) = crossbeam_channel::unbounded();
        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // the receiver only goes away while the source is being dropped
                    let _ = sender.send(mix_to_mono(data, channels));
                },
                |err| warn!("Capture stream error: {}", err),
                None,
            )
            .context("Failed to build input stream")?;
        stream.play().context("Failed to start input stream")?;

        Ok(Self {
            _stream: stream,
            chunks,
            history: VecDeque::from(vec![0.0; fft_size]),
            sample_rate,
            window: vec![0.0; fft_size],
            spectrum: Spectrum::new(fft_size),
        })
    }

    fn drain(&mut self) {
        let capacity = self.window.len();
        for chunk in self.chunks.try_iter() {
            self.history.extend(chunk);
        }
        while self.history.len() > capacity {
            self.history.pop_front();
        }
    }
}

/// Average interleaved frames down to one channel. A trailing partial frame
/// is averaged over the samples it has.
fn mix_to_mono(data: &[f32], channels: usize) -> Vec<f32> {
    data.chunks(channels.max(1))
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

impl SampleSource for MicSource {
    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn fft_size(&self) -> usize {
        self.window.len()
    }

    fn read_time_domain(&mut self, out: &mut [u8]) {
        self.drain();
        for (slot, &sample) in self.window.iter_mut().zip(self.history.iter()) {
            *slot = sample;
        }
        quantize(&self.window, out);
    }

    fn read_frequency_domain(&mut self, out: &mut [u8]) {
        self.spectrum.process(&self.window, out);
    }

    fn source_type(&self) -> &'static str {
        "mic"
    }
}
