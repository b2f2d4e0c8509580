/// Supplier of the two fixed-length sequences consumed by each analysis pass.
///
/// A source is acquired (and can fail) before the frame driver starts; once a
/// driver owns it, every read is assumed to succeed. Implementations keep the
/// window length fixed for their lifetime.
///
/// # Read order
/// `read_time_domain` captures the current window. `read_frequency_domain`
/// reports the magnitude spectrum of the most recently captured window, so a
/// pass reads time-domain data first.
///
/// # Available Implementations
/// - `ToneSource`: synthetic sine/square generator
/// - `WavSource`: looping WAV file reader
/// - `MicSource`: live default input device (`mic` feature)
///
/// # Example Usage
/// ```rust,no_run
/// use pitchscope::audio::{AudioFrame, SampleSource, ToneSource};
///
/// let mut source: Box<dyn SampleSource> = Box::new(ToneSource::new(440.0, 44100.0, 2048));
/// let mut frame = AudioFrame::default();
/// frame.fill_from(source.as_mut());
/// println!("{} source, {} Hz", source.source_type(), frame.sample_rate);
/// ```
pub trait SampleSource {
    /// Sampling rate in Hz.
    fn sample_rate(&self) -> f32;

    /// Number of time-domain samples per window (power of two).
    fn fft_size(&self) -> usize;

    /// Fill `out` (length `fft_size`) with bytes centred on 128.
    fn read_time_domain(&mut self, out: &mut [u8]);

    /// Fill `out` (length `fft_size / 2`) with magnitude bytes, lowest bin first.
    fn read_frequency_domain(&mut self, out: &mut [u8]);

    /// Short identification string ("tone", "wav", "mic") used in logs.
    fn source_type(&self) -> &'static str;
}

/// Reject window sizes the analysis path cannot use.
pub fn validate_fft_size(fft_size: usize) -> anyhow::Result<()> {
    if fft_size < 32 || !fft_size.is_power_of_two() {
        anyhow::bail!("FFT size must be a power of two >= 32, got {}", fft_size);
    }
    Ok(())
}
