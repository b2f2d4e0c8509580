use anyhow::{bail, Result};
use clap::Parser;
use log::info;

use pitchscope::audio::source::validate_fft_size;
use pitchscope::audio::tone::tone_bytes;
use pitchscope::audio::{PitchEstimator, Waveform};
use pitchscope::settings::AnalysisConfig;

#[derive(Parser)]
#[command(name = "tone-sweep")]
#[command(about = "Measure pitch estimator error over a sweep of synthetic tones")]
struct Args {
    /// Lowest tone in Hz
    #[arg(long, default_value = "80")]
    from: f32,

    /// Highest tone in Hz
    #[arg(long, default_value = "1000")]
    to: f32,

    /// Number of tones in the sweep (spaced logarithmically)
    #[arg(long, default_value = "12")]
    steps: usize,

    /// Sample rate in Hz
    #[arg(long, default_value = "44100")]
    sample_rate: f32,

    /// Analysis window length
    #[arg(long, default_value = "2048")]
    fft_size: usize,

    /// Sweep square waves instead of sines
    #[arg(long)]
    square: bool,

    /// Refine the integer-lag estimate with parabolic interpolation
    #[arg(long)]
    interpolate: bool,
}

fn sweep_frequencies(from: f32, to: f32, steps: usize) -> Vec<f32> {
    if steps <= 1 {
        return vec![from];
    }
    let ratio = (to / from).powf(1.0 / (steps - 1) as f32);
    (0..steps).map(|i| from * ratio.powi(i as i32)).collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    validate_fft_size(args.fft_size)?;
    if !(args.from > 0.0 && args.to >= args.from) {
        bail!("sweep range must satisfy 0 < from <= to");
    }

    let config = AnalysisConfig {
        interpolate_peak: args.interpolate,
        ..AnalysisConfig::default()
    };
    let estimator = PitchEstimator::from_config(&config);
    let waveform = if args.square { Waveform::Square } else { Waveform::Sine };

    info!(
        "Sweeping {:?} from {} Hz to {} Hz, {} samples at {} Hz",
        waveform, args.from, args.to, args.fft_size, args.sample_rate
    );

    println!("{:>10}  {:>10}  {:>8}", "tone (Hz)", "estimate", "error %");
    let mut worst: f32 = 0.0;
    for frequency in sweep_frequencies(args.from, args.to, args.steps) {
        let window = tone_bytes(waveform, frequency, args.sample_rate, 0.8, args.fft_size);
        let estimate = estimator.estimate(&window, args.sample_rate);
        match estimate.hz() {
            Some(hz) => {
                let error = (hz - frequency) / frequency * 100.0;
                worst = worst.max(error.abs());
                println!("{:>10.2}  {:>10.2}  {:>8.3}", frequency, hz, error);
            }
            None => println!("{:>10.2}  {:>10}  {:>8}", frequency, "--", "--"),
        }
    }

    info!("Worst error {:.3}%", worst);
    Ok(())
}
