use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Duration;

use pitchscope::audio::source::validate_fft_size;
use pitchscope::audio::{SampleSource, ToneSource, WavSource, Waveform, DEFAULT_SAMPLE_RATE};
use pitchscope::driver::{FrameDriver, IntervalClock};
use pitchscope::graphics::{Canvas, Rgb};
use pitchscope::settings::{ColorMode, ConfigEvent, RenderMode, Settings, Theme};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// Default input device (requires the `mic` feature)
    Mic,
    /// Synthetic test tone
    Tone,
    /// Looping WAV file
    Wav,
}

#[derive(Parser)]
#[command(name = "pitchscope")]
#[command(about = "Live pitch and loudness readout with waveform/spectrum visualization")]
struct Args {
    /// Where the audio comes from
    #[arg(long, value_enum, default_value = "tone")]
    source: SourceKind,

    /// Tone frequency in Hz for the tone source
    #[arg(long, default_value = "440")]
    tone_hz: f32,

    /// Use a square wave instead of a sine for the tone source
    #[arg(long)]
    square: bool,

    /// WAV file for the wav source
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Analysis window length (power of two, at least 32)
    #[arg(long, default_value = "2048")]
    fft_size: usize,

    /// JSON settings file with initial visualization state and analysis constants
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Render mode (overrides the settings file)
    #[arg(long, value_enum)]
    mode: Option<RenderMode>,

    /// Colour mode (overrides the settings file)
    #[arg(long, value_enum)]
    color_mode: Option<ColorMode>,

    /// Theme (overrides the settings file)
    #[arg(long, value_enum)]
    theme: Option<Theme>,

    /// Accent colour as #rrggbb
    #[arg(long)]
    accent: Option<Rgb>,

    /// Visual amplitude multiplier
    #[arg(long)]
    gain: Option<f32>,

    /// Sensitivity slider value; gain becomes one fifth of it
    #[arg(long, conflicts_with = "gain")]
    sensitivity: Option<f32>,

    /// Surface width in pixels
    #[arg(long, default_value = "800")]
    width: u32,

    /// Surface height in pixels
    #[arg(long, default_value = "300")]
    height: u32,

    /// Stop after this many frames (runs until Ctrl-C otherwise)
    #[arg(long)]
    frames: Option<u64>,

    /// Refresh rate in frames per second
    #[arg(long, default_value = "60", value_parser = parse_frame_rate)]
    fps: f32,

    /// Step through every render mode, switching after this many seconds
    #[arg(long, value_parser = parse_seconds)]
    cycle_modes: Option<Duration>,

    /// Write the last rendered frame to this file as a binary PPM
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

fn parse_positive(value: &str) -> Result<f32, String> {
    let number: f32 = value.parse().map_err(|_| format!("'{}' is not a number", value))?;
    if number.is_finite() && number > 0.0 {
        Ok(number)
    } else {
        Err(format!("expected a finite value above zero, got {}", value))
    }
}

fn parse_frame_rate(value: &str) -> Result<f32, String> {
    parse_positive(value).map(|fps| fps.min(1000.0))
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds = parse_positive(value)?;
    Duration::try_from_secs_f32(seconds).map_err(|e| format!("{}: {}", value, e))
}

fn open_source(args: &Args) -> Result<Box<dyn SampleSource>> {
    let source: Box<dyn SampleSource> = match args.source {
        SourceKind::Tone => {
            let waveform = if args.square { Waveform::Square } else { Waveform::Sine };
            Box::new(
                ToneSource::new(args.tone_hz, DEFAULT_SAMPLE_RATE, args.fft_size).with_waveform(waveform),
            )
        }
        SourceKind::Wav => {
            let Some(path) = &args.wav else {
                bail!("--source wav needs --wav <FILE>");
            };
            let source = WavSource::open(path, args.fft_size, args.fps)?;
            info!("Looping {:.1} s of audio", source.duration_seconds());
            Box::new(source)
        }
        SourceKind::Mic => open_mic(args.fft_size)?,
    };

    info!(
        "Opened {} source at {} Hz, window {}",
        source.source_type(),
        source.sample_rate(),
        source.fft_size()
    );
    Ok(source)
}

#[cfg(feature = "mic")]
fn open_mic(fft_size: usize) -> Result<Box<dyn SampleSource>> {
    Ok(Box::new(pitchscope::audio::MicSource::open(fft_size)?))
}

#[cfg(not(feature = "mic"))]
fn open_mic(_fft_size: usize) -> Result<Box<dyn SampleSource>> {
    bail!("microphone input needs a build with the `mic` feature")
}

fn build_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => {
            info!("Loading settings from {}", path.display());
            Settings::load(path)?
        }
        None => Settings::default(),
    };

    let overrides = [
        args.mode.map(ConfigEvent::SetMode),
        args.color_mode.map(ConfigEvent::SetColorMode),
        args.theme.map(ConfigEvent::SetTheme),
        args.accent.map(ConfigEvent::SetAccent),
        args.gain.map(ConfigEvent::SetGain),
        args.sensitivity.map(ConfigEvent::SetSensitivity),
    ];
    for event in overrides.into_iter().flatten() {
        settings.visual.apply(event);
    }

    Ok(settings)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    info!("Starting pitchscope");
    validate_fft_size(args.fft_size)?;

    let settings = build_settings(&args)?;
    let source = open_source(&args)?;
    let canvas = Canvas::new(args.width, args.height);

    let (event_sender, event_receiver) = crossbeam_channel::unbounded();
    let mut driver = FrameDriver::new(source, canvas, settings).with_config_events(event_receiver);

    let control = driver.control();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping");
            control.pause();
        }
    });

    if let Some(period) = args.cycle_modes {
        let mut mode = driver.state().mode;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                mode = mode.next();
                if event_sender.send(ConfigEvent::SetMode(mode)).is_err() {
                    break;
                }
            }
        });
    }

    let mut clock = IntervalClock::new(args.fps);
    let log_every = (args.fps.round() as u64).max(1);
    let passes = driver
        .run(&mut clock, args.frames, |report| {
            if report.frame_index % log_every == 0 {
                info!("{} | {:.0} dB", report.pitch, report.loudness.db);
            }
            if report.loudness.overload {
                warn!("Input overload at level {:.0}", report.loudness.level);
            }
        })
        .await;

    info!("Rendered {} frames", passes);

    if let Some(path) = &args.snapshot {
        driver.surface().write_ppm(path)?;
        info!("Snapshot written to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_and_period_arguments_reject_non_finite() {
        for bad in ["NaN", "inf", "-inf", "0", "-2", "fast"] {
            assert!(parse_frame_rate(bad).is_err(), "fps {}", bad);
            assert!(parse_seconds(bad).is_err(), "seconds {}", bad);
        }
        assert!(parse_seconds("1e30").is_err());
    }

    #[test]
    fn test_rate_and_period_arguments_accept_positive_values() {
        assert_eq!(parse_frame_rate("30"), Ok(30.0));
        assert_eq!(parse_frame_rate("5000"), Ok(1000.0));
        assert_eq!(parse_seconds("2.5"), Ok(Duration::from_millis(2500)));
    }

    #[test]
    fn test_args_parse_cycle_period() {
        let args = Args::try_parse_from(["pitchscope", "--cycle-modes", "4", "--fps", "24"]).unwrap();
        assert_eq!(args.cycle_modes, Some(Duration::from_secs(4)));
        assert_eq!(args.fps, 24.0);
        assert!(Args::try_parse_from(["pitchscope", "--cycle-modes", "inf"]).is_err());
        assert!(Args::try_parse_from(["pitchscope", "--fps", "NaN"]).is_err());
    }
}
