use async_trait::async_trait;
use crossbeam_channel::Receiver;
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};

use crate::audio::{AudioFrame, LoudnessMeter, LoudnessReading, PitchEstimate, PitchEstimator, SampleSource};
use crate::graphics::{Renderer, Surface};
use crate::settings::{ConfigEvent, Settings, VisualizationState};

/// The host's "wait until the next display refresh" primitive.
#[async_trait(?Send)]
pub trait FrameClock {
    async fn next_frame(&mut self);
}

/// Refresh clock backed by a tokio interval. Late ticks are skipped rather
/// than bunched up, so a slow pass drops frames instead of queueing them.
pub struct IntervalClock {
    interval: Interval,
}

impl IntervalClock {
    pub const DEFAULT_FRAME_RATE: f32 = 60.0;

    /// Rates are clamped to 1..=1000 fps; a non-finite rate falls back to
    /// [`Self::DEFAULT_FRAME_RATE`].
    pub fn new(frame_rate: f32) -> Self {
        let frame_rate = if frame_rate.is_finite() {
            frame_rate.clamp(1.0, 1000.0)
        } else {
            Self::DEFAULT_FRAME_RATE
        };
        let period = Duration::from_secs_f32(1.0 / frame_rate);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { interval }
    }
}

#[async_trait(?Send)]
impl FrameClock for IntervalClock {
    async fn next_frame(&mut self) {
        self.interval.tick().await;
    }
}

/// Shared pause flag. Pausing makes the running loop return at the top of
/// its next pass; calling `run` again resumes.
#[derive(Debug, Clone, Default)]
pub struct DriverControl {
    paused: Arc<AtomicBool>,
}

impl DriverControl {
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }
}

/// Per-pass analysis output, handed to the outside UI for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub frame_index: u64,
    pub pitch: PitchEstimate,
    pub loudness: LoudnessReading,
}

/// Runs sample → analysis → render passes one at a time.
pub struct FrameDriver<D: Surface> {
    source: Box<dyn SampleSource>,
    surface: D,
    frame: AudioFrame,
    estimator: PitchEstimator,
    meter: LoudnessMeter,
    renderer: Renderer,
    state: VisualizationState,
    config_events: Option<Receiver<ConfigEvent>>,
    control: DriverControl,
    frames_rendered: u64,
}

impl<D: Surface> FrameDriver<D> {
    pub fn new(source: Box<dyn SampleSource>, surface: D, settings: Settings) -> Self {
        let frame = AudioFrame::new(source.fft_size(), source.sample_rate());
        info!(
            "Frame driver ready: {} source, {} samples at {} Hz",
            source.source_type(),
            source.fft_size(),
            source.sample_rate()
        );

        Self {
            source,
            surface,
            frame,
            estimator: PitchEstimator::from_config(&settings.analysis),
            meter: LoudnessMeter::from_config(&settings.analysis),
            renderer: Renderer::new(settings.render),
            state: settings.visual,
            config_events: None,
            control: DriverControl::default(),
            frames_rendered: 0,
        }
    }

    /// Attach the receiving end of a configuration channel. Pending events
    /// are applied at the start of every pass.
    pub fn with_config_events(mut self, receiver: Receiver<ConfigEvent>) -> Self {
        self.config_events = Some(receiver);
        self
    }

    pub fn control(&self) -> DriverControl {
        self.control.clone()
    }

    pub fn state(&self) -> &VisualizationState {
        &self.state
    }

    pub fn apply_event(&mut self, event: ConfigEvent) {
        if self.state.apply(event) {
            debug!("Applied {:?}", event);
        }
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn surface(&self) -> &D {
        &self.surface
    }

    /// Access for the surface owner, e.g. to resize between passes.
    pub fn surface_mut(&mut self) -> &mut D {
        &mut self.surface
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// One complete analysis + render pass.
    pub fn run_pass(&mut self) -> FrameReport {
        let pending: Vec<ConfigEvent> = self
            .config_events
            .as_ref()
            .map(|receiver| receiver.try_iter().collect())
            .unwrap_or_default();
        for event in pending {
            self.apply_event(event);
        }

        self.frame.fill_from(self.source.as_mut());

        let pitch = self.estimator.estimate(&self.frame.time_domain, self.frame.sample_rate);
        let loudness = self.meter.measure(&self.frame.time_domain);
        self.renderer
            .render(&self.frame, pitch, &loudness, &self.state, &mut self.surface);

        let report = FrameReport {
            frame_index: self.frames_rendered,
            pitch,
            loudness,
        };
        self.frames_rendered += 1;

        debug!(
            "frame {}: {} | {:.1} dB | level {:.0}{}",
            report.frame_index,
            pitch,
            loudness.db,
            loudness.level,
            if loudness.overload { " OVERLOAD" } else { "" }
        );
        report
    }

    /// Wait for each refresh, then run a pass, until paused or `max_frames`
    /// passes have run in this call. Returns the number of passes run.
    pub async fn run<C, F>(&mut self, clock: &mut C, max_frames: Option<u64>, mut on_frame: F) -> u64
    where
        C: FrameClock + ?Sized,
        F: FnMut(&FrameReport),
    {
        info!("Frame driver started in {:?} mode", self.state.mode);
        let mut passes = 0;

        loop {
            if max_frames.is_some_and(|limit| passes >= limit) {
                break;
            }

            clock.next_frame().await;
            if self.control.is_paused() {
                info!("Frame driver paused after {} frames", self.frames_rendered);
                break;
            }

            let report = self.run_pass();
            on_frame(&report);
            passes += 1;
        }

        passes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ToneSource;
    use crate::graphics::Canvas;
    use crate::settings::RenderMode;

    /// Clock that never sleeps and can pause the driver after a set number
    /// of ticks.
    struct CountingClock {
        ticks: u64,
        pause_after: Option<(u64, DriverControl)>,
    }

    #[async_trait(?Send)]
    impl FrameClock for CountingClock {
        async fn next_frame(&mut self) {
            self.ticks += 1;
            if let Some((limit, control)) = &self.pause_after {
                if self.ticks > *limit {
                    control.pause();
                }
            }
        }
    }

    fn driver() -> FrameDriver<Canvas> {
        let source = ToneSource::new(440.0, 44100.0, 2048);
        FrameDriver::new(Box::new(source), Canvas::new(64, 48), Settings::default())
    }

    #[tokio::test]
    async fn test_runs_requested_number_of_frames() {
        let mut driver = driver();
        let mut clock = CountingClock { ticks: 0, pause_after: None };
        let mut reports = Vec::new();

        let passes = driver.run(&mut clock, Some(5), |report| reports.push(*report)).await;

        assert_eq!(passes, 5);
        assert_eq!(clock.ticks, 5);
        assert_eq!(reports.iter().map(|r| r.frame_index).collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
        let hz = reports[4].pitch.hz().unwrap();
        assert!((hz - 440.0).abs() / 440.0 < 0.02, "got {}", hz);
        assert!(reports[4].loudness.level > 80.0);
    }

    #[tokio::test]
    async fn test_pause_stops_loop_and_resume_reenters() {
        let mut driver = driver();
        let control = driver.control();
        let mut clock = CountingClock {
            ticks: 0,
            pause_after: Some((3, control.clone())),
        };

        let passes = driver.run(&mut clock, None, |_| {}).await;
        assert_eq!(passes, 3);
        assert!(control.is_paused());

        clock.pause_after = None;
        control.resume();
        let passes = driver.run(&mut clock, Some(2), |_| {}).await;
        assert_eq!(passes, 2);
        assert_eq!(driver.frames_rendered(), 5);
    }

    #[tokio::test]
    async fn test_paused_driver_runs_nothing() {
        let mut driver = driver();
        driver.control().pause();
        let mut clock = CountingClock { ticks: 0, pause_after: None };
        assert_eq!(driver.run(&mut clock, None, |_| {}).await, 0);
        assert_eq!(driver.frames_rendered(), 0);
    }

    #[tokio::test]
    async fn test_interval_clock_tolerates_bad_rates() {
        for rate in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY, 0.0, -5.0, 1e9] {
            let mut clock = IntervalClock::new(rate);
            // the first tick of a tokio interval completes immediately
            clock.next_frame().await;
        }
    }

    #[test]
    fn test_config_events_apply_before_pass() {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let mut driver = driver().with_config_events(receiver);

        sender.send(ConfigEvent::SetMode(RenderMode::Spectrogram)).unwrap();
        sender.send(ConfigEvent::SetGain(-1.0)).unwrap();
        sender.send(ConfigEvent::SetSensitivity(15.0)).unwrap();
        driver.run_pass();

        assert_eq!(driver.state().mode, RenderMode::Spectrogram);
        assert_eq!(driver.state().gain, 3.0);
        assert_eq!(driver.renderer().waterfall().unwrap().size(), (64, 48));
    }

    #[test]
    fn test_surface_resize_between_passes() {
        let mut driver = driver();
        driver.apply_event(ConfigEvent::SetMode(RenderMode::Spectrogram));
        driver.run_pass();

        driver.surface_mut().resize(32, 16);
        driver.run_pass();
        assert_eq!(driver.renderer().waterfall().unwrap().size(), (32, 16));
        assert_eq!(driver.surface().raster().size(), (32, 16));
    }

    #[test]
    fn test_silent_source_reports_indeterminate() {
        let source = ToneSource::new(440.0, 44100.0, 1024).with_amplitude(0.0);
        let mut driver = FrameDriver::new(Box::new(source), Canvas::new(16, 16), Settings::default());
        let report = driver.run_pass();
        assert!(report.pitch.is_indeterminate());
        assert_eq!(report.loudness.level, 0.0);
        assert!(!report.loudness.overload);
    }
}
