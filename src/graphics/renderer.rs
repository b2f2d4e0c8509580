use glam::Vec2;
use log::debug;
use std::f32::consts::TAU;

use super::color::{self, ColorResolver};
use super::{PeakTracker, Rgb, Surface, WaterfallHistory};
use crate::audio::{centered, AudioFrame, LoudnessReading, PitchEstimate};
use crate::settings::{RenderConfig, RenderMode, VisualizationState};

const OVERLAY_STRIP_HEIGHT: f32 = 3.0;
const OVERLAY_MIN_HZ: f32 = 50.0;
const OVERLAY_MAX_HZ: f32 = 2000.0;

/// Draws one frame per call in the mode selected by the visualization state.
///
/// The waterfall history (spectrogram) and peak trackers (bars) are created
/// on first use of their mode, survive switching to another mode and back,
/// and are dropped whenever the surface size changes. The waterfall is also
/// restarted when the theme background changes, so old rows never show the
/// previous theme.
pub struct Renderer {
    config: RenderConfig,
    surface_size: Option<(u32, u32)>,
    waterfall: Option<WaterfallHistory>,
    peaks: Option<PeakTracker>,
}

/// Pixel dimensions of the surface for the current pass.
#[derive(Debug, Clone, Copy)]
struct Area {
    width: f32,
    height: f32,
}

impl Area {
    fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    fn short_side(&self) -> f32 {
        self.width.min(self.height)
    }
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            surface_size: None,
            waterfall: None,
            peaks: None,
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn waterfall(&self) -> Option<&WaterfallHistory> {
        self.waterfall.as_ref()
    }

    pub fn peaks(&self) -> Option<&[f32]> {
        self.peaks.as_ref().map(|tracker| tracker.peaks())
    }

    pub fn render(
        &mut self,
        frame: &AudioFrame,
        pitch: PitchEstimate,
        loudness: &LoudnessReading,
        state: &VisualizationState,
        surface: &mut dyn Surface,
    ) {
        let (width, height) = surface.size();
        self.track_surface_size((width, height));

        let background = color::background(state.theme);
        surface.clear(background);
        if width == 0 || height == 0 {
            return;
        }

        let area = Area {
            width: width as f32,
            height: height as f32,
        };
        let colors = ColorResolver::new(state, &self.config);

        match state.mode {
            RenderMode::Wave => draw_wave(&frame.time_domain, state.gain, &colors, area, surface),
            RenderMode::Mirror => draw_mirror(&frame.time_domain, state.gain, &colors, area, surface),
            RenderMode::Bars => self.draw_bars(&frame.frequency_domain, state.gain, &colors, area, surface),
            RenderMode::Spectrogram => {
                self.draw_spectrogram(&frame.frequency_domain, state.gain, &colors, background, surface)
            }
            RenderMode::Circular => self.draw_circular(&frame.time_domain, state.gain, &colors, area, surface),
            RenderMode::Star => self.draw_star(&frame.frequency_domain, state.gain, &colors, area, surface),
        }

        if self.config.level_meter {
            draw_overlay(pitch, loudness, state.accent, area, surface);
        }
    }

    fn track_surface_size(&mut self, size: (u32, u32)) {
        if self.surface_size == Some(size) {
            return;
        }

        if self.surface_size.is_some() {
            debug!("Surface resized to {}x{}, dropping waterfall and peak state", size.0, size.1);
        }
        self.surface_size = Some(size);
        self.waterfall = None;
        self.peaks = None;
    }

    fn draw_bars(&mut self, magnitudes: &[u8], gain: f32, colors: &ColorResolver, area: Area, surface: &mut dyn Surface) {
        let bar_width = self.config.bar_width.max(1.0);
        let marker = self.config.peak_marker_height;
        let bar_count = ((area.width / bar_width) as usize).max(1);
        let heights = bar_heights(magnitudes, bar_count, gain);

        let decay = self.config.peak_decay;
        let tracker = self.peaks.get_or_insert_with(|| PeakTracker::new(heights.len(), decay));
        tracker.update(&heights);

        let total = heights.len();
        for (i, (&height, &peak)) in heights.iter().zip(tracker.peaks()).enumerate() {
            let x = i as f32 * bar_width;
            let color = colors.color_at(i, total);
            let drawn_width = (bar_width - 1.0).max(1.0);

            surface.fill_rect(Vec2::new(x, area.height - height), Vec2::new(drawn_width, height), color);
            if peak >= 1.0 {
                surface.fill_rect(
                    Vec2::new(x, area.height - peak - marker),
                    Vec2::new(drawn_width, marker),
                    color,
                );
            }
        }
    }

    fn draw_spectrogram(
        &mut self,
        magnitudes: &[u8],
        gain: f32,
        colors: &ColorResolver,
        background: Rgb,
        surface: &mut dyn Surface,
    ) {
        let (width, height) = surface.size();
        let gate = self.config.spectrogram_gate;
        let visible = visible_bins(magnitudes);

        let row: Vec<Rgb> = (0..width as usize)
            .map(|x| {
                if visible == 0 {
                    return background;
                }
                let bin = (x * visible / width as usize).min(visible - 1);
                if magnitudes[bin] as f32 * gain < gate {
                    background
                } else {
                    colors.color_at(bin, visible)
                }
            })
            .collect();

        if self
            .waterfall
            .as_ref()
            .is_some_and(|history| history.background() != background)
        {
            debug!("Theme changed, restarting waterfall history");
            self.waterfall = None;
        }

        let history = self
            .waterfall
            .get_or_insert_with(|| WaterfallHistory::new(width, height, background));
        history.push_row(&row);
        surface.put_raster(history.raster());
    }

    fn draw_circular(&self, samples: &[u8], gain: f32, colors: &ColorResolver, area: Area, surface: &mut dyn Surface) {
        let count = samples.len();
        if count == 0 {
            return;
        }

        let center = area.center();
        let base_radius = area.short_side() * self.config.base_radius_fraction;
        let mut points: Vec<Vec2> = samples
            .iter()
            .enumerate()
            .map(|(i, &sample)| {
                let angle = i as f32 / count as f32 * TAU;
                let radius = base_radius + centered(sample) * base_radius * gain;
                center + radius * Vec2::new(angle.cos(), angle.sin())
            })
            .collect();
        points.push(points[0]);

        stroke_path(&points, colors, count, surface);
    }

    fn draw_star(&self, magnitudes: &[u8], gain: f32, colors: &ColorResolver, area: Area, surface: &mut dyn Surface) {
        let visible = visible_bins(magnitudes);
        let center = area.center();
        let max_length = area.short_side() / 2.0;

        for (i, &magnitude) in magnitudes.iter().enumerate().take(visible) {
            let scaled = magnitude as f32 / 255.0 * gain;
            if scaled <= self.config.star_gate {
                continue;
            }

            let angle = i as f32 / visible as f32 * TAU;
            let tip = center + scaled * max_length * Vec2::new(angle.cos(), angle.sin());
            surface.stroke_segment(center, tip, colors.color_at(i, visible));
        }
    }
}

/// Bins drawn by the spectrogram and star modes: the lower half of the
/// magnitude array.
fn visible_bins(magnitudes: &[u8]) -> usize {
    match magnitudes.len() {
        0 => 0,
        1 => 1,
        len => len / 2,
    }
}

/// Average contiguous bins into at most `bar_count` bars, scaled by `gain`.
pub fn bar_heights(magnitudes: &[u8], bar_count: usize, gain: f32) -> Vec<f32> {
    let len = magnitudes.len();
    if len == 0 || bar_count == 0 {
        return Vec::new();
    }

    let count = bar_count.min(len);
    (0..count)
        .map(|bar| {
            let start = bar * len / count;
            let end = ((bar + 1) * len / count).max(start + 1);
            let sum: f32 = magnitudes[start..end].iter().map(|&m| m as f32).sum();
            sum / (end - start) as f32 * gain
        })
        .collect()
}

fn draw_wave(samples: &[u8], gain: f32, colors: &ColorResolver, area: Area, surface: &mut dyn Surface) {
    let count = samples.len();
    if count == 0 {
        return;
    }

    let slice_width = if count > 1 { area.width / (count - 1) as f32 } else { 0.0 };
    let center = area.height / 2.0;
    let half_height = area.height / 2.0;

    let points: Vec<Vec2> = samples
        .iter()
        .enumerate()
        .map(|(i, &sample)| Vec2::new(i as f32 * slice_width, center + centered(sample) * half_height * gain))
        .collect();

    stroke_path(&points, colors, count, surface);
}

fn draw_mirror(samples: &[u8], gain: f32, colors: &ColorResolver, area: Area, surface: &mut dyn Surface) {
    let count = samples.len();
    let slice_width = area.width / count.max(1) as f32;
    let center = area.height / 2.0;
    let quarter_height = area.height / 4.0;

    for (i, &sample) in samples.iter().enumerate() {
        let x = i as f32 * slice_width;
        let half_length = centered(sample) * quarter_height * gain;
        surface.stroke_segment(
            Vec2::new(x, center - half_length),
            Vec2::new(x, center + half_length),
            colors.color_at(i, count),
        );
    }
}

/// Stroke a path; in rainbow mode every segment gets its own colour.
fn stroke_path(points: &[Vec2], colors: &ColorResolver, total: usize, surface: &mut dyn Surface) {
    if colors.is_rainbow() {
        for (i, pair) in points.windows(2).enumerate() {
            surface.stroke_segment(pair[0], pair[1], colors.color_at(i, total));
        }
    } else {
        surface.stroke_polyline(points, colors.color_at(0, total));
    }
}

/// Loudness strip along the top edge plus a pitch tick on a log axis.
fn draw_overlay(pitch: PitchEstimate, loudness: &LoudnessReading, accent: Rgb, area: Area, surface: &mut dyn Surface) {
    let color = if loudness.overload { Rgb::OVERLOAD } else { accent };
    surface.fill_rect(
        Vec2::ZERO,
        Vec2::new(area.width * loudness.level / 100.0, OVERLAY_STRIP_HEIGHT),
        color,
    );

    if let Some(hz) = pitch.hz() {
        let position = ((hz / OVERLAY_MIN_HZ).log2() / (OVERLAY_MAX_HZ / OVERLAY_MIN_HZ).log2()).clamp(0.0, 1.0);
        let x = position * (area.width - 2.0).max(0.0);
        surface.fill_rect(Vec2::new(x, 0.0), Vec2::new(2.0, OVERLAY_STRIP_HEIGHT * 2.0), accent);
    }
}
