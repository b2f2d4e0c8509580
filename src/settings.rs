use anyhow::{Context, Result};
use clap::ValueEnum;
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::graphics::Rgb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Wave,
    Mirror,
    Bars,
    Spectrogram,
    Circular,
    Star,
}

impl RenderMode {
    pub const ALL: [RenderMode; 6] = [
        RenderMode::Wave,
        RenderMode::Mirror,
        RenderMode::Bars,
        RenderMode::Spectrogram,
        RenderMode::Circular,
        RenderMode::Star,
    ];

    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|&m| m == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Solid,
    Rainbow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

/// What the renderer draws and how. Written only through [`ConfigEvent`]s,
/// read once per pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationState {
    pub mode: RenderMode,
    pub color_mode: ColorMode,
    pub theme: Theme,
    pub accent: Rgb,
    /// Multiplier on visual amplitude, always positive.
    pub gain: f32,
}

impl Default for VisualizationState {
    fn default() -> Self {
        Self {
            mode: RenderMode::Wave,
            color_mode: ColorMode::Solid,
            theme: Theme::Dark,
            accent: Rgb::new(0x00, 0xff, 0x88),
            gain: 1.0,
        }
    }
}

/// Fire-and-forget configuration change from outside the core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigEvent {
    SetMode(RenderMode),
    SetColorMode(ColorMode),
    SetTheme(Theme),
    SetAccent(Rgb),
    SetGain(f32),
    /// Slider value; the visual gain is one fifth of it.
    SetSensitivity(f32),
}

/// Convert a sensitivity slider position into a gain multiplier.
pub fn gain_from_sensitivity(sensitivity: f32) -> f32 {
    sensitivity / 5.0
}

impl VisualizationState {
    /// Apply one event as a single field write. Returns false when the event
    /// carried an invalid value and was ignored.
    pub fn apply(&mut self, event: ConfigEvent) -> bool {
        match event {
            ConfigEvent::SetMode(mode) => self.mode = mode,
            ConfigEvent::SetColorMode(color_mode) => self.color_mode = color_mode,
            ConfigEvent::SetTheme(theme) => self.theme = theme,
            ConfigEvent::SetAccent(accent) => self.accent = accent,
            ConfigEvent::SetGain(gain) => return self.set_gain(gain),
            ConfigEvent::SetSensitivity(value) => return self.set_gain(gain_from_sensitivity(value)),
        }
        true
    }

    fn set_gain(&mut self, gain: f32) -> bool {
        if gain.is_finite() && gain > 0.0 {
            self.gain = gain;
            true
        } else {
            warn!("Ignoring non-positive gain {}", gain);
            false
        }
    }
}

/// Thresholds used by the pitch estimator and loudness meter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Below this RMS a window is treated as silence.
    pub silence_rms: f32,
    /// |centred sample| below this counts as a zero crossing when trimming.
    pub zero_crossing_threshold: f32,
    /// Refine the autocorrelation peak with a parabola through its neighbours.
    /// Off by default, so estimates are `sample_rate / lag` for a whole lag.
    pub interpolate_peak: bool,
    /// Normalized level above which a reading is flagged as overload.
    pub overload_level: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            silence_rms: 0.01,
            zero_crossing_threshold: 0.2,
            interpolate_peak: false,
            overload_level: 85.0,
        }
    }
}

/// Drawing constants for the render modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Per-frame multiplicative decay of bar peak markers.
    pub peak_decay: f32,
    /// Width of one bar (including its 1 px gap) in pixels.
    pub bar_width: f32,
    /// Height of a bar's peak marker in pixels.
    pub peak_marker_height: f32,
    /// Spectrogram cells with `magnitude * gain` below this stay background.
    pub spectrogram_gate: f32,
    /// Star rays need `magnitude / 255 * gain` above this.
    pub star_gate: f32,
    /// Circular base radius as a fraction of the shorter surface side.
    pub base_radius_fraction: f32,
    pub rainbow_saturation: f32,
    pub rainbow_lightness_dark: f32,
    pub rainbow_lightness_light: f32,
    /// Draw a thin loudness strip along the top edge.
    pub level_meter: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            peak_decay: 0.98,
            bar_width: 6.0,
            peak_marker_height: 2.0,
            spectrogram_gate: 70.0,
            star_gate: 0.05,
            base_radius_fraction: 0.3,
            rainbow_saturation: 0.8,
            rainbow_lightness_dark: 0.6,
            rainbow_lightness_light: 0.4,
            level_meter: false,
        }
    }
}

/// Everything a settings file can provide. Missing sections fall back to
/// their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub visual: VisualizationState,
    pub analysis: AnalysisConfig,
    pub render: RenderConfig,
}

impl Settings {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        let mut settings: Settings = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))?;

        if !(settings.visual.gain.is_finite() && settings.visual.gain > 0.0) {
            warn!("Settings file gain {} is not positive, using 1.0", settings.visual.gain);
            settings.visual.gain = 1.0;
        }

        Ok(settings)
    }
}
