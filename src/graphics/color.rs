use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::settings::{ColorMode, RenderConfig, Theme, VisualizationState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const OVERLOAD: Rgb = Rgb::new(0xff, 0x33, 0x33);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Hue in degrees, saturation and lightness in [0, 1].
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let s = saturation.clamp(0.0, 1.0);
        let l = lightness.clamp(0.0, 1.0);

        let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let m = l - chroma / 2.0;
        let to_byte = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;

        Self::new(to_byte(r), to_byte(g), to_byte(b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = String;

    /// Parses `#rrggbb` (the leading `#` is optional).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("expected #rrggbb, got '{}'", s));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| format!("invalid hex colour '{}'", s))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

pub fn background(theme: Theme) -> Rgb {
    match theme {
        Theme::Dark => Rgb::new(0x11, 0x11, 0x11),
        Theme::Light => Rgb::new(0xf4, 0xf4, 0xf4),
    }
}

/// Per-index colour lookup for one pass: the accent in solid mode, an evenly
/// spread hue wheel in rainbow mode.
#[derive(Debug, Clone, Copy)]
pub struct ColorResolver {
    mode: ColorMode,
    accent: Rgb,
    saturation: f32,
    lightness: f32,
}

impl ColorResolver {
    pub fn new(state: &VisualizationState, config: &RenderConfig) -> Self {
        let lightness = match state.theme {
            Theme::Dark => config.rainbow_lightness_dark,
            Theme::Light => config.rainbow_lightness_light,
        };

        Self {
            mode: state.color_mode,
            accent: state.accent,
            saturation: config.rainbow_saturation,
            lightness,
        }
    }

    pub fn is_rainbow(&self) -> bool {
        self.mode == ColorMode::Rainbow
    }

    pub fn color_at(&self, index: usize, total: usize) -> Rgb {
        match self.mode {
            ColorMode::Solid => self.accent,
            ColorMode::Rainbow => {
                let hue = index as f32 / total.max(1) as f32 * 360.0;
                Rgb::from_hsl(hue, self.saturation, self.lightness)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsl_primaries() {
        assert_eq!(Rgb::from_hsl(0.0, 1.0, 0.5), Rgb::new(255, 0, 0));
        assert_eq!(Rgb::from_hsl(120.0, 1.0, 0.5), Rgb::new(0, 255, 0));
        assert_eq!(Rgb::from_hsl(240.0, 1.0, 0.5), Rgb::new(0, 0, 255));
        assert_eq!(Rgb::from_hsl(360.0, 1.0, 0.5), Rgb::new(255, 0, 0));
        assert_eq!(Rgb::from_hsl(77.0, 0.0, 1.0), Rgb::new(255, 255, 255));
    }

    #[test]
    fn test_hex_parsing() {
        assert_eq!("#00ff88".parse::<Rgb>().unwrap(), Rgb::new(0, 255, 0x88));
        assert_eq!("A0B0C0".parse::<Rgb>().unwrap(), Rgb::new(0xa0, 0xb0, 0xc0));
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#gg0000".parse::<Rgb>().is_err());
        assert_eq!(Rgb::new(1, 2, 255).to_string(), "#0102ff");
    }

    #[test]
    fn test_rainbow_lightness_follows_theme() {
        let config = RenderConfig::default();
        let mut state = VisualizationState {
            color_mode: ColorMode::Rainbow,
            ..VisualizationState::default()
        };
        let dark = ColorResolver::new(&state, &config).color_at(0, 10);
        state.theme = Theme::Light;
        let light = ColorResolver::new(&state, &config).color_at(0, 10);

        assert!(dark.r > light.r);
        assert_ne!(dark, light);
    }

    #[test]
    fn test_solid_ignores_index() {
        let state = VisualizationState::default();
        let resolver = ColorResolver::new(&state, &RenderConfig::default());
        assert_eq!(resolver.color_at(0, 4), state.accent);
        assert_eq!(resolver.color_at(3, 4), state.accent);
    }
}
