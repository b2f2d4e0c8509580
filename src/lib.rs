//! Real-time pitch, loudness and waveform/spectrum visualization core.
//!
//! Audio comes from a [`audio::SampleSource`], is analysed into a
//! [`audio::PitchEstimate`] and [`audio::LoudnessReading`], and is drawn onto
//! a [`graphics::Surface`] by the [`graphics::Renderer`] once per refresh
//! under the [`driver::FrameDriver`].

pub mod audio;
pub mod driver;
pub mod graphics;
pub mod settings;
