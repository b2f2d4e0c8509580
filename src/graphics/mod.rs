pub mod canvas;
pub mod color;
pub mod peaks;
pub mod raster;
pub mod renderer;
pub mod surface;
pub mod waterfall;

pub use canvas::Canvas;
pub use color::{ColorResolver, Rgb};
pub use peaks::PeakTracker;
pub use raster::Raster;
pub use renderer::Renderer;
pub use surface::Surface;
pub use waterfall::WaterfallHistory;
