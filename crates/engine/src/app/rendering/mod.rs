mod frame_surface;
mod glyphs;
mod renderer;
mod surface;

use serde::{Deserialize, Serialize};

pub use frame_surface::{blend_pixel, FrameSurface};
pub use glyphs::{measure_text, DEFAULT_FONT_SIZE_PX};
pub use renderer::Renderer;
pub use surface::{BlendMode, Color, DrawSurface};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}
