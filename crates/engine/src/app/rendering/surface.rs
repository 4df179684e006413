use serde::{Deserialize, Serialize};

use crate::assets::ImageAsset;
use crate::math::{Rect, Vector2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Compositing operator applied to subsequent draws.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    SourceOver,
    Lighter,
    Multiply,
    Copy,
}

/// Immediate-mode 2D drawing target. Coordinates pass through the current
/// translation before reaching the surface.
pub trait DrawSurface {
    fn size(&self) -> (u32, u32);
    fn clear(&mut self, rect: Rect);
    /// Fills a closed polygon.
    fn fill_path(&mut self, points: &[Vector2], color: Color);
    fn stroke_path(&mut self, points: &[Vector2], color: Color, width: f32);
    /// Draws a single line of text with its top-left corner at `position`.
    fn fill_text(&mut self, text: &str, position: Vector2, font_size_px: f32, color: Color);
    fn draw_image(&mut self, image: &ImageAsset, rect: Rect);
    fn blend_mode(&self) -> BlendMode;
    fn set_blend_mode(&mut self, mode: BlendMode);
    fn translate(&mut self, offset: Vector2);
    fn reset_transform(&mut self);
}
