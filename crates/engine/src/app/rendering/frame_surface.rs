use std::ops::Range;

use crate::assets::ImageAsset;
use crate::math::{bounds_of, Rect, Vector2};

use super::glyphs::{glyph_rows, glyph_scale, GLYPH_HEIGHT, GLYPH_WIDTH};
use super::surface::{BlendMode, Color, DrawSurface};

/// Software rasterizer writing RGBA8 pixels into a borrowed frame buffer,
/// typically the `pixels` frame of the host window.
pub struct FrameSurface<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
    offset: Vector2,
    blend: BlendMode,
    clear_color: Color,
}

impl<'a> FrameSurface<'a> {
    pub fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            frame,
            width,
            height,
            offset: Vector2::ZERO,
            blend: BlendMode::SourceOver,
            clear_color: Color::BLACK,
        }
    }

    pub fn with_clear_color(mut self, clear_color: Color) -> Self {
        self.clear_color = clear_color;
        self
    }

    fn pixel_offset(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let index = (y as usize)
            .checked_mul(self.width as usize)?
            .checked_add(x as usize)?
            .checked_mul(4)?;
        if index + 4 > self.frame.len() {
            return None;
        }
        Some(index)
    }

    fn put_pixel(&mut self, x: i32, y: i32, color: Color) {
        let Some(index) = self.pixel_offset(x, y) else {
            return;
        };
        let dst = [
            self.frame[index],
            self.frame[index + 1],
            self.frame[index + 2],
            self.frame[index + 3],
        ];
        let out = blend_pixel(self.blend, color.to_array(), dst);
        self.frame[index..index + 4].copy_from_slice(&out);
    }

    fn fill_rect_px(&mut self, left: i32, top: i32, width: i32, height: i32, color: Color) {
        let columns = clip_span(left, width, self.width);
        for y in clip_span(top, height, self.height) {
            for x in columns.clone() {
                self.put_pixel(x, y, color);
            }
        }
    }

    fn stroke_segment(&mut self, from: Vector2, to: Vector2, color: Color, width: f32) {
        let length = from.distance(to);
        let steps = (length * 2.0).ceil().max(1.0) as u32;
        let brush = width.round().max(1.0) as i32;
        let half = brush / 2;
        for step in 0..=steps {
            let t = step as f32 / steps as f32;
            let point = from + (to - from) * t;
            let cx = point.x.floor() as i32;
            let cy = point.y.floor() as i32;
            for y in cy - half..cy - half + brush {
                for x in cx - half..cx - half + brush {
                    self.write_stroke_pixel(x, y, color);
                }
            }
        }
    }

    /// Strokes overwrite rather than blend so overlapping brush stamps do not
    /// accumulate.
    fn write_stroke_pixel(&mut self, x: i32, y: i32, color: Color) {
        if let Some(index) = self.pixel_offset(x, y) {
            let dst = [
                self.frame[index],
                self.frame[index + 1],
                self.frame[index + 2],
                self.frame[index + 3],
            ];
            let out = if self.blend == BlendMode::SourceOver && color.a == 255 {
                color.to_array()
            } else {
                blend_pixel(self.blend, color.to_array(), dst)
            };
            self.frame[index..index + 4].copy_from_slice(&out);
        }
    }
}

impl DrawSurface for FrameSurface<'_> {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, rect: Rect) {
        let left = (rect.x + self.offset.x).floor() as i32;
        let top = (rect.y + self.offset.y).floor() as i32;
        let right = (rect.right() + self.offset.x).ceil() as i32;
        let bottom = (rect.bottom() + self.offset.y).ceil() as i32;
        let color = self.clear_color.to_array();
        for y in top.max(0)..bottom.min(self.height as i32) {
            for x in left.max(0)..right.min(self.width as i32) {
                if let Some(index) = self.pixel_offset(x, y) {
                    self.frame[index..index + 4].copy_from_slice(&color);
                }
            }
        }
    }

    fn fill_path(&mut self, points: &[Vector2], color: Color) {
        if points.len() < 3 {
            return;
        }
        let points: Vec<Vector2> = points.iter().map(|point| *point + self.offset).collect();
        let Some(bounds) = bounds_of(&points) else {
            return;
        };
        let top = (bounds.min.y.floor() as i32).max(0);
        let bottom = (bounds.max.y.ceil() as i32).min(self.height as i32);
        let mut crossings = Vec::new();
        for y in top..bottom {
            let sample_y = y as f32 + 0.5;
            crossings.clear();
            for (index, start) in points.iter().enumerate() {
                let end = points[(index + 1) % points.len()];
                let (low, high) = if start.y <= end.y {
                    (*start, end)
                } else {
                    (end, *start)
                };
                if sample_y < low.y || sample_y >= high.y {
                    continue;
                }
                let t = (sample_y - low.y) / (high.y - low.y);
                crossings.push(low.x + (high.x - low.x) * t);
            }
            crossings.sort_by(f32::total_cmp);
            for span in crossings.chunks_exact(2) {
                let left = (span[0] - 0.5).ceil() as i32;
                let right = (span[1] - 0.5).ceil() as i32;
                for x in left.max(0)..right.min(self.width as i32) {
                    self.put_pixel(x, y, color);
                }
            }
        }
    }

    fn stroke_path(&mut self, points: &[Vector2], color: Color, width: f32) {
        if points.len() < 2 {
            return;
        }
        for (index, start) in points.iter().enumerate() {
            let end = points[(index + 1) % points.len()];
            self.stroke_segment(*start + self.offset, end + self.offset, color, width);
        }
    }

    fn fill_text(&mut self, text: &str, position: Vector2, font_size_px: f32, color: Color) {
        let scale = glyph_scale(font_size_px) as i32;
        let origin = position + self.offset;
        let mut pen_x = origin.x.round() as i32;
        let pen_y = origin.y.round() as i32;
        let cell_height = GLYPH_HEIGHT as i32 * scale;
        if clip_span(pen_y, cell_height, self.height).is_empty() {
            return;
        }
        let advance = (GLYPH_WIDTH as i32 + 1) * scale;
        for ch in text.chars() {
            if pen_x >= self.width as i32 {
                break;
            }
            if pen_x.saturating_add(advance) <= 0 {
                pen_x = pen_x.saturating_add(advance);
                continue;
            }
            let rows = glyph_rows(ch);
            for (row_index, row) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH as i32 {
                    let bit = 1 << (GLYPH_WIDTH as i32 - 1 - col);
                    if row & bit == 0 {
                        continue;
                    }
                    self.fill_rect_px(
                        pen_x + col * scale,
                        pen_y + row_index as i32 * scale,
                        scale,
                        scale,
                        color,
                    );
                }
            }
            pen_x = pen_x.saturating_add(advance);
        }
    }

    fn draw_image(&mut self, image: &ImageAsset, rect: Rect) {
        if image.width() == 0 || image.height() == 0 || rect.width <= 0.0 || rect.height <= 0.0 {
            return;
        }
        let left = (rect.x + self.offset.x).round() as i32;
        let top = (rect.y + self.offset.y).round() as i32;
        let out_width = rect.width.round().max(1.0) as i32;
        let out_height = rect.height.round().max(1.0) as i32;
        let x_ratio = image.width() as f32 / out_width as f32;
        let y_ratio = image.height() as f32 / out_height as f32;

        let rows = clip_span(top, out_height, self.height);
        let columns = clip_span(left, out_width, self.width);
        for y in rows {
            let dy = i64::from(y) - i64::from(top);
            let src_y = ((dy as f32 * y_ratio) as u32).min(image.height() - 1);
            for x in columns.clone() {
                let dx = i64::from(x) - i64::from(left);
                let src_x = ((dx as f32 * x_ratio) as u32).min(image.width() - 1);
                let Some(texel) = image.pixel(src_x, src_y) else {
                    continue;
                };
                if texel.a == 0 && self.blend != BlendMode::Copy {
                    continue;
                }
                self.put_pixel(x, y, texel);
            }
        }
    }

    fn blend_mode(&self) -> BlendMode {
        self.blend
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend = mode;
    }

    fn translate(&mut self, offset: Vector2) {
        self.offset = self.offset + offset;
    }

    fn reset_transform(&mut self) {
        self.offset = Vector2::ZERO;
    }
}

/// Part of `start..start + len` that lies inside `0..limit`.
fn clip_span(start: i32, len: i32, limit: u32) -> Range<i32> {
    let begin = i64::from(start).max(0);
    let end = (i64::from(start) + i64::from(len.max(0))).min(i64::from(limit));
    if end <= begin {
        return 0..0;
    }
    begin as i32..end as i32
}

pub fn blend_pixel(mode: BlendMode, src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    let alpha = src[3] as u32;
    let inv_alpha = 255 - alpha;
    let mix = |s: u8, d: u8| ((s as u32 * alpha + d as u32 * inv_alpha) / 255) as u8;
    match mode {
        BlendMode::Copy => src,
        BlendMode::SourceOver => [
            mix(src[0], dst[0]),
            mix(src[1], dst[1]),
            mix(src[2], dst[2]),
            (alpha + dst[3] as u32 * inv_alpha / 255).min(255) as u8,
        ],
        BlendMode::Lighter => {
            let add = |s: u8, d: u8| (d as u32 + s as u32 * alpha / 255).min(255) as u8;
            [
                add(src[0], dst[0]),
                add(src[1], dst[1]),
                add(src[2], dst[2]),
                (dst[3] as u32 + alpha).min(255) as u8,
            ]
        }
        BlendMode::Multiply => {
            let product = |s: u8, d: u8| ((s as u32 * d as u32) / 255) as u8;
            [
                mix(product(src[0], dst[0]), dst[0]),
                mix(product(src[1], dst[1]), dst[1]),
                mix(product(src[2], dst[2]), dst[2]),
                dst[3],
            ]
        }
    }
}
