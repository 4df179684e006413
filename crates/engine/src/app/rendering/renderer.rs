use std::cmp::Ordering;

use tracing::trace;

use crate::math::{Rect, Vector2};

use super::surface::{Color, DrawSurface};
use crate::app::object::{GameObject, ObjectId, Visual};
use crate::app::scene::{Camera2D, SceneWorld};

const DEFAULT_STROKE_WIDTH: f32 = 2.0;

/// Orders and paints one scene per frame.
#[derive(Debug, Default)]
pub struct Renderer {
    draw_list: Vec<ObjectId>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids painted by the last [`Renderer::render`] call, back to front.
    pub fn draw_order(&self) -> &[ObjectId] {
        &self.draw_list
    }

    pub fn render(&mut self, world: &SceneWorld, surface: &mut dyn DrawSurface) {
        let viewport = world.viewport();
        let camera = *world.camera();
        surface.reset_transform();
        surface.clear(Rect::new(
            0.0,
            0.0,
            viewport.width as f32,
            viewport.height as f32,
        ));

        let view = camera.view_bounds(viewport);
        collect_sorted_draw_list(world, view, &mut self.draw_list);

        for id in &self.draw_list {
            let Some(object) = world.object(*id) else {
                continue;
            };
            paint_object(object, &camera, surface);
        }
        trace!(drawn = self.draw_list.len(), "frame_rendered");
    }
}

/// Depth-first flatten, drop objects with nothing to paint or outside the
/// camera, then stable sort by render layer and y-sort key.
fn collect_sorted_draw_list(world: &SceneWorld, view: Rect, out: &mut Vec<ObjectId>) {
    out.clear();
    out.extend(world.flatten().into_iter().filter(|id| {
        world.object(*id).is_some_and(|object| {
            object.visual().has_payload()
                && (object.detach_from_camera || is_in_view(object, view))
        })
    }));
    out.sort_by(|a, b| match (world.object(*a), world.object(*b)) {
        (Some(a), Some(b)) => compare_draw_order(a, b),
        _ => Ordering::Equal,
    });
}

fn is_in_view(object: &GameObject, view: Rect) -> bool {
    object.x() + object.width() > view.left()
        && object.x() < view.right()
        && object.y() + object.height() > view.top()
        && object.y() < view.bottom()
}

fn compare_draw_order(a: &GameObject, b: &GameObject) -> Ordering {
    a.render_layer.cmp(&b.render_layer).then_with(|| {
        let a_key = a.y() + a.y_sort_offset;
        let b_key = b.y() + b.y_sort_offset;
        a_key.total_cmp(&b_key)
    })
}

fn paint_object(object: &GameObject, camera: &Camera2D, surface: &mut dyn DrawSurface) {
    if surface.blend_mode() != object.blend_mode {
        surface.set_blend_mode(object.blend_mode);
    }
    surface.reset_transform();
    if !object.detach_from_camera {
        surface.translate(-camera.position);
    }

    match object.visual() {
        Visual::None => {}
        Visual::Shapes { shapes, style } => {
            for shape in shapes {
                if let Some(fill) = style.fill {
                    surface.fill_path(&shape.points, fill);
                }
                if let Some(stroke) = style.stroke {
                    let width = style.stroke_width.unwrap_or(DEFAULT_STROKE_WIDTH);
                    surface.stroke_path(&shape.points, stroke, width);
                }
            }
        }
        Visual::Text(text) => {
            surface.fill_text(
                &text.content,
                object.position(),
                text.font_size_px,
                text.fill.unwrap_or(Color::BLACK),
            );
        }
        Visual::Image(image) => {
            let padding = image.padding;
            let rect = Rect::at(
                object.position() + Vector2::new(padding, padding),
                object.width() - padding * 2.0,
                object.height() - padding * 2.0,
            );
            surface.draw_image(&image.image, rect);
        }
    }

    surface.reset_transform();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::object::{GameObject, ShapeStyle};
    use crate::app::rendering::{BlendMode, Viewport};
    use crate::assets::ImageAsset;

    #[derive(Debug, Clone, PartialEq)]
    enum DrawCall {
        Clear,
        Fill(Vector2),
        Stroke(f32),
        Text(String, Vector2),
        Image(Rect),
        Blend(BlendMode),
        Translate(Vector2),
    }

    #[derive(Default)]
    struct RecordingSurface {
        calls: Vec<DrawCall>,
        blend: BlendMode,
        offset: Vector2,
    }

    impl RecordingSurface {
        fn fills(&self) -> Vec<Vector2> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    DrawCall::Fill(origin) => Some(*origin),
                    _ => None,
                })
                .collect()
        }
    }

    impl DrawSurface for RecordingSurface {
        fn size(&self) -> (u32, u32) {
            (800, 600)
        }

        fn clear(&mut self, _rect: Rect) {
            self.calls.push(DrawCall::Clear);
        }

        fn fill_path(&mut self, points: &[Vector2], _color: Color) {
            self.calls.push(DrawCall::Fill(points[0] + self.offset));
        }

        fn stroke_path(&mut self, _points: &[Vector2], _color: Color, width: f32) {
            self.calls.push(DrawCall::Stroke(width));
        }

        fn fill_text(&mut self, text: &str, position: Vector2, _font_size_px: f32, _color: Color) {
            self.calls
                .push(DrawCall::Text(text.to_string(), position + self.offset));
        }

        fn draw_image(&mut self, _image: &ImageAsset, rect: Rect) {
            self.calls.push(DrawCall::Image(rect));
        }

        fn blend_mode(&self) -> BlendMode {
            self.blend
        }

        fn set_blend_mode(&mut self, mode: BlendMode) {
            self.blend = mode;
            self.calls.push(DrawCall::Blend(mode));
        }

        fn translate(&mut self, offset: Vector2) {
            self.offset = self.offset + offset;
            self.calls.push(DrawCall::Translate(offset));
        }

        fn reset_transform(&mut self) {
            self.offset = Vector2::ZERO;
        }
    }

    fn world() -> SceneWorld {
        SceneWorld::new(Viewport {
            width: 800,
            height: 600,
        })
    }

    fn tile(name: &str, x: f32, y: f32) -> GameObject {
        GameObject::rectangle(name, 10.0, 10.0, Color::WHITE).with_position(Vector2::new(x, y))
    }

    #[test]
    fn sorts_by_layer_then_y_with_stable_ties() {
        let mut world = world();
        let low = world.add_object(tile("low", 0.0, 50.0));
        let high = world.add_object(tile("high", 0.0, 10.0));
        let ui = world.add_object(tile("ui", 0.0, 0.0).with_render_layer(10));
        let tie_a = world.add_object(tile("tie_a", 20.0, 30.0));
        let tie_b = world.add_object(tile("tie_b", 40.0, 30.0));

        let mut renderer = Renderer::new();
        let mut surface = RecordingSurface::default();
        renderer.render(&world, &mut surface);

        assert_eq!(renderer.draw_order(), &[high, tie_a, tie_b, low, ui]);
        assert_eq!(surface.calls.first(), Some(&DrawCall::Clear));
    }

    #[test]
    fn lower_layer_paints_first_then_smaller_y() {
        let mut world = SceneWorld::new(Viewport {
            width: 800,
            height: 1200,
        });
        let x = world.add_object(tile("x", 100.0, 50.0).with_render_layer(1));
        let y = world.add_object(tile("y", 200.0, 999.0).with_render_layer(0));
        let z = world.add_object(tile("z", 300.0, 10.0).with_render_layer(1));

        let mut renderer = Renderer::new();
        let mut surface = RecordingSurface::default();
        renderer.render(&world, &mut surface);

        assert_eq!(renderer.draw_order(), &[y, z, x]);
        assert_eq!(
            surface.fills(),
            vec![
                Vector2::new(200.0, 999.0),
                Vector2::new(300.0, 10.0),
                Vector2::new(100.0, 50.0),
            ]
        );
    }

    #[test]
    fn y_sort_offset_shifts_draw_key() {
        let mut world = world();
        let tall = world.add_object(tile("tall", 0.0, 10.0).with_y_sort_offset(30.0));
        let short = world.add_object(tile("short", 0.0, 20.0));

        let mut renderer = Renderer::new();
        renderer.render(&world, &mut RecordingSurface::default());
        assert_eq!(renderer.draw_order(), &[short, tall]);
    }

    #[test]
    fn skips_objects_without_payload_and_culls_offscreen() {
        let mut world = world();
        let visible = world.add_object(tile("visible", 10.0, 10.0));
        world.add_object(GameObject::new("empty").with_size(10.0, 10.0));
        world.add_object(tile("far", 5000.0, 0.0));
        world.add_object(tile("touching_edge", 800.0, 0.0));

        let mut renderer = Renderer::new();
        renderer.render(&world, &mut RecordingSurface::default());
        assert_eq!(renderer.draw_order(), &[visible]);
    }

    #[test]
    fn detached_objects_bypass_culling_and_camera_translation() {
        let mut world = world();
        world.camera_mut().position = Vector2::new(1000.0, 0.0);
        let hud = world.add_object(tile("hud", 5.0, 5.0).with_detach_from_camera(true));
        let scenery = world.add_object(tile("scenery", 1005.0, 5.0));

        let mut renderer = Renderer::new();
        let mut surface = RecordingSurface::default();
        renderer.render(&world, &mut surface);

        assert_eq!(renderer.draw_order(), &[hud, scenery]);
        assert_eq!(
            surface.fills(),
            vec![Vector2::new(5.0, 5.0), Vector2::new(5.0, 5.0)]
        );
    }

    #[test]
    fn children_are_flattened_into_the_sort() {
        let mut world = world();
        let parent = world.add_object(tile("parent", 0.0, 100.0));
        let child = world
            .add_child(parent, tile("child", 0.0, 10.0))
            .expect("child");

        let mut renderer = Renderer::new();
        renderer.render(&world, &mut RecordingSurface::default());
        assert_eq!(renderer.draw_order(), &[child, parent]);
    }

    #[test]
    fn blend_mode_switches_only_when_it_differs() {
        let mut world = world();
        world.add_object(tile("a", 0.0, 0.0));
        world.add_object(tile("b", 0.0, 1.0).with_blend_mode(BlendMode::Lighter));
        world.add_object(tile("c", 0.0, 2.0).with_blend_mode(BlendMode::Lighter));

        let mut renderer = Renderer::new();
        let mut surface = RecordingSurface::default();
        renderer.render(&world, &mut surface);

        let switches: Vec<_> = surface
            .calls
            .iter()
            .filter(|call| matches!(call, DrawCall::Blend(_)))
            .collect();
        assert_eq!(switches, vec![&DrawCall::Blend(BlendMode::Lighter)]);
    }

    #[test]
    fn paints_text_stroke_and_padded_image() {
        let mut world = world();
        world.add_object(
            GameObject::new("label")
                .with_text("HI")
                .with_position(Vector2::new(3.0, 4.0)),
        );
        world.add_object(
            GameObject::rectangle("outline", 10.0, 10.0, Color::WHITE)
                .with_position(Vector2::new(0.0, 20.0))
                .with_shape_style(ShapeStyle {
                    fill: None,
                    stroke: Some(Color::BLACK),
                    stroke_width: None,
                }),
        );
        let image = std::sync::Arc::new(ImageAsset::solid(2, 2, Color::WHITE));
        world.add_object(
            GameObject::new("portrait")
                .with_size(20.0, 20.0)
                .with_position(Vector2::new(0.0, 40.0))
                .with_image(image, 2.0),
        );

        let mut renderer = Renderer::new();
        let mut surface = RecordingSurface::default();
        renderer.render(&world, &mut surface);

        assert!(surface
            .calls
            .contains(&DrawCall::Text("HI".to_string(), Vector2::new(3.0, 4.0))));
        assert!(surface.calls.contains(&DrawCall::Stroke(DEFAULT_STROKE_WIDTH)));
        assert!(surface
            .calls
            .contains(&DrawCall::Image(Rect::new(2.0, 42.0, 16.0, 16.0))));
    }
}
