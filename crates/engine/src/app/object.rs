use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::assets::ImageAsset;
use crate::math::{rotate_points, Hitbox, Rect, Vector2};

use super::input::PointerEvent;
use super::layout::UiLayout;
use super::rendering::{measure_text, BlendMode, Color, DEFAULT_FONT_SIZE_PX};
use super::scene::SceneWorld;

/// Render layer given to UI rectangles so they paint above world objects.
pub const UI_RENDER_LAYER: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

#[derive(Debug, Default)]
pub struct ObjectIdAllocator {
    next: u64,
}

impl ObjectIdAllocator {
    pub fn allocate(&mut self) -> ObjectId {
        let id = ObjectId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

/// Non-owning back-reference to whatever holds an object in its child list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    Root,
    Object(ObjectId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub points: Vec<Vector2>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeStyle {
    pub fill: Option<Color>,
    pub stroke: Option<Color>,
    pub stroke_width: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextVisual {
    pub content: String,
    pub font_size_px: f32,
    pub fill: Option<Color>,
}

#[derive(Debug, Clone)]
pub struct ImageVisual {
    pub image: Arc<ImageAsset>,
    pub padding: f32,
}

#[derive(Debug, Clone, Default)]
pub enum Visual {
    #[default]
    None,
    Shapes {
        shapes: Vec<Shape>,
        style: ShapeStyle,
    },
    Text(TextVisual),
    Image(ImageVisual),
}

impl Visual {
    /// Whether the renderer has anything to paint for this payload.
    pub fn has_payload(&self) -> bool {
        match self {
            Visual::None => false,
            Visual::Shapes { shapes, .. } => !shapes.is_empty(),
            Visual::Text(text) => !text.content.is_empty(),
            Visual::Image(_) => true,
        }
    }
}

pub type ShapeBuilder = fn(&GameObject) -> Vec<Shape>;
pub type BoxParams = Rc<dyn Fn(&GameObject, Vector2) -> Rect>;

pub type FrameHook = Box<dyn FnMut(&mut SceneWorld, ObjectId, f32)>;
pub type ObjectHook = Box<dyn FnMut(&mut SceneWorld, ObjectId)>;
pub type PointerHook = Box<dyn FnMut(&mut SceneWorld, ObjectId, PointerEvent)>;
pub type CollisionHook = Box<dyn FnMut(&mut SceneWorld, ObjectId, ObjectId)>;

pub(crate) type HookSlot<T> = fn(&mut Hooks) -> &mut Option<T>;

/// Optional per-object callbacks. Capabilities are decided by which slots are
/// filled.
#[derive(Default)]
pub struct Hooks {
    pub update: Option<FrameHook>,
    pub physics_update: Option<FrameHook>,
    pub start: Option<ObjectHook>,
    pub on_click: Option<PointerHook>,
    pub on_mouse_enter: Option<ObjectHook>,
    pub on_mouse_leave: Option<ObjectHook>,
    pub on_collision: Option<CollisionHook>,
    pub on_change_shape: Option<ObjectHook>,
}

impl Hooks {
    pub(crate) fn update_slot(hooks: &mut Hooks) -> &mut Option<FrameHook> {
        &mut hooks.update
    }

    pub(crate) fn physics_update_slot(hooks: &mut Hooks) -> &mut Option<FrameHook> {
        &mut hooks.physics_update
    }

    pub(crate) fn start_slot(hooks: &mut Hooks) -> &mut Option<ObjectHook> {
        &mut hooks.start
    }

    pub(crate) fn on_click_slot(hooks: &mut Hooks) -> &mut Option<PointerHook> {
        &mut hooks.on_click
    }

    pub(crate) fn on_mouse_enter_slot(hooks: &mut Hooks) -> &mut Option<ObjectHook> {
        &mut hooks.on_mouse_enter
    }

    pub(crate) fn on_mouse_leave_slot(hooks: &mut Hooks) -> &mut Option<ObjectHook> {
        &mut hooks.on_mouse_leave
    }

    pub(crate) fn on_collision_slot(hooks: &mut Hooks) -> &mut Option<CollisionHook> {
        &mut hooks.on_collision
    }

    pub(crate) fn on_change_shape_slot(hooks: &mut Hooks) -> &mut Option<ObjectHook> {
        &mut hooks.on_change_shape
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("update", &self.update.is_some())
            .field("physics_update", &self.physics_update.is_some())
            .field("start", &self.start.is_some())
            .field("on_click", &self.on_click.is_some())
            .field("on_mouse_enter", &self.on_mouse_enter.is_some())
            .field("on_mouse_leave", &self.on_mouse_leave.is_some())
            .field("on_collision", &self.on_collision.is_some())
            .field("on_change_shape", &self.on_change_shape.is_some())
            .finish()
    }
}

/// Collision box spanning the object's own width and height.
pub fn bounds_box() -> BoxParams {
    Rc::new(|object: &GameObject, position: Vector2| {
        Rect::at(position, object.width(), object.height())
    })
}

/// Zero-sized box at the object's position; reach queries hit it only when
/// the query area strictly contains the point.
pub fn point_box() -> BoxParams {
    Rc::new(|_object: &GameObject, position: Vector2| Rect::at(position, 0.0, 0.0))
}

/// Box offset from the object's position with a fixed size.
pub fn offset_box(offset: Vector2, width: f32, height: f32) -> BoxParams {
    Rc::new(move |_object: &GameObject, position: Vector2| {
        Rect::at(position + offset, width, height)
    })
}

/// Axis-aligned rectangle over position and size, rotated about its center.
pub fn rectangle_shape(object: &GameObject) -> Vec<Shape> {
    let corners = object.bounds().points();
    let points = if object.rotation() == 0.0 {
        corners.to_vec()
    } else {
        let center = object.position() + object.center();
        rotate_points(&corners, object.rotation(), center)
    };
    vec![Shape { points }]
}

pub struct GameObject {
    pub(crate) name: String,
    pub(crate) position: Vector2,
    pub(crate) width: f32,
    pub(crate) height: f32,
    pub(crate) rotation: f32,
    pub(crate) collision_layer: u32,
    pub(crate) visual: Visual,
    pub(crate) layout: Option<UiLayout>,
    pub(crate) parent: Parent,
    pub(crate) children: Vec<ObjectId>,
    pub(crate) started: bool,
    pub(crate) hovered: bool,
    pub(crate) cached_hitbox: Option<Hitbox>,
    pub render_layer: i32,
    pub y_sort_offset: f32,
    pub rigid_body: bool,
    pub detach_from_camera: bool,
    pub blend_mode: BlendMode,
    pub shape_builder: Option<ShapeBuilder>,
    /// `None` means the object has no collision hitbox at all.
    pub hitbox: Option<BoxParams>,
    pub interact_box: Option<BoxParams>,
    pub hooks: Hooks,
}

impl GameObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: Vector2::ZERO,
            width: 0.0,
            height: 0.0,
            rotation: 0.0,
            collision_layer: 0,
            visual: Visual::None,
            layout: None,
            parent: Parent::Root,
            children: Vec::new(),
            started: false,
            hovered: false,
            cached_hitbox: None,
            render_layer: 0,
            y_sort_offset: 0.0,
            rigid_body: false,
            detach_from_camera: false,
            blend_mode: BlendMode::SourceOver,
            shape_builder: None,
            hitbox: Some(bounds_box()),
            interact_box: Some(point_box()),
            hooks: Hooks::default(),
        }
    }

    /// Filled rectangle whose shape follows position and size.
    pub fn rectangle(name: impl Into<String>, width: f32, height: f32, fill: Color) -> Self {
        Self::new(name)
            .with_size(width, height)
            .with_shape_builder(rectangle_shape)
            .with_shape_style(ShapeStyle {
                fill: Some(fill),
                ..ShapeStyle::default()
            })
    }

    pub fn ui_rect(name: impl Into<String>) -> Self {
        Self::new(name)
            .with_render_layer(UI_RENDER_LAYER)
            .with_shape_builder(rectangle_shape)
    }

    pub fn with_position(mut self, position: Vector2) -> Self {
        self.position = position;
        self.rebuild_shapes();
        self
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self.rebuild_shapes();
        self
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = degrees;
        self.rebuild_shapes();
        self
    }

    pub fn with_render_layer(mut self, render_layer: i32) -> Self {
        self.render_layer = render_layer;
        self
    }

    pub fn with_y_sort_offset(mut self, y_sort_offset: f32) -> Self {
        self.y_sort_offset = y_sort_offset;
        self
    }

    pub fn with_collision_layer(mut self, layer: u32) -> Self {
        self.collision_layer = layer;
        self
    }

    pub fn with_rigid_body(mut self, rigid_body: bool) -> Self {
        self.rigid_body = rigid_body;
        self
    }

    pub fn with_detach_from_camera(mut self, detach_from_camera: bool) -> Self {
        self.detach_from_camera = detach_from_camera;
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_visual(mut self, visual: Visual) -> Self {
        self.visual = visual;
        self
    }

    pub fn with_shape_builder(mut self, builder: ShapeBuilder) -> Self {
        self.shape_builder = Some(builder);
        self.rebuild_shapes();
        self
    }

    pub fn with_shape_style(mut self, style: ShapeStyle) -> Self {
        match &mut self.visual {
            Visual::Shapes { style: current, .. } => *current = style,
            _ => {
                self.visual = Visual::Shapes {
                    shapes: Vec::new(),
                    style,
                };
                self.rebuild_shapes();
            }
        }
        self
    }

    pub fn with_text(mut self, content: impl Into<String>) -> Self {
        self.apply_text(content.into());
        self
    }

    pub fn with_font_size(mut self, font_size_px: f32) -> Self {
        if let Visual::Text(text) = &mut self.visual {
            text.font_size_px = font_size_px;
            let content = text.content.clone();
            self.apply_text(content);
        }
        self
    }

    pub fn with_text_fill(mut self, fill: Color) -> Self {
        if let Visual::Text(text) = &mut self.visual {
            text.fill = Some(fill);
        }
        self
    }

    pub fn with_image(mut self, image: Arc<ImageAsset>, padding: f32) -> Self {
        self.visual = Visual::Image(ImageVisual { image, padding });
        self
    }

    pub fn with_hitbox(mut self, params: BoxParams) -> Self {
        self.hitbox = Some(params);
        self
    }

    pub fn without_hitbox(mut self) -> Self {
        self.hitbox = None;
        self
    }

    pub fn with_interact_box(mut self, params: BoxParams) -> Self {
        self.interact_box = Some(params);
        self
    }

    pub fn with_layout(mut self, layout: UiLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn on_update(mut self, hook: impl FnMut(&mut SceneWorld, ObjectId, f32) + 'static) -> Self {
        self.hooks.update = Some(Box::new(hook));
        self
    }

    pub fn on_physics_update(
        mut self,
        hook: impl FnMut(&mut SceneWorld, ObjectId, f32) + 'static,
    ) -> Self {
        self.hooks.physics_update = Some(Box::new(hook));
        self
    }

    pub fn on_start(mut self, hook: impl FnMut(&mut SceneWorld, ObjectId) + 'static) -> Self {
        self.hooks.start = Some(Box::new(hook));
        self
    }

    pub fn on_click(
        mut self,
        hook: impl FnMut(&mut SceneWorld, ObjectId, PointerEvent) + 'static,
    ) -> Self {
        self.hooks.on_click = Some(Box::new(hook));
        self
    }

    pub fn on_mouse_enter(mut self, hook: impl FnMut(&mut SceneWorld, ObjectId) + 'static) -> Self {
        self.hooks.on_mouse_enter = Some(Box::new(hook));
        self
    }

    pub fn on_mouse_leave(mut self, hook: impl FnMut(&mut SceneWorld, ObjectId) + 'static) -> Self {
        self.hooks.on_mouse_leave = Some(Box::new(hook));
        self
    }

    pub fn on_collision(
        mut self,
        hook: impl FnMut(&mut SceneWorld, ObjectId, ObjectId) + 'static,
    ) -> Self {
        self.hooks.on_collision = Some(Box::new(hook));
        self
    }

    pub fn on_change_shape(
        mut self,
        hook: impl FnMut(&mut SceneWorld, ObjectId) + 'static,
    ) -> Self {
        self.hooks.on_change_shape = Some(Box::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vector2 {
        self.position
    }

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn y(&self) -> f32 {
        self.position.y
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Degrees.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Half extents, relative to the object's position.
    pub fn center(&self) -> Vector2 {
        Vector2::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn bounds(&self) -> Rect {
        Rect::at(self.position, self.width, self.height)
    }

    pub fn collision_layer(&self) -> u32 {
        self.collision_layer
    }

    pub fn visual(&self) -> &Visual {
        &self.visual
    }

    pub fn text(&self) -> Option<&str> {
        match &self.visual {
            Visual::Text(text) => Some(text.content.as_str()),
            _ => None,
        }
    }

    pub fn layout(&self) -> Option<&UiLayout> {
        self.layout.as_ref()
    }

    pub fn parent(&self) -> Parent {
        self.parent
    }

    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn cached_hitbox(&self) -> Option<&Hitbox> {
        self.cached_hitbox.as_ref()
    }

    pub fn has_collision_hook(&self) -> bool {
        self.hooks.on_collision.is_some()
    }

    pub fn build_hitbox(&self, position: Vector2) -> Option<Hitbox> {
        self.hitbox
            .as_ref()
            .map(|params| params(self, position).points())
    }

    pub fn build_interact_box(&self, position: Vector2) -> Option<Hitbox> {
        self.interact_box
            .as_ref()
            .map(|params| params(self, position).points())
    }

    pub(crate) fn refresh_cached_hitbox(&mut self) {
        if self.rigid_body || self.has_collision_hook() {
            self.cached_hitbox = self.build_hitbox(self.position);
        }
    }

    pub(crate) fn rebuild_shapes(&mut self) {
        let Some(builder) = self.shape_builder else {
            return;
        };
        let shapes = builder(self);
        match &mut self.visual {
            Visual::Shapes { shapes: current, .. } => *current = shapes,
            Visual::None => {
                self.visual = Visual::Shapes {
                    shapes,
                    style: ShapeStyle::default(),
                }
            }
            Visual::Text(_) | Visual::Image(_) => {}
        }
    }

    /// Stores text and grows the object to fit it. Returns whether the size
    /// changed.
    pub(crate) fn apply_text(&mut self, content: String) -> bool {
        let (font_size_px, fill) = match &self.visual {
            Visual::Text(text) => (text.font_size_px, text.fill),
            _ => (DEFAULT_FONT_SIZE_PX, None),
        };
        let (text_width, text_height) = measure_text(&content, font_size_px);
        let mut resized = false;
        if text_width > self.width {
            self.width = text_width;
            resized = true;
        }
        if text_height > self.height {
            self.height = text_height;
            resized = true;
        }
        self.visual = Visual::Text(TextVisual {
            content,
            font_size_px,
            fill,
        });
        resized
    }
}

impl fmt::Debug for GameObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameObject")
            .field("name", &self.name)
            .field("position", &self.position)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("rotation", &self.rotation)
            .field("render_layer", &self.render_layer)
            .field("collision_layer", &self.collision_layer)
            .field("rigid_body", &self.rigid_body)
            .field("detach_from_camera", &self.detach_from_camera)
            .field("visual", &self.visual)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("started", &self.started)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}
