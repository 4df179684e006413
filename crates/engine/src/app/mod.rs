mod collision;
mod engine;
mod events;
mod input;
mod layout;
mod loop_runner;
mod object;
mod rendering;
mod scene;
mod scene_manager;
mod tween;

pub use collision::{CollisionError, CollisionIndex};
pub use engine::{Engine, EngineError, EngineStatus, LoopControl};
pub use events::{
    EventBus, EventData, EventHandler, SubscriptionId, COMPLETE_EVENT, PROGRESS_EVENT,
};
pub use input::{
    screen_to_scene, CursorIcon, InputSnapshot, InputState, PointerButton, PointerEvent,
};
pub use layout::{
    anchored_position, space_evenly, Anchor, AnchorTarget, Justify, UiLayout,
    BOTTOM_ANCHOR_MARGIN,
};
pub use loop_runner::{
    run_app, AppError, FramePlan, LoopConfig, LoopDriver, DEFAULT_MAX_PHYSICS_STEPS,
    DEFAULT_PHYSICS_STEP_MS,
};
pub use object::{
    bounds_box, offset_box, point_box, rectangle_shape, BoxParams, CollisionHook, FrameHook,
    GameObject, Hooks, ImageVisual, ObjectHook, ObjectId, Parent, PointerHook, Shape,
    ShapeBuilder, ShapeStyle, TextVisual, Visual, UI_RENDER_LAYER,
};
pub use rendering::{
    blend_pixel, measure_text, BlendMode, Color, DrawSurface, FrameSurface, Renderer, Viewport,
    DEFAULT_FONT_SIZE_PX,
};
pub use scene::{
    Camera2D, PreloadContext, PreloadStatus, Scene, SceneCommand, SceneError, SceneStatus,
    SceneWorld,
};
pub use scene_manager::SceneManager;
pub use tween::{Easing, Tween, TweenLoop, TweenSegment, TweenState};
