use std::path::{Path, PathBuf};
use std::time::Instant;

use pixels::{Error as PixelsError, Pixels, SurfaceTexture};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::Key;
use winit::window::{Window, WindowBuilder};

use crate::math::Vector2;
use crate::{resolve_app_paths, StartupError};

use super::engine::{Engine, EngineError, EngineStatus, LoopControl};
use super::input::{CursorIcon, PointerButton};
use super::rendering::{Color, FrameSurface};
use super::scene::Scene;

pub const DEFAULT_PHYSICS_STEP_MS: f64 = 16.0;
pub const DEFAULT_MAX_PHYSICS_STEPS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub physics_step_ms: f64,
    pub max_physics_steps: u32,
    /// Relative paths resolve against the project root.
    pub asset_dir: PathBuf,
    pub clear_color: Color,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Strata".to_string(),
            window_width: 800,
            window_height: 600,
            physics_step_ms: DEFAULT_PHYSICS_STEP_MS,
            max_physics_steps: DEFAULT_MAX_PHYSICS_STEPS,
            asset_dir: PathBuf::from("assets"),
            clear_color: Color::rgb(20, 22, 28),
        }
    }
}

impl LoopConfig {
    pub fn normalized_physics_step_ms(&self) -> f64 {
        normalize_step_ms(self.physics_step_ms)
    }

    pub fn normalized_max_physics_steps(&self) -> u32 {
        self.max_physics_steps.max(1)
    }

    pub fn resolve_asset_dir(&self, root: &Path) -> PathBuf {
        if self.asset_dir.is_absolute() {
            self.asset_dir.clone()
        } else {
            root.join(&self.asset_dir)
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize pixel surface: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Work planned for one host tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePlan {
    pub delta_ms: f64,
    pub physics_steps: u32,
    /// Steps the backlog asked for beyond the per-frame cap.
    pub dropped_steps: u32,
}

impl FramePlan {
    pub fn delta_seconds(&self) -> f32 {
        (self.delta_ms.max(0.0) / 1000.0) as f32
    }
}

/// Splits host timestamps into one variable-step delta and a clamped number
/// of fixed physics steps. The leftover may go negative when a frame is
/// shorter than one step; the next frame absorbs it.
#[derive(Debug, Clone)]
pub struct LoopDriver {
    fixed_step_ms: f64,
    max_steps: u32,
    start_time_ms: Option<f64>,
    previous_time_ms: f64,
    leftover_ms: f64,
}

fn normalize_step_ms(step_ms: f64) -> f64 {
    if step_ms.is_finite() && step_ms > 0.0 {
        step_ms
    } else {
        DEFAULT_PHYSICS_STEP_MS
    }
}

impl LoopDriver {
    /// A non-positive or non-finite step falls back to the default step.
    pub fn new(fixed_step_ms: f64, max_steps: u32) -> Self {
        Self {
            fixed_step_ms: normalize_step_ms(fixed_step_ms),
            max_steps: max_steps.max(1),
            start_time_ms: None,
            previous_time_ms: 0.0,
            leftover_ms: 0.0,
        }
    }

    pub fn advance(&mut self, timestamp_ms: f64) -> FramePlan {
        if self.start_time_ms.is_none() {
            self.start_time_ms = Some(timestamp_ms);
        }
        let delta_ms = timestamp_ms - self.previous_time_ms;
        self.previous_time_ms = timestamp_ms;

        let mut wanted = ((delta_ms + self.leftover_ms) / self.fixed_step_ms).floor();
        if wanted.is_nan() {
            warn!(timestamp_ms, "frame_timestamp_not_finite");
            wanted = 1.0;
        }
        let physics_steps = wanted.clamp(1.0, self.max_steps as f64) as u32;
        let dropped_steps = if wanted > self.max_steps as f64 {
            (wanted - self.max_steps as f64) as u32
        } else {
            0
        };
        self.leftover_ms = delta_ms - physics_steps as f64 * self.fixed_step_ms;
        if !self.leftover_ms.is_finite() {
            self.leftover_ms = 0.0;
        }

        FramePlan {
            delta_ms,
            physics_steps,
            dropped_steps,
        }
    }

    pub fn fixed_step_ms(&self) -> f64 {
        self.fixed_step_ms
    }

    pub fn fixed_step_seconds(&self) -> f32 {
        (self.fixed_step_ms / 1000.0) as f32
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    pub fn start_time_ms(&self) -> Option<f64> {
        self.start_time_ms
    }

    pub fn leftover_ms(&self) -> f64 {
        self.leftover_ms
    }
}

struct FrameTarget {
    window: &'static Window,
    pixels: Pixels<'static>,
    width: u32,
    height: u32,
}

impl FrameTarget {
    fn new(window: &'static Window, width: u32, height: u32) -> Result<Self, PixelsError> {
        let pixels = Self::build_pixels(window, width, height)?;
        Ok(Self {
            window,
            pixels,
            width,
            height,
        })
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), PixelsError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(self.window, width, height)?;
        self.width = width;
        self.height = height;
        Ok(())
    }

    fn build_pixels(
        window: &'static Window,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, PixelsError> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }
}

pub fn run_app(config: LoopConfig, scenes: Vec<Box<dyn Scene>>) -> Result<(), AppError> {
    let app_paths = resolve_app_paths()?;
    let asset_root = config.resolve_asset_dir(&app_paths.root);
    info!(
        root = %app_paths.root.display(),
        asset_root = %asset_root.display(),
        "startup"
    );
    let mut engine = Engine::new(&config, asset_root, scenes)?;

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window: &'static Window = Box::leak(Box::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    ));
    let size = window.inner_size();
    let mut target =
        FrameTarget::new(window, size.width, size.height).map_err(AppError::CreateRenderer)?;
    engine.resize(size.width, size.height);

    event_loop.set_control_flow(ControlFlow::Poll);
    info!(
        physics_step_ms = config.normalized_physics_step_ms(),
        max_physics_steps = config.normalized_max_physics_steps(),
        scene = engine.scenes().current_name(),
        "loop_config"
    );
    engine.preload();

    let launched_at = Instant::now();
    let clear_color = config.clear_color;
    let mut applied_cursor = CursorIcon::Default;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    engine.stop();
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = target.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                    engine.resize(new_size.width, new_size.height);
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = target.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                    engine.resize(size.width, size.height);
                }
                WindowEvent::CursorMoved { position, .. } => {
                    engine.pointer_moved(Vector2::new(position.x as f32, position.y as f32));
                }
                WindowEvent::CursorLeft { .. } => engine.pointer_left(),
                WindowEvent::MouseInput {
                    state: ElementState::Pressed,
                    button,
                    ..
                } => {
                    if let Some(button) = pointer_button(button) {
                        engine.click(button);
                    }
                }
                WindowEvent::Focused(false) => engine.release_keys(),
                WindowEvent::KeyboardInput { event, .. } => {
                    let Some(name) = key_name(&event.logical_key) else {
                        return;
                    };
                    match event.state {
                        ElementState::Pressed => {
                            if name == "Escape" {
                                info!(reason = "escape_key", "shutdown_requested");
                                engine.stop();
                                window_target.exit();
                                return;
                            }
                            engine.key_down(name);
                        }
                        ElementState::Released => engine.key_up(&name),
                    }
                }
                WindowEvent::RedrawRequested => {
                    let timestamp_ms = launched_at.elapsed().as_secs_f64() * 1000.0;
                    let (width, height) = (target.width, target.height);
                    let result = {
                        let mut surface = FrameSurface::new(target.pixels.frame_mut(), width, height)
                            .with_clear_color(clear_color);
                        engine.frame(timestamp_ms, &mut surface)
                    };
                    match result {
                        Ok(LoopControl::Continue) => {}
                        Ok(LoopControl::Stop) => {
                            info!(status = ?engine.status(), "loop_stopped");
                        }
                        Err(error) => {
                            error!(error = %error, "frame_failed");
                            window_target.exit();
                            return;
                        }
                    }
                    if let Err(error) = target.pixels.render() {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    let cursor = engine.cursor();
                    if cursor != applied_cursor {
                        window.set_cursor_icon(winit_cursor(cursor));
                        applied_cursor = cursor;
                    }
                }
                _ => {}
            },
            Event::AboutToWait => match engine.loop_control() {
                LoopControl::Continue => window.request_redraw(),
                LoopControl::Stop if engine.status() == EngineStatus::Stopped => {
                    window_target.exit();
                }
                LoopControl::Stop => {}
            },
            Event::LoopExiting => {
                engine.shutdown();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Logical key name: named keys by their variant (`ArrowLeft`, `Tab`),
/// character keys lowercased.
fn key_name(key: &Key) -> Option<String> {
    match key {
        Key::Named(named) => Some(format!("{named:?}")),
        Key::Character(text) => Some(text.to_lowercase()),
        _ => None,
    }
}

fn pointer_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Right => Some(PointerButton::Secondary),
        _ => None,
    }
}

fn winit_cursor(cursor: CursorIcon) -> winit::window::CursorIcon {
    match cursor {
        CursorIcon::Default => winit::window::CursorIcon::Default,
        CursorIcon::Pointer => winit::window::CursorIcon::Pointer,
    }
}
