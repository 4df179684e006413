use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::assets::{AssetCache, AssetError, LoadProgress};
use crate::math::Vector2;

use super::collision::CollisionError;
use super::events::EventBus;
use super::input::{screen_to_scene, CursorIcon, InputState, PointerButton, PointerEvent};
use super::loop_runner::{LoopConfig, LoopDriver};
use super::rendering::{DrawSurface, Renderer, Viewport};
use super::scene::{PreloadStatus, Scene, SceneCommand, SceneError, SceneStatus};
use super::scene_manager::SceneManager;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EngineStatus {
    #[default]
    Pending,
    Loading,
    Running,
    Paused,
    Stopped,
}

/// Whether the host should schedule another frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Collision(#[from] CollisionError),
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// Top-level object tying scenes, assets, input and the loop driver together.
/// The host feeds it timestamps and device events; it never blocks.
pub struct Engine {
    status: EngineStatus,
    driver: LoopDriver,
    scenes: SceneManager,
    renderer: Renderer,
    assets: AssetCache,
    events: EventBus,
    input: InputState,
    viewport: Viewport,
}

impl Engine {
    pub fn new(
        config: &LoopConfig,
        asset_root: impl Into<PathBuf>,
        scenes: Vec<Box<dyn Scene>>,
    ) -> Result<Self, EngineError> {
        let viewport = Viewport {
            width: config.window_width,
            height: config.window_height,
        };
        let physics_step_ms = config.normalized_physics_step_ms();
        if physics_step_ms != config.physics_step_ms {
            warn!(
                configured = config.physics_step_ms,
                fallback = physics_step_ms,
                "physics_step_invalid"
            );
        }
        Ok(Self {
            status: EngineStatus::Pending,
            driver: LoopDriver::new(physics_step_ms, config.normalized_max_physics_steps()),
            scenes: SceneManager::new(scenes, viewport)?,
            renderer: Renderer::new(),
            assets: AssetCache::new(asset_root),
            events: EventBus::new(),
            input: InputState::default(),
            viewport,
        })
    }

    pub fn status(&self) -> EngineStatus {
        self.status
    }

    pub fn set_status(&mut self, status: EngineStatus) {
        if self.status != status {
            info!(from = ?self.status, to = ?status, "engine_status_changed");
            self.status = status;
        }
    }

    /// Preloads the current scene. Starts right away when the scene has no
    /// pending work; otherwise `pump_loading` finishes the job.
    pub fn preload(&mut self) {
        self.set_status(EngineStatus::Loading);
        match self
            .scenes
            .preload_current(&mut self.assets, &mut self.events)
        {
            PreloadStatus::Complete => self.start(),
            PreloadStatus::Pending => {
                info!(
                    scene = self.scenes.current_name(),
                    queued = self.assets.progress().total,
                    "scene_preload_pending"
                );
            }
        }
    }

    pub fn start(&mut self) {
        self.set_status(EngineStatus::Running);
        self.scenes.boot_current(&self.assets);
    }

    /// Drains the asset queue and boots the current scene once every queued
    /// item has been processed.
    pub fn pump_loading(&mut self) -> LoadProgress {
        let progress = self.assets.process_queue(&mut self.events);
        if progress.is_complete() && self.scenes.current_status() == SceneStatus::Loading {
            self.start();
        }
        progress
    }

    /// Pausing holds the current scene too, so its hooks stay quiet even if
    /// the host keeps calling `frame`.
    pub fn pause(&mut self) {
        if self.status == EngineStatus::Running {
            self.set_status(EngineStatus::Paused);
            self.scenes.pause_current();
        }
    }

    pub fn resume(&mut self) {
        if self.status == EngineStatus::Paused {
            self.set_status(EngineStatus::Running);
            self.scenes.resume_current();
        }
    }

    pub fn stop(&mut self) {
        self.set_status(EngineStatus::Stopped);
        self.scenes.stop_current();
    }

    pub fn loop_control(&self) -> LoopControl {
        match self.status {
            EngineStatus::Running | EngineStatus::Loading => LoopControl::Continue,
            EngineStatus::Pending | EngineStatus::Paused | EngineStatus::Stopped => {
                LoopControl::Stop
            }
        }
    }

    /// One host tick: render with the state left by the previous tick, run
    /// the variable update, then the fixed physics steps. The return value
    /// reflects the status after the tick, so a status change made by any
    /// hook takes effect at the next reschedule check.
    pub fn frame(
        &mut self,
        timestamp_ms: f64,
        surface: &mut dyn DrawSurface,
    ) -> Result<LoopControl, EngineError> {
        match self.status {
            EngineStatus::Running => {}
            EngineStatus::Loading => {
                self.pump_loading();
                return Ok(self.loop_control());
            }
            EngineStatus::Pending | EngineStatus::Paused | EngineStatus::Stopped => {
                return Ok(self.loop_control());
            }
        }

        let plan = self.driver.advance(timestamp_ms);
        if plan.dropped_steps > 0 {
            warn!(
                delta_ms = plan.delta_ms,
                dropped_steps = plan.dropped_steps,
                max_steps = self.driver.max_steps(),
                "sim_clamp_triggered"
            );
        }
        if self.scenes.current_status() == SceneStatus::Loading {
            self.pump_loading();
        }

        self.renderer.render(self.scenes.current_world(), surface);

        let snapshot = self.input.snapshot(self.scenes.current_world().camera());
        self.scenes.current_world_mut().set_input(snapshot);
        if let SceneCommand::SwitchTo(name) = self.scenes.update(plan.delta_seconds()) {
            self.switch_to(&name)?;
        }

        let fixed_dt_seconds = self.driver.fixed_step_seconds();
        for _ in 0..plan.physics_steps {
            self.scenes.physics_update(fixed_dt_seconds);
        }
        debug!(
            delta_ms = plan.delta_ms,
            physics_steps = plan.physics_steps,
            drawn = self.renderer.draw_order().len(),
            "frame"
        );

        Ok(self.loop_control())
    }

    pub fn switch_to(&mut self, name: &str) -> Result<(), EngineError> {
        let status = self
            .scenes
            .switch_to(name, &mut self.assets, &mut self.events)?;
        if status == PreloadStatus::Pending {
            info!(
                scene = name,
                queued = self.assets.progress().total,
                "scene_preload_pending"
            );
        }
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let viewport = Viewport { width, height };
        if viewport != self.viewport {
            self.viewport = viewport;
            self.scenes.set_viewport(viewport);
            debug!(width, height, "viewport_resized");
        }
    }

    pub fn key_down(&mut self, key: impl Into<String>) {
        self.input.key_down(key);
    }

    pub fn key_up(&mut self, key: &str) {
        self.input.key_up(key);
    }

    pub fn release_keys(&mut self) {
        self.input.release_all();
    }

    /// Records the pointer in screen pixels and updates hover state in the
    /// running scene.
    pub fn pointer_moved(&mut self, screen: Vector2) {
        self.input.set_pointer(screen);
        if self.scenes.current_status() != SceneStatus::Running {
            return;
        }
        let world = self.scenes.current_world_mut();
        let position = screen_to_scene(screen, world.camera());
        world.dispatch_pointer_move(position);
    }

    pub fn pointer_left(&mut self) {
        self.input.clear_pointer();
    }

    /// Clicks at the last known pointer position. Returns whether any click
    /// hook ran.
    pub fn click(&mut self, button: PointerButton) -> bool {
        let Some(screen) = self.input.pointer_screen() else {
            return false;
        };
        if self.scenes.current_status() != SceneStatus::Running {
            return false;
        }
        let world = self.scenes.current_world_mut();
        let event = PointerEvent {
            position: screen_to_scene(screen, world.camera()),
            button,
        };
        world.dispatch_click(event)
    }

    pub fn cursor(&self) -> CursorIcon {
        self.scenes.current_world().cursor()
    }

    pub fn shutdown(&mut self) {
        self.scenes.shutdown_all();
        self.set_status(EngineStatus::Stopped);
    }

    pub fn scenes(&self) -> &SceneManager {
        &self.scenes
    }

    pub fn scenes_mut(&mut self) -> &mut SceneManager {
        &mut self.scenes
    }

    pub fn assets(&self) -> &AssetCache {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut AssetCache {
        &mut self.assets
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn driver(&self) -> &LoopDriver {
        &self.driver
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::app::events::PROGRESS_EVENT;
    use crate::app::object::GameObject;
    use crate::app::rendering::{Color, FrameSurface};
    use crate::app::scene::{PreloadContext, SceneWorld};

    type Log = Rc<RefCell<Vec<String>>>;

    struct ScriptedScene {
        name: &'static str,
        log: Log,
        queue_missing_asset: bool,
        switch_to: Option<&'static str>,
    }

    impl ScriptedScene {
        fn boxed(name: &'static str, log: &Log) -> Box<dyn Scene> {
            Box::new(Self {
                name,
                log: Rc::clone(log),
                queue_missing_asset: false,
                switch_to: None,
            })
        }
    }

    impl Scene for ScriptedScene {
        fn name(&self) -> &str {
            self.name
        }

        fn preload(&mut self, ctx: &mut PreloadContext<'_>) -> PreloadStatus {
            if self.queue_missing_asset {
                ctx.assets.load_image("ghost", "ghost.png");
                return PreloadStatus::Pending;
            }
            PreloadStatus::Complete
        }

        fn start(&mut self, _world: &mut SceneWorld, _assets: &AssetCache) {
            self.log.borrow_mut().push(format!("{}:start", self.name));
        }

        fn update(&mut self, _dt_seconds: f32, _world: &mut SceneWorld) -> SceneCommand {
            self.log.borrow_mut().push(format!("{}:update", self.name));
            match self.switch_to.take() {
                Some(target) => SceneCommand::SwitchTo(target.to_string()),
                None => SceneCommand::None,
            }
        }

        fn physics_update(&mut self, _fixed_dt_seconds: f32, _world: &mut SceneWorld) {
            self.log.borrow_mut().push(format!("{}:physics", self.name));
        }
    }

    fn config() -> LoopConfig {
        LoopConfig {
            window_width: 64,
            window_height: 48,
            ..LoopConfig::default()
        }
    }

    fn run_frame(engine: &mut Engine, timestamp_ms: f64) -> LoopControl {
        let mut frame = vec![0_u8; 64 * 48 * 4];
        let mut surface = FrameSurface::new(&mut frame, 64, 48);
        engine.frame(timestamp_ms, &mut surface).expect("frame")
    }

    fn count(log: &Log, entry: &str) -> usize {
        log.borrow().iter().filter(|line| *line == entry).count()
    }

    #[test]
    fn preload_without_pending_work_starts_engine() {
        let log = Log::default();
        let mut engine =
            Engine::new(&config(), "assets", vec![ScriptedScene::boxed("level", &log)])
                .expect("engine");
        assert_eq!(engine.status(), EngineStatus::Pending);
        assert_eq!(engine.loop_control(), LoopControl::Stop);

        engine.preload();
        assert_eq!(engine.status(), EngineStatus::Running);
        assert_eq!(engine.scenes().current_status(), SceneStatus::Running);
        assert_eq!(*log.borrow(), vec!["level:start"]);
    }

    #[test]
    fn frames_run_one_update_and_clamped_physics_steps() {
        let log = Log::default();
        let mut engine =
            Engine::new(&config(), "assets", vec![ScriptedScene::boxed("level", &log)])
                .expect("engine");
        engine.preload();
        let ticks = Rc::new(Cell::new(0));
        let seen = Rc::clone(&ticks);
        engine.scenes_mut().current_world_mut().add_object(
            GameObject::new("counter").on_physics_update(move |_, _, _| seen.set(seen.get() + 1)),
        );

        let mut physics_per_frame = Vec::new();
        for timestamp in [10.0, 20.0, 120.0] {
            let before = ticks.get();
            assert_eq!(run_frame(&mut engine, timestamp), LoopControl::Continue);
            physics_per_frame.push(ticks.get() - before);
        }

        assert_eq!(physics_per_frame, vec![1, 1, 5]);
        assert_eq!(count(&log, "level:update"), 3);
        assert_eq!(count(&log, "level:physics"), 7);
    }

    #[test]
    fn update_runs_before_physics_within_a_frame() {
        let log = Log::default();
        let mut engine =
            Engine::new(&config(), "assets", vec![ScriptedScene::boxed("level", &log)])
                .expect("engine");
        engine.preload();
        log.borrow_mut().clear();

        run_frame(&mut engine, 40.0);
        assert_eq!(
            *log.borrow(),
            vec!["level:update", "level:physics", "level:physics"]
        );
    }

    #[test]
    fn leaving_running_status_stops_the_loop() {
        let log = Log::default();
        let mut engine =
            Engine::new(&config(), "assets", vec![ScriptedScene::boxed("level", &log)])
                .expect("engine");
        engine.preload();
        engine.pause();
        log.borrow_mut().clear();

        assert_eq!(run_frame(&mut engine, 16.0), LoopControl::Stop);
        assert!(log.borrow().is_empty());

        assert_eq!(engine.scenes().current_status(), SceneStatus::Paused);

        engine.resume();
        assert_eq!(engine.scenes().current_status(), SceneStatus::Running);
        assert_eq!(run_frame(&mut engine, 32.0), LoopControl::Continue);
        engine.stop();
        assert_eq!(engine.loop_control(), LoopControl::Stop);
        assert_eq!(engine.scenes().current_status(), SceneStatus::Stopped);
    }

    #[test]
    fn scene_command_switches_scene() {
        let log = Log::default();
        let title = Box::new(ScriptedScene {
            name: "title",
            log: Rc::clone(&log),
            queue_missing_asset: false,
            switch_to: Some("level"),
        });
        let mut engine = Engine::new(
            &config(),
            "assets",
            vec![title, ScriptedScene::boxed("level", &log)],
        )
        .expect("engine");
        engine.preload();

        run_frame(&mut engine, 16.0);
        assert_eq!(engine.scenes().current_name(), "level");
        assert_eq!(engine.scenes().current_status(), SceneStatus::Running);
        assert!(log.borrow().contains(&"level:start".to_string()));
        assert!(matches!(
            engine.switch_to("credits"),
            Err(EngineError::Scene(SceneError::SceneNotFound { .. }))
        ));
    }

    #[test]
    fn pending_preload_completes_after_queue_drains() {
        let log = Log::default();
        let temp = tempfile::TempDir::new().expect("temp");
        let scene = Box::new(ScriptedScene {
            name: "level",
            log: Rc::clone(&log),
            queue_missing_asset: true,
            switch_to: None,
        });
        let mut engine = Engine::new(&config(), temp.path(), vec![scene]).expect("engine");
        let reports = Rc::new(Cell::new(0));
        let seen = Rc::clone(&reports);
        engine
            .events_mut()
            .subscribe(PROGRESS_EVENT, move |_| seen.set(seen.get() + 1));

        engine.preload();
        assert_eq!(engine.status(), EngineStatus::Loading);
        assert_eq!(engine.loop_control(), LoopControl::Continue);
        assert!(log.borrow().is_empty());

        run_frame(&mut engine, 16.0);
        assert_eq!(engine.status(), EngineStatus::Running);
        assert_eq!(*log.borrow(), vec!["level:start"]);
        assert_eq!(engine.assets().progress().failed, 1);
        assert_eq!(reports.get(), 1);
    }

    #[test]
    fn clicks_translate_screen_to_scene_coordinates() {
        let log = Log::default();
        let mut engine =
            Engine::new(&config(), "assets", vec![ScriptedScene::boxed("level", &log)])
                .expect("engine");
        engine.preload();
        let clicked = Rc::new(Cell::new(None));
        let seen = Rc::clone(&clicked);
        let world = engine.scenes_mut().current_world_mut();
        world.camera_mut().position = Vector2::new(100.0, 0.0);
        world.add_object(
            GameObject::rectangle("button", 20.0, 10.0, Color::WHITE)
                .with_position(Vector2::new(105.0, 5.0))
                .on_click(move |_, _, event| seen.set(Some(event.position))),
        );

        assert!(!engine.click(PointerButton::Primary));
        engine.pointer_moved(Vector2::new(10.0, 8.0));
        assert!(engine.click(PointerButton::Primary));
        assert_eq!(clicked.get(), Some(Vector2::new(110.0, 8.0)));
    }

    #[test]
    fn keys_reach_scene_input_snapshot() {
        let log = Log::default();
        let mut engine =
            Engine::new(&config(), "assets", vec![ScriptedScene::boxed("level", &log)])
                .expect("engine");
        engine.preload();
        engine.key_down("ArrowRight");

        run_frame(&mut engine, 16.0);
        let input = engine.scenes().current_world().input();
        assert!(input.is_key_down("ArrowRight"));
        assert_eq!(input.movement_axis(), Vector2::new(1.0, 0.0));

        engine.release_keys();
        run_frame(&mut engine, 32.0);
        assert!(!engine.scenes().current_world().input().is_key_down("ArrowRight"));
    }

    #[test]
    fn resize_updates_scene_viewports() {
        let log = Log::default();
        let mut engine =
            Engine::new(&config(), "assets", vec![ScriptedScene::boxed("level", &log)])
                .expect("engine");
        engine.resize(0, 10);
        assert_eq!(engine.viewport().width, 64);
        engine.resize(200, 100);
        assert_eq!(
            engine.scenes().current_world().viewport(),
            Viewport {
                width: 200,
                height: 100
            }
        );
    }
}
