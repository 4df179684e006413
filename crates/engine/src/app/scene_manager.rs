use tracing::{debug, info};

use crate::assets::AssetCache;

use super::events::EventBus;
use super::input::CursorIcon;
use super::rendering::Viewport;
use super::scene::{
    PreloadContext, PreloadStatus, Scene, SceneCommand, SceneError, SceneStatus, SceneWorld,
};

struct SceneRuntime {
    scene: Box<dyn Scene>,
    world: SceneWorld,
}

impl SceneRuntime {
    fn name(&self) -> &str {
        self.scene.name()
    }

    /// Runs the preload hook. A scene without pending work starts at once.
    fn enter_loading(&mut self, assets: &mut AssetCache, events: &mut EventBus) -> PreloadStatus {
        self.world.set_status(SceneStatus::Loading);
        info!(scene = self.scene.name(), "scene_loading");
        let status = {
            let mut ctx = PreloadContext {
                world: &mut self.world,
                assets,
                events,
            };
            self.scene.preload(&mut ctx)
        };
        if status == PreloadStatus::Complete {
            self.enter_running(assets);
        }
        status
    }

    fn enter_running(&mut self, assets: &AssetCache) {
        self.world.set_status(SceneStatus::Running);
        self.world.start_pending_objects();
        self.scene.start(&mut self.world, assets);
        info!(scene = self.scene.name(), objects = self.world.object_count(), "scene_started");
    }

    fn set_status_logged(&mut self, status: SceneStatus) {
        self.world.set_status(status);
        info!(scene = self.scene.name(), status = ?status, "scene_status_changed");
    }

    fn enter_ready(&mut self) {
        self.world.set_status(SceneStatus::Ready);
        self.scene.unmount(&mut self.world);
        info!(scene = self.scene.name(), "scene_unmounted");
    }
}

/// Ordered set of scenes with exactly one current scene.
pub struct SceneManager {
    runtimes: Vec<SceneRuntime>,
    current: usize,
}

impl SceneManager {
    /// The first scene becomes current.
    pub fn new(scenes: Vec<Box<dyn Scene>>, viewport: Viewport) -> Result<Self, SceneError> {
        if scenes.is_empty() {
            return Err(SceneError::NoScenes);
        }
        let runtimes = scenes
            .into_iter()
            .map(|scene| SceneRuntime {
                scene,
                world: SceneWorld::new(viewport),
            })
            .collect();
        Ok(Self {
            runtimes,
            current: 0,
        })
    }

    pub fn current_name(&self) -> &str {
        self.current_runtime().name()
    }

    pub fn current_status(&self) -> SceneStatus {
        self.current_runtime().world.status()
    }

    pub fn current_world(&self) -> &SceneWorld {
        &self.current_runtime().world
    }

    pub fn current_world_mut(&mut self) -> &mut SceneWorld {
        &mut self.current_runtime_mut().world
    }

    pub fn world(&self, name: &str) -> Option<&SceneWorld> {
        self.runtimes
            .iter()
            .find(|runtime| runtime.name() == name)
            .map(|runtime| &runtime.world)
    }

    pub fn scene_names(&self) -> impl Iterator<Item = &str> {
        self.runtimes.iter().map(SceneRuntime::name)
    }

    pub fn len(&self) -> usize {
        self.runtimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runtimes.is_empty()
    }

    pub fn preload_current(&mut self, assets: &mut AssetCache, events: &mut EventBus) -> PreloadStatus {
        self.current_runtime_mut().enter_loading(assets, events)
    }

    /// Marks the current scene running unless it already is.
    pub fn boot_current(&mut self, assets: &AssetCache) {
        let runtime = self.current_runtime_mut();
        if runtime.world.status() != SceneStatus::Running {
            runtime.enter_running(assets);
        }
    }

    /// Holds a running scene. Hooks stop until `resume_current`.
    pub fn pause_current(&mut self) -> bool {
        let runtime = self.current_runtime_mut();
        if runtime.world.status() != SceneStatus::Running {
            return false;
        }
        runtime.set_status_logged(SceneStatus::Paused);
        true
    }

    /// Puts a paused scene back to running. Objects attached while it was
    /// paused start now.
    pub fn resume_current(&mut self) -> bool {
        let runtime = self.current_runtime_mut();
        if runtime.world.status() != SceneStatus::Paused {
            return false;
        }
        runtime.world.set_status(SceneStatus::Running);
        runtime.world.start_pending_objects();
        info!(scene = runtime.name(), "scene_resumed");
        true
    }

    /// A stopped scene is never resumed; it is unmounted by the next switch
    /// or by `shutdown_all`.
    pub fn stop_current(&mut self) {
        let runtime = self.current_runtime_mut();
        if !matches!(
            runtime.world.status(),
            SceneStatus::Ready | SceneStatus::Stopped
        ) {
            runtime.set_status_logged(SceneStatus::Stopped);
        }
    }

    /// Makes `name` current by its registered name. The outgoing scene is
    /// unmounted, the incoming one gets a default cursor and is preloaded.
    pub fn switch_to(
        &mut self,
        name: &str,
        assets: &mut AssetCache,
        events: &mut EventBus,
    ) -> Result<PreloadStatus, SceneError> {
        let next = self
            .runtimes
            .iter()
            .position(|runtime| runtime.name() == name)
            .ok_or_else(|| SceneError::SceneNotFound {
                name: name.to_string(),
            })?;

        let previous = self.current;
        self.current_runtime_mut().enter_ready();
        self.current = next;
        info!(
            from = self.runtimes[previous].name(),
            to = self.current_name(),
            "scene_switched"
        );

        let runtime = self.current_runtime_mut();
        runtime.world.set_cursor(CursorIcon::Default);
        Ok(runtime.enter_loading(assets, events))
    }

    /// Variable-step update of the current scene: object hooks first, then
    /// the scene's own update.
    pub fn update(&mut self, dt_seconds: f32) -> SceneCommand {
        let runtime = self.current_runtime_mut();
        if runtime.world.status() != SceneStatus::Running {
            debug!(scene = runtime.name(), status = ?runtime.world.status(), "scene_update_skipped");
            return SceneCommand::None;
        }
        runtime.world.update(dt_seconds);
        runtime.scene.update(dt_seconds, &mut runtime.world)
    }

    pub fn physics_update(&mut self, fixed_dt_seconds: f32) {
        let runtime = self.current_runtime_mut();
        if runtime.world.status() != SceneStatus::Running {
            debug!(scene = runtime.name(), status = ?runtime.world.status(), "scene_physics_skipped");
            return;
        }
        runtime.world.physics_update(fixed_dt_seconds);
        runtime.scene.physics_update(fixed_dt_seconds, &mut runtime.world);
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        for runtime in &mut self.runtimes {
            runtime.world.set_viewport(viewport);
        }
    }

    pub fn shutdown_all(&mut self) {
        for runtime in &mut self.runtimes {
            if runtime.world.status() != SceneStatus::Ready {
                runtime.enter_ready();
            }
        }
    }

    fn current_runtime(&self) -> &SceneRuntime {
        &self.runtimes[self.current]
    }

    fn current_runtime_mut(&mut self) -> &mut SceneRuntime {
        &mut self.runtimes[self.current]
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::app::object::GameObject;

    type Log = Rc<RefCell<Vec<String>>>;

    struct LoggingScene {
        name: &'static str,
        log: Log,
        preload: PreloadStatus,
    }

    impl LoggingScene {
        fn boxed(name: &'static str, log: &Log) -> Box<dyn Scene> {
            Box::new(Self {
                name,
                log: Rc::clone(log),
                preload: PreloadStatus::Complete,
            })
        }

        fn record(&self, event: &str) {
            self.log.borrow_mut().push(format!("{}:{event}", self.name));
        }
    }

    impl Scene for LoggingScene {
        fn name(&self) -> &str {
            self.name
        }

        fn preload(&mut self, _ctx: &mut PreloadContext<'_>) -> PreloadStatus {
            self.record("preload");
            self.preload
        }

        fn start(&mut self, world: &mut SceneWorld, _assets: &AssetCache) {
            self.record("start");
            world.add_object(GameObject::new("marker"));
        }

        fn update(&mut self, _dt_seconds: f32, _world: &mut SceneWorld) -> SceneCommand {
            self.record("update");
            SceneCommand::None
        }

        fn physics_update(&mut self, _fixed_dt_seconds: f32, _world: &mut SceneWorld) {
            self.record("physics");
        }

        fn unmount(&mut self, _world: &mut SceneWorld) {
            self.record("unmount");
        }
    }

    fn fixtures() -> (AssetCache, EventBus) {
        (AssetCache::new("assets"), EventBus::new())
    }

    fn viewport() -> Viewport {
        Viewport {
            width: 320,
            height: 240,
        }
    }

    #[test]
    fn empty_scene_list_is_rejected() {
        assert!(matches!(
            SceneManager::new(Vec::new(), viewport()),
            Err(SceneError::NoScenes)
        ));
    }

    #[test]
    fn first_scene_is_current_and_preload_without_work_starts_it() {
        let log = Log::default();
        let mut manager = SceneManager::new(
            vec![LoggingScene::boxed("title", &log), LoggingScene::boxed("level", &log)],
            viewport(),
        )
        .expect("manager");
        let (mut assets, mut events) = fixtures();

        assert_eq!(manager.current_name(), "title");
        assert_eq!(manager.current_status(), SceneStatus::Ready);
        assert_eq!(
            manager.preload_current(&mut assets, &mut events),
            PreloadStatus::Complete
        );
        assert_eq!(manager.current_status(), SceneStatus::Running);
        assert_eq!(*log.borrow(), vec!["title:preload", "title:start"]);
    }

    #[test]
    fn switching_unmounts_old_scene_and_preloads_new_one() {
        let log = Log::default();
        let mut manager = SceneManager::new(
            vec![LoggingScene::boxed("title", &log), LoggingScene::boxed("level", &log)],
            viewport(),
        )
        .expect("manager");
        let (mut assets, mut events) = fixtures();
        manager.preload_current(&mut assets, &mut events);
        manager.current_world_mut().set_cursor(CursorIcon::Pointer);
        log.borrow_mut().clear();

        manager
            .switch_to("level", &mut assets, &mut events)
            .expect("switch");

        assert_eq!(manager.current_name(), "level");
        assert_eq!(manager.current_world().cursor(), CursorIcon::Default);
        assert_eq!(
            manager.world("title").map(SceneWorld::status),
            Some(SceneStatus::Ready)
        );
        assert_eq!(
            *log.borrow(),
            vec!["title:unmount", "level:preload", "level:start"]
        );
    }

    #[test]
    fn unknown_scene_name_is_an_error_and_keeps_current() {
        let log = Log::default();
        let mut manager =
            SceneManager::new(vec![LoggingScene::boxed("title", &log)], viewport()).expect("manager");
        let (mut assets, mut events) = fixtures();

        let result = manager.switch_to("missing", &mut assets, &mut events);
        assert_eq!(
            result,
            Err(SceneError::SceneNotFound {
                name: "missing".to_string()
            })
        );
        assert_eq!(manager.current_name(), "title");
    }

    #[test]
    fn pending_preload_waits_for_boot() {
        let log = Log::default();
        let scene = Box::new(LoggingScene {
            name: "level",
            log: Rc::clone(&log),
            preload: PreloadStatus::Pending,
        });
        let mut manager = SceneManager::new(vec![scene], viewport()).expect("manager");
        let (mut assets, mut events) = fixtures();

        manager.preload_current(&mut assets, &mut events);
        assert_eq!(manager.current_status(), SceneStatus::Loading);
        assert_eq!(manager.update(0.016), SceneCommand::None);
        assert_eq!(*log.borrow(), vec!["level:preload"]);

        manager.boot_current(&assets);
        manager.boot_current(&assets);
        assert_eq!(manager.current_status(), SceneStatus::Running);
        assert_eq!(*log.borrow(), vec!["level:preload", "level:start"]);
        assert!(manager.current_world().object_by_name("marker").is_some());
    }

    #[test]
    fn paused_and_stopped_scenes_skip_hooks() {
        let log = Log::default();
        let mut manager =
            SceneManager::new(vec![LoggingScene::boxed("level", &log)], viewport()).expect("manager");
        let (mut assets, mut events) = fixtures();
        manager.preload_current(&mut assets, &mut events);
        log.borrow_mut().clear();

        assert!(manager.pause_current());
        assert!(!manager.pause_current());
        assert_eq!(manager.current_status(), SceneStatus::Paused);
        assert_eq!(manager.update(0.016), SceneCommand::None);
        manager.physics_update(0.016);
        assert!(log.borrow().is_empty());

        manager.current_world_mut().add_object(GameObject::new("late"));
        let late = manager.current_world().object_by_name("late").expect("late");
        assert!(!manager.current_world().object(late).expect("late").is_started());

        assert!(manager.resume_current());
        assert_eq!(manager.current_status(), SceneStatus::Running);
        assert!(manager.current_world().object(late).expect("late").is_started());
        manager.update(0.016);
        assert_eq!(*log.borrow(), vec!["level:update"]);

        manager.stop_current();
        assert_eq!(manager.current_status(), SceneStatus::Stopped);
        assert!(!manager.resume_current());
        manager.physics_update(0.016);
        manager.shutdown_all();
        assert_eq!(*log.borrow(), vec!["level:update", "level:unmount"]);
        assert_eq!(manager.current_status(), SceneStatus::Ready);
    }

    #[test]
    fn update_and_physics_reach_running_scene() {
        let log = Log::default();
        let mut manager =
            SceneManager::new(vec![LoggingScene::boxed("level", &log)], viewport()).expect("manager");
        let (mut assets, mut events) = fixtures();
        manager.preload_current(&mut assets, &mut events);
        log.borrow_mut().clear();

        manager.update(0.016);
        manager.physics_update(0.016);
        manager.shutdown_all();
        assert_eq!(
            *log.borrow(),
            vec!["level:update", "level:physics", "level:unmount"]
        );
    }
}
