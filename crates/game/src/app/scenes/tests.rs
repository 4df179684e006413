use strata_engine::app::FrameSurface;
use strata_engine::{
    CursorIcon, Engine, EngineStatus, GameObject, LoopConfig, ObjectId, PointerButton,
    SceneStatus, SceneWorld, Vector2,
};
use tempfile::TempDir;

use super::arena::{COIN_POSITIONS, DRONE_START, HAZARD_RECT, PLAYER_SPAWN};
use super::*;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;

struct Harness {
    engine: Engine,
    now_ms: f64,
    _assets: TempDir,
}

impl Harness {
    fn new() -> Self {
        let assets = TempDir::new().expect("temp");
        let config = LoopConfig {
            window_width: WIDTH,
            window_height: HEIGHT,
            ..LoopConfig::default()
        };
        let mut engine = Engine::new(&config, assets.path(), build_scenes()).expect("engine");
        engine.preload();
        Self {
            engine,
            now_ms: 0.0,
            _assets: assets,
        }
    }

    fn in_arena() -> Self {
        let mut harness = Self::new();
        harness.tick();
        harness.tap(SWITCH_KEY);
        harness.tick();
        assert_eq!(harness.engine.scenes().current_name(), ARENA_SCENE);
        assert_eq!(harness.engine.scenes().current_status(), SceneStatus::Running);
        harness
    }

    fn tick(&mut self) {
        self.now_ms += 16.0;
        let mut frame = vec![0_u8; (WIDTH * HEIGHT * 4) as usize];
        let mut surface = FrameSurface::new(&mut frame, WIDTH, HEIGHT);
        self.engine
            .frame(self.now_ms, &mut surface)
            .expect("frame");
    }

    fn ticks(&mut self, count: usize) {
        for _ in 0..count {
            self.tick();
        }
    }

    fn tap(&mut self, key: &str) {
        self.engine.key_down(key);
        self.tick();
        self.engine.key_up(key);
        self.tick();
    }

    fn world(&self) -> &SceneWorld {
        self.engine.scenes().current_world()
    }

    fn id(&self, name: &str) -> ObjectId {
        self.world().find_by_name(name).expect(name)
    }

    fn object(&self, name: &str) -> &GameObject {
        self.world().object(self.id(name)).expect(name)
    }
}

fn center_of(object: &GameObject) -> Vector2 {
    object.position() + object.center()
}

#[test]
fn title_menu_is_anchored_and_justified() {
    let harness = Harness::new();
    assert_eq!(harness.engine.status(), EngineStatus::Running);
    assert_eq!(harness.engine.scenes().current_name(), TITLE_SCENE);

    let menu = harness.object("menu").bounds();
    let play = harness.object("play").bounds();
    let hint = harness.object("hint").bounds();
    assert_eq!(menu.x, (WIDTH as f32 - menu.width) / 2.0);
    assert!(menu.bottom() < HEIGHT as f32);
    assert_eq!(play.x, menu.x);
    assert!((hint.right() - menu.right()).abs() < 0.001);
    assert_eq!(harness.object("caption").x(), play.x);
}

#[test]
fn hovering_play_button_switches_cursor() {
    let mut harness = Harness::new();
    let play = center_of(harness.object("play"));

    harness.engine.pointer_moved(play);
    assert_eq!(harness.engine.cursor(), CursorIcon::Pointer);

    harness.engine.pointer_moved(Vector2::new(1.0, 1.0));
    assert_eq!(harness.engine.cursor(), CursorIcon::Default);
}

#[test]
fn clicking_play_loads_arena() {
    let mut harness = Harness::new();
    let play = center_of(harness.object("play"));
    harness.engine.pointer_moved(play);
    assert!(harness.engine.click(PointerButton::Primary));

    harness.tick();
    assert_eq!(harness.engine.scenes().current_name(), ARENA_SCENE);
    assert_eq!(harness.engine.cursor(), CursorIcon::Default);

    harness.tick();
    assert_eq!(harness.engine.scenes().current_status(), SceneStatus::Running);
    assert!(harness.engine.assets().progress().is_complete());
    assert!(harness.world().find_by_name("player").is_some());
}

#[test]
fn holding_switch_key_does_not_bounce_between_scenes() {
    let mut harness = Harness::new();
    harness.tick();
    harness.engine.key_down(SWITCH_KEY);
    harness.ticks(6);
    assert_eq!(harness.engine.scenes().current_name(), ARENA_SCENE);

    harness.engine.key_up(SWITCH_KEY);
    harness.tick();
    harness.tap(SWITCH_KEY);
    assert_eq!(harness.engine.scenes().current_name(), TITLE_SCENE);
}

#[test]
fn player_moves_and_stops_at_walls() {
    let mut harness = Harness::in_arena();
    let start = harness.object("player").position();

    harness.engine.key_down("ArrowRight");
    harness.ticks(5);
    harness.engine.key_up("ArrowRight");
    let moved = harness.object("player").position();
    assert!(moved.x > start.x);
    assert_eq!(moved.y, start.y);

    harness.engine.key_down("ArrowLeft");
    harness.ticks(60);
    let wall = harness.object("wall-left").bounds();
    assert!(harness.object("player").x() >= wall.right());
}

#[test]
fn camera_follows_player() {
    let harness = Harness::in_arena();
    let player = center_of(harness.object("player"));
    let camera = harness.world().camera().position;
    assert_eq!(
        camera,
        player - Vector2::new(WIDTH as f32 / 2.0, HEIGHT as f32 / 2.0)
    );
}

#[test]
fn touching_a_coin_collects_it_and_updates_hud() {
    let mut harness = Harness::in_arena();
    let coins_before = harness.world().objects_in_layer(arena::COIN_LAYER).len();
    assert_eq!(coins_before, COIN_POSITIONS.len());

    let (x, y) = COIN_POSITIONS[0];
    let player = harness.id("player");
    harness
        .engine
        .scenes_mut()
        .current_world_mut()
        .set_position(player, Vector2::new(x - 4.0, y - 4.0));
    harness.ticks(2);

    assert_eq!(
        harness.world().objects_in_layer(arena::COIN_LAYER).len(),
        coins_before - 1
    );
    assert!(harness.world().find_by_name("coin-0").is_none());
    assert_eq!(harness.object("score").text(), Some("SCORE 1"));
    assert_eq!(harness.object("coins").text(), Some("COINS 5"));
}

#[test]
fn hazard_sends_player_back_to_spawn() {
    let mut harness = Harness::in_arena();
    let (x, y, _, _) = HAZARD_RECT;
    let player = harness.id("player");
    let moved = harness
        .engine
        .scenes_mut()
        .current_world_mut()
        .set_position(player, Vector2::new(x + 10.0, y + 10.0));
    assert!(moved);

    harness.tick();
    assert_eq!(harness.object("player").position(), PLAYER_SPAWN);
}

#[test]
fn pausing_holds_the_arena_until_resumed() {
    let mut harness = Harness::in_arena();
    let start = harness.object("player").position();
    harness.engine.key_down("ArrowRight");

    harness.engine.pause();
    assert_eq!(harness.engine.status(), EngineStatus::Paused);
    assert_eq!(harness.engine.scenes().current_status(), SceneStatus::Paused);
    harness.ticks(5);
    harness.engine.scenes_mut().physics_update(0.016);
    assert_eq!(harness.engine.scenes_mut().update(0.016), strata_engine::SceneCommand::None);
    assert_eq!(harness.object("player").position(), start);

    harness.engine.resume();
    assert_eq!(harness.engine.scenes().current_status(), SceneStatus::Running);
    harness.tick();
    assert!(harness.object("player").x() > start.x);
}

#[test]
fn drone_patrols_and_turns_back() {
    let mut harness = Harness::in_arena();
    let first = harness.object("drone").x();
    assert!(first > DRONE_START.x);
    assert_eq!(harness.object("drone").y(), DRONE_START.y);

    harness.ticks(90);
    let far = harness.object("drone").x();
    assert!(far > first);

    harness.ticks(90);
    assert!(harness.object("drone").x() < far);
}

#[test]
fn key_latch_fires_once_per_press() {
    let mut latch = KeyLatch::default();
    assert!(latch.pressed(true));
    assert!(!latch.pressed(true));
    assert!(!latch.pressed(false));
    assert!(latch.pressed(true));

    latch.arm_after_release();
    assert!(!latch.pressed(true));
    assert!(!latch.pressed(false));
    assert!(latch.pressed(true));
}
