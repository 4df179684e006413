use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use strata_engine::app::{
    Anchor, Justify, ShapeStyle, SubscriptionId, UiLayout, PROGRESS_EVENT,
};
use strata_engine::{
    AssetCache, Color, Easing, EventData, GameObject, ObjectId, PreloadContext, PreloadStatus,
    Rect, Scene, SceneCommand, SceneError, SceneWorld, SpritesheetConfig, Tween, TweenLoop,
    Vector2,
};
use tracing::{debug, info, warn};

use super::{label, KeyLatch, PANEL_FILL, SWITCH_KEY, TEXT_FILL, TITLE_SCENE, ARENA_SCENE};

pub(crate) const WALL_LAYER: u32 = 1;
pub(crate) const COIN_LAYER: u32 = 2;
pub(crate) const PLAYER_SPAWN: Vector2 = Vector2::new(80.0, 80.0);
pub(crate) const PLAYER_SPEED_UNITS_PER_SECOND: f32 = 180.0;

const ARENA_WIDTH: f32 = 960.0;
const ARENA_HEIGHT: f32 = 720.0;
const WALL_THICKNESS: f32 = 16.0;
const PLAYER_SIZE: f32 = 20.0;
const COIN_SIZE: f32 = 8.0;
const HUD_WIDTH: f32 = 300.0;
const HUD_HEIGHT: f32 = 28.0;

const FLOOR_KEY: &str = "floor";
const FLOOR_PATH: &str = "sprites/floor.png";
const COIN_SHEET_KEY: &str = "coin";
const COIN_SHEET_PATH: &str = "sprites/coin.png";
const COIN_FRAME: &str = "spin-0";

const FLOOR_FILL: Color = Color::rgb(38, 44, 52);
const WALL_FILL: Color = Color::rgb(96, 102, 116);
const CRATE_FILL: Color = Color::rgb(150, 110, 60);
const PLAYER_FILL: Color = Color::rgb(90, 200, 120);
const COIN_FILL: Color = Color::rgb(240, 200, 60);
const HAZARD_FILL: Color = Color::rgba(200, 50, 50, 160);

pub(crate) const COIN_POSITIONS: [(f32, f32); 6] = [
    (200.0, 120.0),
    (420.0, 300.0),
    (700.0, 160.0),
    (860.0, 620.0),
    (300.0, 560.0),
    (120.0, 400.0),
];
const CRATE_RECTS: [(f32, f32, f32, f32); 3] = [
    (240.0, 200.0, 64.0, 64.0),
    (520.0, 420.0, 96.0, 32.0),
    (760.0, 300.0, 32.0, 160.0),
];
pub(crate) const HAZARD_RECT: (f32, f32, f32, f32) = (560.0, 560.0, 80.0, 80.0);
pub(crate) const DRONE_START: Vector2 = Vector2::new(380.0, 660.0);
const DRONE_SIZE: f32 = 14.0;
const DRONE_SWEEP: f32 = 140.0;
const DRONE_LEG_SECONDS: f32 = 1.5;
const DRONE_FILL: Color = Color::rgb(120, 170, 240);

pub(crate) struct ArenaScene {
    player: Option<ObjectId>,
    score_label: Option<ObjectId>,
    coins_label: Option<ObjectId>,
    score: Rc<Cell<u32>>,
    shown: Option<(u32, usize)>,
    switch_key: KeyLatch,
    progress_subscription: Option<SubscriptionId>,
}

impl ArenaScene {
    pub(crate) fn new() -> Self {
        Self {
            player: None,
            score_label: None,
            coins_label: None,
            score: Rc::new(Cell::new(0)),
            shown: None,
            switch_key: KeyLatch::default(),
            progress_subscription: None,
        }
    }

    fn coin_sheet() -> SpritesheetConfig {
        SpritesheetConfig {
            key: COIN_SHEET_KEY.to_string(),
            path: COIN_SHEET_PATH.into(),
            frame_width: 8,
            frame_height: 8,
            frames: BTreeMap::from([("spin-0".to_string(), 0), ("spin-1".to_string(), 1)]),
        }
    }

    fn build_level(&mut self, world: &mut SceneWorld, assets: &AssetCache) {
        let floor = match assets.image(FLOOR_KEY) {
            Ok(image) => GameObject::new("floor")
                .with_size(ARENA_WIDTH, ARENA_HEIGHT)
                .with_image(image, 0.0),
            Err(error) => {
                debug!(error = %error, "floor_image_unavailable");
                GameObject::rectangle("floor", ARENA_WIDTH, ARENA_HEIGHT, FLOOR_FILL)
            }
        };
        world.add_object(floor.with_render_layer(-1).without_hitbox());

        let walls = [
            ("wall-top", 0.0, 0.0, ARENA_WIDTH, WALL_THICKNESS),
            ("wall-bottom", 0.0, ARENA_HEIGHT - WALL_THICKNESS, ARENA_WIDTH, WALL_THICKNESS),
            ("wall-left", 0.0, 0.0, WALL_THICKNESS, ARENA_HEIGHT),
            ("wall-right", ARENA_WIDTH - WALL_THICKNESS, 0.0, WALL_THICKNESS, ARENA_HEIGHT),
        ];
        for (name, x, y, width, height) in walls {
            world.add_object(solid(name, Rect::new(x, y, width, height), WALL_FILL));
        }
        for (index, (x, y, width, height)) in CRATE_RECTS.into_iter().enumerate() {
            let name = format!("crate-{index}");
            world.add_object(solid(&name, Rect::new(x, y, width, height), CRATE_FILL));
        }

        let coin_frame = assets.image(&Self::coin_sheet().frame_key(COIN_FRAME)).ok();
        for (index, (x, y)) in COIN_POSITIONS.into_iter().enumerate() {
            let coin = match &coin_frame {
                Some(image) => GameObject::new(format!("coin-{index}"))
                    .with_size(COIN_SIZE, COIN_SIZE)
                    .with_image(image.clone(), 0.0),
                None => GameObject::rectangle(format!("coin-{index}"), COIN_SIZE, COIN_SIZE, COIN_FILL),
            };
            world.add_object(
                coin.with_position(Vector2::new(x, y))
                    .with_collision_layer(COIN_LAYER),
            );
        }

        let (x, y, width, height) = HAZARD_RECT;
        world.add_object(
            GameObject::rectangle("hazard", width, height, HAZARD_FILL)
                .with_position(Vector2::new(x, y))
                .with_collision_layer(WALL_LAYER)
                .on_physics_update(|world, id, _| {
                    let Some(player) = world.object_by_name("player") else {
                        return;
                    };
                    if let Err(error) = world.check_collisions(id, player) {
                        warn!(error = %error, "hazard_check_failed");
                    }
                })
                .on_collision(|world, _, other| {
                    info!("player_hit_hazard");
                    world.set_position(other, PLAYER_SPAWN);
                }),
        );

        let patrol = Tween::new()
            .then(Vector2::new(DRONE_SWEEP, 0.0), DRONE_LEG_SECONDS, Easing::EaseInOutQuad)
            .then(Vector2::new(-DRONE_SWEEP, 0.0), DRONE_LEG_SECONDS, Easing::EaseInOutQuad)
            .with_loop(TweenLoop::Repeat);
        world.add_object(
            GameObject::rectangle("drone", DRONE_SIZE, DRONE_SIZE, DRONE_FILL)
                .with_position(DRONE_START)
                .with_render_layer(1)
                .on_physics_update(patrol.into_hook()),
        );

        let score = Rc::clone(&self.score);
        let player = world.add_object(
            GameObject::rectangle("player", PLAYER_SIZE, PLAYER_SIZE, PLAYER_FILL)
                .with_position(PLAYER_SPAWN)
                .with_collision_layer(WALL_LAYER)
                .with_rigid_body(true)
                .with_render_layer(1)
                .with_y_sort_offset(PLAYER_SIZE)
                .on_physics_update(move |world, id, fixed_dt_seconds| {
                    step_player(world, id, fixed_dt_seconds, &score);
                }),
        );
        self.player = Some(player);
    }

    fn build_hud(&mut self, world: &mut SceneWorld) -> Result<(), SceneError> {
        let hud = world.add_object(
            GameObject::ui_rect("hud")
                .with_size(HUD_WIDTH, HUD_HEIGHT)
                .with_shape_style(ShapeStyle {
                    fill: Some(PANEL_FILL),
                    ..ShapeStyle::default()
                })
                .with_detach_from_camera(true)
                .with_layout(UiLayout::anchored(Anchor::TopLeft).with_justify(Justify::SpaceEvenly)),
        );
        self.score_label = Some(world.add_child(hud, label("score", "SCORE 0", TEXT_FILL))?);
        self.coins_label = Some(world.add_child(hud, label("coins", "COINS 0", TEXT_FILL))?);
        Ok(())
    }

    fn follow_player(&self, world: &mut SceneWorld) {
        let Some(player) = self.player.and_then(|id| world.object(id)) else {
            return;
        };
        let focus = player.position() + player.center();
        let viewport = world.viewport();
        world.camera_mut().position =
            focus - Vector2::new(viewport.width as f32 / 2.0, viewport.height as f32 / 2.0);
    }

    fn refresh_hud(&mut self, world: &mut SceneWorld) {
        let score = self.score.get();
        let remaining = world.objects_in_layer(COIN_LAYER).len();
        if self.shown == Some((score, remaining)) {
            return;
        }
        self.shown = Some((score, remaining));
        if let Some(id) = self.score_label {
            world.set_text(id, format!("SCORE {score}"));
        }
        if let Some(id) = self.coins_label {
            let text = if remaining == 0 {
                "ALL CLEAR!".to_string()
            } else {
                format!("COINS {remaining}")
            };
            world.set_text(id, text);
        }
    }
}

impl Scene for ArenaScene {
    fn name(&self) -> &str {
        ARENA_SCENE
    }

    fn preload(&mut self, ctx: &mut PreloadContext<'_>) -> PreloadStatus {
        if self.progress_subscription.is_none() {
            let id = ctx.events.subscribe(PROGRESS_EVENT, |data| {
                if let EventData::Progress { percent } = data {
                    info!(percent = *percent, "arena_assets_progress");
                }
            });
            self.progress_subscription = Some(id);
        }
        if ctx.assets.contains(FLOOR_KEY) {
            return PreloadStatus::Complete;
        }
        ctx.assets.load_image(FLOOR_KEY, FLOOR_PATH);
        ctx.assets.load_spritesheet(Self::coin_sheet());
        PreloadStatus::Pending
    }

    fn start(&mut self, world: &mut SceneWorld, assets: &AssetCache) {
        self.score.set(0);
        self.shown = None;
        self.switch_key.arm_after_release();

        self.build_level(world, assets);
        if let Err(error) = self.build_hud(world) {
            warn!(error = %error, "arena_hud_build_failed");
        }
        self.follow_player(world);
        self.refresh_hud(world);
    }

    fn update(&mut self, _dt_seconds: f32, world: &mut SceneWorld) -> SceneCommand {
        self.follow_player(world);
        self.refresh_hud(world);
        if self
            .switch_key
            .pressed(world.input().is_key_down(SWITCH_KEY))
        {
            return SceneCommand::SwitchTo(TITLE_SCENE.to_string());
        }
        SceneCommand::None
    }

    fn unmount(&mut self, world: &mut SceneWorld) {
        debug!(score = self.score.get(), objects = world.object_count(), "arena_unmounted");
    }
}

fn solid(name: &str, rect: Rect, fill: Color) -> GameObject {
    GameObject::rectangle(name, rect.width, rect.height, fill)
        .with_position(Vector2::new(rect.x, rect.y))
        .with_collision_layer(WALL_LAYER)
        .with_rigid_body(true)
}

/// Moves one axis at a time so the player slides along walls, then collects
/// every coin the new bounds touch.
fn step_player(world: &mut SceneWorld, id: ObjectId, fixed_dt_seconds: f32, score: &Cell<u32>) {
    let step = world.input().movement_axis() * (PLAYER_SPEED_UNITS_PER_SECOND * fixed_dt_seconds);
    if step.x != 0.0 {
        world.move_by(id, Vector2::new(step.x, 0.0));
    }
    if step.y != 0.0 {
        world.move_by(id, Vector2::new(0.0, step.y));
    }

    let Some(bounds) = world.object(id).map(GameObject::bounds) else {
        return;
    };
    for coin in world.objects_within_rect(COIN_LAYER, bounds) {
        if world.destroy(coin).is_ok() {
            score.set(score.get() + 1);
            debug!(score = score.get(), "coin_collected");
        }
    }
}
