use std::cell::Cell;
use std::rc::Rc;

use strata_engine::app::{Anchor, AnchorTarget, Justify, ShapeStyle, UiLayout};
use strata_engine::{
    AssetCache, Color, CursorIcon, GameObject, Scene, SceneCommand, SceneError, SceneWorld,
};
use tracing::{info, warn};

use super::{
    label, with_pointer_cursor, KeyLatch, ARENA_SCENE, MUTED_TEXT_FILL, PANEL_FILL, SWITCH_KEY,
    TEXT_FILL, TITLE_SCENE,
};

const MENU_WIDTH: f32 = 320.0;
const MENU_HEIGHT: f32 = 40.0;
const BUTTON_WIDTH: f32 = 96.0;
const BUTTON_HEIGHT: f32 = 24.0;
const BUTTON_FILL: Color = Color::rgb(54, 98, 170);
const HEADING_FONT_SIZE_PX: f32 = 30.0;

pub(crate) struct TitleScene {
    play_clicked: Rc<Cell<bool>>,
    switch_key: KeyLatch,
}

impl TitleScene {
    pub(crate) fn new() -> Self {
        Self {
            play_clicked: Rc::new(Cell::new(false)),
            switch_key: KeyLatch::default(),
        }
    }

    fn build_menu(&self, world: &mut SceneWorld) -> Result<(), SceneError> {
        let menu = world.add_object(
            GameObject::ui_rect("menu")
                .with_size(MENU_WIDTH, MENU_HEIGHT)
                .with_shape_style(ShapeStyle {
                    fill: Some(PANEL_FILL),
                    ..ShapeStyle::default()
                })
                .with_detach_from_camera(true)
                .with_layout(UiLayout::anchored(Anchor::Bottom).with_justify(Justify::SpaceEvenly)),
        );

        let clicked = Rc::clone(&self.play_clicked);
        let button = GameObject::ui_rect("play")
            .with_size(BUTTON_WIDTH, BUTTON_HEIGHT)
            .with_shape_style(ShapeStyle {
                fill: Some(BUTTON_FILL),
                stroke: Some(TEXT_FILL),
                stroke_width: Some(1.0),
            })
            .on_click(move |_, _, _| clicked.set(true));
        let play = world.add_child(menu, with_pointer_cursor(button))?;
        world.add_child(
            play,
            label("caption", "PLAY", TEXT_FILL)
                .with_layout(UiLayout::anchored(Anchor::Left).with_anchor_to(AnchorTarget::Parent)),
        )?;
        world.add_child(menu, label("hint", "TAB TO START", MUTED_TEXT_FILL))?;
        Ok(())
    }
}

impl Scene for TitleScene {
    fn name(&self) -> &str {
        TITLE_SCENE
    }

    fn start(&mut self, world: &mut SceneWorld, _assets: &AssetCache) {
        self.play_clicked.set(false);
        self.switch_key.arm_after_release();

        world.add_object(
            label("heading", "STRATA", TEXT_FILL)
                .with_font_size(HEADING_FONT_SIZE_PX)
                .with_detach_from_camera(true)
                .with_layout(UiLayout::anchored(Anchor::TopLeft)),
        );
        if let Err(error) = self.build_menu(world) {
            warn!(error = %error, "title_menu_build_failed");
        }
    }

    fn update(&mut self, _dt_seconds: f32, world: &mut SceneWorld) -> SceneCommand {
        let switch_pressed = self
            .switch_key
            .pressed(world.input().is_key_down(SWITCH_KEY));
        if self.play_clicked.replace(false) || switch_pressed {
            info!(target_scene = ARENA_SCENE, "title_start_requested");
            return SceneCommand::SwitchTo(ARENA_SCENE.to_string());
        }
        SceneCommand::None
    }

    fn unmount(&mut self, world: &mut SceneWorld) {
        world.set_cursor(CursorIcon::Default);
    }
}
