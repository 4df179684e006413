mod arena;
mod title;

#[cfg(test)]
mod tests;

use strata_engine::app::UI_RENDER_LAYER;
use strata_engine::{Color, CursorIcon, GameObject, Scene};

pub(crate) use arena::ArenaScene;
pub(crate) use title::TitleScene;

pub(crate) const TITLE_SCENE: &str = "title";
pub(crate) const ARENA_SCENE: &str = "arena";
pub(crate) const SWITCH_KEY: &str = "Tab";

const PANEL_FILL: Color = Color::rgba(12, 14, 20, 200);
const TEXT_FILL: Color = Color::rgb(236, 238, 242);
const MUTED_TEXT_FILL: Color = Color::rgb(140, 146, 160);

pub(crate) fn build_scenes() -> Vec<Box<dyn Scene>> {
    vec![Box::new(TitleScene::new()), Box::new(ArenaScene::new())]
}

/// Turns a held key into a single press. Re-arming after a scene switch
/// ignores the key until it has been released once.
#[derive(Debug, Default)]
struct KeyLatch {
    held: bool,
}

impl KeyLatch {
    fn arm_after_release(&mut self) {
        self.held = true;
    }

    fn pressed(&mut self, down: bool) -> bool {
        let pressed = down && !self.held;
        self.held = down;
        pressed
    }
}

fn label(name: &str, content: &str, fill: Color) -> GameObject {
    GameObject::new(name)
        .with_text(content)
        .with_text_fill(fill)
        .with_render_layer(UI_RENDER_LAYER)
}

fn with_pointer_cursor(object: GameObject) -> GameObject {
    object
        .on_mouse_enter(|world, _| world.set_cursor(CursorIcon::Pointer))
        .on_mouse_leave(|world, _| world.set_cursor(CursorIcon::Default))
}
