use std::collections::BTreeSet;

use crate::math::Vector2;

use super::scene::Camera2D;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CursorIcon {
    #[default]
    Default,
    Pointer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// Pointer press in scene space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: Vector2,
    pub button: PointerButton,
}

/// Screen pixels to scene units: the camera position is the scene point at
/// the viewport's top-left corner.
pub fn screen_to_scene(screen: Vector2, camera: &Camera2D) -> Vector2 {
    screen + camera.position
}

/// Per-frame view of input handed to scenes and object hooks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    keys_down: BTreeSet<String>,
    pointer: Option<Vector2>,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_key_down(mut self, key: impl Into<String>) -> Self {
        self.keys_down.insert(key.into());
        self
    }

    pub fn with_pointer(mut self, pointer: Option<Vector2>) -> Self {
        self.pointer = pointer;
        self
    }

    pub fn is_key_down(&self, key: &str) -> bool {
        self.keys_down.contains(key)
    }

    pub fn keys_down(&self) -> impl Iterator<Item = &str> {
        self.keys_down.iter().map(String::as_str)
    }

    /// Pointer position in scene space, if the pointer is over the window.
    pub fn pointer(&self) -> Option<Vector2> {
        self.pointer
    }

    /// Unit-length direction from held arrow or WASD keys.
    pub fn movement_axis(&self) -> Vector2 {
        let mut axis = Vector2::ZERO;
        if self.is_key_down("ArrowLeft") || self.is_key_down("a") {
            axis.x -= 1.0;
        }
        if self.is_key_down("ArrowRight") || self.is_key_down("d") {
            axis.x += 1.0;
        }
        if self.is_key_down("ArrowUp") || self.is_key_down("w") {
            axis.y -= 1.0;
        }
        if self.is_key_down("ArrowDown") || self.is_key_down("s") {
            axis.y += 1.0;
        }
        axis.normalize()
    }
}

/// Live input state fed by the host window.
#[derive(Debug, Default)]
pub struct InputState {
    keys_down: BTreeSet<String>,
    pointer_screen: Option<Vector2>,
}

impl InputState {
    pub fn key_down(&mut self, key: impl Into<String>) {
        self.keys_down.insert(key.into());
    }

    pub fn key_up(&mut self, key: &str) {
        self.keys_down.remove(key);
    }

    pub fn is_key_down(&self, key: &str) -> bool {
        self.keys_down.contains(key)
    }

    pub fn set_pointer(&mut self, screen: Vector2) {
        self.pointer_screen = Some(screen);
    }

    pub fn clear_pointer(&mut self) {
        self.pointer_screen = None;
    }

    pub fn pointer_screen(&self) -> Option<Vector2> {
        self.pointer_screen
    }

    pub fn release_all(&mut self) {
        self.keys_down.clear();
    }

    pub fn snapshot(&self, camera: &Camera2D) -> InputSnapshot {
        InputSnapshot {
            keys_down: self.keys_down.clone(),
            pointer: self
                .pointer_screen
                .map(|screen| screen_to_scene(screen, camera)),
        }
    }
}
