use tracing::warn;

use crate::math::{Rect, Vector2};

use super::object::{ObjectId, Parent};
use super::scene::SceneWorld;

/// Gap kept between a bottom-anchored element and the target's lower edge.
pub const BOTTOM_ANCHOR_MARGIN: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    TopLeft,
    TopRight,
    BottomLeft,
    Bottom,
    Left,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnchorTarget {
    #[default]
    Viewport,
    Parent,
    Object(ObjectId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justify {
    SpaceEvenly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UiLayout {
    pub anchor: Option<Anchor>,
    pub anchor_to: AnchorTarget,
    pub justify: Option<Justify>,
}

impl UiLayout {
    pub fn anchored(anchor: Anchor) -> Self {
        Self {
            anchor: Some(anchor),
            ..Self::default()
        }
    }

    pub fn justified(justify: Justify) -> Self {
        Self {
            justify: Some(justify),
            ..Self::default()
        }
    }

    pub fn with_anchor_to(mut self, anchor_to: AnchorTarget) -> Self {
        self.anchor_to = anchor_to;
        self
    }

    pub fn with_justify(mut self, justify: Justify) -> Self {
        self.justify = Some(justify);
        self
    }
}

pub fn anchored_position(anchor: Anchor, target: Rect, width: f32, height: f32) -> Vector2 {
    match anchor {
        Anchor::TopLeft => Vector2::new(target.x, target.y),
        Anchor::TopRight => Vector2::new(target.right() - width, target.y),
        Anchor::BottomLeft => Vector2::new(target.x, target.bottom() - height),
        Anchor::Bottom => Vector2::new(
            target.x + target.width / 2.0 - width / 2.0,
            target.bottom() - height - BOTTOM_ANCHOR_MARGIN,
        ),
        Anchor::Left => Vector2::new(target.x, target.y + target.height / 2.0 - height / 2.0),
    }
}

/// Left edges for items spread across `container` with equal gaps between
/// neighbours. The first item sits on the left edge, the last on the right.
/// Every item shares the container's top edge.
pub fn space_evenly(container: Rect, widths: &[f32]) -> Vec<Vector2> {
    let gap = match widths.len() {
        0 => return Vec::new(),
        1 => 0.0,
        count => {
            let total: f32 = widths.iter().sum();
            (container.width - total) / (count - 1) as f32
        }
    };
    let mut x = container.x;
    widths
        .iter()
        .map(|width| {
            let position = Vector2::new(x, container.y);
            x += width + gap;
            position
        })
        .collect()
}

impl SceneWorld {
    /// Installs a layout on an object and applies it immediately.
    pub fn set_layout(&mut self, id: ObjectId, layout: UiLayout) -> bool {
        let Some(object) = self.object_mut(id) else {
            warn!(object = ?id, "set_layout_missing_object");
            return false;
        };
        object.layout = Some(layout);
        self.apply_layout(id);
        true
    }

    pub(crate) fn apply_layout(&mut self, id: ObjectId) {
        self.apply_anchor(id);
        self.apply_justify(id);
    }

    pub(crate) fn apply_anchor(&mut self, id: ObjectId) {
        let Some(object) = self.object(id) else {
            return;
        };
        let Some(layout) = object.layout else {
            return;
        };
        let Some(anchor) = layout.anchor else {
            return;
        };
        let target = self.anchor_target_rect(object.parent(), layout.anchor_to);
        let position = anchored_position(anchor, target, object.width(), object.height());
        if position != object.position() {
            self.set_position(id, position);
        }
    }

    fn anchor_target_rect(&self, parent: Parent, anchor_to: AnchorTarget) -> Rect {
        let viewport = self.viewport();
        let screen = Rect::new(0.0, 0.0, viewport.width as f32, viewport.height as f32);
        let target = match (anchor_to, parent) {
            (AnchorTarget::Viewport, _) | (AnchorTarget::Parent, Parent::Root) => return screen,
            (AnchorTarget::Parent, Parent::Object(parent_id)) => parent_id,
            (AnchorTarget::Object(target_id), _) => target_id,
        };
        match self.object(target) {
            Some(object) => object.bounds(),
            None => {
                warn!(target = ?target, "anchor_target_missing");
                screen
            }
        }
    }

    pub(crate) fn apply_justify(&mut self, id: ObjectId) {
        let Some(object) = self.object(id) else {
            return;
        };
        let Some(Justify::SpaceEvenly) = object.layout.and_then(|layout| layout.justify) else {
            return;
        };
        let container = object.bounds();
        let children = object.children().to_vec();
        let widths: Vec<f32> = children
            .iter()
            .map(|child| self.object(*child).map_or(0.0, |object| object.width()))
            .collect();
        for (child, position) in children.into_iter().zip(space_evenly(container, &widths)) {
            let unchanged = self
                .object(child)
                .is_some_and(|object| object.position() == position);
            if !unchanged {
                self.set_position(child, position);
            }
        }
    }
}
