use std::collections::BTreeMap;

use thiserror::Error;

use super::object::ObjectId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollisionError {
    #[error("object `{name}` has no hitbox to test collisions against")]
    MissingHitbox { name: String },
    #[error("object {id:?} is not part of the scene")]
    ObjectNotFound { id: ObjectId },
}

/// Objects grouped by collision layer. Layer 0 means "no collision" and is
/// never stored. Each object appears in at most one layer.
#[derive(Debug, Default)]
pub struct CollisionIndex {
    layers: BTreeMap<u32, Vec<ObjectId>>,
}

impl CollisionIndex {
    /// Returns `false` when the layer is 0 or the object was already present.
    pub fn insert(&mut self, layer: u32, id: ObjectId) -> bool {
        if layer == 0 {
            return false;
        }
        let members = self.layers.entry(layer).or_default();
        if members.contains(&id) {
            return false;
        }
        members.push(id);
        true
    }

    pub fn remove(&mut self, layer: u32, id: ObjectId) -> bool {
        let Some(members) = self.layers.get_mut(&layer) else {
            return false;
        };
        let before = members.len();
        members.retain(|member| *member != id);
        let removed = members.len() != before;
        if members.is_empty() {
            self.layers.remove(&layer);
        }
        removed
    }

    /// Members in insertion order.
    pub fn layer(&self, layer: u32) -> &[ObjectId] {
        self.layers
            .get(&layer)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn contains(&self, layer: u32, id: ObjectId) -> bool {
        self.layer(layer).contains(&id)
    }

    pub fn layer_of(&self, id: ObjectId) -> Option<u32> {
        self.layers
            .iter()
            .find(|(_, members)| members.contains(&id))
            .map(|(layer, _)| *layer)
    }

    pub fn layers(&self) -> impl Iterator<Item = u32> + '_ {
        self.layers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.layers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn clear(&mut self) {
        self.layers.clear();
    }
}
