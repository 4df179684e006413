use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::assets::AssetCache;
use crate::math::{overlaps, Hitbox, Rect, Vector2};

use super::collision::{CollisionError, CollisionIndex};
use super::events::EventBus;
use super::input::{CursorIcon, InputSnapshot, PointerEvent};
use super::object::{GameObject, HookSlot, Hooks, ObjectId, ObjectIdAllocator, Parent};
use super::rendering::Viewport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SceneStatus {
    #[default]
    Ready,
    Loading,
    Running,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    SwitchTo(String),
}

/// Result of a scene's preload hook. `Complete` lets the scene start right
/// away; `Pending` keeps it loading until the asset queue drains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadStatus {
    Complete,
    Pending,
}

pub struct PreloadContext<'a> {
    pub world: &'a mut SceneWorld,
    pub assets: &'a mut AssetCache,
    pub events: &'a mut EventBus,
}

pub trait Scene {
    fn name(&self) -> &str;
    fn preload(&mut self, _ctx: &mut PreloadContext<'_>) -> PreloadStatus {
        PreloadStatus::Complete
    }
    fn start(&mut self, _world: &mut SceneWorld, _assets: &AssetCache) {}
    fn update(&mut self, _dt_seconds: f32, _world: &mut SceneWorld) -> SceneCommand {
        SceneCommand::None
    }
    fn physics_update(&mut self, _fixed_dt_seconds: f32, _world: &mut SceneWorld) {}
    fn unmount(&mut self, _world: &mut SceneWorld) {}
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("at least one scene is required")]
    NoScenes,
    #[error("scene `{name}` not found")]
    SceneNotFound { name: String },
    #[error("parent object {id:?} not found")]
    ParentNotFound { id: ObjectId },
    #[error("object {id:?} has no parent container")]
    Unparented { id: ObjectId },
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera2D {
    pub position: Vector2,
}

impl Camera2D {
    pub fn view_bounds(&self, viewport: Viewport) -> Rect {
        Rect::at(
            self.position,
            viewport.width as f32,
            viewport.height as f32,
        )
    }
}

#[derive(Debug, Default)]
pub struct SceneWorld {
    status: SceneStatus,
    allocator: ObjectIdAllocator,
    objects: HashMap<ObjectId, GameObject>,
    roots: Vec<ObjectId>,
    collision_index: CollisionIndex,
    camera: Camera2D,
    viewport: Viewport,
    input: InputSnapshot,
    cursor: CursorIcon,
}

impl SceneWorld {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            ..Self::default()
        }
    }

    pub fn status(&self) -> SceneStatus {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: SceneStatus) {
        self.status = status;
    }

    /// Adds a root object. An existing root with the same name is destroyed
    /// first.
    pub fn add_object(&mut self, object: GameObject) -> ObjectId {
        let id = self.attach(Parent::Root, object);
        self.apply_layout(id);
        self.start_if_live(id);
        id
    }

    /// Adds a child under `parent`. Children inherit camera detachment and
    /// replace any sibling with the same name.
    pub fn add_child(
        &mut self,
        parent: ObjectId,
        mut object: GameObject,
    ) -> Result<ObjectId, SceneError> {
        let Some(parent_object) = self.objects.get(&parent) else {
            return Err(SceneError::ParentNotFound { id: parent });
        };
        if parent_object.detach_from_camera {
            object.detach_from_camera = true;
        }
        let id = self.attach(Parent::Object(parent), object);
        self.apply_layout(id);
        self.children_changed(parent);
        self.start_if_live(id);
        Ok(id)
    }

    fn attach(&mut self, parent: Parent, mut object: GameObject) -> ObjectId {
        if let Some(existing) = self.sibling_by_name(parent, &object.name) {
            debug!(name = %object.name, replaced = ?existing, "object_replaced");
            self.detach_from_parent(existing, parent);
            self.destroy_subtree(existing);
        }

        let id = self.allocator.allocate();
        object.parent = parent;
        object.children.clear();
        object.started = false;
        object.hovered = false;
        object.refresh_cached_hitbox();
        if object.collision_layer != 0 {
            self.collision_index.insert(object.collision_layer, id);
        }
        self.objects.insert(id, object);
        match parent {
            Parent::Root => self.roots.push(id),
            Parent::Object(parent_id) => {
                if let Some(parent_object) = self.objects.get_mut(&parent_id) {
                    parent_object.children.push(id);
                }
            }
        }
        id
    }

    fn start_if_live(&mut self, id: ObjectId) {
        if matches!(self.status, SceneStatus::Loading | SceneStatus::Running) {
            self.start_object(id);
        }
    }

    fn start_object(&mut self, id: ObjectId) {
        let Some(object) = self.objects.get_mut(&id) else {
            return;
        };
        if object.started {
            return;
        }
        object.started = true;
        self.with_hook(id, Hooks::start_slot, |hook, world| hook(world, id));
    }

    /// Runs the start hook of every object that has not started yet, in
    /// traversal order.
    pub(crate) fn start_pending_objects(&mut self) {
        for id in self.flatten() {
            self.start_object(id);
        }
    }

    /// Destroys the root object with this name. Missing names are ignored.
    pub fn destroy_object(&mut self, name: &str) -> bool {
        let Some(id) = self.sibling_by_name(Parent::Root, name) else {
            warn!(name, "destroy_object_missing");
            return false;
        };
        self.detach_from_parent(id, Parent::Root);
        self.destroy_subtree(id);
        true
    }

    /// Destroys the named child of `parent`. Missing parents or children are
    /// ignored.
    pub fn destroy_child(&mut self, parent: ObjectId, name: &str) -> bool {
        if !self.objects.contains_key(&parent) {
            warn!(parent = ?parent, name, "destroy_child_missing_parent");
            return false;
        }
        let Some(id) = self.sibling_by_name(Parent::Object(parent), name) else {
            warn!(parent = ?parent, name, "destroy_child_missing");
            return false;
        };
        self.detach_from_parent(id, Parent::Object(parent));
        self.destroy_subtree(id);
        self.children_changed(parent);
        true
    }

    /// Destroys an object through whichever container holds it.
    pub fn destroy(&mut self, id: ObjectId) -> Result<(), SceneError> {
        let parent = self
            .objects
            .get(&id)
            .map(|object| object.parent)
            .ok_or(SceneError::Unparented { id })?;
        self.detach_from_parent(id, parent);
        self.destroy_subtree(id);
        if let Parent::Object(parent_id) = parent {
            self.children_changed(parent_id);
        }
        Ok(())
    }

    fn detach_from_parent(&mut self, id: ObjectId, parent: Parent) {
        match parent {
            Parent::Root => self.roots.retain(|root| *root != id),
            Parent::Object(parent_id) => {
                if let Some(parent_object) = self.objects.get_mut(&parent_id) {
                    parent_object.children.retain(|child| *child != id);
                }
            }
        }
    }

    fn destroy_subtree(&mut self, id: ObjectId) {
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            let Some(object) = self.objects.remove(&next) else {
                continue;
            };
            if object.collision_layer != 0 {
                self.collision_index.remove(object.collision_layer, next);
            }
            pending.extend(object.children.iter().copied());
        }
    }

    fn sibling_by_name(&self, parent: Parent, name: &str) -> Option<ObjectId> {
        let siblings = match parent {
            Parent::Root => self.roots.as_slice(),
            Parent::Object(parent_id) => self.objects.get(&parent_id)?.children.as_slice(),
        };
        siblings.iter().copied().find(|id| {
            self.objects
                .get(id)
                .is_some_and(|object| object.name == name)
        })
    }

    pub fn object(&self, id: ObjectId) -> Option<&GameObject> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut GameObject> {
        self.objects.get_mut(&id)
    }

    pub fn object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.sibling_by_name(Parent::Root, name)
    }

    pub fn child_by_name(&self, parent: ObjectId, name: &str) -> Option<ObjectId> {
        self.sibling_by_name(Parent::Object(parent), name)
    }

    /// First object with this name anywhere in the tree, depth first.
    pub fn find_by_name(&self, name: &str) -> Option<ObjectId> {
        self.flatten().into_iter().find(|id| {
            self.objects
                .get(id)
                .is_some_and(|object| object.name == name)
        })
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Every object id, parents before their children, roots in insertion
    /// order.
    pub fn flatten(&self) -> Vec<ObjectId> {
        let mut out = Vec::with_capacity(self.objects.len());
        self.flatten_into(&self.roots, &mut out);
        out
    }

    fn flatten_into(&self, ids: &[ObjectId], out: &mut Vec<ObjectId>) {
        for id in ids {
            let Some(object) = self.objects.get(id) else {
                continue;
            };
            out.push(*id);
            self.flatten_into(&object.children, out);
        }
    }

    pub fn camera(&self) -> &Camera2D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera2D {
        &mut self.camera
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Updates the viewport and re-applies anchors of laid-out objects.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        if self.viewport == viewport {
            return;
        }
        self.viewport = viewport;
        let anchored: Vec<ObjectId> = self
            .flatten()
            .into_iter()
            .filter(|id| {
                self.objects
                    .get(id)
                    .and_then(|object| object.layout)
                    .is_some_and(|layout| layout.anchor.is_some())
            })
            .collect();
        for id in anchored {
            self.apply_anchor(id);
        }
    }

    pub fn input(&self) -> &InputSnapshot {
        &self.input
    }

    pub(crate) fn set_input(&mut self, input: InputSnapshot) {
        self.input = input;
    }

    pub fn cursor(&self) -> CursorIcon {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: CursorIcon) {
        self.cursor = cursor;
    }

    /// Moves an object. Rigid bodies refuse moves that would overlap another
    /// rigid body on their collision layer; the return value reports whether
    /// the move happened.
    pub fn set_position(&mut self, id: ObjectId, position: Vector2) -> bool {
        let Some(object) = self.objects.get(&id) else {
            warn!(object = ?id, "set_position_missing_object");
            return false;
        };
        if object.rigid_body && self.blocked_by_rigid_body(object, id, position) {
            debug!(name = %object.name, x = position.x, y = position.y, "rigid_body_move_rejected");
            return false;
        }
        if let Some(object) = self.objects.get_mut(&id) {
            object.position = position;
            object.refresh_cached_hitbox();
        }
        self.shape_changed(id);
        true
    }

    pub fn move_by(&mut self, id: ObjectId, delta: Vector2) -> bool {
        let Some(object) = self.objects.get(&id) else {
            return false;
        };
        let target = object.position + delta;
        self.set_position(id, target)
    }

    fn blocked_by_rigid_body(&self, object: &GameObject, id: ObjectId, position: Vector2) -> bool {
        if object.collision_layer == 0 {
            return false;
        }
        let Some(next) = object.build_hitbox(position) else {
            return false;
        };
        self.collision_index
            .layer(object.collision_layer)
            .iter()
            .filter(|other| **other != id)
            .filter_map(|other| self.objects.get(other))
            .filter(|other| other.rigid_body)
            .filter_map(|other| other.build_hitbox(other.position))
            .any(|hitbox| overlaps(&next, &hitbox))
    }

    pub fn set_size(&mut self, id: ObjectId, width: f32, height: f32) -> bool {
        let Some(object) = self.objects.get_mut(&id) else {
            warn!(object = ?id, "set_size_missing_object");
            return false;
        };
        object.width = width;
        object.height = height;
        object.refresh_cached_hitbox();
        self.shape_changed(id);
        true
    }

    pub fn set_rotation(&mut self, id: ObjectId, degrees: f32) -> bool {
        let Some(object) = self.objects.get_mut(&id) else {
            return false;
        };
        object.rotation = degrees;
        self.shape_changed(id);
        true
    }

    /// Replaces the text payload, growing the object to fit the measured
    /// text.
    pub fn set_text(&mut self, id: ObjectId, content: impl Into<String>) -> bool {
        let Some(object) = self.objects.get_mut(&id) else {
            warn!(object = ?id, "set_text_missing_object");
            return false;
        };
        if object.apply_text(content.into()) {
            object.refresh_cached_hitbox();
            self.shape_changed(id);
        }
        true
    }

    pub fn set_rigid_body(&mut self, id: ObjectId, rigid_body: bool) -> bool {
        let Some(object) = self.objects.get_mut(&id) else {
            return false;
        };
        object.rigid_body = rigid_body;
        object.refresh_cached_hitbox();
        true
    }

    /// Moves an object between collision layers. Layer 0 takes it out of the
    /// index entirely.
    pub fn set_collision_layer(&mut self, id: ObjectId, layer: u32) -> bool {
        let Some(object) = self.objects.get_mut(&id) else {
            warn!(object = ?id, "set_collision_layer_missing_object");
            return false;
        };
        let previous = object.collision_layer;
        object.collision_layer = layer;
        if previous != 0 {
            self.collision_index.remove(previous, id);
        }
        if layer != 0 {
            self.collision_index.insert(layer, id);
        }
        true
    }

    pub fn add_collision_object(&mut self, id: ObjectId) -> bool {
        let Some(object) = self.objects.get(&id) else {
            return false;
        };
        self.collision_index.insert(object.collision_layer, id)
    }

    pub fn remove_collision_object(&mut self, id: ObjectId) -> bool {
        let Some(object) = self.objects.get(&id) else {
            return false;
        };
        self.collision_index.remove(object.collision_layer, id)
    }

    pub fn collision_index(&self) -> &CollisionIndex {
        &self.collision_index
    }

    pub fn objects_in_layer(&self, layer: u32) -> &[ObjectId] {
        self.collision_index.layer(layer)
    }

    pub fn objects_within_area(
        &self,
        layer: u32,
        position: Vector2,
        width: f32,
        height: f32,
    ) -> Vec<ObjectId> {
        self.objects_within_rect(layer, Rect::at(position, width, height))
    }

    /// Members of `layer` whose hitbox overlaps `area`.
    pub fn objects_within_rect(&self, layer: u32, area: Rect) -> Vec<ObjectId> {
        self.query_layer(layer, area, GameObject::build_hitbox)
    }

    /// Members of `layer` whose interact box overlaps the area.
    pub fn objects_within_interact_area(
        &self,
        layer: u32,
        position: Vector2,
        width: f32,
        height: f32,
    ) -> Vec<ObjectId> {
        self.query_layer(
            layer,
            Rect::at(position, width, height),
            GameObject::build_interact_box,
        )
    }

    fn query_layer(
        &self,
        layer: u32,
        area: Rect,
        build: fn(&GameObject, Vector2) -> Option<Hitbox>,
    ) -> Vec<ObjectId> {
        let area = area.points();
        self.collision_index
            .layer(layer)
            .iter()
            .copied()
            .filter(|id| {
                self.objects
                    .get(id)
                    .and_then(|object| build(object, object.position))
                    .is_some_and(|hitbox| overlaps(&area, &hitbox))
            })
            .collect()
    }

    /// Tests `id` against `other` and fires `id`'s collision hook once on
    /// overlap. Objects without a collision hook never report a hit.
    pub fn check_collisions(&mut self, id: ObjectId, other: ObjectId) -> Result<bool, CollisionError> {
        let object = self
            .objects
            .get(&id)
            .ok_or(CollisionError::ObjectNotFound { id })?;
        if !object.has_collision_hook() {
            return Ok(false);
        }
        let target = self
            .objects
            .get(&other)
            .ok_or(CollisionError::ObjectNotFound { id: other })?;
        let target_box = target.build_hitbox(target.position).ok_or_else(|| {
            CollisionError::MissingHitbox {
                name: target.name.clone(),
            }
        })?;
        let own_box = object.build_hitbox(object.position).ok_or_else(|| {
            CollisionError::MissingHitbox {
                name: object.name.clone(),
            }
        })?;
        if let Some(object) = self.objects.get_mut(&id) {
            object.cached_hitbox = Some(own_box);
        }
        if !overlaps(&own_box, &target_box) {
            return Ok(false);
        }
        self.with_hook(id, Hooks::on_collision_slot, |hook, world| {
            hook(world, id, other)
        });
        Ok(true)
    }

    /// Checks `id` against every other member of its collision layer.
    /// Returns the number of hits.
    pub fn check_layer_collisions(&mut self, id: ObjectId) -> Result<usize, CollisionError> {
        let layer = self
            .objects
            .get(&id)
            .map(|object| object.collision_layer)
            .ok_or(CollisionError::ObjectNotFound { id })?;
        let others: Vec<ObjectId> = self
            .collision_index
            .layer(layer)
            .iter()
            .copied()
            .filter(|other| *other != id)
            .collect();
        let mut hits = 0;
        for other in others {
            if !self.objects.contains_key(&other) || !self.objects.contains_key(&id) {
                continue;
            }
            if self.check_collisions(id, other)? {
                hits += 1;
            }
        }
        Ok(hits)
    }

    /// Variable-step traversal: each object's update hook, then its
    /// children, roots in insertion order.
    pub fn update(&mut self, dt_seconds: f32) {
        let roots = self.roots.clone();
        self.update_objects(&roots, dt_seconds);
    }

    fn update_objects(&mut self, ids: &[ObjectId], dt_seconds: f32) {
        for &id in ids {
            if !self.objects.contains_key(&id) {
                continue;
            }
            self.with_hook(id, Hooks::update_slot, |hook, world| {
                hook(world, id, dt_seconds)
            });
            let Some(children) = self.objects.get(&id).map(|object| object.children.clone()) else {
                continue;
            };
            self.update_objects(&children, dt_seconds);
        }
    }

    /// Fixed-step traversal, same order as [`SceneWorld::update`] but calling
    /// physics hooks at every depth.
    pub fn physics_update(&mut self, fixed_dt_seconds: f32) {
        let roots = self.roots.clone();
        self.physics_update_objects(&roots, fixed_dt_seconds);
    }

    fn physics_update_objects(&mut self, ids: &[ObjectId], fixed_dt_seconds: f32) {
        for &id in ids {
            if !self.objects.contains_key(&id) {
                continue;
            }
            self.with_hook(id, Hooks::physics_update_slot, |hook, world| {
                hook(world, id, fixed_dt_seconds)
            });
            let Some(children) = self.objects.get(&id).map(|object| object.children.clone()) else {
                continue;
            };
            self.physics_update_objects(&children, fixed_dt_seconds);
        }
    }

    /// Delivers a click at a scene-space position. Children are offered the
    /// click before their parent. Returns whether any click hook ran.
    pub fn dispatch_click(&mut self, event: PointerEvent) -> bool {
        let roots = self.roots.clone();
        self.click_objects(&roots, event)
    }

    fn click_objects(&mut self, ids: &[ObjectId], event: PointerEvent) -> bool {
        let mut handled = false;
        for &id in ids {
            let Some(children) = self.objects.get(&id).map(|object| object.children.clone()) else {
                continue;
            };
            handled |= self.click_objects(&children, event);
            let hit = self.objects.get(&id).is_some_and(|object| {
                object.hooks.on_click.is_some() && object.bounds().contains_strict(event.position)
            });
            if hit {
                handled |= self.with_hook(id, Hooks::on_click_slot, |hook, world| {
                    hook(world, id, event)
                });
            }
        }
        handled
    }

    /// Updates hover state for a scene-space pointer position, firing enter
    /// and leave hooks on transitions. Children are visited first.
    pub fn dispatch_pointer_move(&mut self, position: Vector2) {
        let roots = self.roots.clone();
        self.hover_objects(&roots, position);
    }

    fn hover_objects(&mut self, ids: &[ObjectId], position: Vector2) {
        for &id in ids {
            let Some(children) = self.objects.get(&id).map(|object| object.children.clone()) else {
                continue;
            };
            self.hover_objects(&children, position);
            let Some(object) = self.objects.get_mut(&id) else {
                continue;
            };
            let inside = object.bounds().contains_strict(position);
            match (object.hovered, inside) {
                (false, true) => {
                    object.hovered = true;
                    self.with_hook(id, Hooks::on_mouse_enter_slot, |hook, world| hook(world, id));
                }
                (true, false) => {
                    object.hovered = false;
                    self.with_hook(id, Hooks::on_mouse_leave_slot, |hook, world| hook(world, id));
                }
                _ => {}
            }
        }
    }

    /// Rebuilds derived shapes, re-lays out dependent children, then runs the
    /// object's own shape-change hook.
    fn shape_changed(&mut self, id: ObjectId) {
        let Some(object) = self.objects.get_mut(&id) else {
            return;
        };
        object.rebuild_shapes();
        let justified = object
            .layout
            .is_some_and(|layout| layout.justify.is_some());
        let children = object.children.clone();
        if justified {
            self.apply_justify(id);
        }
        for child in children {
            let anchored = self
                .objects
                .get(&child)
                .and_then(|object| object.layout)
                .is_some_and(|layout| layout.anchor.is_some());
            if anchored {
                self.apply_anchor(child);
            }
        }
        self.with_hook(id, Hooks::on_change_shape_slot, |hook, world| hook(world, id));
    }

    fn children_changed(&mut self, parent: ObjectId) {
        let justified = self
            .objects
            .get(&parent)
            .and_then(|object| object.layout)
            .is_some_and(|layout| layout.justify.is_some());
        if justified {
            self.apply_justify(parent);
        }
    }

    /// Takes a hook out of its slot for the duration of the call so it can
    /// freely mutate the world, then puts it back unless the object was
    /// destroyed or the slot was refilled meanwhile.
    fn with_hook<T>(
        &mut self,
        id: ObjectId,
        slot: HookSlot<T>,
        call: impl FnOnce(&mut T, &mut SceneWorld),
    ) -> bool {
        let Some(mut hook) = self
            .objects
            .get_mut(&id)
            .and_then(|object| slot(&mut object.hooks).take())
        else {
            return false;
        };
        call(&mut hook, self);
        if let Some(object) = self.objects.get_mut(&id) {
            let current = slot(&mut object.hooks);
            if current.is_none() {
                *current = Some(hook);
            }
            object.refresh_cached_hitbox();
        }
        true
    }

    pub fn clear(&mut self) {
        self.objects.clear();
        self.roots.clear();
        self.collision_index.clear();
        self.camera = Camera2D::default();
        self.input = InputSnapshot::default();
        self.cursor = CursorIcon::Default;
    }
}
