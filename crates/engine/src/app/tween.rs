use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::math::Vector2;

use super::object::{GameObject, ObjectId};
use super::scene::SceneWorld;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
}

impl Easing {
    /// Maps progress in `0..=1` to eased progress. Out-of-range input is
    /// clamped; NaN counts as no progress.
    pub fn apply(self, t: f32) -> f32 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Easing::Linear => t,
            Easing::EaseInQuad => t * t,
            Easing::EaseOutQuad => t * (2.0 - t),
            Easing::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
        }
    }
}

/// One leg of a tween: move by `offset` over `duration_seconds`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TweenSegment {
    pub offset: Vector2,
    pub duration_seconds: f32,
    #[serde(default)]
    pub easing: Easing,
}

impl TweenSegment {
    pub fn new(offset: Vector2, duration_seconds: f32, easing: Easing) -> Self {
        Self {
            offset,
            duration_seconds,
            easing,
        }
    }

    fn progress(&self, elapsed_seconds: f32) -> f32 {
        if self.duration_seconds > 0.0 {
            (elapsed_seconds / self.duration_seconds).min(1.0)
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TweenLoop {
    #[default]
    Once,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TweenState {
    Running,
    Finished,
}

/// Queue of position segments played back to back on one object.
///
/// Each segment's position is measured from where the object stood when the
/// segment began, and every step goes through [`SceneWorld::set_position`],
/// so rigid-body rejection applies. A move rejected mid-segment is retried
/// from the same origin on the next advance.
#[derive(Debug, Clone, Default)]
pub struct Tween {
    segments: VecDeque<TweenSegment>,
    looping: TweenLoop,
    elapsed_seconds: f32,
    origin: Option<Vector2>,
}

impl Tween {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, offset: Vector2, duration_seconds: f32, easing: Easing) -> Self {
        self.segments
            .push_back(TweenSegment::new(offset, duration_seconds, easing));
        self
    }

    pub fn with_segments(mut self, segments: impl IntoIterator<Item = TweenSegment>) -> Self {
        self.segments.extend(segments);
        self
    }

    pub fn with_loop(mut self, looping: TweenLoop) -> Self {
        self.looping = looping;
        self
    }

    pub fn current(&self) -> Option<&TweenSegment> {
        self.segments.front()
    }

    pub fn remaining_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn is_finished(&self) -> bool {
        self.segments.is_empty()
    }

    /// Advances by `dt_seconds` and moves `id`. Time left over when a segment
    /// ends rolls into the next one, at most one pass over the queue per
    /// call.
    pub fn advance(&mut self, world: &mut SceneWorld, id: ObjectId, dt_seconds: f32) -> TweenState {
        let mut remaining = dt_seconds.max(0.0);
        let mut budget = self.segments.len();
        while let Some(segment) = self.segments.front().copied() {
            let Some(position) = world.object(id).map(GameObject::position) else {
                warn!(object = ?id, "tween_target_missing");
                self.segments.clear();
                break;
            };
            let origin = *self.origin.get_or_insert(position);
            self.elapsed_seconds += remaining;
            let progress = segment.progress(self.elapsed_seconds);
            world.set_position(id, origin + segment.offset * segment.easing.apply(progress));
            if progress < 1.0 {
                return TweenState::Running;
            }

            remaining = (self.elapsed_seconds - segment.duration_seconds.max(0.0)).max(0.0);
            self.finish_segment(id);
            budget = budget.saturating_sub(1);
            if budget == 0 || remaining <= 0.0 {
                break;
            }
        }
        if self.segments.is_empty() {
            TweenState::Finished
        } else {
            TweenState::Running
        }
    }

    fn finish_segment(&mut self, id: ObjectId) {
        if let Some(done) = self.segments.pop_front() {
            if self.looping == TweenLoop::Repeat {
                self.segments.push_back(done);
            }
        }
        self.elapsed_seconds = 0.0;
        self.origin = None;
        debug!(object = ?id, remaining = self.segments.len(), "tween_segment_finished");
    }

    /// Wraps the tween as a physics hook that drives the hook's own object.
    pub fn into_hook(mut self) -> impl FnMut(&mut SceneWorld, ObjectId, f32) + 'static {
        move |world, id, fixed_dt_seconds| {
            if !self.is_finished() {
                self.advance(world, id, fixed_dt_seconds);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rendering::{Color, Viewport};
    use crate::app::scene::SceneStatus;

    fn world() -> SceneWorld {
        let mut world = SceneWorld::new(Viewport {
            width: 320,
            height: 240,
        });
        world.set_status(SceneStatus::Running);
        world
    }

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn easing_curves_match_their_formulas() {
        for easing in [
            Easing::Linear,
            Easing::EaseInQuad,
            Easing::EaseOutQuad,
            Easing::EaseInOutQuad,
        ] {
            assert_eq!(easing.apply(0.0), 0.0, "{easing:?}");
            assert!(close(easing.apply(1.0), 1.0), "{easing:?}");
            assert!(close(easing.apply(3.0), 1.0), "{easing:?}");
            assert_eq!(easing.apply(f32::NAN), 0.0, "{easing:?}");
        }
        assert!(close(Easing::Linear.apply(0.25), 0.25));
        assert!(close(Easing::EaseInQuad.apply(0.5), 0.25));
        assert!(close(Easing::EaseOutQuad.apply(0.5), 0.75));
        assert!(close(Easing::EaseInOutQuad.apply(0.25), 0.125));
        assert!(close(Easing::EaseInOutQuad.apply(0.5), 0.5));
        assert!(close(Easing::EaseInOutQuad.apply(0.75), 0.875));
    }

    #[test]
    fn easing_names_read_from_json() {
        let segment: TweenSegment = serde_json::from_str(
            r#"{ "offset": { "x": 4.0, "y": 0.0 }, "duration_seconds": 0.5, "easing": "ease_in_out_quad" }"#,
        )
        .expect("segment");
        assert_eq!(segment.easing, Easing::EaseInOutQuad);

        let segment: TweenSegment =
            serde_json::from_str(r#"{ "offset": { "x": 0.0, "y": 1.0 }, "duration_seconds": 1.0 }"#)
                .expect("segment");
        assert_eq!(segment.easing, Easing::Linear);
    }

    #[test]
    fn chained_segments_hand_over_leftover_time() {
        let mut world = world();
        let id = world.add_object(GameObject::new("mover"));
        let mut tween = Tween::new()
            .then(Vector2::new(10.0, 0.0), 1.0, Easing::Linear)
            .then(Vector2::new(0.0, 20.0), 0.5, Easing::EaseInQuad);

        assert_eq!(tween.advance(&mut world, id, 0.5), TweenState::Running);
        assert_eq!(world.object(id).map(GameObject::position), Some(Vector2::new(5.0, 0.0)));

        assert_eq!(tween.advance(&mut world, id, 0.75), TweenState::Running);
        assert_eq!(tween.remaining_segments(), 1);
        assert_eq!(world.object(id).map(GameObject::position), Some(Vector2::new(10.0, 5.0)));

        assert_eq!(tween.advance(&mut world, id, 0.25), TweenState::Finished);
        assert!(tween.is_finished());
        assert_eq!(world.object(id).map(GameObject::position), Some(Vector2::new(10.0, 20.0)));
    }

    #[test]
    fn repeating_tween_requeues_finished_segments() {
        let mut world = world();
        let id = world.add_object(GameObject::new("patrol"));
        let mut tween = Tween::new()
            .then(Vector2::new(10.0, 0.0), 1.0, Easing::Linear)
            .then(Vector2::new(-10.0, 0.0), 1.0, Easing::Linear)
            .with_loop(TweenLoop::Repeat);

        tween.advance(&mut world, id, 1.0);
        assert_eq!(world.object(id).map(GameObject::position), Some(Vector2::new(10.0, 0.0)));
        tween.advance(&mut world, id, 1.0);
        assert_eq!(world.object(id).map(GameObject::position), Some(Vector2::ZERO));
        assert_eq!(tween.advance(&mut world, id, 0.5), TweenState::Running);
        assert_eq!(world.object(id).map(GameObject::position), Some(Vector2::new(5.0, 0.0)));
        assert_eq!(tween.remaining_segments(), 2);
    }

    #[test]
    fn rigid_neighbor_blocks_tweened_move() {
        let mut world = world();
        world.add_object(
            GameObject::rectangle("wall", 10.0, 10.0, Color::WHITE)
                .with_position(Vector2::new(15.0, 0.0))
                .with_collision_layer(1)
                .with_rigid_body(true),
        );
        let id = world.add_object(
            GameObject::rectangle("mover", 10.0, 10.0, Color::WHITE)
                .with_collision_layer(1)
                .with_rigid_body(true),
        );
        let mut tween = Tween::new().then(Vector2::new(20.0, 0.0), 1.0, Easing::Linear);

        tween.advance(&mut world, id, 0.25);
        assert_eq!(world.object(id).map(GameObject::position), Some(Vector2::new(5.0, 0.0)));
        tween.advance(&mut world, id, 0.25);
        assert_eq!(world.object(id).map(GameObject::position), Some(Vector2::new(5.0, 0.0)));
        assert_eq!(tween.remaining_segments(), 1);
    }

    #[test]
    fn hook_drives_tween_from_physics_pass() {
        let mut world = world();
        let tween = Tween::new().then(Vector2::new(0.0, 8.0), 0.064, Easing::Linear);
        let id = world.add_object(GameObject::new("drop").on_physics_update(tween.into_hook()));

        world.physics_update(0.032);
        assert_eq!(world.object(id).map(GameObject::position), Some(Vector2::new(0.0, 4.0)));
        world.physics_update(0.032);
        world.physics_update(0.032);
        assert_eq!(world.object(id).map(GameObject::position), Some(Vector2::new(0.0, 8.0)));
    }

    #[test]
    fn missing_target_finishes_tween() {
        let mut world = world();
        let mut tween = Tween::new().then(Vector2::new(1.0, 0.0), 1.0, Easing::Linear);
        assert_eq!(tween.advance(&mut world, ObjectId(99), 0.5), TweenState::Finished);
        assert!(tween.is_finished());
    }
}
