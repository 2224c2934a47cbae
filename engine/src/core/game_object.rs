//! The slice of the game object model the physics layer talks to
//!
//! Game objects live outside this crate. The collision world only needs to
//! look one up by id, read and write its transform, ask whether it is
//! active, and deliver collision events to it.

use super::transform::Transform;
use crate::physics::world::CollisionContext;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque id of the game object that owns a rigid body
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Event hooks and transform access for an object owning a rigid body.
///
/// Every hook receives the other object's id and a [`CollisionContext`] that
/// can mutate the collision world, including destroying bodies.
#[allow(unused_variables)]
pub trait GameObject {
    /// Inactive objects are skipped by contact resolution
    fn is_active(&self) -> bool {
        true
    }

    fn transform(&self) -> Option<&Transform> {
        None
    }

    fn transform_mut(&mut self) -> Option<&mut Transform> {
        None
    }

    fn on_collision_enter(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {}
    fn on_collision_stay(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {}
    fn on_collision_exit(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {}

    fn on_trigger_enter(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {}
    fn on_trigger_stay(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {}
    fn on_trigger_exit(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {}

    fn on_object_enter(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {}
    fn on_object_stay(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {}
    fn on_object_exit(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {}
}

impl<T: GameObject + ?Sized> GameObject for Box<T> {
    fn is_active(&self) -> bool {
        (**self).is_active()
    }
    fn transform(&self) -> Option<&Transform> {
        (**self).transform()
    }
    fn transform_mut(&mut self) -> Option<&mut Transform> {
        (**self).transform_mut()
    }
    fn on_collision_enter(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {
        (**self).on_collision_enter(other, ctx)
    }
    fn on_collision_stay(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {
        (**self).on_collision_stay(other, ctx)
    }
    fn on_collision_exit(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {
        (**self).on_collision_exit(other, ctx)
    }
    fn on_trigger_enter(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {
        (**self).on_trigger_enter(other, ctx)
    }
    fn on_trigger_stay(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {
        (**self).on_trigger_stay(other, ctx)
    }
    fn on_trigger_exit(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {
        (**self).on_trigger_exit(other, ctx)
    }
    fn on_object_enter(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {
        (**self).on_object_enter(other, ctx)
    }
    fn on_object_stay(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {
        (**self).on_object_stay(other, ctx)
    }
    fn on_object_exit(&mut self, other: EntityId, ctx: &mut CollisionContext<'_>) {
        (**self).on_object_exit(other, ctx)
    }
}

/// Lookup of game objects by id
pub trait Scene {
    fn game_object_mut(&mut self, entity: EntityId) -> Option<&mut dyn GameObject>;
}

impl<G: GameObject> Scene for HashMap<EntityId, G> {
    fn game_object_mut(&mut self, entity: EntityId) -> Option<&mut dyn GameObject> {
        self.get_mut(&entity).map(|object| object as &mut dyn GameObject)
    }
}

/// An empty scene: events are dropped and no transforms are synced
impl Scene for () {
    fn game_object_mut(&mut self, _entity: EntityId) -> Option<&mut dyn GameObject> {
        None
    }
}
