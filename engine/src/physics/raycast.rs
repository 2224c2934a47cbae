//! Segment and ray queries against the collision world

use crate::core::game_object::EntityId;
use crate::core::math::Vector3;
use crate::physics::collision::shapes::Ray;
use crate::physics::components::{layers, BodyId, Collider, RigidBody};
use crate::physics::world::CollisionWorld;
use std::cmp::Ordering;
use tracing::trace;

/// Group the ray itself belongs to when filtering against body masks
const RAY_GROUP: u16 = layers::DEFAULT;

/// A body hit by a ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub body: BodyId,
    pub owner: EntityId,
    /// World position of the hit
    pub position: Vector3,
    /// Surface normal at the hit, in world space
    pub normal: Vector3,
    /// Distance from the ray start to `position`
    pub distance: f64,
}

impl CollisionWorld {
    /// Every body crossed by the segment `from..to`, nearest first.
    ///
    /// Bodies in the ignore-raycast layer are never reported, whatever `mask`
    /// says.
    pub fn raycast_all(&self, from: Vector3, to: Vector3, mask: u16) -> Vec<RaycastHit> {
        if !self.is_running() {
            return Vec::new();
        }
        let length = from.distance(to);
        if length <= 0.0 {
            return Vec::new();
        }

        let mask = mask & !layers::IGNORE_RAYCAST;
        let (start, end) = (from.to_vec3(), to.to_vec3());
        let mut hits = Vec::new();

        let mut query = self.dynamics().arena().query::<(&RigidBody, &Collider)>();
        for (entity, (body, collider)) in query.iter() {
            if (collider.group & mask) == 0 || (RAY_GROUP & collider.mask) == 0 {
                continue;
            }

            let shape = collider.scaled_shape();
            if shape
                .world_aabb(body.position, body.rotation)
                .segment_entry(start, end)
                .is_none()
            {
                continue;
            }

            let inverse = body.rotation.inverse();
            let local_ray = Ray::new(inverse * (start - body.position), inverse * (end - start));
            let Some(hit) = shape.raycast(&local_ray, length as f32) else {
                continue;
            };

            let fraction = (hit.distance as f64 / length).clamp(0.0, 1.0);
            let position = from.lerp(to, fraction);
            hits.push(RaycastHit {
                body: BodyId(entity),
                owner: body.owner(),
                position,
                normal: Vector3::from(body.rotation * hit.normal),
                distance: from.distance(position),
            });
        }

        hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));
        trace!(%from, %to, hits = hits.len(), "raycast");
        hits
    }

    /// Like [`raycast_all`](Self::raycast_all) along `direction` for at most
    /// `max_distance`. A non-positive distance returns nothing.
    pub fn raycast_all_dir(
        &self,
        from: Vector3,
        direction: Vector3,
        max_distance: f64,
        mask: u16,
    ) -> Vec<RaycastHit> {
        if max_distance <= 0.0 {
            return Vec::new();
        }
        let to = from + direction.normalized() * max_distance;
        self.raycast_all(from, to, mask)
    }

    /// Nearest body crossed by the segment `from..to`
    pub fn raycast(&self, from: Vector3, to: Vector3, mask: u16) -> Option<RaycastHit> {
        self.raycast_all(from, to, mask).into_iter().next()
    }

    pub fn raycast_dir(
        &self,
        from: Vector3,
        direction: Vector3,
        max_distance: f64,
        mask: u16,
    ) -> Option<RaycastHit> {
        self.raycast_all_dir(from, direction, max_distance, mask)
            .into_iter()
            .next()
    }

    /// Whether anything lies on the segment `from..to`
    pub fn raycast_hit(&self, from: Vector3, to: Vector3, mask: u16) -> bool {
        self.raycast(from, to, mask).is_some()
    }
}
