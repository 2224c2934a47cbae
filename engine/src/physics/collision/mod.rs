//! Collision detection subsystem

pub mod broad_phase;
pub mod gjk;
pub mod mesh;
pub mod narrow_phase;
pub mod shapes;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// One point of a contact manifold between bodies A and B
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    /// World space point on the surface of A
    pub position_on_a: Vec3,
    /// World space point on the surface of B
    pub position_on_b: Vec3,
    /// Contact normal pointing from A to B
    pub normal: Vec3,
    /// Signed separation along the normal, negative when penetrating
    pub distance: f32,
}

impl ContactPoint {
    pub fn new(position_on_a: Vec3, position_on_b: Vec3, normal: Vec3, distance: f32) -> Self {
        Self {
            position_on_a,
            position_on_b,
            normal,
            distance,
        }
    }

    /// Flip the contact (swap A and B)
    pub fn flipped(self) -> Self {
        Self {
            position_on_a: self.position_on_b,
            position_on_b: self.position_on_a,
            normal: -self.normal,
            distance: self.distance,
        }
    }
}

/// Create an orthonormal basis given a normal vector
pub(crate) fn create_tangent_basis(normal: Vec3) -> (Vec3, Vec3) {
    let up = if normal.y.abs() < 0.9 {
        Vec3::Y
    } else {
        Vec3::X
    };

    let tangent = up.cross(normal).normalize();
    let bitangent = normal.cross(tangent);

    (tangent, bitangent)
}

/// Axis-aligned bounding box for broad phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from a center point and half-extents
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Check if this AABB overlaps with another
    pub fn overlaps(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Grow the box by `margin` on every side
    pub fn expanded(&self, margin: f32) -> AABB {
        AABB {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the half-extents of the AABB
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Slab test of the segment `from..to`; returns the entry fraction
    pub fn segment_entry(&self, from: Vec3, to: Vec3) -> Option<f32> {
        let delta = to - from;
        let mut t_min = 0.0f32;
        let mut t_max = 1.0f32;
        for axis in 0..3 {
            if delta[axis].abs() < f32::EPSILON {
                if from[axis] < self.min[axis] || from[axis] > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / delta[axis];
            let t1 = (self.min[axis] - from[axis]) * inv;
            let t2 = (self.max[axis] - from[axis]) * inv;
            t_min = t_min.max(t1.min(t2));
            t_max = t_max.min(t1.max(t2));
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}
