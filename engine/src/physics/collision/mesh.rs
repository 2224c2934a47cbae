//! Static triangle meshes
//!
//! A mesh is a plain triangle soup with a cached bounding box. It is only
//! ever attached to static bodies, so it needs no inertia and never collides
//! with another mesh.

use super::shapes::{Ray, ShapeHit};
use super::AABB;
use crate::core::math::Vector3;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Immutable triangle soup in mesh space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    triangles: Vec<[Vec3; 3]>,
    bounds: AABB,
}

impl TriangleMesh {
    /// Build a mesh from a vertex buffer and triangle indices. Triangles that
    /// reference a missing vertex are skipped.
    pub fn from_indexed(vertices: &[Vector3], indices: &[[u32; 3]]) -> Self {
        let triangles = indices
            .iter()
            .filter_map(|triangle| {
                let corner = |i: u32| vertices.get(i as usize).map(|v| v.to_vec3());
                match (corner(triangle[0]), corner(triangle[1]), corner(triangle[2])) {
                    (Some(a), Some(b), Some(c)) => Some([a, b, c]),
                    _ => {
                        warn!(?triangle, vertices = vertices.len(), "triangle index out of range");
                        None
                    }
                }
            })
            .collect();
        Self::from_triangles(triangles)
    }

    pub fn from_triangles(triangles: Vec<[Vec3; 3]>) -> Self {
        let bounds = if triangles.is_empty() {
            AABB::new(Vec3::ZERO, Vec3::ZERO)
        } else {
            let corners = triangles.iter().flatten();
            let min = corners.clone().fold(Vec3::splat(f32::MAX), |m, v| m.min(*v));
            let max = corners.fold(Vec3::splat(f32::MIN), |m, v| m.max(*v));
            AABB::new(min, max)
        };
        Self { triangles, bounds }
    }

    pub fn triangles(&self) -> &[[Vec3; 3]] {
        &self.triangles
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Bounds of the mesh after `scale` is applied
    pub fn scaled_bounds(&self, scale: Vec3) -> AABB {
        let a = self.bounds.min * scale;
        let b = self.bounds.max * scale;
        AABB::new(a.min(b), a.max(b))
    }

    /// Triangles with `scale` applied
    pub fn scaled_triangles(&self, scale: Vec3) -> impl Iterator<Item = Triangle> + '_ {
        self.triangles
            .iter()
            .map(move |[a, b, c]| Triangle([*a * scale, *b * scale, *c * scale]))
    }

    /// Nearest hit of a mesh-space ray against any triangle, from either side
    pub fn raycast(&self, scale: Vec3, ray: &Ray, max_distance: f32) -> Option<ShapeHit> {
        self.scaled_triangles(scale)
            .filter_map(|triangle| triangle.raycast(ray))
            .filter(|hit| hit.distance <= max_distance)
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// One triangle, usable as a convex shape by the narrow phase
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle(pub [Vec3; 3]);

impl Triangle {
    pub fn normal(&self) -> Vec3 {
        let [a, b, c] = self.0;
        (b - a).cross(c - a).normalize_or_zero()
    }

    pub fn aabb(&self) -> AABB {
        let [a, b, c] = self.0;
        AABB::new(a.min(b).min(c), a.max(b).max(c))
    }

    pub fn support(&self, direction: Vec3) -> Vec3 {
        let [a, b, c] = self.0;
        let (da, db, dc) = (a.dot(direction), b.dot(direction), c.dot(direction));
        if da >= db && da >= dc {
            a
        } else if db >= dc {
            b
        } else {
            c
        }
    }

    /// Closest point of the triangle to `p`
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        let [a, b, c] = self.0;
        let ab = b - a;
        let ac = c - a;
        let ap = p - a;
        let d1 = ab.dot(ap);
        let d2 = ac.dot(ap);
        if d1 <= 0.0 && d2 <= 0.0 {
            return a;
        }

        let bp = p - b;
        let d3 = ab.dot(bp);
        let d4 = ac.dot(bp);
        if d3 >= 0.0 && d4 <= d3 {
            return b;
        }

        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            return a + ab * (d1 / (d1 - d3));
        }

        let cp = p - c;
        let d5 = ab.dot(cp);
        let d6 = ac.dot(cp);
        if d6 >= 0.0 && d5 <= d6 {
            return c;
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            return a + ac * (d2 / (d2 - d6));
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
        }

        let denom = 1.0 / (va + vb + vc);
        a + ab * (vb * denom) + ac * (vc * denom)
    }

    /// Möller-Trumbore; the normal faces the incoming ray
    pub fn raycast(&self, ray: &Ray) -> Option<ShapeHit> {
        let [a, b, c] = self.0;
        let e1 = b - a;
        let e2 = c - a;
        let p = ray.direction.cross(e2);
        let det = e1.dot(p);
        if det.abs() < 1e-8 {
            return None;
        }
        let inv = 1.0 / det;
        let s = ray.origin - a;
        let u = s.dot(p) * inv;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(e1);
        let v = ray.direction.dot(q) * inv;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let t = e2.dot(q) * inv;
        if t < 0.0 {
            return None;
        }

        let normal = self.normal();
        Some(ShapeHit {
            distance: t,
            normal: if normal.dot(ray.direction) > 0.0 {
                -normal
            } else {
                normal
            },
        })
    }
}
