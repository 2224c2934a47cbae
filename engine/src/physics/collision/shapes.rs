//! Collision shape geometry: bounds, support mapping, inertia and ray tests

use crate::physics::components::CollisionShape;
use glam::{Quat, Vec3};

use super::AABB;

impl CollisionShape {
    /// Get the AABB for this shape in local space
    pub fn local_aabb(&self) -> AABB {
        let half_extents = match self {
            CollisionShape::Sphere { radius } => Vec3::splat(*radius),
            CollisionShape::Box { half_extents } | CollisionShape::Cylinder { half_extents } => {
                *half_extents
            }
            CollisionShape::Capsule { radius, height } => {
                Vec3::new(*radius, height * 0.5 + radius, *radius)
            }
            CollisionShape::Cone { radius, height } => Vec3::new(*radius, height * 0.5, *radius),
            CollisionShape::TriangleMesh { mesh, scale } => return mesh.scaled_bounds(*scale),
        };
        AABB::from_center_half_extents(Vec3::ZERO, half_extents)
    }

    /// Get the AABB for this shape transformed by position and rotation
    pub fn world_aabb(&self, position: Vec3, rotation: Quat) -> AABB {
        match self {
            CollisionShape::Sphere { radius } => {
                return AABB::from_center_half_extents(position, Vec3::splat(*radius));
            }
            CollisionShape::TriangleMesh { .. } => {
                // Bounds of the rotated local box
                let local = self.local_aabb();
                let center = position + rotation * local.center();
                let half = local.half_extents();
                let axes = [rotation * Vec3::X, rotation * Vec3::Y, rotation * Vec3::Z];
                let reach = axes[0].abs() * half.x + axes[1].abs() * half.y + axes[2].abs() * half.z;
                return AABB::from_center_half_extents(center, reach);
            }
            _ => {}
        }

        // Exact bounds of a convex shape from its support points along the world axes
        let mut min = Vec3::ZERO;
        let mut max = Vec3::ZERO;
        for (i, axis) in [Vec3::X, Vec3::Y, Vec3::Z].into_iter().enumerate() {
            max[i] = self.world_support(axis, position, rotation)[i];
            min[i] = self.world_support(-axis, position, rotation)[i];
        }
        AABB::new(min, max)
    }

    /// Radius of the sphere around the body origin enclosing the local AABB
    pub fn bounding_radius(&self) -> f32 {
        let aabb = self.local_aabb();
        aabb.min.abs().max(aabb.max.abs()).length()
    }

    /// Furthest point of the shape along `direction`, in local space
    pub fn support(&self, direction: Vec3) -> Vec3 {
        match *self {
            CollisionShape::TriangleMesh { ref mesh, scale } => mesh
                .scaled_triangles(scale)
                .map(|triangle| triangle.support(direction))
                .max_by(|a, b| a.dot(direction).total_cmp(&b.dot(direction)))
                .unwrap_or(Vec3::ZERO),
            CollisionShape::Sphere { radius } => direction.normalize_or_zero() * radius,
            CollisionShape::Box { half_extents } => Vec3::new(
                half_extents.x.copysign(direction.x),
                half_extents.y.copysign(direction.y),
                half_extents.z.copysign(direction.z),
            ),
            CollisionShape::Capsule { radius, height } => {
                let cap = Vec3::new(0.0, (height * 0.5).copysign(direction.y), 0.0);
                cap + direction.normalize_or_zero() * radius
            }
            CollisionShape::Cylinder { half_extents } => {
                let (a, c) = (half_extents.x, half_extents.z);
                let reach = ((a * direction.x).powi(2) + (c * direction.z).powi(2)).sqrt();
                let (x, z) = if reach > f32::EPSILON {
                    (a * a * direction.x / reach, c * c * direction.z / reach)
                } else {
                    (0.0, 0.0)
                };
                Vec3::new(x, half_extents.y.copysign(direction.y), z)
            }
            CollisionShape::Cone { radius, height } => {
                let half_height = height * 0.5;
                let sin_angle = radius / (radius * radius + height * height).sqrt();
                if direction.y > direction.length() * sin_angle {
                    Vec3::new(0.0, half_height, 0.0)
                } else {
                    let radial = Vec3::new(direction.x, 0.0, direction.z).normalize_or_zero();
                    radial * radius - Vec3::new(0.0, half_height, 0.0)
                }
            }
        }
    }

    /// Transform support point to world space
    pub fn world_support(&self, direction: Vec3, position: Vec3, rotation: Quat) -> Vec3 {
        let local_direction = rotation.conjugate() * direction;
        position + rotation * self.support(local_direction)
    }

    /// Diagonal of the local inertia tensor. Capsules and cones use their
    /// bounding box; meshes are always static and have none.
    pub fn calculate_local_inertia(&self, mass: f32) -> Vec3 {
        match *self {
            CollisionShape::Sphere { radius } => Vec3::splat(0.4 * mass * radius * radius),
            CollisionShape::Box { half_extents } => box_inertia(mass, half_extents),
            CollisionShape::Cylinder { half_extents } => {
                let (a, c) = (half_extents.x, half_extents.z);
                let height = half_extents.y * 2.0;
                Vec3::new(
                    mass * (c * c / 4.0 + height * height / 12.0),
                    mass * (a * a + c * c) / 4.0,
                    mass * (a * a / 4.0 + height * height / 12.0),
                )
            }
            CollisionShape::Capsule { .. } | CollisionShape::Cone { .. } => {
                box_inertia(mass, self.local_aabb().half_extents())
            }
            CollisionShape::TriangleMesh { .. } => Vec3::ZERO,
        }
    }

    /// Check if a point is inside the shape (in local space)
    pub fn contains_point(&self, point: Vec3) -> bool {
        match *self {
            CollisionShape::Sphere { radius } => point.length() <= radius,
            CollisionShape::Box { half_extents } => {
                point.x.abs() <= half_extents.x
                    && point.y.abs() <= half_extents.y
                    && point.z.abs() <= half_extents.z
            }
            CollisionShape::Capsule { radius, height } => {
                let half_height = height * 0.5;
                let clamped_y = point.y.clamp(-half_height, half_height);
                (point - Vec3::new(0.0, clamped_y, 0.0)).length() <= radius
            }
            CollisionShape::Cylinder { half_extents } => {
                point.y.abs() <= half_extents.y
                    && (point.x / half_extents.x).powi(2) + (point.z / half_extents.z).powi(2)
                        <= 1.0
            }
            CollisionShape::Cone { radius, height } => {
                let half_height = height * 0.5;
                if point.y.abs() > half_height || height <= 0.0 {
                    return false;
                }
                let allowed = radius * (half_height - point.y) / height;
                point.x * point.x + point.z * point.z <= allowed * allowed
            }
            // A triangle soup has no inside
            CollisionShape::TriangleMesh { .. } => false,
        }
    }
}

fn box_inertia(mass: f32, half_extents: Vec3) -> Vec3 {
    let size = half_extents * 2.0;
    let factor = mass / 12.0;
    Vec3::new(
        factor * (size.y * size.y + size.z * size.z),
        factor * (size.x * size.x + size.z * size.z),
        factor * (size.x * size.x + size.y * size.y),
    )
}

/// Ray for raycasting
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray; the direction is normalized
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Get a point along the ray at distance t
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Hit of a ray against a single shape
#[derive(Debug, Clone, Copy)]
pub struct ShapeHit {
    /// Distance along the ray to the hit point
    pub distance: f32,
    /// Surface normal at the hit point
    pub normal: Vec3,
}

impl CollisionShape {
    /// Raycast in the shape's local space. Rays starting inside the shape do
    /// not hit it.
    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<ShapeHit> {
        if ray.direction == Vec3::ZERO || self.contains_point(ray.origin) {
            return None;
        }

        let hit = match *self {
            CollisionShape::TriangleMesh { ref mesh, scale } => {
                mesh.raycast(scale, ray, max_distance)
            }
            CollisionShape::Sphere { radius } => ray_sphere(ray, Vec3::ZERO, radius),
            CollisionShape::Box { half_extents } => ray_box(ray, half_extents),
            CollisionShape::Capsule { radius, height } => {
                let half_height = height * 0.5;
                let side = ray_cylinder_side(ray, radius, half_height);
                let top = ray_sphere(ray, Vec3::new(0.0, half_height, 0.0), radius);
                let bottom = ray_sphere(ray, Vec3::new(0.0, -half_height, 0.0), radius);
                nearest([side, top, bottom])
            }
            CollisionShape::Cylinder { half_extents } => {
                // Squash the elliptical cross-section into the unit circle.
                // The ray parameter is unchanged by the squash.
                let squash = Vec3::new(1.0 / half_extents.x, 1.0, 1.0 / half_extents.z);
                let unit = Ray {
                    origin: ray.origin * squash,
                    direction: ray.direction * squash,
                };
                let side = ray_cylinder_side(&unit, 1.0, half_extents.y).map(|hit| ShapeHit {
                    normal: (hit.normal * squash).normalize_or_zero(),
                    ..hit
                });
                let top = ray_disc(&unit, half_extents.y, 1.0, Vec3::Y);
                let bottom = ray_disc(&unit, -half_extents.y, 1.0, Vec3::NEG_Y);
                nearest([side, top, bottom])
            }
            CollisionShape::Cone { radius, height } => {
                let side = ray_cone_side(ray, radius, height);
                let base = ray_disc(ray, -height * 0.5, radius, Vec3::NEG_Y);
                nearest([side, base])
            }
        }?;

        (hit.distance <= max_distance).then_some(hit)
    }
}

fn nearest<const N: usize>(hits: [Option<ShapeHit>; N]) -> Option<ShapeHit> {
    hits.into_iter()
        .flatten()
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

fn ray_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<ShapeHit> {
    let oc = ray.origin - center;
    let b = oc.dot(ray.direction);
    let c = oc.dot(oc) - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let t = -b - discriminant.sqrt();
    if t < 0.0 {
        return None;
    }
    Some(ShapeHit {
        distance: t,
        normal: (ray.at(t) - center).normalize_or_zero(),
    })
}

fn ray_box(ray: &Ray, half_extents: Vec3) -> Option<ShapeHit> {
    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut enter_axis = 0;

    for axis in 0..3 {
        let origin = ray.origin[axis];
        let direction = ray.direction[axis];
        let extent = half_extents[axis];
        if direction.abs() < f32::EPSILON {
            if origin.abs() > extent {
                return None;
            }
            continue;
        }
        let inv = 1.0 / direction;
        let (near, far) = {
            let t1 = (-extent - origin) * inv;
            let t2 = (extent - origin) * inv;
            (t1.min(t2), t1.max(t2))
        };
        if near > t_enter {
            t_enter = near;
            enter_axis = axis;
        }
        t_exit = t_exit.min(far);
    }

    if t_enter > t_exit || t_enter < 0.0 {
        return None;
    }

    let mut normal = Vec3::ZERO;
    normal[enter_axis] = -ray.direction[enter_axis].signum();
    Some(ShapeHit {
        distance: t_enter,
        normal,
    })
}

/// Side of a Y-aligned cylinder limited to `|y| <= half_height`
fn ray_cylinder_side(ray: &Ray, radius: f32, half_height: f32) -> Option<ShapeHit> {
    let (o, d) = (ray.origin, ray.direction);
    let a = d.x * d.x + d.z * d.z;
    if a < f32::EPSILON {
        return None;
    }
    let b = o.x * d.x + o.z * d.z;
    let c = o.x * o.x + o.z * o.z - radius * radius;
    let discriminant = b * b - a * c;
    if discriminant < 0.0 {
        return None;
    }
    let t = (-b - discriminant.sqrt()) / a;
    if t < 0.0 {
        return None;
    }
    let point = ray.at(t);
    if point.y.abs() > half_height {
        return None;
    }
    Some(ShapeHit {
        distance: t,
        normal: Vec3::new(point.x, 0.0, point.z).normalize_or_zero(),
    })
}

/// Disc of `radius` lying in the plane `y = height`, facing `normal`
fn ray_disc(ray: &Ray, height: f32, radius: f32, normal: Vec3) -> Option<ShapeHit> {
    if ray.direction.y.abs() < f32::EPSILON {
        return None;
    }
    let t = (height - ray.origin.y) / ray.direction.y;
    if t < 0.0 || ray.direction.dot(normal) >= 0.0 {
        return None;
    }
    let point = ray.at(t);
    (point.x * point.x + point.z * point.z <= radius * radius).then_some(ShapeHit {
        distance: t,
        normal,
    })
}

fn ray_cone_side(ray: &Ray, radius: f32, height: f32) -> Option<ShapeHit> {
    if height <= 0.0 {
        return None;
    }
    let apex = height * 0.5;
    let k2 = (radius / height).powi(2);
    let (o, d) = (ray.origin, ray.direction);
    let h = apex - o.y;

    let a = d.x * d.x + d.z * d.z - k2 * d.y * d.y;
    let b = o.x * d.x + o.z * d.z + k2 * h * d.y;
    let c = o.x * o.x + o.z * o.z - k2 * h * h;

    let mut roots = Vec::with_capacity(2);
    if a.abs() < f32::EPSILON {
        if b.abs() > f32::EPSILON {
            roots.push(-c / (2.0 * b));
        }
    } else {
        let discriminant = b * b - a * c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt = discriminant.sqrt();
        roots.push((-b - sqrt) / a);
        roots.push((-b + sqrt) / a);
    }
    roots.sort_by(f32::total_cmp);

    roots
        .into_iter()
        .filter(|t| *t >= 0.0)
        .map(|t| (t, ray.at(t)))
        .find(|(_, point)| point.y >= -apex && point.y <= apex)
        .map(|(t, point)| ShapeHit {
            distance: t,
            normal: Vec3::new(point.x, k2 * (apex - point.y), point.z).normalize_or(Vec3::Y),
        })
}
