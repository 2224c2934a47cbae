//! Narrow phase collision detection for generating contact points
//!
//! Every routine reports points with the normal pointing from A to B and a
//! signed `distance` (negative when penetrating). Points separated by up to
//! `margin` are kept so the solver can see contacts about to happen.

use super::gjk::{self, Placed};
use super::mesh::{Triangle, TriangleMesh};
use super::{create_tangent_basis, ContactPoint};
use crate::physics::components::CollisionShape;
use glam::{Quat, Vec3};

/// Lateral lean of the extra support directions used to fill out a GJK manifold
const MANIFOLD_TILT: f32 = 0.5;
/// Points closer than this are the same manifold point
const MERGE_DISTANCE: f32 = 1e-2;

/// Test for collision between two shapes and generate the contact manifold points
pub fn generate_contacts(
    shape_a: &CollisionShape,
    transform_a: (Vec3, Quat),
    shape_b: &CollisionShape,
    transform_b: (Vec3, Quat),
    margin: f32,
) -> Vec<ContactPoint> {
    match (shape_a, shape_b) {
        // Meshes are static and never touch each other
        (CollisionShape::TriangleMesh { .. }, CollisionShape::TriangleMesh { .. }) => Vec::new(),
        (CollisionShape::TriangleMesh { mesh, scale }, other) => {
            mesh_contacts(mesh, *scale, transform_a, other, transform_b, margin)
        }
        (other, CollisionShape::TriangleMesh { mesh, scale }) => {
            mesh_contacts(mesh, *scale, transform_b, other, transform_a, margin)
                .into_iter()
                .map(ContactPoint::flipped)
                .collect()
        }
        (
            CollisionShape::Sphere { radius: radius_a },
            CollisionShape::Sphere { radius: radius_b },
        ) => sphere_sphere(transform_a.0, *radius_a, transform_b.0, *radius_b, margin)
            .into_iter()
            .collect(),
        (CollisionShape::Sphere { radius }, CollisionShape::Box { half_extents }) => {
            sphere_box(transform_a.0, *radius, transform_b, *half_extents, margin)
                .into_iter()
                .collect()
        }
        (CollisionShape::Box { half_extents }, CollisionShape::Sphere { radius }) => {
            sphere_box(transform_b.0, *radius, transform_a, *half_extents, margin)
                .map(ContactPoint::flipped)
                .into_iter()
                .collect()
        }
        (
            CollisionShape::Box {
                half_extents: extents_a,
            },
            CollisionShape::Box {
                half_extents: extents_b,
            },
        ) => box_box(transform_a, *extents_a, transform_b, *extents_b, margin),
        (CollisionShape::Sphere { radius: sphere }, CollisionShape::Capsule { radius, height }) => {
            let (start, end) = capsule_segment(transform_b, *height);
            let closest = closest_on_segment(transform_a.0, start, end);
            sphere_sphere(transform_a.0, *sphere, closest, *radius, margin)
                .into_iter()
                .collect()
        }
        (CollisionShape::Capsule { radius, height }, CollisionShape::Sphere { radius: sphere }) => {
            let (start, end) = capsule_segment(transform_a, *height);
            let closest = closest_on_segment(transform_b.0, start, end);
            sphere_sphere(closest, *radius, transform_b.0, *sphere, margin)
                .into_iter()
                .collect()
        }
        (
            CollisionShape::Capsule {
                radius: radius_a,
                height: height_a,
            },
            CollisionShape::Capsule {
                radius: radius_b,
                height: height_b,
            },
        ) => {
            let (a0, a1) = capsule_segment(transform_a, *height_a);
            let (b0, b1) = capsule_segment(transform_b, *height_b);
            let (on_a, on_b) = closest_between_segments(a0, a1, b0, b1);
            sphere_sphere(on_a, *radius_a, on_b, *radius_b, margin)
                .into_iter()
                .collect()
        }
        (CollisionShape::Capsule { radius, height }, CollisionShape::Box { half_extents }) => {
            capsule_box(transform_a, *radius, *height, transform_b, *half_extents, margin)
        }
        (CollisionShape::Box { half_extents }, CollisionShape::Capsule { radius, height }) => {
            capsule_box(transform_b, *radius, *height, transform_a, *half_extents, margin)
                .into_iter()
                .map(ContactPoint::flipped)
                .collect()
        }
        _ => convex_convex(
            &placed(shape_a, transform_a),
            &placed(shape_b, transform_b),
            margin,
        ),
    }
}

fn placed(shape: &CollisionShape, (position, rotation): (Vec3, Quat)) -> Placed<'_> {
    Placed {
        shape,
        position,
        rotation,
        margin: 0.0,
    }
}

/// Test collision between two spheres
fn sphere_sphere(
    pos_a: Vec3,
    radius_a: f32,
    pos_b: Vec3,
    radius_b: f32,
    margin: f32,
) -> Option<ContactPoint> {
    let delta = pos_b - pos_a;
    let radius_sum = radius_a + radius_b;
    let reach = radius_sum + margin;

    if delta.length_squared() > reach * reach {
        return None;
    }

    let center_distance = delta.length();
    let normal = if center_distance > 0.0 {
        delta / center_distance
    } else {
        // Spheres are at the same position, use arbitrary normal
        Vec3::Y
    };

    Some(ContactPoint::new(
        pos_a + normal * radius_a,
        pos_b - normal * radius_b,
        normal,
        center_distance - radius_sum,
    ))
}

/// Test collision between a sphere (A) and a box (B)
fn sphere_box(
    sphere_pos: Vec3,
    sphere_radius: f32,
    (box_pos, box_rot): (Vec3, Quat),
    half_extents: Vec3,
    margin: f32,
) -> Option<ContactPoint> {
    // Transform sphere to box's local space
    let local = box_rot.conjugate() * (sphere_pos - box_pos);
    let closest = local.clamp(-half_extents, half_extents);
    let delta = local - closest;
    let outside_distance = delta.length();

    // Normal from the box towards the sphere, in box space, and the surface point
    let (local_normal, surface, separation) = if outside_distance > 0.0 {
        (
            delta / outside_distance,
            closest,
            outside_distance - sphere_radius,
        )
    } else {
        // Sphere center is inside box, push out through the nearest face
        let face_gap = half_extents - local.abs();
        let axis = if face_gap.x <= face_gap.y && face_gap.x <= face_gap.z {
            0
        } else if face_gap.y <= face_gap.z {
            1
        } else {
            2
        };
        let mut normal = Vec3::ZERO;
        normal[axis] = if local[axis] < 0.0 { -1.0 } else { 1.0 };
        let mut surface = local;
        surface[axis] = half_extents[axis] * normal[axis];
        (normal, surface, -(face_gap[axis] + sphere_radius))
    };

    if separation > margin {
        return None;
    }

    let normal_a_to_b = -(box_rot * local_normal);
    Some(ContactPoint::new(
        sphere_pos + normal_a_to_b * sphere_radius,
        box_pos + box_rot * surface,
        normal_a_to_b,
        separation,
    ))
}

/// Test collision between two boxes using SAT (Separating Axis Theorem) and
/// collect the vertices of each box lying inside the other.
fn box_box(
    (pos_a, rot_a): (Vec3, Quat),
    extents_a: Vec3,
    (pos_b, rot_b): (Vec3, Quat),
    extents_b: Vec3,
    margin: f32,
) -> Vec<ContactPoint> {
    let axes_a = [rot_a * Vec3::X, rot_a * Vec3::Y, rot_a * Vec3::Z];
    let axes_b = [rot_b * Vec3::X, rot_b * Vec3::Y, rot_b * Vec3::Z];
    let center_delta = pos_b - pos_a;

    let mut min_penetration = f32::MAX;
    let mut best_axis = Vec3::Y;

    let edge_axes = (0..3).flat_map(|i| (0..3).map(move |j| (i, j))).filter_map(|(i, j)| {
        let axis = axes_a[i].cross(axes_b[j]);
        // Parallel edges
        (axis.length_squared() > 1e-6).then(|| axis.normalize())
    });
    let candidates = axes_a.into_iter().chain(axes_b).chain(edge_axes);

    for axis in candidates {
        let Some((penetration, flip)) = test_separation_axis(
            &axis,
            center_delta,
            extents_a,
            extents_b,
            &axes_a,
            &axes_b,
            margin,
        ) else {
            return Vec::new();
        };

        // Face axes come first, so an edge axis only wins when clearly better
        if penetration < min_penetration - 1e-4 {
            min_penetration = penetration;
            best_axis = if flip { -axis } else { axis };
        }
    }

    let normal = best_axis;
    let radius_a = projected_radius(&axes_a, extents_a, normal);
    let radius_b = projected_radius(&axes_b, extents_b, normal);
    let face_a = pos_a.dot(normal) + radius_a;
    let face_b = pos_b.dot(normal) - radius_b;

    let mut points = Vec::new();
    let tolerance = Vec3::splat(margin + 1e-3);

    for corner in box_corners(pos_b, &axes_b, extents_b) {
        let separation = corner.dot(normal) - face_a;
        let local = inverse_rotate(&axes_a, corner - pos_a);
        if separation <= margin && local.abs().cmple(extents_a + tolerance).all() {
            points.push(ContactPoint::new(
                corner - normal * separation,
                corner,
                normal,
                separation,
            ));
        }
    }
    for corner in box_corners(pos_a, &axes_a, extents_a) {
        let separation = face_b - corner.dot(normal);
        let local = inverse_rotate(&axes_b, corner - pos_b);
        if separation <= margin && local.abs().cmple(extents_b + tolerance).all() {
            points.push(ContactPoint::new(
                corner,
                corner + normal * separation,
                normal,
                separation,
            ));
        }
    }

    if points.is_empty() {
        // Edge-edge contact: use the deepest points of both boxes
        let support_a = get_box_support_point(pos_a, &axes_a, extents_a, normal);
        let support_b = get_box_support_point(pos_b, &axes_b, extents_b, -normal);
        points.push(ContactPoint::new(
            support_a,
            support_b,
            normal,
            -min_penetration,
        ));
    }

    points
}

/// Test a separation axis for the SAT algorithm
fn test_separation_axis(
    axis: &Vec3,
    center_delta: Vec3,
    extents_a: Vec3,
    extents_b: Vec3,
    axes_a: &[Vec3; 3],
    axes_b: &[Vec3; 3],
    margin: f32,
) -> Option<(f32, bool)> {
    let separation = center_delta.dot(*axis);
    let radius_a = projected_radius(axes_a, extents_a, *axis);
    let radius_b = projected_radius(axes_b, extents_b, *axis);

    let penetration = radius_a + radius_b - separation.abs();

    if penetration < -margin {
        None // Separated along this axis
    } else {
        Some((penetration, separation < 0.0))
    }
}

fn projected_radius(axes: &[Vec3; 3], extents: Vec3, axis: Vec3) -> f32 {
    extents.x * axes[0].dot(axis).abs()
        + extents.y * axes[1].dot(axis).abs()
        + extents.z * axes[2].dot(axis).abs()
}

fn inverse_rotate(axes: &[Vec3; 3], v: Vec3) -> Vec3 {
    Vec3::new(axes[0].dot(v), axes[1].dot(v), axes[2].dot(v))
}

fn box_corners(center: Vec3, axes: &[Vec3; 3], extents: Vec3) -> [Vec3; 8] {
    let mut corners = [Vec3::ZERO; 8];
    for (i, corner) in corners.iter_mut().enumerate() {
        let sx = if i & 1 == 0 { -1.0 } else { 1.0 };
        let sy = if i & 2 == 0 { -1.0 } else { 1.0 };
        let sz = if i & 4 == 0 { -1.0 } else { 1.0 };
        *corner = center
            + axes[0] * (extents.x * sx)
            + axes[1] * (extents.y * sy)
            + axes[2] * (extents.z * sz);
    }
    corners
}

/// Get the support point of a box in a given direction
fn get_box_support_point(center: Vec3, axes: &[Vec3; 3], extents: Vec3, direction: Vec3) -> Vec3 {
    let mut support = center;
    for (axis, extent) in axes.iter().zip([extents.x, extents.y, extents.z]) {
        if axis.dot(direction) > 0.0 {
            support += *axis * extent;
        } else {
            support -= *axis * extent;
        }
    }
    support
}

/// Capsule (A) against a box (B): the end caps plus the segment point nearest
/// the box, each treated as a sphere
fn capsule_box(
    capsule: (Vec3, Quat),
    radius: f32,
    height: f32,
    (box_pos, box_rot): (Vec3, Quat),
    half_extents: Vec3,
    margin: f32,
) -> Vec<ContactPoint> {
    let (start, end) = capsule_segment(capsule, height);
    let mut centers = vec![start, end];

    // Alternate projections between the segment and the box converge on
    // the segment point nearest the box
    let to_local = |p: Vec3| box_rot.conjugate() * (p - box_pos);
    let (local_start, local_end) = (to_local(start), to_local(end));
    let segment = local_end - local_start;
    let length_sq = segment.length_squared();
    if length_sq > f32::EPSILON {
        let mut t = 0.5;
        for _ in 0..16 {
            let on_box = (local_start + segment * t).clamp(-half_extents, half_extents);
            t = ((on_box - local_start).dot(segment) / length_sq).clamp(0.0, 1.0);
        }
        if t > 0.01 && t < 0.99 {
            centers.push(start + (end - start) * t);
        }
    }

    let mut points = Vec::new();
    for center in centers {
        if let Some(point) =
            sphere_box(center, radius, (box_pos, box_rot), half_extents, margin)
        {
            push_distinct(&mut points, point);
        }
    }
    points
}

/// End points of a capsule's core segment in world space
fn capsule_segment((position, rotation): (Vec3, Quat), height: f32) -> (Vec3, Vec3) {
    let half = rotation * Vec3::new(0.0, height * 0.5, 0.0);
    (position - half, position + half)
}

fn closest_on_segment(point: Vec3, start: Vec3, end: Vec3) -> Vec3 {
    let segment = end - start;
    let length_sq = segment.length_squared();
    if length_sq < f32::EPSILON {
        return start;
    }
    let t = ((point - start).dot(segment) / length_sq).clamp(0.0, 1.0);
    start + segment * t
}

/// Closest points between segments `p1..q1` and `p2..q2`
fn closest_between_segments(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    if a < f32::EPSILON && e < f32::EPSILON {
        return (p1, p2);
    }
    let (s, t) = if a < f32::EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e < f32::EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let mut s = if denom.abs() > f32::EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };
    (p1 + d1 * s, p2 + d2 * t)
}

/// Generic convex pair through GJK/EPA.
///
/// B is rounded by `margin` so shapes that touch or nearly touch still
/// produce a contact. Once a contact normal is known, the supports of both
/// shapes along directions leaning off that normal become candidate points.
/// Each candidate is measured against the other shape with a ray along the
/// normal and joins the manifold when it lies within `margin`. A flat face
/// resting on another gets several points instead of one that wanders.
fn convex_convex(a: &Placed<'_>, b: &Placed<'_>, margin: f32) -> Vec<ContactPoint> {
    let rounded = Placed { margin, ..*b };
    let Some(hit) = gjk::penetration(a, &rounded) else {
        return Vec::new();
    };
    let normal = hit.normal;
    let mut points = vec![ContactPoint::new(
        hit.point_on_a,
        hit.point_on_b + normal * margin,
        normal,
        margin - hit.depth,
    )];

    // Rays start this far back so they begin outside the other shape
    let reach = hit.depth + 1e-3;
    let (tangent, bitangent) = create_tangent_basis(normal);
    for step in 0..8 {
        let angle = step as f32 * std::f32::consts::FRAC_PI_4;
        let lean = (tangent * angle.cos() + bitangent * angle.sin()) * MANIFOLD_TILT;

        let on_b = b.support(-normal + lean);
        if let Some(t) = a.raycast(on_b + normal * reach, -normal) {
            let separation = t - reach;
            if separation <= margin {
                let on_a = on_b + normal * (reach - t);
                push_distinct(&mut points, ContactPoint::new(on_a, on_b, normal, separation));
            }
        }

        let on_a = a.support(normal + lean);
        if let Some(t) = b.raycast(on_a - normal * reach, normal) {
            let separation = t - reach;
            if separation <= margin {
                let on_b = on_a - normal * (reach - t);
                push_distinct(&mut points, ContactPoint::new(on_a, on_b, normal, separation));
            }
        }
    }
    points
}

fn push_distinct(points: &mut Vec<ContactPoint>, contact: ContactPoint) {
    let merge_sq = MERGE_DISTANCE * MERGE_DISTANCE;
    let duplicate = points.iter().any(|existing| {
        existing.position_on_a.distance_squared(contact.position_on_a) < merge_sq
            || existing.position_on_b.distance_squared(contact.position_on_b) < merge_sq
    });
    if !duplicate {
        points.push(contact);
    }
}

/// Static mesh (A) against a convex shape (B), one triangle at a time
fn mesh_contacts(
    mesh: &TriangleMesh,
    scale: Vec3,
    (mesh_pos, mesh_rot): (Vec3, Quat),
    shape: &CollisionShape,
    (position, rotation): (Vec3, Quat),
    margin: f32,
) -> Vec<ContactPoint> {
    // Cull triangles in mesh space
    let local_pos = mesh_rot.conjugate() * (position - mesh_pos);
    let local_rot = mesh_rot.conjugate() * rotation;
    let reach = shape.world_aabb(local_pos, local_rot).expanded(margin);

    let nearby = mesh
        .scaled_triangles(scale)
        .filter(|triangle| triangle.aabb().overlaps(&reach));

    if let CollisionShape::Sphere { radius } = shape {
        // A sphere touches the mesh at its single closest point
        return nearby
            .filter_map(|triangle| {
                sphere_triangle(&triangle, (mesh_pos, mesh_rot), position, *radius, margin)
            })
            .min_by(|x, y| x.distance.total_cmp(&y.distance))
            .into_iter()
            .collect();
    }

    let body = placed(shape, (position, rotation));
    let mut points = Vec::new();
    for triangle in nearby {
        let face = Placed {
            shape: &triangle,
            position: mesh_pos,
            rotation: mesh_rot,
            margin: 0.0,
        };
        for contact in convex_convex(&face, &body, margin) {
            push_distinct(&mut points, contact);
        }
    }
    points
}

/// Triangle (A, in mesh space) against a sphere (B)
fn sphere_triangle(
    triangle: &Triangle,
    (mesh_pos, mesh_rot): (Vec3, Quat),
    sphere_pos: Vec3,
    radius: f32,
    margin: f32,
) -> Option<ContactPoint> {
    let center = mesh_rot.conjugate() * (sphere_pos - mesh_pos);
    let closest = triangle.closest_point(center);
    let delta = center - closest;
    let gap = delta.length();
    if gap - radius > margin {
        return None;
    }

    let local_normal = if gap > 1e-6 {
        delta / gap
    } else {
        // Center on the surface: push out along the face normal
        triangle.normal()
    };
    let normal = mesh_rot * local_normal;
    Some(ContactPoint::new(
        mesh_pos + mesh_rot * closest,
        sphere_pos - normal * radius,
        normal,
        gap - radius,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARGIN: f32 = 0.04;

    fn at(position: Vec3) -> (Vec3, Quat) {
        (position, Quat::IDENTITY)
    }

    #[test]
    fn test_sphere_sphere_collision() {
        let sphere = CollisionShape::Sphere { radius: 1.0 };
        let points = generate_contacts(
            &sphere,
            at(Vec3::ZERO),
            &sphere,
            at(Vec3::new(1.5, 0.0, 0.0)),
            MARGIN,
        );

        assert_eq!(points.len(), 1);
        assert!((points[0].distance + 0.5).abs() < 1e-6);
        assert!((points[0].normal - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_sphere_box_collision() {
        let sphere = CollisionShape::Sphere { radius: 1.0 };
        let cube = CollisionShape::Box {
            half_extents: Vec3::ONE,
        };
        let points = generate_contacts(
            &sphere,
            at(Vec3::new(1.5, 0.0, 0.0)),
            &cube,
            at(Vec3::ZERO),
            MARGIN,
        );

        assert_eq!(points.len(), 1);
        assert!((points[0].distance + 0.5).abs() < 1e-6);
        // Sphere is A and sits on the +X side of the box
        assert!((points[0].normal - Vec3::NEG_X).length() < 1e-6);

        let flipped = generate_contacts(
            &cube,
            at(Vec3::ZERO),
            &sphere,
            at(Vec3::new(1.5, 0.0, 0.0)),
            MARGIN,
        );
        assert!((flipped[0].normal - Vec3::X).length() < 1e-6);
    }

    #[test]
    fn test_box_resting_on_box_has_four_points() {
        let ground = CollisionShape::Box {
            half_extents: Vec3::new(5.0, 0.5, 5.0),
        };
        let crate_box = CollisionShape::Box {
            half_extents: Vec3::splat(0.5),
        };
        let points = generate_contacts(
            &ground,
            at(Vec3::ZERO),
            &crate_box,
            at(Vec3::new(0.0, 0.99, 0.0)),
            MARGIN,
        );

        assert_eq!(points.len(), 4, "expected one point per bottom corner");
        for point in &points {
            assert!((point.normal - Vec3::Y).length() < 1e-5);
            assert!((point.distance + 0.01).abs() < 1e-4, "distance {}", point.distance);
        }
    }

    #[test]
    fn test_near_contact_within_margin() {
        let sphere = CollisionShape::Sphere { radius: 0.5 };
        let points = generate_contacts(
            &sphere,
            at(Vec3::ZERO),
            &sphere,
            at(Vec3::new(1.02, 0.0, 0.0)),
            MARGIN,
        );
        assert_eq!(points.len(), 1);
        assert!(points[0].distance > 0.0);
    }

    #[test]
    fn test_capsule_capsule_parallel() {
        let capsule = CollisionShape::Capsule {
            radius: 0.5,
            height: 2.0,
        };
        let points = generate_contacts(
            &capsule,
            at(Vec3::ZERO),
            &capsule,
            at(Vec3::new(0.8, 0.5, 0.0)),
            MARGIN,
        );
        assert_eq!(points.len(), 1);
        assert!((points[0].distance + 0.2).abs() < 1e-5);
        assert!((points[0].normal - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_no_collision() {
        let sphere = CollisionShape::Sphere { radius: 1.0 };
        let cone = CollisionShape::Cone {
            radius: 1.0,
            height: 2.0,
        };
        assert!(generate_contacts(
            &sphere,
            at(Vec3::ZERO),
            &sphere,
            at(Vec3::new(10.0, 0.0, 0.0)),
            MARGIN,
        )
        .is_empty());
        assert!(generate_contacts(
            &cone,
            at(Vec3::ZERO),
            &sphere,
            at(Vec3::new(10.0, 0.0, 0.0)),
            MARGIN,
        )
        .is_empty());
    }

    fn floor() -> CollisionShape {
        CollisionShape::Box {
            half_extents: Vec3::new(5.0, 0.5, 5.0),
        }
    }

    fn mesh_floor() -> CollisionShape {
        let corners = [
            Vec3::new(-2.0, 0.0, -2.0),
            Vec3::new(2.0, 0.0, -2.0),
            Vec3::new(2.0, 0.0, 2.0),
            Vec3::new(-2.0, 0.0, 2.0),
        ];
        let mesh = TriangleMesh::from_triangles(vec![
            [corners[0], corners[2], corners[1]],
            [corners[0], corners[3], corners[2]],
        ]);
        CollisionShape::TriangleMesh {
            mesh: std::sync::Arc::new(mesh),
            scale: Vec3::ONE,
        }
    }

    #[test]
    fn test_standing_capsule_keeps_contact_on_box() {
        let capsule = CollisionShape::Capsule {
            radius: 0.5,
            height: 1.0,
        };
        // Bottom cap sits exactly on the top face at y = 0.5, then slightly in
        for (center_y, expected) in [(1.5, 0.0), (1.495, -0.005)] {
            let points = generate_contacts(
                &floor(),
                at(Vec3::ZERO),
                &capsule,
                at(Vec3::new(0.0, center_y, 0.0)),
                MARGIN,
            );
            assert_eq!(points.len(), 1, "at y {center_y}");
            assert!((points[0].distance - expected).abs() < 1e-5);
            assert!((points[0].normal - Vec3::Y).length() < 1e-5);
        }
    }

    #[test]
    fn test_lying_capsule_on_box() {
        let capsule = CollisionShape::Capsule {
            radius: 0.5,
            height: 2.0,
        };
        let lying = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let points = generate_contacts(
            &capsule,
            (Vec3::new(0.0, 0.99, 0.0), lying),
            &floor(),
            at(Vec3::ZERO),
            MARGIN,
        );
        assert!(points.len() >= 2, "both caps touch, got {}", points.len());
        for point in &points {
            assert!((point.distance + 0.01).abs() < 1e-4, "distance {}", point.distance);
            assert!((point.normal - Vec3::NEG_Y).length() < 1e-4);
        }
    }

    #[test]
    fn test_cylinder_on_box_has_rim_points() {
        let cylinder = CollisionShape::Cylinder {
            half_extents: Vec3::new(0.5, 1.0, 0.5),
        };
        let points = generate_contacts(
            &floor(),
            at(Vec3::ZERO),
            &cylinder,
            at(Vec3::new(0.0, 1.5, 0.0)),
            MARGIN,
        );
        assert!(points.len() >= 4, "got {} points", points.len());
        for point in &points {
            assert!(point.distance.abs() < 2e-3, "distance {}", point.distance);
            assert!(point.normal.y > 0.99, "normal {:?}", point.normal);
        }
    }

    #[test]
    fn test_cone_base_on_box() {
        let cone = CollisionShape::Cone {
            radius: 0.5,
            height: 2.0,
        };
        let points = generate_contacts(
            &cone,
            at(Vec3::new(0.0, 1.49, 0.0)),
            &floor(),
            at(Vec3::ZERO),
            MARGIN,
        );
        assert!(points.len() >= 4, "got {} points", points.len());
        for point in &points {
            assert!((point.distance + 0.01).abs() < 2e-3, "distance {}", point.distance);
            assert!(point.normal.y < -0.99, "normal {:?}", point.normal);
        }
    }

    #[test]
    fn test_sphere_on_mesh() {
        let sphere = CollisionShape::Sphere { radius: 0.5 };
        let points = generate_contacts(
            &mesh_floor(),
            at(Vec3::ZERO),
            &sphere,
            at(Vec3::new(0.3, 0.49, 0.2)),
            MARGIN,
        );
        assert_eq!(points.len(), 1);
        assert!((points[0].distance + 0.01).abs() < 1e-5);
        assert!((points[0].normal - Vec3::Y).length() < 1e-5);

        // Right on the shared diagonal both triangles report the same point
        let flipped = generate_contacts(
            &sphere,
            at(Vec3::new(0.5, 0.49, 0.5)),
            &mesh_floor(),
            at(Vec3::ZERO),
            MARGIN,
        );
        assert_eq!(flipped.len(), 1);
        assert!((flipped[0].normal - Vec3::NEG_Y).length() < 1e-5);

        let far = generate_contacts(
            &mesh_floor(),
            at(Vec3::ZERO),
            &sphere,
            at(Vec3::new(3.0, 0.49, 0.0)),
            MARGIN,
        );
        assert!(far.is_empty());
    }

    #[test]
    fn test_box_on_mesh() {
        let cube = CollisionShape::Box {
            half_extents: Vec3::splat(0.5),
        };
        let points = generate_contacts(
            &mesh_floor(),
            at(Vec3::ZERO),
            &cube,
            at(Vec3::new(0.2, 0.49, -0.1)),
            MARGIN,
        );
        assert!(points.len() >= 4, "got {} points", points.len());
        for point in &points {
            assert!((point.distance + 0.01).abs() < 2e-3, "distance {}", point.distance);
            assert!(point.normal.y > 0.99, "normal {:?}", point.normal);
        }
        assert!(generate_contacts(&mesh_floor(), at(Vec3::ZERO), &mesh_floor(), at(Vec3::Y), MARGIN)
            .is_empty());
    }
}
