//! GJK intersection test and EPA penetration depth for convex shapes
//!
//! Used by the narrow phase for every shape pair without an analytic routine
//! (cylinders, cones and mesh triangles). Both algorithms work on the
//! Minkowski difference `A - B` through support mapping only. A placed shape
//! may carry a margin, which rounds it by that radius so that resting and
//! nearly touching shapes still report a contact.

use super::mesh::Triangle;
use super::shapes::Ray;
use crate::physics::components::CollisionShape;
use glam::{Quat, Vec3};

const MAX_GJK_ITERATIONS: usize = 64;
const MAX_EPA_ITERATIONS: usize = 64;
const EPA_TOLERANCE: f32 = 1e-4;

/// Convex geometry described by its local support function
pub trait SupportMap {
    fn local_support(&self, direction: Vec3) -> Vec3;

    /// Distance along a local-space ray to the surface
    fn local_raycast(&self, ray: &Ray) -> Option<f32>;
}

impl SupportMap for CollisionShape {
    fn local_support(&self, direction: Vec3) -> Vec3 {
        self.support(direction)
    }

    fn local_raycast(&self, ray: &Ray) -> Option<f32> {
        self.raycast(ray, f32::MAX).map(|hit| hit.distance)
    }
}

impl SupportMap for Triangle {
    fn local_support(&self, direction: Vec3) -> Vec3 {
        self.support(direction)
    }

    fn local_raycast(&self, ray: &Ray) -> Option<f32> {
        self.raycast(ray).map(|hit| hit.distance)
    }
}

/// A convex shape placed in the world, rounded by `margin`
#[derive(Clone, Copy)]
pub struct Placed<'a> {
    pub shape: &'a dyn SupportMap,
    pub position: Vec3,
    pub rotation: Quat,
    pub margin: f32,
}

impl Placed<'_> {
    pub fn support(&self, direction: Vec3) -> Vec3 {
        let local = self.shape.local_support(self.rotation.inverse() * direction);
        self.position + self.rotation * local + direction.normalize_or_zero() * self.margin
    }

    /// Distance from `origin` along unit `direction` to the core shape
    pub fn raycast(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let inverse = self.rotation.inverse();
        let ray = Ray {
            origin: inverse * (origin - self.position),
            direction: inverse * direction,
        };
        self.shape.local_raycast(&ray)
    }
}

/// Penetration of A into B
#[derive(Debug, Clone, Copy)]
pub struct Penetration {
    /// Direction from A to B along which B must move to separate
    pub normal: Vec3,
    pub depth: f32,
    pub point_on_a: Vec3,
    pub point_on_b: Vec3,
}

/// Point of the Minkowski difference together with the support points it came from
#[derive(Debug, Clone, Copy)]
struct Vertex {
    point: Vec3,
    on_a: Vec3,
    on_b: Vec3,
}

fn minkowski_support(a: &Placed<'_>, b: &Placed<'_>, direction: Vec3) -> Vertex {
    let on_a = a.support(direction);
    let on_b = b.support(-direction);
    Vertex {
        point: on_a - on_b,
        on_a,
        on_b,
    }
}

/// Penetration depth and normal, or `None` when the shapes do not overlap
pub fn penetration(a: &Placed<'_>, b: &Placed<'_>) -> Option<Penetration> {
    let simplex = intersect(a, b)?;
    expand_polytope(a, b, simplex)
}

fn triple(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    a.cross(b).cross(c)
}

/// GJK boolean test. Returns the enclosing tetrahedron on overlap.
fn intersect(a: &Placed<'_>, b: &Placed<'_>) -> Option<[Vertex; 4]> {
    let mut direction = b.position - a.position;
    if direction.length_squared() < f32::EPSILON {
        direction = Vec3::X;
    }

    let mut simplex = vec![minkowski_support(a, b, direction)];
    direction = -simplex[0].point;

    for _ in 0..MAX_GJK_ITERATIONS {
        if direction.length_squared() < f32::EPSILON {
            // Origin lies on the simplex boundary: touching, not penetrating
            return None;
        }
        let vertex = minkowski_support(a, b, direction);
        if vertex.point.dot(direction) < 0.0 {
            return None;
        }
        simplex.push(vertex);
        if evolve_simplex(&mut simplex, &mut direction) {
            return Some([simplex[0], simplex[1], simplex[2], simplex[3]]);
        }
    }
    None
}

/// Reduce the simplex to the feature nearest the origin; the newest vertex is last
fn evolve_simplex(simplex: &mut Vec<Vertex>, direction: &mut Vec3) -> bool {
    match simplex.len() {
        2 => line_case(simplex, direction),
        3 => triangle_case(simplex, direction),
        4 => tetrahedron_case(simplex, direction),
        _ => false,
    }
}

fn line_case(simplex: &mut Vec<Vertex>, direction: &mut Vec3) -> bool {
    let (b, a) = (simplex[0], simplex[1]);
    let ab = b.point - a.point;
    let ao = -a.point;
    if ab.dot(ao) > 0.0 {
        *direction = triple(ab, ao, ab);
    } else {
        *simplex = vec![a];
        *direction = ao;
    }
    false
}

fn triangle_case(simplex: &mut Vec<Vertex>, direction: &mut Vec3) -> bool {
    let (c, b, a) = (simplex[0], simplex[1], simplex[2]);
    let ab = b.point - a.point;
    let ac = c.point - a.point;
    let ao = -a.point;
    let abc = ab.cross(ac);

    if abc.cross(ac).dot(ao) > 0.0 {
        if ac.dot(ao) > 0.0 {
            *simplex = vec![c, a];
            *direction = triple(ac, ao, ac);
        } else {
            *simplex = vec![b, a];
            return line_case(simplex, direction);
        }
    } else if ab.cross(abc).dot(ao) > 0.0 {
        *simplex = vec![b, a];
        return line_case(simplex, direction);
    } else if abc.dot(ao) > 0.0 {
        *direction = abc;
    } else {
        *simplex = vec![b, c, a];
        *direction = -abc;
    }
    false
}

fn tetrahedron_case(simplex: &mut Vec<Vertex>, direction: &mut Vec3) -> bool {
    let (d, c, b, a) = (simplex[0], simplex[1], simplex[2], simplex[3]);
    let ab = b.point - a.point;
    let ac = c.point - a.point;
    let ad = d.point - a.point;
    let ao = -a.point;

    let outward = |normal: Vec3, towards_opposite: Vec3| {
        if normal.dot(towards_opposite) > 0.0 {
            -normal
        } else {
            normal
        }
    };
    let abc = outward(ab.cross(ac), ad);
    let acd = outward(ac.cross(ad), ab);
    let adb = outward(ad.cross(ab), ac);

    if abc.dot(ao) > 0.0 {
        *simplex = vec![c, b, a];
        return triangle_case(simplex, direction);
    }
    if acd.dot(ao) > 0.0 {
        *simplex = vec![d, c, a];
        return triangle_case(simplex, direction);
    }
    if adb.dot(ao) > 0.0 {
        *simplex = vec![b, d, a];
        return triangle_case(simplex, direction);
    }
    true
}

#[derive(Debug, Clone, Copy)]
struct Face {
    indices: [usize; 3],
    normal: Vec3,
    distance: f32,
}

fn make_face(vertices: &[Vertex], i: usize, j: usize, k: usize) -> Option<Face> {
    let (a, b, c) = (vertices[i].point, vertices[j].point, vertices[k].point);
    let normal = (b - a).cross(c - a);
    if normal.length_squared() < 1e-12 {
        return None;
    }
    let normal = normal.normalize();
    let distance = normal.dot(a);
    // The origin is inside the polytope, so outward faces have positive distance
    Some(if distance < 0.0 {
        Face {
            indices: [i, k, j],
            normal: -normal,
            distance: -distance,
        }
    } else {
        Face {
            indices: [i, j, k],
            normal,
            distance,
        }
    })
}

fn add_horizon_edge(edges: &mut Vec<(usize, usize)>, from: usize, to: usize) {
    if let Some(shared) = edges.iter().position(|&(a, b)| a == to && b == from) {
        edges.swap_remove(shared);
    } else {
        edges.push((from, to));
    }
}

fn expand_polytope(
    a: &Placed<'_>,
    b: &Placed<'_>,
    simplex: [Vertex; 4],
) -> Option<Penetration> {
    let mut vertices = simplex.to_vec();
    let mut faces: Vec<Face> = [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]]
        .iter()
        .filter_map(|&[i, j, k]| make_face(&vertices, i, j, k))
        .collect();

    let mut closest = *faces
        .iter()
        .min_by(|x, y| x.distance.total_cmp(&y.distance))?;

    for _ in 0..MAX_EPA_ITERATIONS {
        let vertex = minkowski_support(a, b, closest.normal);
        if vertex.point.dot(closest.normal) - closest.distance < EPA_TOLERANCE {
            break;
        }

        let mut edges = Vec::new();
        faces.retain(|face| {
            let visible =
                face.normal.dot(vertex.point - vertices[face.indices[0]].point) > 0.0;
            if visible {
                let [i, j, k] = face.indices;
                add_horizon_edge(&mut edges, i, j);
                add_horizon_edge(&mut edges, j, k);
                add_horizon_edge(&mut edges, k, i);
            }
            !visible
        });

        vertices.push(vertex);
        let new_index = vertices.len() - 1;
        for (i, j) in edges {
            if let Some(face) = make_face(&vertices, i, j, new_index) {
                faces.push(face);
            }
        }

        match faces
            .iter()
            .min_by(|x, y| x.distance.total_cmp(&y.distance))
        {
            Some(face) => closest = *face,
            None => break,
        }
    }

    Some(build_penetration(&vertices, &closest))
}

fn build_penetration(vertices: &[Vertex], face: &Face) -> Penetration {
    let [i, j, k] = face.indices;
    let (a, b, c) = (vertices[i], vertices[j], vertices[k]);
    let (u, v, w) = barycentric(face.normal * face.distance, a.point, b.point, c.point);
    Penetration {
        normal: face.normal,
        depth: face.distance,
        point_on_a: a.on_a * u + b.on_a * v + c.on_a * w,
        point_on_b: a.on_b * u + b.on_b * v + c.on_b * w,
    }
}

/// Barycentric coordinates of `p` projected on triangle `abc`
fn barycentric(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> (f32, f32, f32) {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < 1e-12 {
        return (1.0, 0.0, 0.0);
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    (1.0 - v - w, v, w)
}
