//! Rigid body simulation behind the collision world
//!
//! One fixed step runs, in order: velocity integration, broad phase, narrow
//! phase, the contact solver, position integration and force clearing. The
//! manifolds found by the narrow phase are kept until the next step so the
//! collision world can turn them into contact events.
//!
//! Penetration is resolved with split impulses: positional correction goes
//! into the one-step push/turn velocities and never into the real velocity.

use crate::config::PhysicsConfig;
use crate::physics::collision::{
    broad_phase::{sweep_and_prune, BroadPhaseEntry},
    create_tangent_basis,
    narrow_phase::generate_contacts,
    ContactPoint,
};
use crate::physics::components::{BodyId, Collider, CollisionShape, RigidBody};
use glam::{Mat3, Quat, Vec3};
use std::collections::HashMap;
use tracing::trace;

/// Closing speed below which restitution is ignored
const RESTITUTION_THRESHOLD: f32 = 0.2;

/// Contact points found between two bodies during the last step
#[derive(Debug, Clone)]
pub struct ContactManifold {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Normals point from `body_a` to `body_b`
    pub points: Vec<ContactPoint>,
}

/// Arena of simulated bodies plus the manifolds of the last step
#[derive(Default)]
pub struct DynamicsWorld {
    bodies: hecs::World,
    manifolds: Vec<ContactManifold>,
}

impl DynamicsWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, body: RigidBody, collider: Collider) -> BodyId {
        BodyId(self.bodies.spawn((body, collider)))
    }

    /// Remove a body and every manifold that references it
    pub fn remove(&mut self, id: BodyId) -> Option<(RigidBody, Collider)> {
        let removed = self.bodies.remove::<(RigidBody, Collider)>(id.0).ok()?;
        let _ = self.bodies.despawn(id.0);
        self.manifolds
            .retain(|manifold| manifold.body_a != id && manifold.body_b != id);
        Some(removed)
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.bodies.contains(id.0)
    }

    pub fn len(&self) -> usize {
        self.bodies.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn body(&self, id: BodyId) -> Option<hecs::Ref<'_, RigidBody>> {
        self.bodies.get::<&RigidBody>(id.0).ok()
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.query_one_mut::<&mut RigidBody>(id.0).ok()
    }

    pub fn collider(&self, id: BodyId) -> Option<hecs::Ref<'_, Collider>> {
        self.bodies.get::<&Collider>(id.0).ok()
    }

    pub fn collider_mut(&mut self, id: BodyId) -> Option<&mut Collider> {
        self.bodies.query_one_mut::<&mut Collider>(id.0).ok()
    }

    /// Ids of every body, in arena order
    pub fn body_ids(&self) -> Vec<BodyId> {
        self.bodies.iter().map(|entity| BodyId(entity.entity())).collect()
    }

    pub(crate) fn arena(&self) -> &hecs::World {
        &self.bodies
    }

    pub(crate) fn arena_mut(&mut self) -> &mut hecs::World {
        &mut self.bodies
    }

    /// Manifolds produced by the most recent step
    pub fn manifolds(&self) -> &[ContactManifold] {
        &self.manifolds
    }

    /// Drop every body and manifold
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.manifolds.clear();
    }

    /// Advance the simulation by one fixed step
    pub fn step(&mut self, dt: f32, config: &PhysicsConfig) {
        if dt <= 0.0 {
            return;
        }

        self.integrate_velocities(dt);
        self.detect_collisions(config.contact_margin);
        self.solve_contacts(dt, config);
        self.integrate_positions(dt);

        trace!(
            bodies = self.len(),
            manifolds = self.manifolds.len(),
            "physics step"
        );
    }

    fn integrate_velocities(&mut self, dt: f32) {
        for (_, body) in self.bodies.query_mut::<&mut RigidBody>() {
            if !body.is_simulated() || !body.is_dynamic() {
                continue;
            }

            let acceleration = body.gravity * body.linear_factor + body.total_force * body.inverse_mass;
            body.linear_velocity += acceleration * dt;
            let angular_acceleration = body.inverse_inertia_world() * body.total_torque;
            body.angular_velocity += angular_acceleration * dt;

            body.linear_velocity *= (1.0 - body.linear_damping).powf(dt);
            body.angular_velocity *= (1.0 - body.angular_damping).powf(dt);
        }
    }

    fn detect_collisions(&mut self, margin: f32) {
        struct Proxy {
            id: BodyId,
            shape: CollisionShape,
            pose: (Vec3, Quat),
            collider: Collider,
            dynamic: bool,
        }

        let proxies: Vec<Proxy> = self
            .bodies
            .query::<(&RigidBody, &Collider)>()
            .iter()
            .filter(|(_, (body, _))| body.is_simulated())
            .map(|(entity, (body, collider))| Proxy {
                id: BodyId(entity),
                shape: collider.scaled_shape(),
                pose: (body.position, body.rotation),
                collider: collider.clone(),
                dynamic: body.is_dynamic(),
            })
            .collect();

        let entries: Vec<BroadPhaseEntry> = proxies
            .iter()
            .map(|proxy| BroadPhaseEntry {
                body: proxy.id,
                aabb: proxy.shape.world_aabb(proxy.pose.0, proxy.pose.1).expanded(margin),
            })
            .collect();

        let pairs = sweep_and_prune(&entries);
        trace!(candidates = pairs.len(), "broad phase");

        self.manifolds.clear();
        for (i, j) in pairs {
            let (a, b) = (&proxies[i], &proxies[j]);
            if !a.dynamic && !b.dynamic {
                continue;
            }
            if !a.collider.accepts(&b.collider) {
                continue;
            }

            let points = generate_contacts(&a.shape, a.pose, &b.shape, b.pose, margin);
            if !points.is_empty() {
                self.manifolds.push(ContactManifold {
                    body_a: a.id,
                    body_b: b.id,
                    points,
                });
            }
        }
    }

    fn solve_contacts(&mut self, dt: f32, config: &PhysicsConfig) {
        let mut solver_bodies = Vec::new();
        let mut index_of = HashMap::new();
        for (entity, body) in self.bodies.query_mut::<&RigidBody>() {
            index_of.insert(BodyId(entity), solver_bodies.len());
            solver_bodies.push(SolverBody::from_body(BodyId(entity), body));
        }

        let mut constraints = Vec::new();
        for manifold in &self.manifolds {
            let (Some(&a), Some(&b)) = (index_of.get(&manifold.body_a), index_of.get(&manifold.body_b))
            else {
                continue;
            };
            if !solver_bodies[a].responds || !solver_bodies[b].responds {
                continue;
            }
            for point in &manifold.points {
                constraints.push(ContactConstraint::new(
                    a,
                    b,
                    point,
                    &solver_bodies,
                    dt,
                    config,
                ));
            }
        }

        if constraints.is_empty() {
            return;
        }

        for _ in 0..config.solver_iterations {
            for constraint in &mut constraints {
                constraint.solve_velocity(&mut solver_bodies);
            }
        }
        for _ in 0..config.solver_iterations {
            for constraint in &mut constraints {
                constraint.solve_position(&mut solver_bodies);
            }
        }

        for solver_body in solver_bodies.iter().filter(|b| b.inverse_mass > 0.0) {
            if let Ok(body) = self.bodies.query_one_mut::<&mut RigidBody>(solver_body.id.0) {
                body.linear_velocity = solver_body.linear_velocity;
                body.angular_velocity = solver_body.angular_velocity;
                body.push_velocity = solver_body.push_velocity;
                body.turn_velocity = solver_body.turn_velocity;
            }
        }
    }

    fn integrate_positions(&mut self, dt: f32) {
        for (_, body) in self.bodies.query_mut::<&mut RigidBody>() {
            if body.is_simulated() && body.is_dynamic() {
                let velocity = body.linear_velocity + body.push_velocity;
                let spin = body.angular_velocity + body.turn_velocity;
                body.position += velocity * dt;
                if spin.length_squared() > 0.0 {
                    body.rotation = (Quat::from_scaled_axis(spin * dt) * body.rotation).normalize();
                }
            }
            body.push_velocity = Vec3::ZERO;
            body.turn_velocity = Vec3::ZERO;
            body.clear_forces();
        }
    }
}

/// Copy of the body state the solver works on
struct SolverBody {
    id: BodyId,
    responds: bool,
    inverse_mass: f32,
    inverse_inertia: Mat3,
    position: Vec3,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    push_velocity: Vec3,
    turn_velocity: Vec3,
    linear_factor: Vec3,
    angular_factor: Vec3,
    friction: f32,
    restitution: f32,
}

impl SolverBody {
    fn from_body(id: BodyId, body: &RigidBody) -> Self {
        // Static, kinematic and disabled bodies act as infinite mass
        let movable = body.is_simulated() && body.is_dynamic();
        Self {
            id,
            responds: body.has_contact_response(),
            inverse_mass: if movable { body.inverse_mass } else { 0.0 },
            inverse_inertia: if movable {
                body.inverse_inertia_world()
            } else {
                Mat3::ZERO
            },
            position: body.position,
            linear_velocity: body.linear_velocity,
            angular_velocity: body.angular_velocity,
            push_velocity: body.push_velocity,
            turn_velocity: body.turn_velocity,
            linear_factor: body.linear_factor,
            angular_factor: body.angular_factor,
            friction: body.friction,
            restitution: body.restitution,
        }
    }

    fn velocity_at(&self, arm: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(arm)
    }

    fn push_at(&self, arm: Vec3) -> Vec3 {
        self.push_velocity + self.turn_velocity.cross(arm)
    }

    fn apply_impulse(&mut self, impulse: Vec3, arm: Vec3) {
        self.linear_velocity += impulse * self.inverse_mass * self.linear_factor;
        self.angular_velocity += self.inverse_inertia * arm.cross(impulse) * self.angular_factor;
    }

    fn apply_push(&mut self, impulse: Vec3, arm: Vec3) {
        self.push_velocity += impulse * self.inverse_mass * self.linear_factor;
        self.turn_velocity += self.inverse_inertia * arm.cross(impulse) * self.angular_factor;
    }

    /// Inverse effective mass along `direction` at `arm`
    fn inverse_mass_along(&self, direction: Vec3, arm: Vec3) -> f32 {
        let angular = (self.inverse_inertia * arm.cross(direction)).cross(arm);
        self.inverse_mass + direction.dot(angular)
    }
}

struct ContactConstraint {
    a: usize,
    b: usize,
    normal: Vec3,
    tangents: [Vec3; 2],
    arm_a: Vec3,
    arm_b: Vec3,
    normal_mass: f32,
    tangent_mass: [f32; 2],
    /// Lowest normal relative velocity the contact allows
    target_velocity: f32,
    /// Separating push velocity wanted to remove penetration
    push_target: f32,
    friction: f32,
    normal_impulse: f32,
    tangent_impulse: [f32; 2],
    push_impulse: f32,
}

impl ContactConstraint {
    fn new(
        a: usize,
        b: usize,
        point: &ContactPoint,
        bodies: &[SolverBody],
        dt: f32,
        config: &PhysicsConfig,
    ) -> Self {
        let (body_a, body_b) = (&bodies[a], &bodies[b]);
        let normal = point.normal;
        let (t1, t2) = create_tangent_basis(normal);
        let arm_a = point.position_on_a - body_a.position;
        let arm_b = point.position_on_b - body_b.position;

        let mass = |direction: Vec3| {
            let k = body_a.inverse_mass_along(direction, arm_a)
                + body_b.inverse_mass_along(direction, arm_b);
            if k > 0.0 {
                1.0 / k
            } else {
                0.0
            }
        };

        let approach = (body_b.velocity_at(arm_b) - body_a.velocity_at(arm_a)).dot(normal);
        // Let the bodies close until they overlap by the slop, so a resting
        // contact stays slightly penetrating instead of hovering at zero
        let gap = point.distance + config.penetration_slop;
        let mut target_velocity = if gap > 0.0 { -gap / dt } else { 0.0 };
        let restitution = body_a.restitution * body_b.restitution;
        let closes_this_step = point.distance + approach * dt <= 0.0;
        if restitution > 0.0 && approach < -RESTITUTION_THRESHOLD && closes_this_step {
            target_velocity = target_velocity.max(-restitution * approach);
        }

        let penetration = -point.distance - config.penetration_slop;
        let push_target = if penetration > 0.0 {
            config.position_correction * penetration / dt
        } else {
            0.0
        };

        Self {
            a,
            b,
            normal,
            tangents: [t1, t2],
            arm_a,
            arm_b,
            normal_mass: mass(normal),
            tangent_mass: [mass(t1), mass(t2)],
            target_velocity,
            push_target,
            friction: body_a.friction * body_b.friction,
            normal_impulse: 0.0,
            tangent_impulse: [0.0; 2],
            push_impulse: 0.0,
        }
    }

    fn apply(&self, bodies: &mut [SolverBody], impulse: Vec3) {
        bodies[self.a].apply_impulse(-impulse, self.arm_a);
        bodies[self.b].apply_impulse(impulse, self.arm_b);
    }

    fn solve_velocity(&mut self, bodies: &mut [SolverBody]) {
        let relative =
            bodies[self.b].velocity_at(self.arm_b) - bodies[self.a].velocity_at(self.arm_a);
        let normal_speed = relative.dot(self.normal);
        let lambda = (self.target_velocity - normal_speed) * self.normal_mass;
        let accumulated = (self.normal_impulse + lambda).max(0.0);
        let delta = accumulated - self.normal_impulse;
        self.normal_impulse = accumulated;
        self.apply(bodies, self.normal * delta);

        let limit = self.friction * self.normal_impulse;
        for axis in 0..2 {
            let tangent = self.tangents[axis];
            let relative =
                bodies[self.b].velocity_at(self.arm_b) - bodies[self.a].velocity_at(self.arm_a);
            let lambda = -relative.dot(tangent) * self.tangent_mass[axis];
            let accumulated = (self.tangent_impulse[axis] + lambda).clamp(-limit, limit);
            let delta = accumulated - self.tangent_impulse[axis];
            self.tangent_impulse[axis] = accumulated;
            self.apply(bodies, tangent * delta);
        }
    }

    fn solve_position(&mut self, bodies: &mut [SolverBody]) {
        if self.push_target <= 0.0 {
            return;
        }
        let relative = bodies[self.b].push_at(self.arm_b) - bodies[self.a].push_at(self.arm_a);
        let lambda = (self.push_target - relative.dot(self.normal)) * self.normal_mass;
        let accumulated = (self.push_impulse + lambda).max(0.0);
        let delta = accumulated - self.push_impulse;
        self.push_impulse = accumulated;

        let impulse = self.normal * delta;
        bodies[self.a].apply_push(-impulse, self.arm_a);
        bodies[self.b].apply_push(impulse, self.arm_b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::game_object::EntityId;
    use crate::core::math::Vector3;
    use crate::physics::components::layers;

    fn spawn(
        world: &mut DynamicsWorld,
        shape: CollisionShape,
        mass: f32,
        position: Vec3,
        gravity: Vec3,
    ) -> BodyId {
        let inertia = if mass != 0.0 {
            shape.calculate_local_inertia(mass)
        } else {
            Vec3::ZERO
        };
        let mut body = RigidBody::new(EntityId(0), mass, inertia, position, Quat::IDENTITY);
        body.gravity = gravity;
        let collider = Collider::new(shape, Vector3::ZERO, layers::DEFAULT, layers::ALL);
        world.insert(body, collider)
    }

    fn floor(world: &mut DynamicsWorld) -> BodyId {
        let shape = CollisionShape::Box {
            half_extents: Vec3::new(10.0, 0.5, 10.0),
        };
        spawn(world, shape, 0.0, Vec3::new(0.0, -0.5, 0.0), Vec3::ZERO)
    }

    #[test]
    fn test_free_fall() {
        let mut world = DynamicsWorld::new();
        let gravity = Vec3::new(0.0, -10.0, 0.0);
        let ball = spawn(
            &mut world,
            CollisionShape::Sphere { radius: 0.5 },
            1.0,
            Vec3::new(0.0, 10.0, 0.0),
            gravity,
        );
        let config = PhysicsConfig::default();
        for _ in 0..10 {
            world.step(0.02, &config);
        }
        let body = world.body(ball).unwrap();
        assert!((body.linear_velocity.y + 2.0).abs() < 1e-4);
        assert!(body.position.y < 10.0);
    }

    #[test]
    fn test_sphere_rests_on_floor() {
        let mut world = DynamicsWorld::new();
        floor(&mut world);
        let ball = spawn(
            &mut world,
            CollisionShape::Sphere { radius: 0.5 },
            1.0,
            Vec3::new(0.0, 2.0, 0.0),
            Vec3::new(0.0, -9.81, 0.0),
        );
        let config = PhysicsConfig::default();
        for _ in 0..250 {
            world.step(0.02, &config);
        }
        let body = world.body(ball).unwrap();
        assert!(
            (body.position.y - 0.5).abs() < 0.05,
            "sphere should rest on the floor, got y = {}",
            body.position.y
        );
        assert!(body.linear_velocity.length() < 0.1);
    }

    #[test]
    fn test_resting_contact_settles_inside_slop() {
        let mut world = DynamicsWorld::new();
        floor(&mut world);
        spawn(
            &mut world,
            CollisionShape::Sphere { radius: 0.5 },
            1.0,
            Vec3::new(0.0, 0.6, 0.0),
            Vec3::new(0.0, -9.81, 0.0),
        );
        let config = PhysicsConfig::default();
        for step in 0..200 {
            world.step(1.0 / 60.0, &config);
            if step < 60 {
                continue;
            }
            let manifolds = world.manifolds();
            assert_eq!(manifolds.len(), 1, "contact lost at step {step}");
            for point in &manifolds[0].points {
                assert!(
                    point.distance < 0.0 && point.distance > -4.0 * config.penetration_slop,
                    "step {step}: distance {}",
                    point.distance
                );
            }
        }
    }

    #[test]
    fn test_box_stack_does_not_sink() {
        let mut world = DynamicsWorld::new();
        floor(&mut world);
        let crate_shape = CollisionShape::Box {
            half_extents: Vec3::splat(0.5),
        };
        let gravity = Vec3::new(0.0, -9.81, 0.0);
        let lower = spawn(&mut world, crate_shape.clone(), 1.0, Vec3::new(0.0, 0.5, 0.0), gravity);
        let upper = spawn(&mut world, crate_shape, 1.0, Vec3::new(0.0, 1.5, 0.0), gravity);
        let config = PhysicsConfig::default();
        for _ in 0..150 {
            world.step(0.02, &config);
        }
        let lower_y = world.body(lower).unwrap().position.y;
        let upper_y = world.body(upper).unwrap().position.y;
        assert!((lower_y - 0.5).abs() < 0.05, "lower crate at {lower_y}");
        assert!((upper_y - 1.5).abs() < 0.1, "upper crate at {upper_y}");
    }

    #[test]
    fn test_trigger_passes_through() {
        let mut world = DynamicsWorld::new();
        floor(&mut world);
        let ghost = spawn(
            &mut world,
            CollisionShape::Sphere { radius: 0.5 },
            1.0,
            Vec3::new(0.0, 0.4, 0.0),
            Vec3::new(0.0, -10.0, 0.0),
        );
        world.body_mut(ghost).unwrap().set_trigger(true);
        let config = PhysicsConfig::default();
        for _ in 0..10 {
            world.step(0.02, &config);
        }
        assert!(world.body(ghost).unwrap().position.y < 0.0);
    }

    #[test]
    fn test_static_pairs_are_skipped() {
        let mut world = DynamicsWorld::new();
        let shape = CollisionShape::Box {
            half_extents: Vec3::ONE,
        };
        spawn(&mut world, shape.clone(), 0.0, Vec3::ZERO, Vec3::ZERO);
        spawn(&mut world, shape, 0.0, Vec3::new(0.5, 0.0, 0.0), Vec3::ZERO);
        world.step(0.02, &PhysicsConfig::default());
        assert!(world.manifolds().is_empty());
    }

    #[test]
    fn test_mask_filters_pairs() {
        let mut world = DynamicsWorld::new();
        let shape = CollisionShape::Sphere { radius: 1.0 };
        let a = spawn(&mut world, shape.clone(), 1.0, Vec3::ZERO, Vec3::ZERO);
        spawn(&mut world, shape, 1.0, Vec3::new(0.5, 0.0, 0.0), Vec3::ZERO);
        world.collider_mut(a).unwrap().mask = layers::NONE;
        world.step(0.02, &PhysicsConfig::default());
        assert!(world.manifolds().is_empty());
    }

    #[test]
    fn test_remove_purges_manifolds() {
        let mut world = DynamicsWorld::new();
        let shape = CollisionShape::Sphere { radius: 1.0 };
        let a = spawn(&mut world, shape.clone(), 1.0, Vec3::ZERO, Vec3::ZERO);
        spawn(&mut world, shape, 1.0, Vec3::new(0.5, 0.0, 0.0), Vec3::ZERO);
        world.step(0.02, &PhysicsConfig::default());
        assert_eq!(world.manifolds().len(), 1);

        assert!(world.remove(a).is_some());
        assert!(world.manifolds().is_empty());
        assert!(!world.contains(a));
        assert!(world.remove(a).is_none());
    }

    #[test]
    fn test_push_is_applied_once() {
        let mut world = DynamicsWorld::new();
        let ball = spawn(
            &mut world,
            CollisionShape::Sphere { radius: 0.5 },
            1.0,
            Vec3::ZERO,
            Vec3::ZERO,
        );
        world.body_mut(ball).unwrap().add_impulse(
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::ZERO,
            crate::physics::components::ImpulseMode::Push,
        );
        let config = PhysicsConfig::default();
        world.step(0.02, &config);
        let after_one = world.body(ball).unwrap().position.x;
        world.step(0.02, &config);
        let after_two = world.body(ball).unwrap().position.x;
        assert!((after_one - 0.02).abs() < 1e-6);
        assert_eq!(after_one, after_two);
        assert_eq!(world.body(ball).unwrap().linear_velocity, Vec3::ZERO);
    }
}
