//! Collision world: fixed-step simulation plus contact events
//!
//! The world owns every body (in the dynamics arena), steps them at a fixed
//! rate and, after each step, diffs the set of touching pairs against the
//! previous step to produce enter, stay and exit events for the owning game
//! objects.
//!
//! Callbacks run synchronously inside [`CollisionWorld::update`] and get a
//! [`CollisionContext`] with mutable access to the world. Destroying a body
//! from a callback purges its contact pairs right away, so no further event
//! references it.

use crate::config::PhysicsConfig;
use crate::core::game_object::{EntityId, GameObject, Scene};
use crate::core::math::Vector3;
use crate::core::transform::Transform;
use crate::error::PhysicsError;
use crate::physics::accumulator::PhysicsAccumulator;
use crate::physics::collision::mesh::TriangleMesh;
use crate::physics::components::{BodyId, Collider, CollisionShape, RigidBody};
use crate::physics::contacts::{dispatch_plan, ContactPair, EventKind, Role, Side, Transition};
use crate::physics::dynamics::DynamicsWorld;
use crate::physics::properties::{BodyConfig, RigidBodyDesc};
use glam::{Quat, Vec3};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Lifecycle of a collision world
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldState {
    Uninitialized,
    Running,
    Closed,
}

/// Owns the simulation and turns contacts into game object events
pub struct CollisionWorld {
    config: PhysicsConfig,
    state: WorldState,
    dynamics: DynamicsWorld,
    gravity: Vector3,
    accumulator: PhysicsAccumulator,
    /// Pairs touching at the end of the previous step
    contacts: BTreeSet<ContactPair>,
    /// Pairs found so far in the step being resolved
    pending: BTreeSet<ContactPair>,
    /// Set while `update` runs so callbacks cannot step the world again
    stepping: bool,
}

impl CollisionWorld {
    pub fn new(config: PhysicsConfig) -> Self {
        let accumulator = PhysicsAccumulator::new(config.fixed_timestep)
            .with_max_steps(config.max_steps_per_update);
        Self {
            config,
            state: WorldState::Uninitialized,
            dynamics: DynamicsWorld::new(),
            gravity: Vector3::ZERO,
            accumulator,
            contacts: BTreeSet::new(),
            pending: BTreeSet::new(),
            stepping: false,
        }
    }

    /// Start the world. Fails on an invalid config or if the world was
    /// already started or closed.
    pub fn init(&mut self) -> Result<(), PhysicsError> {
        match self.state {
            WorldState::Running => return Err(PhysicsError::AlreadyRunning),
            WorldState::Closed => return Err(PhysicsError::Closed),
            WorldState::Uninitialized => {}
        }
        self.config.validate()?;

        self.gravity = self.config.gravity;
        self.accumulator.reset();
        self.state = WorldState::Running;
        info!(
            fixed_timestep = self.config.fixed_timestep,
            gravity = %self.gravity,
            "Collision world initialized"
        );
        Ok(())
    }

    /// Destroy every body and stop the world for good
    pub fn close(&mut self) {
        if self.state != WorldState::Running {
            return;
        }
        let bodies = self.dynamics.len();
        self.contacts.clear();
        self.pending.clear();
        self.dynamics.clear();
        self.state = WorldState::Closed;
        info!(bodies, "Collision world closed");
    }

    pub fn is_running(&self) -> bool {
        self.state == WorldState::Running
    }

    pub fn state(&self) -> WorldState {
        self.state
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    pub fn fixed_timestep(&self) -> f64 {
        self.config.fixed_timestep
    }

    pub fn accumulator(&self) -> &PhysicsAccumulator {
        &self.accumulator
    }

    /// Advance the simulation by whole fixed steps and fire contact events
    /// after each of them.
    pub fn update(&mut self, delta_time: f64, scene: &mut dyn Scene) {
        if !self.is_running() {
            return;
        }
        if self.stepping {
            warn!("Ignoring collision world update from inside a collision callback");
            return;
        }

        let steps = self.accumulator.accumulate(delta_time);
        self.stepping = true;
        for _ in 0..steps {
            // A callback may have closed the world
            if !self.is_running() {
                break;
            }
            self.dynamics
                .step(self.config.fixed_timestep as f32, &self.config);
            self.resolve_contacts(scene);
        }
        self.stepping = false;
        trace!(steps, "Collision world updated");
    }

    /// Sync transforms after the frame: simulated bodies write their pose to
    /// their owner, kinematic bodies pick up their owner's pose.
    pub fn post_update(&mut self, scene: &mut dyn Scene) {
        if !self.is_running() {
            return;
        }

        for id in self.dynamics.body_ids() {
            let Some(sync) = self.transform_sync(id) else {
                continue;
            };
            let Some(object) = scene.game_object_mut(sync.owner) else {
                continue;
            };

            if sync.kinematic {
                if let Some(transform) = object.transform().copied() {
                    self.update_transform(id, &transform);
                }
            } else if sync.simulated {
                if let Some(transform) = object.transform_mut() {
                    transform.apply_sim_pose(sync.position, sync.rotation, sync.offset);
                }
            }
        }
    }

    fn transform_sync(&self, id: BodyId) -> Option<TransformSync> {
        let body = self.dynamics.body(id)?;
        let collider = self.dynamics.collider(id)?;
        Some(TransformSync {
            owner: body.owner(),
            kinematic: body.is_kinematic(),
            simulated: body.is_dynamic() && body.is_simulated(),
            position: body.position,
            rotation: body.rotation,
            offset: collider.offset,
        })
    }

    /// Move a kinematic body to its owner's transform. The kinematic flag is
    /// dropped while the pose is written and restored afterwards.
    pub fn update_transform(&mut self, id: BodyId, transform: &Transform) -> bool {
        if !self.is_running() {
            return false;
        }
        let Some(offset) = self.dynamics.collider(id).map(|collider| collider.offset) else {
            return false;
        };
        let Some(body) = self.dynamics.body_mut(id) else {
            return false;
        };
        if !body.is_kinematic() {
            return false;
        }

        let (position, rotation) = transform.sim_pose(offset);
        body.set_kinematic(false);
        body.set_pose(position, rotation);
        body.set_kinematic(true);
        true
    }

    /// Create a body for `owner` sized from `config.dimensions` times the
    /// owner's scale. Returns `None` when the world is not running.
    pub fn configure(
        &mut self,
        owner: EntityId,
        transform: &Transform,
        config: &BodyConfig,
    ) -> Option<BodyId> {
        if !self.is_running() {
            warn!(?owner, "Cannot create a rigidbody outside a running collision world");
            return None;
        }

        let mut mass = config.mass;
        if !mass.is_finite() || mass < 0.0 {
            warn!(?owner, mass, "Invalid rigidbody mass, treating body as static");
            mass = 0.0;
        }
        let mass = mass as f32;

        let dimensions = (config.dimensions * transform.scale).to_vec3();
        let shape = CollisionShape::from_dimensions(config.shape, dimensions);
        let local_inertia = if mass != 0.0 {
            shape.calculate_local_inertia(mass)
        } else {
            Vec3::ZERO
        };

        let (position, rotation) = transform.sim_pose(config.offset);
        let mut body = RigidBody::new(owner, mass, local_inertia, position, rotation);
        body.set_gravity(self.gravity);
        if mass > 0.0 {
            body.disable_deactivation();
        }

        let collider = Collider::new(shape, config.offset, config.group, config.mask);
        let id = self.dynamics.insert(body, collider);
        debug!(
            ?owner,
            body = ?id,
            shape = %config.shape,
            mass,
            group = config.group,
            mask = config.mask,
            "Rigidbody created"
        );
        Some(id)
    }

    /// Create a body from a full description, applying its properties in the
    /// same order a property block would.
    pub fn spawn(
        &mut self,
        owner: EntityId,
        transform: &Transform,
        desc: &RigidBodyDesc,
    ) -> Option<BodyId> {
        let id = self.configure(owner, transform, &desc.body)?;
        let gravity = desc.gravity.unwrap_or(self.gravity);
        let body = self.dynamics.body_mut(id)?;
        body.set_gravity(gravity);
        body.set_damping(desc.damping);
        body.set_angular_damping(desc.angular_damping);
        body.set_friction(desc.friction);
        body.set_restitution(desc.restitution);
        body.set_movement_constraints(desc.movement_constraints);
        body.set_rotation_constraints(desc.rotation_constraints);
        body.set_kinematic(desc.kinematic);
        body.set_trigger(desc.trigger);
        Some(id)
    }

    /// Create a static body for `owner` from a triangle mesh, scaled by the
    /// owner's scale. Mesh bodies never move and have no mass.
    pub fn configure_mesh(
        &mut self,
        owner: EntityId,
        transform: &Transform,
        mesh: Arc<TriangleMesh>,
        group: u16,
        mask: u16,
    ) -> Option<BodyId> {
        if !self.is_running() {
            warn!(?owner, "Cannot create a mesh body outside a running collision world");
            return None;
        }

        let triangles = mesh.len();
        let (position, rotation) = transform.sim_pose(Vector3::ZERO);
        let mut body = RigidBody::new(owner, 0.0, Vec3::ZERO, position, rotation);
        body.set_gravity(self.gravity);

        let shape = CollisionShape::TriangleMesh {
            mesh,
            scale: Vec3::ONE,
        };
        let mut collider = Collider::new(shape, Vector3::ZERO, group, mask);
        collider.local_scaling = transform.scale.to_vec3();
        let id = self.dynamics.insert(body, collider);
        debug!(?owner, body = ?id, triangles, group, mask, "Mesh body created");
        Some(id)
    }

    /// Remove a body. Its contact pairs are dropped first and no exit event
    /// is fired for them.
    pub fn destroy_body(&mut self, id: BodyId) -> bool {
        let before = self.contacts.len() + self.pending.len();
        self.contacts.retain(|pair| !pair.contains(id));
        self.pending.retain(|pair| !pair.contains(id));
        let purged = before - self.contacts.len() - self.pending.len();

        match self.dynamics.remove(id) {
            Some((body, _)) => {
                debug!(body = ?id, owner = ?body.owner(), purged, "Rigidbody destroyed");
                true
            }
            None => false,
        }
    }

    pub fn body(&self, id: BodyId) -> Option<hecs::Ref<'_, RigidBody>> {
        self.dynamics.body(id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.dynamics.body_mut(id)
    }

    pub fn collider(&self, id: BodyId) -> Option<hecs::Ref<'_, Collider>> {
        self.dynamics.collider(id)
    }

    pub fn body_count(&self) -> usize {
        self.dynamics.len()
    }

    pub(crate) fn dynamics(&self) -> &DynamicsWorld {
        &self.dynamics
    }

    /// World gravity, zero when the world is not running
    pub fn gravity(&self) -> Vector3 {
        if !self.is_running() {
            return Vector3::ZERO;
        }
        self.gravity
    }

    /// Change world gravity and apply it to every body
    pub fn set_gravity(&mut self, gravity: Vector3) {
        if !self.is_running() {
            return;
        }
        self.gravity = gravity;
        for (_, body) in self.dynamics.arena_mut().query_mut::<&mut RigidBody>() {
            body.set_gravity(gravity);
        }
        debug!(%gravity, "World gravity changed");
    }

    /// Multiply the collider's local scaling
    pub fn multiply_scale(&mut self, id: BodyId, factor: Vector3) -> bool {
        match self.dynamics.collider_mut(id) {
            Some(collider) => {
                collider.local_scaling *= factor.to_vec3();
                true
            }
            None => false,
        }
    }

    /// Half extents of the body's local bounding box
    pub fn bounding_half_extents(&self, id: BodyId) -> Option<Vector3> {
        let collider = self.dynamics.collider(id)?;
        Some(collider.scaled_shape().local_aabb().half_extents().into())
    }

    /// Pairs that were touching after the last step
    pub fn contact_pairs(&self) -> Vec<ContactPair> {
        self.contacts.iter().copied().collect()
    }

    pub fn is_in_contact(&self, a: BodyId, b: BodyId) -> bool {
        self.contacts.contains(&ContactPair::new(a, b))
    }

    /// A body takes part in contact resolution only if it and its owner are
    /// both active. Owners missing from the scene count as active.
    pub fn is_body_active(&self, id: BodyId, scene: &mut dyn Scene) -> bool {
        let Some(body) = self.dynamics.body(id) else {
            return false;
        };
        if !body.is_active() {
            return false;
        }
        scene
            .game_object_mut(body.owner())
            .map_or(true, |object| object.is_active())
    }

    /// Pairs from the last step's manifolds whose bodies really touch.
    ///
    /// A point counts when it penetrates, but by less than the smaller
    /// bounding radius of the two shapes.
    fn touching_pairs(&self) -> Vec<ContactPair> {
        let radius = |id: BodyId| {
            self.dynamics
                .collider(id)
                .map(|collider| collider.scaled_shape().bounding_radius())
        };

        let mut pairs = Vec::new();
        for manifold in self.dynamics.manifolds() {
            let (Some(radius_a), Some(radius_b)) = (radius(manifold.body_a), radius(manifold.body_b))
            else {
                continue;
            };
            let limit = radius_a.min(radius_b);
            let touching = manifold
                .points
                .iter()
                .any(|point| point.distance < 0.0 && point.distance > -limit);
            if touching {
                pairs.push(ContactPair::new(manifold.body_a, manifold.body_b));
            }
        }
        pairs
    }

    fn resolve_contacts(&mut self, scene: &mut dyn Scene) {
        self.pending.clear();

        for pair in self.touching_pairs() {
            if self.pending.contains(&pair) {
                continue;
            }
            // Earlier callbacks may have destroyed or deactivated either body
            if !self.is_body_active(pair.first(), scene) || !self.is_body_active(pair.second(), scene)
            {
                continue;
            }

            self.pending.insert(pair);
            if self.contacts.contains(&pair) {
                self.dispatch(pair, Transition::Stay, scene);
            } else {
                debug!(a = ?pair.first(), b = ?pair.second(), "Contact enter");
                self.dispatch(pair, Transition::Enter, scene);
            }
        }

        let vanished: Vec<ContactPair> = self.contacts.difference(&self.pending).copied().collect();
        for pair in vanished {
            if !self.contacts.contains(&pair) {
                continue;
            }
            debug!(a = ?pair.first(), b = ?pair.second(), "Contact exit");
            self.dispatch(pair, Transition::Exit, scene);
        }

        self.contacts = std::mem::take(&mut self.pending);
    }

    fn pair_is_live(&self, pair: &ContactPair, transition: Transition) -> bool {
        match transition {
            Transition::Exit => self.contacts.contains(pair),
            Transition::Enter | Transition::Stay => self.pending.contains(pair),
        }
    }

    fn dispatch(&mut self, pair: ContactPair, transition: Transition, scene: &mut dyn Scene) {
        let participant = |id: BodyId| {
            self.dynamics
                .body(id)
                .map(|body| (body.owner(), Role::from_trigger(body.is_trigger())))
        };
        let (Some((owner_a, role_a)), Some((owner_b, role_b))) =
            (participant(pair.first()), participant(pair.second()))
        else {
            return;
        };

        let plan = dispatch_plan(role_a, role_b, transition);
        for delivery in plan.deliveries() {
            if !self.pair_is_live(&pair, transition) {
                break;
            }

            let (this, other, this_owner, other_owner) = match delivery.target {
                Side::A => (pair.first(), pair.second(), owner_a, owner_b),
                Side::B => (pair.second(), pair.first(), owner_b, owner_a),
            };
            let Some(object) = scene.game_object_mut(this_owner) else {
                continue;
            };

            let mut ctx = CollisionContext {
                world: self,
                this,
                other,
            };
            deliver(object, delivery.kind, transition, other_owner, &mut ctx);
        }
    }
}

impl Default for CollisionWorld {
    fn default() -> Self {
        Self::new(PhysicsConfig::default())
    }
}

struct TransformSync {
    owner: EntityId,
    kinematic: bool,
    simulated: bool,
    position: Vec3,
    rotation: Quat,
    offset: Vector3,
}

fn deliver(
    object: &mut dyn GameObject,
    kind: EventKind,
    transition: Transition,
    other: EntityId,
    ctx: &mut CollisionContext<'_>,
) {
    match (kind, transition) {
        (EventKind::Collision, Transition::Enter) => object.on_collision_enter(other, ctx),
        (EventKind::Collision, Transition::Stay) => object.on_collision_stay(other, ctx),
        (EventKind::Collision, Transition::Exit) => object.on_collision_exit(other, ctx),
        (EventKind::Trigger, Transition::Enter) => object.on_trigger_enter(other, ctx),
        (EventKind::Trigger, Transition::Stay) => object.on_trigger_stay(other, ctx),
        (EventKind::Trigger, Transition::Exit) => object.on_trigger_exit(other, ctx),
        (EventKind::Object, Transition::Enter) => object.on_object_enter(other, ctx),
        (EventKind::Object, Transition::Stay) => object.on_object_stay(other, ctx),
        (EventKind::Object, Transition::Exit) => object.on_object_exit(other, ctx),
    }
}

/// What a collision callback can reach while it runs
pub struct CollisionContext<'w> {
    world: &'w mut CollisionWorld,
    this: BodyId,
    other: BodyId,
}

impl<'w> CollisionContext<'w> {
    pub fn world(&self) -> &CollisionWorld {
        self.world
    }

    pub fn world_mut(&mut self) -> &mut CollisionWorld {
        self.world
    }

    /// Body of the object receiving the event
    pub fn this_body(&self) -> BodyId {
        self.this
    }

    /// Body of the other object in the contact
    pub fn other_body(&self) -> BodyId {
        self.other
    }

    /// Destroy a body right away; pending events for it are dropped
    pub fn destroy_body(&mut self, id: BodyId) -> bool {
        self.world.destroy_body(id)
    }
}
