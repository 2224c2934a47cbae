//! Components stored on every body in the collision world

use crate::core::game_object::EntityId;
use crate::core::math::{quat_to_euler, Vector3};
use crate::physics::collision::mesh::TriangleMesh;
use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Stable id of a body in the collision world's arena.
///
/// Ordered by the underlying entity bits, which gives contact pairs their
/// canonical orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId(pub(crate) hecs::Entity);

impl BodyId {
    pub fn to_bits(self) -> u64 {
        self.0.to_bits().get()
    }

    pub fn from_bits(bits: u64) -> Option<Self> {
        hecs::Entity::from_bits(bits).map(BodyId)
    }
}

impl Ord for BodyId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_bits().cmp(&other.to_bits())
    }
}

impl PartialOrd for BodyId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Collision flag bits. Toggled with add/subtract deltas, never or/and-not.
pub mod collision_flags {
    pub const STATIC_OBJECT: u32 = 1;
    pub const KINEMATIC_OBJECT: u32 = 2;
    pub const NO_CONTACT_RESPONSE: u32 = 4;
}

/// Collision group/mask presets
pub mod layers {
    pub const NONE: u16 = 0;
    pub const DEFAULT: u16 = 1;
    pub const IGNORE_RAYCAST: u16 = 2;
    pub const ALL: u16 = 0xFFFF;

    /// Resolve a preset by the name used in property blocks
    pub fn preset(name: &str) -> Option<u16> {
        match name {
            "None" => Some(NONE),
            "Default" => Some(DEFAULT),
            "IgnoreRaycast" => Some(IGNORE_RAYCAST),
            "All" => Some(ALL),
            _ => None,
        }
    }
}

/// Shape family requested when configuring a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShapeKind {
    #[default]
    Box,
    Sphere,
    Capsule,
    Cylinder,
    Cone,
}

impl FromStr for ShapeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Box" => Ok(ShapeKind::Box),
            "Sphere" => Ok(ShapeKind::Sphere),
            "Capsule" => Ok(ShapeKind::Capsule),
            "Cylinder" => Ok(ShapeKind::Cylinder),
            "Cone" => Ok(ShapeKind::Cone),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeKind::Box => "Box",
            ShapeKind::Sphere => "Sphere",
            ShapeKind::Capsule => "Capsule",
            ShapeKind::Cylinder => "Cylinder",
            ShapeKind::Cone => "Cone",
        };
        f.write_str(name)
    }
}

/// Collision shape types. All primitives are centred on the body origin and
/// aligned with the local Y axis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CollisionShape {
    /// Box with half-extents (width/2, height/2, depth/2)
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    /// Hemispherical caps joined by a cylinder of length `height`
    Capsule { radius: f32, height: f32 },
    /// Half height is `half_extents.y`; the cross-section is the ellipse with
    /// semi-axes `half_extents.x` and `half_extents.z`
    Cylinder { half_extents: Vec3 },
    /// Apex at `+height/2`, base disc at `-height/2`
    Cone { radius: f32, height: f32 },
    /// Static triangle soup shared between bodies, scaled per body
    TriangleMesh { mesh: Arc<TriangleMesh>, scale: Vec3 },
}

impl CollisionShape {
    /// Size a shape from full body dimensions
    pub fn from_dimensions(kind: ShapeKind, dimensions: Vec3) -> Self {
        let half = dimensions * 0.5;
        let radius_xz = dimensions.x.max(dimensions.z) * 0.5;
        match kind {
            ShapeKind::Box => CollisionShape::Box { half_extents: half },
            ShapeKind::Sphere => CollisionShape::Sphere {
                radius: dimensions.max_element() * 0.5,
            },
            ShapeKind::Capsule => CollisionShape::Capsule {
                radius: radius_xz,
                height: dimensions.y,
            },
            ShapeKind::Cylinder => CollisionShape::Cylinder { half_extents: half },
            ShapeKind::Cone => CollisionShape::Cone {
                radius: radius_xz,
                height: dimensions.y,
            },
        }
    }

    /// Primitive family of the shape; meshes have none
    pub fn kind(&self) -> Option<ShapeKind> {
        match self {
            CollisionShape::Box { .. } => Some(ShapeKind::Box),
            CollisionShape::Sphere { .. } => Some(ShapeKind::Sphere),
            CollisionShape::Capsule { .. } => Some(ShapeKind::Capsule),
            CollisionShape::Cylinder { .. } => Some(ShapeKind::Cylinder),
            CollisionShape::Cone { .. } => Some(ShapeKind::Cone),
            CollisionShape::TriangleMesh { .. } => None,
        }
    }

    /// Apply a local scaling factor
    pub fn scaled(&self, factor: Vec3) -> Self {
        match self {
            CollisionShape::Box { half_extents } => CollisionShape::Box {
                half_extents: *half_extents * factor,
            },
            CollisionShape::Sphere { radius } => CollisionShape::Sphere {
                radius: radius * factor.x,
            },
            CollisionShape::Capsule { radius, height } => CollisionShape::Capsule {
                radius: radius * factor.x.max(factor.z),
                height: height * factor.y,
            },
            CollisionShape::Cylinder { half_extents } => CollisionShape::Cylinder {
                half_extents: *half_extents * factor,
            },
            CollisionShape::Cone { radius, height } => CollisionShape::Cone {
                radius: radius * factor.x.max(factor.z),
                height: height * factor.y,
            },
            CollisionShape::TriangleMesh { mesh, scale } => CollisionShape::TriangleMesh {
                mesh: Arc::clone(mesh),
                scale: *scale * factor,
            },
        }
    }
}

/// Collider attached to a body: shape, placement and filtering
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    pub shape: CollisionShape,
    pub local_scaling: Vec3,
    /// Offset of the body from its owner's origin, in the owner's frame
    pub offset: Vector3,
    pub group: u16,
    pub mask: u16,
}

impl Collider {
    pub fn new(shape: CollisionShape, offset: Vector3, group: u16, mask: u16) -> Self {
        Self {
            shape,
            local_scaling: Vec3::ONE,
            offset,
            group,
            mask,
        }
    }

    /// Shape with the local scaling applied
    pub fn scaled_shape(&self) -> CollisionShape {
        self.shape.scaled(self.local_scaling)
    }

    /// Two colliders may touch only when each one's group is in the other's mask
    pub fn accepts(&self, other: &Collider) -> bool {
        (self.group & other.mask) != 0 && (other.group & self.mask) != 0
    }
}

/// How `RigidBody::add_impulse` interprets its vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImpulseMode {
    /// Immediate change of linear (and, off-centre, angular) velocity
    #[default]
    Impulse,
    /// Displacement applied for one step only, used for penetration recovery
    Push,
    /// Immediate change of angular velocity
    Torque,
    /// Rotation applied for one step only
    TorqueTurn,
}

/// Simulation activation state of a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ActivationState {
    /// Simulated; the default for static bodies
    ActiveTag = 1,
    /// Simulated and never put to sleep
    DisableDeactivation = 4,
    /// Skipped by the simulation and contact resolution
    DisableSimulation = 5,
}

/// One simulated body bound to exactly one game object.
///
/// Everything the game object side sees is expressed in `Vector3`; the
/// simulation state underneath is single precision.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub(crate) owner: EntityId,
    pub(crate) active: bool,
    pub(crate) flags: u32,
    pub(crate) activation: ActivationState,

    pub(crate) mass: f32,
    pub(crate) inverse_mass: f32,
    pub(crate) inverse_inertia_local: Vec3,

    pub(crate) position: Vec3,
    pub(crate) rotation: Quat,
    pub(crate) linear_velocity: Vec3,
    pub(crate) angular_velocity: Vec3,
    pub(crate) push_velocity: Vec3,
    pub(crate) turn_velocity: Vec3,
    pub(crate) total_force: Vec3,
    pub(crate) total_torque: Vec3,

    pub(crate) gravity: Vec3,
    pub(crate) linear_damping: f32,
    pub(crate) angular_damping: f32,
    pub(crate) friction: f32,
    pub(crate) restitution: f32,
    pub(crate) linear_factor: Vec3,
    pub(crate) angular_factor: Vec3,
}

impl RigidBody {
    pub(crate) fn new(
        owner: EntityId,
        mass: f32,
        local_inertia: Vec3,
        position: Vec3,
        rotation: Quat,
    ) -> Self {
        let inverse = |v: f32| if v != 0.0 { 1.0 / v } else { 0.0 };
        let inverse_mass = inverse(mass);
        let mut body = Self {
            owner,
            active: true,
            flags: 0,
            activation: ActivationState::ActiveTag,
            mass,
            inverse_mass,
            inverse_inertia_local: Vec3::new(
                inverse(local_inertia.x),
                inverse(local_inertia.y),
                inverse(local_inertia.z),
            ),
            position,
            rotation,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            push_velocity: Vec3::ZERO,
            turn_velocity: Vec3::ZERO,
            total_force: Vec3::ZERO,
            total_torque: Vec3::ZERO,
            gravity: Vec3::ZERO,
            linear_damping: 0.0,
            angular_damping: 0.0,
            friction: 0.5,
            restitution: 0.0,
            linear_factor: Vec3::ONE,
            angular_factor: Vec3::ONE,
        };
        if inverse_mass == 0.0 {
            body.flags += collision_flags::STATIC_OBJECT;
        }
        body
    }

    /// Game object owning this body
    pub fn owner(&self) -> EntityId {
        self.owner
    }

    pub fn mass(&self) -> f64 {
        self.mass as f64
    }

    pub fn collision_flags(&self) -> u32 {
        self.flags
    }

    fn has_flag(&self, bit: u32) -> bool {
        self.flags & bit != 0
    }

    fn toggle_flag(&mut self, bit: u32, on: bool) {
        let present = self.has_flag(bit);
        if on && !present {
            self.flags += bit;
        } else if !on && present {
            self.flags -= bit;
        }
    }

    /// Triggers detect overlap but get no contact response
    pub fn set_trigger(&mut self, trigger: bool) {
        self.toggle_flag(collision_flags::NO_CONTACT_RESPONSE, trigger);
    }

    pub fn is_trigger(&self) -> bool {
        self.has_flag(collision_flags::NO_CONTACT_RESPONSE)
    }

    pub fn set_contact_response(&mut self, response: bool) {
        self.set_trigger(!response);
    }

    pub fn has_contact_response(&self) -> bool {
        !self.is_trigger()
    }

    pub fn set_kinematic(&mut self, kinematic: bool) {
        self.toggle_flag(collision_flags::KINEMATIC_OBJECT, kinematic);
    }

    pub fn is_kinematic(&self) -> bool {
        self.has_flag(collision_flags::KINEMATIC_OBJECT)
    }

    /// Marks the body immovable. Ignored for bodies with positive mass.
    pub fn set_static(&mut self, is_static: bool) {
        if is_static && self.mass > 0.0 {
            warn!(owner = ?self.owner, mass = self.mass, "cannot make a body with mass static");
            return;
        }
        self.toggle_flag(collision_flags::STATIC_OBJECT, is_static);
    }

    pub fn is_static(&self) -> bool {
        self.has_flag(collision_flags::STATIC_OBJECT)
    }

    /// Bodies moved by the solver
    pub fn is_dynamic(&self) -> bool {
        !self.is_static() && !self.is_kinematic() && self.inverse_mass > 0.0
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        self.activation = if !active {
            ActivationState::DisableSimulation
        } else if !self.is_static() {
            ActivationState::DisableDeactivation
        } else {
            ActivationState::ActiveTag
        };
        debug!(owner = ?self.owner, active, state = ?self.activation, "rigidbody activation changed");
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn disable_deactivation(&mut self) {
        self.activation = ActivationState::DisableDeactivation;
    }

    pub fn activation_state(&self) -> ActivationState {
        self.activation
    }

    pub(crate) fn is_simulated(&self) -> bool {
        self.activation != ActivationState::DisableSimulation
    }

    /// World space inverse inertia tensor
    pub(crate) fn inverse_inertia_world(&self) -> Mat3 {
        let rotation = Mat3::from_quat(self.rotation);
        rotation * Mat3::from_diagonal(self.inverse_inertia_local) * rotation.transpose()
    }

    /// Accumulates a force for the next step. A zero `rel_pos` applies it at
    /// the centre of mass.
    pub fn add_force(&mut self, force: Vector3, rel_pos: Vector3) {
        let force = force.to_vec3() * self.linear_factor;
        self.total_force += force;
        if !rel_pos.is_zero() {
            self.total_torque += rel_pos.to_vec3().cross(force) * self.angular_factor;
        }
    }

    pub fn add_torque(&mut self, torque: Vector3) {
        self.total_torque += torque.to_vec3() * self.angular_factor;
    }

    /// Applies an impulse. `rel_pos` only matters for `Impulse` and `Push`.
    pub fn add_impulse(&mut self, impulse: Vector3, rel_pos: Vector3, mode: ImpulseMode) {
        if self.inverse_mass == 0.0 {
            return;
        }
        let impulse = impulse.to_vec3();
        let arm = rel_pos.to_vec3();
        match mode {
            ImpulseMode::Impulse => {
                self.linear_velocity += impulse * self.linear_factor * self.inverse_mass;
                if !rel_pos.is_zero() {
                    let torque = arm.cross(impulse * self.linear_factor);
                    self.angular_velocity +=
                        self.inverse_inertia_world() * torque * self.angular_factor;
                }
            }
            ImpulseMode::Push => {
                self.push_velocity += impulse * self.linear_factor * self.inverse_mass;
                if !rel_pos.is_zero() {
                    let torque = arm.cross(impulse * self.linear_factor);
                    self.turn_velocity +=
                        self.inverse_inertia_world() * torque * self.angular_factor;
                }
            }
            ImpulseMode::Torque => {
                self.angular_velocity +=
                    self.inverse_inertia_world() * impulse * self.angular_factor;
            }
            ImpulseMode::TorqueTurn => {
                self.turn_velocity += self.inverse_inertia_world() * impulse * self.angular_factor;
            }
        }
    }

    pub fn clear_forces(&mut self) {
        self.total_force = Vec3::ZERO;
        self.total_torque = Vec3::ZERO;
    }

    pub fn total_force(&self) -> Vector3 {
        self.total_force.into()
    }

    pub fn total_torque(&self) -> Vector3 {
        self.total_torque.into()
    }

    pub fn linear_velocity(&self) -> Vector3 {
        self.linear_velocity.into()
    }

    pub fn set_linear_velocity(&mut self, velocity: Vector3) {
        self.linear_velocity = velocity.to_vec3();
    }

    pub fn angular_velocity(&self) -> Vector3 {
        self.angular_velocity.into()
    }

    pub fn set_angular_velocity(&mut self, velocity: Vector3) {
        self.angular_velocity = velocity.to_vec3();
    }

    /// Gravity acceleration applied to this body
    pub fn gravity(&self) -> Vector3 {
        self.gravity.into()
    }

    pub fn set_gravity(&mut self, gravity: Vector3) {
        self.gravity = gravity.to_vec3();
    }

    /// Linear damping, clamped to `[0, 1]`
    pub fn set_damping(&mut self, damping: f64) {
        self.linear_damping = (damping as f32).clamp(0.0, 1.0);
    }

    pub fn damping(&self) -> f64 {
        self.linear_damping as f64
    }

    pub fn set_angular_damping(&mut self, damping: f64) {
        self.angular_damping = (damping as f32).clamp(0.0, 1.0);
    }

    pub fn angular_damping(&self) -> f64 {
        self.angular_damping as f64
    }

    pub fn set_friction(&mut self, friction: f64) {
        self.friction = friction as f32;
    }

    pub fn friction(&self) -> f64 {
        self.friction as f64
    }

    pub fn set_restitution(&mut self, restitution: f64) {
        self.restitution = restitution as f32;
    }

    pub fn restitution(&self) -> f64 {
        self.restitution as f64
    }

    /// Per-axis linear factor: 1 leaves the axis free, 0 locks it
    pub fn set_movement_constraints(&mut self, constraints: Vector3) {
        self.linear_factor = constraints.to_vec3();
    }

    pub fn movement_constraints(&self) -> Vector3 {
        self.linear_factor.into()
    }

    /// Per-axis angular factor: 1 leaves the axis free, 0 locks it
    pub fn set_rotation_constraints(&mut self, constraints: Vector3) {
        self.angular_factor = constraints.to_vec3();
    }

    pub fn rotation_constraints(&self) -> Vector3 {
        self.angular_factor.into()
    }

    /// Centre of mass position in world space
    pub fn position(&self) -> Vector3 {
        self.position.into()
    }

    /// Orientation as Euler angles in degrees
    pub fn orientation(&self) -> Vector3 {
        quat_to_euler(self.rotation)
    }

    pub(crate) fn set_pose(&mut self, position: Vec3, rotation: Quat) {
        self.position = position;
        self.rotation = rotation.normalize();
    }
}
