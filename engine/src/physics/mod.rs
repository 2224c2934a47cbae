//! Physics integration and collision events
//!
//! [`CollisionWorld`] owns every [`RigidBody`], steps the simulation at a
//! fixed rate and reports contact transitions to the bodies' owners.

pub mod accumulator;
pub mod collision;
pub mod components;
pub mod contacts;
pub mod dynamics;
pub mod properties;
pub mod raycast;
pub mod world;

// Re-export commonly used types
pub use accumulator::PhysicsAccumulator;
pub use collision::mesh::TriangleMesh;
pub use components::{
    collision_flags, layers, ActivationState, BodyId, Collider, CollisionShape, ImpulseMode,
    RigidBody, ShapeKind,
};
pub use contacts::{dispatch_plan, ContactPair, DispatchPlan, EventKind, Role, Transition};
pub use properties::{BodyConfig, RigidBodyDesc};
pub use raycast::RaycastHit;
pub use world::{CollisionContext, CollisionWorld, WorldState};
