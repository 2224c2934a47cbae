//! Gaia physics layer
//!
//! Rigid bodies bound to game objects, a fixed-step collision world, and the
//! enter/stay/exit contact events it delivers to their owners.

pub mod config;
pub mod core;
pub mod error;
pub mod physics;

// Re-export commonly used types
pub mod prelude {
    // Spatial types
    pub use crate::core::math::Vector3;
    pub use crate::core::transform::Transform;

    // Game object collaborators
    pub use crate::core::game_object::{EntityId, GameObject, Scene};

    // Config and errors
    pub use crate::config::PhysicsConfig;
    pub use crate::error::PhysicsError;

    // Physics types
    pub use crate::physics::{
        layers, BodyConfig, BodyId, CollisionContext, CollisionWorld, ContactPair, ImpulseMode,
        RaycastHit, RigidBody, RigidBodyDesc, ShapeKind, TriangleMesh,
    };
}

/// Initialize logging for the engine
pub fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gaia=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
