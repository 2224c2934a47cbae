//! Errors surfaced by the physics layer
//!
//! Only configuration and world start-up can fail. Everything that runs per
//! frame returns a documented default instead.

/// Errors from configuring or starting the collision world
#[derive(Debug, thiserror::Error)]
pub enum PhysicsError {
    #[error("fixed timestep must be a positive number of seconds, got {0}")]
    InvalidFixedStep(f64),

    #[error("solver needs at least one iteration")]
    InvalidSolverIterations,

    #[error("collision world is already running")]
    AlreadyRunning,

    #[error("collision world has been closed")]
    Closed,

    #[error("failed to read physics config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse physics config: {0}")]
    Json(#[from] serde_json::Error),
}
