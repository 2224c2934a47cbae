//! Spatial value types and the game object interface the physics layer uses

pub mod game_object;
pub mod math;
pub mod transform;
