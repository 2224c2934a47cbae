//! Configuration types for the engine

use crate::core::math::Vector3;
use crate::error::PhysicsError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Configuration for the collision world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Seconds simulated by one fixed step
    pub fixed_timestep: f64,
    /// Initial world gravity
    pub gravity: Vector3,
    /// Sequential impulse iterations per step
    pub solver_iterations: u32,
    /// Separation below which contact points are kept in manifolds
    pub contact_margin: f32,
    /// Fraction of penetration removed per step
    pub position_correction: f32,
    /// Penetration tolerated before positional correction kicks in
    pub penetration_slop: f32,
    /// Upper bound on fixed steps run by a single update call
    pub max_steps_per_update: Option<u32>,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 50.0,
            gravity: Vector3::new(0.0, -9.81, 0.0),
            solver_iterations: 10,
            contact_margin: 0.04,
            position_correction: 0.2,
            penetration_slop: 0.005,
            max_steps_per_update: None,
        }
    }
}

impl PhysicsConfig {
    /// Parse a config from JSON; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self, PhysicsError> {
        let config: PhysicsConfig = serde_json::from_str(json)?;
        config.validate()?;
        debug!(config = ?config, "Loaded physics config");
        Ok(config)
    }

    /// Load a config from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PhysicsError> {
        let path = path.as_ref();
        debug!(path = ?path, "Reading physics config");
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String, PhysicsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the world cannot run with
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !self.fixed_timestep.is_finite() || self.fixed_timestep <= 0.0 {
            return Err(PhysicsError::InvalidFixedStep(self.fixed_timestep));
        }
        if self.solver_iterations == 0 {
            return Err(PhysicsError::InvalidSolverIterations);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PhysicsConfig::default();
        assert_eq!(config.fixed_timestep, 0.02);
        assert_eq!(config.gravity, Vector3::new(0.0, -9.81, 0.0));
        assert_eq!(config.max_steps_per_update, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            PhysicsConfig::from_json_str(r#"{ "gravity": { "x": 0.0, "y": -1.62, "z": 0.0 } }"#)
                .unwrap();
        assert_eq!(config.gravity.y, -1.62);
        assert_eq!(config.fixed_timestep, 0.02);
        assert_eq!(config.solver_iterations, 10);
    }

    #[test]
    fn test_rejects_bad_timestep() {
        let err = PhysicsConfig::from_json_str(r#"{ "fixed_timestep": 0.0 }"#).unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidFixedStep(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = PhysicsConfig::from_json_str("{ fixed_timestep: ").unwrap_err();
        assert!(matches!(err, PhysicsError::Json(_)));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = PhysicsConfig {
            max_steps_per_update: Some(5),
            ..Default::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(PhysicsConfig::from_json_str(&json).unwrap(), config);
    }
}
