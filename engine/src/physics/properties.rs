//! Rigid body description and the key/value property block that fills it
//!
//! Scene files describe a body as a flat list of `key = value` strings.
//! Parsing is forgiving: a bad value is logged and the default kept, an
//! unknown key is logged and skipped. Nothing here ever fails.

use crate::core::math::Vector3;
use crate::physics::components::{layers, ShapeKind};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

/// Geometry and filtering needed to create a body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Zero makes the body static
    pub mass: f64,
    pub shape: ShapeKind,
    /// Offset of the body from its owner's origin
    pub offset: Vector3,
    /// Full size before the owner's scale is applied
    pub dimensions: Vector3,
    pub group: u16,
    pub mask: u16,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            mass: 1.0,
            shape: ShapeKind::Box,
            offset: Vector3::ZERO,
            dimensions: Vector3::IDENTITY,
            group: layers::DEFAULT,
            mask: layers::ALL,
        }
    }
}

/// Everything a property block can say about a body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigidBodyDesc {
    pub body: BodyConfig,
    pub damping: f64,
    pub angular_damping: f64,
    pub friction: f64,
    pub restitution: f64,
    /// `None` uses the world gravity at spawn time
    pub gravity: Option<Vector3>,
    pub movement_constraints: Vector3,
    pub rotation_constraints: Vector3,
    pub trigger: bool,
    pub kinematic: bool,
}

impl Default for RigidBodyDesc {
    fn default() -> Self {
        Self {
            body: BodyConfig::default(),
            damping: 0.0,
            angular_damping: 0.0,
            friction: 0.0,
            restitution: 0.0,
            gravity: None,
            movement_constraints: Vector3::IDENTITY,
            rotation_constraints: Vector3::IDENTITY,
            trigger: false,
            kinematic: false,
        }
    }
}

impl RigidBodyDesc {
    /// Build a description from a property block.
    ///
    /// Recognised keys: `shape`, `mass`, `friction`, `restitution`,
    /// `damping`, `angularDamping`, `offset`, `scale`, `trigger`,
    /// `kinematic`, `gravity`, `movementConstraints`, `rotationConstraints`,
    /// `collisionGroup` and `collidesWith`.
    pub fn from_properties<I, K, V>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut desc = RigidBodyDesc::default();
        for (key, value) in properties {
            desc.apply_property(key.as_ref(), value.as_ref());
        }
        desc
    }

    fn apply_property(&mut self, key: &str, value: &str) {
        match key {
            "shape" => match ShapeKind::from_str(value.trim()) {
                Ok(shape) => self.body.shape = shape,
                Err(_) => warn!(key, value, "not a valid rigidbody shape"),
            },
            "mass" => parse_into(key, value, &mut self.body.mass),
            "friction" => parse_into(key, value, &mut self.friction),
            "restitution" => parse_into(key, value, &mut self.restitution),
            "damping" => parse_into(key, value, &mut self.damping),
            "angularDamping" => parse_into(key, value, &mut self.angular_damping),
            "offset" => parse_into(key, value, &mut self.body.offset),
            "scale" => parse_into(key, value, &mut self.body.dimensions),
            "trigger" => parse_bool_into(key, value, &mut self.trigger),
            "kinematic" => parse_bool_into(key, value, &mut self.kinematic),
            "gravity" => match value.parse::<Vector3>() {
                Ok(gravity) => self.gravity = Some(gravity),
                Err(_) => warn!(key, value, "wrong value for property"),
            },
            "movementConstraints" => parse_into(key, value, &mut self.movement_constraints),
            "rotationConstraints" => parse_into(key, value, &mut self.rotation_constraints),
            "collisionGroup" => parse_layer_into(key, value, &mut self.body.group),
            "collidesWith" => parse_layer_into(key, value, &mut self.body.mask),
            _ => warn!(key, value, "property does not exist"),
        }
    }
}

fn parse_into<T: FromStr>(key: &str, value: &str, slot: &mut T) {
    match value.trim().parse::<T>() {
        Ok(parsed) => *slot = parsed,
        Err(_) => warn!(key, value, "wrong value for property"),
    }
}

fn parse_bool_into(key: &str, value: &str, slot: &mut bool) {
    match value.trim() {
        "1" | "true" => *slot = true,
        "0" | "false" => *slot = false,
        _ => warn!(key, value, "wrong value for property"),
    }
}

fn parse_layer_into(key: &str, value: &str, slot: &mut u16) {
    match layers::preset(value.trim()) {
        Some(layer) => *slot = layer,
        None => warn!(key, value, "wrong value for property"),
    }
}
