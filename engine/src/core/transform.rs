//! World transform of a game object as seen by the physics layer

use super::math::{euler_to_quat, quat_to_euler, Vector3};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position, rotation (Euler angles in degrees) and scale in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vector3,
    pub rotation: Vector3,
    pub scale: Vector3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vector3::ZERO,
            rotation: Vector3::ZERO,
            scale: Vector3::IDENTITY,
        }
    }
}

impl Transform {
    /// Create a new transform with the given position
    pub fn from_position(position: Vector3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Set the rotation in Euler degrees
    pub fn with_rotation(mut self, rotation: Vector3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the scale of the transform
    pub fn with_scale(mut self, scale: Vector3) -> Self {
        self.scale = scale;
        self
    }

    pub fn rotation_quat(&self) -> Quat {
        euler_to_quat(self.rotation)
    }

    /// Pose of a body whose collider sits at `offset` in this transform's local frame
    pub fn sim_pose(&self, offset: Vector3) -> (Vec3, Quat) {
        let rotation = self.rotation_quat();
        let position = self.position.to_vec3() + rotation * offset.to_vec3();
        (position, rotation)
    }

    /// Write a simulated body pose back, undoing the collider offset
    pub fn apply_sim_pose(&mut self, position: Vec3, rotation: Quat, offset: Vector3) {
        let origin = position - rotation * offset.to_vec3();
        self.position = Vector3::from(origin);
        self.rotation = quat_to_euler(rotation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_pose_applies_offset() {
        let transform = Transform::from_position(Vector3::new(1.0, 2.0, 3.0))
            .with_rotation(Vector3::new(0.0, 90.0, 0.0));
        let (position, _) = transform.sim_pose(Vector3::new(1.0, 0.0, 0.0));

        // +X rotated 90 degrees about Y points to -Z
        assert!((position - Vec3::new(1.0, 2.0, 2.0)).length() < 1e-5, "got {position:?}");
    }

    #[test]
    fn test_sim_pose_roundtrip() {
        let offset = Vector3::new(0.0, 0.5, 0.0);
        let original = Transform::from_position(Vector3::new(-4.0, 1.0, 7.0))
            .with_rotation(Vector3::new(10.0, 20.0, 30.0));
        let (position, rotation) = original.sim_pose(offset);

        let mut restored = Transform::default();
        restored.apply_sim_pose(position, rotation, offset);

        assert!((restored.position - original.position).magnitude() < 1e-4);
        assert!((restored.rotation - original.rotation).magnitude() < 1e-2);
    }
}
