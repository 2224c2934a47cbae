//! Double precision vector type used on the game-object side of the engine
//!
//! Transforms, property blocks and every public physics accessor speak
//! `Vector3` (f64, Euler angles in degrees). The simulation itself runs on
//! `glam::Vec3`/`glam::Quat`; the helpers at the bottom of this module convert
//! between the two representations.

use glam::{DVec3, EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{
    Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign,
};
use std::str::FromStr;

/// Three component vector with value semantics
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3::new(0.0, 0.0, 0.0);
    pub const IDENTITY: Vector3 = Vector3::new(1.0, 1.0, 1.0);
    pub const NEGATIVE_IDENTITY: Vector3 = Vector3::new(-1.0, -1.0, -1.0);
    pub const RIGHT: Vector3 = Vector3::new(1.0, 0.0, 0.0);
    pub const LEFT: Vector3 = Vector3::new(-1.0, 0.0, 0.0);
    pub const UP: Vector3 = Vector3::new(0.0, 1.0, 0.0);
    pub const DOWN: Vector3 = Vector3::new(0.0, -1.0, 0.0);
    pub const FORWARD: Vector3 = Vector3::new(0.0, 0.0, 1.0);
    pub const BACK: Vector3 = Vector3::new(0.0, 0.0, -1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn splat(v: f64) -> Self {
        Self::new(v, v, v)
    }

    pub fn dot(&self, other: Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(&self, other: Vector3) -> Vector3 {
        Vector3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn magnitude_squared(&self) -> f64 {
        self.dot(*self)
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude_squared().sqrt()
    }

    pub fn distance(&self, other: Vector3) -> f64 {
        (*self - other).magnitude()
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    /// Unit length copy of this vector. The zero vector stays zero.
    pub fn normalized(&self) -> Vector3 {
        let len = self.magnitude();
        if len > 0.0 {
            *self / len
        } else {
            Vector3::ZERO
        }
    }

    /// Normalizes in place; no-op for the zero vector.
    pub fn normalize(&mut self) {
        *self = self.normalized();
    }

    /// Linear interpolation towards `to`. `t` is expected in `[0, 1]`.
    pub fn lerp(&self, to: Vector3, t: f64) -> Vector3 {
        self.lerp_axes(to, Vector3::splat(t))
    }

    /// Per-axis linear interpolation towards `to`
    pub fn lerp_axes(&self, to: Vector3, t: Vector3) -> Vector3 {
        Vector3::new(
            self.x + (to.x - self.x) * t.x,
            self.y + (to.y - self.y) * t.y,
            self.z + (to.z - self.z) * t.z,
        )
    }

    /// Rotates this vector around `axis` by `degrees` (Rodrigues' formula)
    pub fn rotate_around_axis(&self, axis: Vector3, degrees: f64) -> Vector3 {
        let k = axis.normalized();
        if k.is_zero() {
            return *self;
        }
        let theta = degrees.to_radians();
        let (sin, cos) = theta.sin_cos();
        *self * cos + k.cross(*self) * sin + k * (k.dot(*self) * (1.0 - cos))
    }

    /// Rotates this point around `pivot` by Euler `angles` given in degrees
    pub fn rotate_around_pivot(&self, pivot: Vector3, angles: Vector3) -> Vector3 {
        let q = euler_to_dquat(angles);
        let rotated = q * DVec3::from(*self - pivot);
        Vector3::from(rotated) + pivot
    }

    /// Single precision copy for the simulation side
    pub fn to_vec3(&self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.x, self.y, self.z)
    }
}

/// Error returned when a string is not three whitespace separated numbers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected three numbers, got {0:?}")]
pub struct ParseVectorError(pub String);

impl FromStr for Vector3 {
    type Err = ParseVectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace().map(str::parse::<f64>);
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(x)), Some(Ok(y)), Some(Ok(z)), None) => Ok(Vector3::new(x, y, z)),
            _ => Err(ParseVectorError(s.to_string())),
        }
    }
}

impl Add for Vector3 {
    type Output = Vector3;
    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Vector3;
    fn sub(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Vector3;
    fn mul(self, rhs: f64) -> Vector3 {
        Vector3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<Vector3> for Vector3 {
    type Output = Vector3;
    fn mul(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x * rhs.x, self.y * rhs.y, self.z * rhs.z)
    }
}

impl Div<f64> for Vector3 {
    type Output = Vector3;
    fn div(self, rhs: f64) -> Vector3 {
        Vector3::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Div<Vector3> for Vector3 {
    type Output = Vector3;
    fn div(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x / rhs.x, self.y / rhs.y, self.z / rhs.z)
    }
}

impl Neg for Vector3 {
    type Output = Vector3;
    fn neg(self) -> Vector3 {
        Vector3::new(-self.x, -self.y, -self.z)
    }
}

impl AddAssign for Vector3 {
    fn add_assign(&mut self, rhs: Vector3) {
        *self = *self + rhs;
    }
}

impl SubAssign for Vector3 {
    fn sub_assign(&mut self, rhs: Vector3) {
        *self = *self - rhs;
    }
}

impl MulAssign<f64> for Vector3 {
    fn mul_assign(&mut self, rhs: f64) {
        *self = *self * rhs;
    }
}

impl MulAssign<Vector3> for Vector3 {
    fn mul_assign(&mut self, rhs: Vector3) {
        *self = *self * rhs;
    }
}

impl DivAssign<f64> for Vector3 {
    fn div_assign(&mut self, rhs: f64) {
        *self = *self / rhs;
    }
}

impl From<Vec3> for Vector3 {
    fn from(v: Vec3) -> Self {
        Vector3::new(v.x as f64, v.y as f64, v.z as f64)
    }
}

impl From<DVec3> for Vector3 {
    fn from(v: DVec3) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

impl From<Vector3> for DVec3 {
    fn from(v: Vector3) -> Self {
        DVec3::new(v.x, v.y, v.z)
    }
}

impl From<Vector3> for Vec3 {
    fn from(v: Vector3) -> Self {
        v.to_vec3()
    }
}

fn euler_to_dquat(degrees: Vector3) -> glam::DQuat {
    glam::DQuat::from_euler(
        EulerRot::ZYX,
        degrees.z.to_radians(),
        degrees.y.to_radians(),
        degrees.x.to_radians(),
    )
}

/// Converts Euler angles in degrees (applied Z, then Y, then X) to a quaternion
pub fn euler_to_quat(degrees: Vector3) -> Quat {
    Quat::from_euler(
        EulerRot::ZYX,
        degrees.z.to_radians() as f32,
        degrees.y.to_radians() as f32,
        degrees.x.to_radians() as f32,
    )
}

/// Inverse of [`euler_to_quat`]
pub fn quat_to_euler(rotation: Quat) -> Vector3 {
    let (z, y, x) = rotation.to_euler(EulerRot::ZYX);
    Vector3::new(
        (x as f64).to_degrees(),
        (y as f64).to_degrees(),
        (z as f64).to_degrees(),
    )
}
