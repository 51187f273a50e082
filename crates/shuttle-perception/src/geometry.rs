//! Rotation and angle helpers on top of [`Vec3`].
//!
//! # Example
//!
//! ```rust
//! use shuttle_perception::geometry::Quaternion;
//! use shuttle_types::Vec3;
//!
//! // Tilt the Y axis 90° about X: it lands on Z.
//! let q = Quaternion::from_axis_angle(Vec3::UNIT_X, std::f64::consts::FRAC_PI_2);
//! assert!(q.rotate(Vec3::UNIT_Y).approx_eq(Vec3::UNIT_Z, 1e-12));
//! ```

use shuttle_types::Vec3;

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion (|q| = 1).
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation (no rotation).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Right-handed rotation of `angle_rad` about `axis`.  A zero axis yields
    /// the identity.
    pub fn from_axis_angle(axis: Vec3, angle_rad: f64) -> Self {
        let axis = axis.normalize();
        if axis == Vec3::ZERO {
            return Self::identity();
        }
        let (s, c) = (angle_rad / 2.0).sin_cos();
        Self::new(c, axis.x * s, axis.y * s, axis.z * s)
    }

    /// Hamilton product: compose two rotations.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }
}

/// Angle in degrees between two directions, in `[0, 180]`.
///
/// The cosine is clamped to `[-1, 1]` so rounding drift on nearly parallel
/// vectors never produces NaN.  A zero vector is treated as perpendicular.
pub fn angle_between_deg(a: Vec3, b: Vec3) -> f64 {
    let dot = a.normalize().dot(b.normalize());
    dot.clamp(-1.0, 1.0).acos().to_degrees()
}
