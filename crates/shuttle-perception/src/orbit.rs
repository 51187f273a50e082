//! Orbit Generator.
//!
//! In orbit mode the shuttle never docks; each lap it flies to a synthetic
//! waypoint one segment further along a circle around a fixed centre.  The
//! circle lies in the plane that contains the X axis and the shuttle's
//! initial line-of-sight from the centre, i.e. the reference XY plane tilted
//! about X by an angle measured once and cached.
//!
//! Each call measures the shuttle's current azimuth inside that tilted plane,
//! adds one segment (2π/20 by default) and converts back to world space, so
//! feeding generated waypoints back in walks the full circle in exactly
//! `segments` calls.
//!
//! # Example
//!
//! ```rust
//! use shuttle_perception::orbit::OrbitGenerator;
//! use shuttle_types::Vec3;
//!
//! let mut orbit = OrbitGenerator::new(Vec3::ZERO, 1000.0);
//! let wp = orbit.next_waypoint(Vec3::new(1000.0, 0.0, 0.0));
//! assert!(!wp.stop_at_waypoint());
//! assert!((wp.coords().length() - 1000.0).abs() < 1e-6);
//! ```

use std::f64::consts::TAU;

use shuttle_types::{Vec3, Waypoint};
use tracing::debug;

use crate::geometry::Quaternion;

/// Number of waypoints per full revolution.
pub const DEFAULT_SEGMENTS: u32 = 20;

/// Name given to every synthetic orbit waypoint.
pub const ORBIT_WAYPOINT_NAME: &str = "Orbit";

#[derive(Debug, Clone, PartialEq)]
pub struct OrbitGenerator {
    center: Vec3,
    radius: f64,
    increment: f64,
    /// Rotation of the orbital plane about X, measured on first use.
    tilt: Option<f64>,
}

impl OrbitGenerator {
    pub fn new(center: Vec3, radius: f64) -> Self {
        Self::with_segments(center, radius, DEFAULT_SEGMENTS)
    }

    /// Orbit split into `segments` steps per revolution (minimum 1).
    pub fn with_segments(center: Vec3, radius: f64, segments: u32) -> Self {
        Self {
            center,
            radius,
            increment: TAU / f64::from(segments.max(1)),
            tilt: None,
        }
    }

    /// Angular step between consecutive waypoints, in radians.
    pub fn increment(&self) -> f64 {
        self.increment
    }

    /// Cached plane tilt in radians, once measured.
    pub fn tilt(&self) -> Option<f64> {
        self.tilt
    }

    /// Forget the cached tilt; the next call re-measures the plane.
    pub fn reset_tilt(&mut self) {
        self.tilt = None;
    }

    /// In-plane Y axis for a plane tilted by `tilt` about X.
    fn plane_y(tilt: f64) -> Vec3 {
        Quaternion::from_axis_angle(Vec3::UNIT_X, tilt).rotate(Vec3::UNIT_Y)
    }

    /// Tilt of the plane through X that contains `position`.
    fn measure_tilt(&self, position: Vec3) -> f64 {
        let d = (position - self.center).normalize();
        d.z.atan2(d.y)
    }

    /// Azimuth of `position` in the orbital plane, in `[0, 2π)`.
    ///
    /// The angle is the arccosine of the in-plane direction against X; its
    /// sign comes from the direction's component along the tilted Y axis.
    pub fn azimuth(&self, position: Vec3, tilt: f64) -> f64 {
        let d = position - self.center;
        let y_axis = Self::plane_y(tilt);
        let in_plane = (Vec3::UNIT_X * d.x + y_axis * d.dot(y_axis)).normalize();
        if in_plane == Vec3::ZERO {
            return 0.0;
        }
        let angle = in_plane.dot(Vec3::UNIT_X).clamp(-1.0, 1.0).acos();
        if in_plane.dot(y_axis) < 0.0 {
            TAU - angle
        } else {
            angle
        }
    }

    /// Point on the orbit at `azimuth` for the given plane tilt.
    pub fn point_at(&self, azimuth: f64, tilt: f64) -> Vec3 {
        let (s, c) = azimuth.sin_cos();
        let flat = Vec3::new(self.radius * c, self.radius * s, 0.0);
        Quaternion::from_axis_angle(Vec3::UNIT_X, tilt).rotate(flat) + self.center
    }

    /// Next synthetic waypoint one segment ahead of `position`.
    pub fn next_waypoint(&mut self, position: Vec3) -> Waypoint {
        let tilt = match self.tilt {
            Some(t) => t,
            None => {
                let t = self.measure_tilt(position);
                debug!(tilt_deg = t.to_degrees(), "orbital plane measured");
                self.tilt = Some(t);
                t
            }
        };
        let next = (self.azimuth(position, tilt) + self.increment) % TAU;
        let coords = self.point_at(next, tilt);
        debug!(azimuth_deg = next.to_degrees(), %coords, "next orbit waypoint");
        Waypoint::new(ORBIT_WAYPOINT_NAME, coords, false)
    }
}
