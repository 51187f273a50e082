//! [`Waypoint`] – a named destination in world space.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ShuttleError;
use crate::geometry::Vec3;

/// A named 3-D destination plus a "stop here" flag.
///
/// Waypoints are immutable once constructed.  A stop waypoint is one the
/// shuttle docks at, recharges at and parks at; a pass-through waypoint
/// (such as a synthetic orbit point) is flown through without stopping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    name: String,
    coords: Vec3,
    stop_at_waypoint: bool,
}

impl Waypoint {
    pub fn new(name: impl Into<String>, coords: Vec3, stop_at_waypoint: bool) -> Self {
        Self {
            name: name.into(),
            coords,
            stop_at_waypoint,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coords(&self) -> Vec3 {
        self.coords
    }

    pub fn stop_at_waypoint(&self) -> bool {
        self.stop_at_waypoint
    }
}

impl std::fmt::Display for Waypoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "GPS:{}:{}:{}:{}:",
            self.name, self.coords.x, self.coords.y, self.coords.z
        )
    }
}

/// Parses the in-game GPS clipboard format `GPS:Name:x:y:z:` with an optional
/// trailing colour field (`GPS:Name:x:y:z:#FF75C9F1:`).
///
/// Waypoints read from GPS strings are stop waypoints.
impl FromStr for Waypoint {
    type Err = ShuttleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ShuttleError::InvalidWaypoint(s.to_string());
        let body = s.trim().strip_prefix("GPS:").ok_or_else(invalid)?;
        let mut fields = body.split(':');

        let name = fields.next().filter(|n| !n.is_empty()).ok_or_else(invalid)?;
        let mut coord = || -> Result<f64, ShuttleError> {
            fields
                .next()
                .and_then(|v| v.trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
                .ok_or_else(invalid)
        };
        let x = coord()?;
        let y = coord()?;
        let z = coord()?;

        Ok(Waypoint::new(name, Vec3::new(x, y, z), true))
    }
}
