//! Obstruction Oracle.
//!
//! Decides whether a direction, seen from the shuttle's reference point, is
//! blocked by something the proximity sensor currently reports.  An entity
//! blocks a direction when the angle between the direction and the
//! line-of-sight to the entity lies strictly inside the cone half-angle
//! (65° by default).  The open interval matters: an entity dead ahead at
//! exactly 0° or on the cone edge does not count.
//!
//! No detections means clear.  Missing sensor data never blocks progress.
//!
//! # Example
//!
//! ```rust
//! use shuttle_perception::obstruction::{EntityFilter, ObstructionOracle};
//! use shuttle_types::{DetectedEntity, EntityKind, Vec3};
//!
//! let oracle = ObstructionOracle::default();
//! let ship = Vec3::ZERO;
//! let tug = DetectedEntity::new(1, "Tug", EntityKind::SmallGrid, Vec3::new(10.0, 0.0, 20.0));
//!
//! assert!(oracle.is_obstructed(ship, Vec3::UNIT_Z, &[tug.clone()], EntityFilter::All));
//! assert!(!oracle.is_obstructed(ship, -Vec3::UNIT_Z, &[tug], EntityFilter::All));
//! ```

use shuttle_types::{DetectedEntity, Direction, EntityKind, Orientation, Vec3};
use tracing::trace;

use crate::geometry::angle_between_deg;

/// Default cone half-angle in degrees.
pub const DEFAULT_CONE_DEG: f64 = 65.0;

/// Order in which departure directions are tried, relative to the docking
/// connector.
pub const DEFAULT_DEPARTURE_PRIORITY: [Direction; 6] = [
    Direction::Backward,
    Direction::Forward,
    Direction::Left,
    Direction::Right,
    Direction::Up,
    Direction::Down,
];

/// Angular tolerance at both cone boundaries, in degrees.
const BOUNDARY_EPS_DEG: f64 = 1e-6;

/// Which detected entities count as obstacles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityFilter {
    #[default]
    All,
    SmallGrid,
    LargeGrid,
}

impl EntityFilter {
    pub fn matches(self, kind: EntityKind) -> bool {
        match self {
            EntityFilter::All => true,
            EntityFilter::SmallGrid => kind == EntityKind::SmallGrid,
            EntityFilter::LargeGrid => kind == EntityKind::LargeGrid,
        }
    }
}

/// Cone test over sensor detections.
#[derive(Debug, Clone, PartialEq)]
pub struct ObstructionOracle {
    cone_deg: f64,
    departure_priority: Vec<Direction>,
}

impl Default for ObstructionOracle {
    fn default() -> Self {
        Self::new(DEFAULT_CONE_DEG, DEFAULT_DEPARTURE_PRIORITY.to_vec())
    }
}

impl ObstructionOracle {
    pub fn new(cone_deg: f64, departure_priority: Vec<Direction>) -> Self {
        Self {
            cone_deg,
            departure_priority,
        }
    }

    /// `true` if any entity passing `filter` lies inside the open cone around
    /// `direction` as seen from `origin`.
    pub fn is_obstructed(
        &self,
        origin: Vec3,
        direction: Vec3,
        entities: &[DetectedEntity],
        filter: EntityFilter,
    ) -> bool {
        entities
            .iter()
            .filter(|e| filter.matches(e.kind))
            .any(|e| {
                let angle = angle_between_deg(e.position - origin, direction);
                let inside = angle > BOUNDARY_EPS_DEG && angle < self.cone_deg - BOUNDARY_EPS_DEG;
                if inside {
                    trace!(entity = %e.name, angle, "direction obstructed");
                }
                inside
            })
    }

    /// First direction in the departure priority that is clear, relative to
    /// `orientation`.  `None` when every direction is obstructed.
    pub fn departure_direction(
        &self,
        origin: Vec3,
        orientation: &Orientation,
        entities: &[DetectedEntity],
    ) -> Option<Direction> {
        self.departure_priority.iter().copied().find(|&dir| {
            !self.is_obstructed(origin, orientation.axis(dir), entities, EntityFilter::All)
        })
    }
}
