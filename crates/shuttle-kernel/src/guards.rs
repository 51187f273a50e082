//! Step guards – preconditions checked before a step body runs.
//!
//! A step declares an ordered list of [`Guard`]s.  The engine evaluates them
//! against a [`GuardContext`] snapshot with [`first_trip`]; the first guard
//! that trips decides the tick and the body never runs:
//!
//! - [`GuardTrip::Skip`] – the step does not apply right now (already docked,
//!   orbit mode, timed out, …).  The engine advances past it.
//! - [`GuardTrip::Hold`] – the step cannot be evaluated yet (required hardware
//!   missing, off-cadence tick).  The engine retries it next tick.
//!
//! Guards never touch hardware.  Everything they need is read into the
//! context once per tick, so re-running a tripped guard any number of times
//! yields the same verdict and no actuator side effects.

use chrono::{DateTime, Duration, Utc};
use shuttle_perception::obstruction::{EntityFilter, ObstructionOracle};
use shuttle_types::{ConnectorStatus, DetectedEntity, Direction, EntityKind, Orientation, Vec3};

// ────────────────────────────────────────────────────────────────────────────
// Context
// ────────────────────────────────────────────────────────────────────────────

/// Everything a guard may look at, captured at the start of the step.
#[derive(Debug, Clone)]
pub struct GuardContext<'a> {
    pub tick: u64,
    pub now: DateTime<Utc>,
    /// When the step index last advanced.
    pub previous_step_end: DateTime<Utc>,
    pub orbit_mode: bool,
    /// `None` when no working docking connector is installed.
    pub connector_status: Option<ConnectorStatus>,
    /// Axes of the docking connector, the frame for directional guards.
    pub orientation: Orientation,
    /// Reference-point position.
    pub origin: Vec3,
    pub sensor_present: bool,
    pub entities: &'a [DetectedEntity],
    pub oracle: &'a ObstructionOracle,
    /// Stop flag of the current waypoint; `None` when there is none.
    pub waypoint_stops: Option<bool>,
}

// ────────────────────────────────────────────────────────────────────────────
// Guards
// ────────────────────────────────────────────────────────────────────────────

/// Verdict of a tripped guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardTrip {
    /// Advance past the step.
    Skip(String),
    /// Stay on the step and retry next tick.
    Hold(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Guard {
    /// Skip while orbit mode is active.
    OrbitMode,
    /// Skip when the connector is `Connected` or `Connectable`.
    Docked,
    /// Skip unless the connector is `Connected`.
    NotConnected,
    /// Skip once more than this many seconds passed since the last advance.
    Timeout(i64),
    /// Skip when the sensor sees no large grid.  Passes without a sensor.
    NoGridNearby,
    /// Skip when `direction` (connector frame) is obstructed.
    Obstructed(Direction, EntityFilter),
    /// Skip when the current waypoint is a pass-through waypoint.
    WaypointWithoutStop,
    /// Hold on every tick that is not a multiple of `n`.
    RunEvery(u64),
}

impl Guard {
    /// Evaluate this guard; `None` means it passes.
    pub fn check(&self, ctx: &GuardContext<'_>) -> Option<GuardTrip> {
        match *self {
            Guard::OrbitMode => ctx
                .orbit_mode
                .then(|| GuardTrip::Skip("orbit mode".to_string())),

            Guard::Docked => match ctx.connector_status {
                None => Some(no_connector()),
                Some(status) if status.is_docked() => {
                    Some(GuardTrip::Skip("ship docked".to_string()))
                }
                Some(_) => None,
            },

            Guard::NotConnected => match ctx.connector_status {
                None => Some(no_connector()),
                Some(ConnectorStatus::Connected) => None,
                Some(_) => Some(GuardTrip::Skip("ship undocked".to_string())),
            },

            // A limit chrono cannot represent never expires.
            Guard::Timeout(secs) => Duration::try_seconds(secs)
                .is_some_and(|limit| ctx.now - ctx.previous_step_end > limit)
                .then(|| GuardTrip::Skip(format!("timed out after {secs}s"))),

            Guard::NoGridNearby => {
                if !ctx.sensor_present {
                    return None;
                }
                let nearby = ctx.entities.iter().any(|e| e.kind == EntityKind::LargeGrid);
                (!nearby).then(|| GuardTrip::Skip("no grids nearby".to_string()))
            }

            Guard::Obstructed(direction, filter) => ctx
                .oracle
                .is_obstructed(ctx.origin, ctx.orientation.axis(direction), ctx.entities, filter)
                .then(|| GuardTrip::Skip(format!("{direction:?} obstructed"))),

            Guard::WaypointWithoutStop => match ctx.waypoint_stops {
                None => Some(GuardTrip::Hold("no current waypoint".to_string())),
                Some(false) => Some(GuardTrip::Skip("waypoint without stop".to_string())),
                Some(true) => None,
            },

            Guard::RunEvery(n) => (n > 1 && ctx.tick % n != 0)
                .then(|| GuardTrip::Hold(format!("runs every {n} ticks"))),
        }
    }
}

fn no_connector() -> GuardTrip {
    GuardTrip::Hold("no working connector found".to_string())
}

/// Evaluate `guards` in order and return the first trip.
pub fn first_trip(guards: &[Guard], ctx: &GuardContext<'_>) -> Option<(Guard, GuardTrip)> {
    guards
        .iter()
        .find_map(|guard| guard.check(ctx).map(|trip| (*guard, trip)))
}
