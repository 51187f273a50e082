//! Mission configuration and the mutable state threaded through every step.
//!
//! [`MissionConfig`] is read once at startup and never changes while the
//! engine runs.  [`MissionState`] is the single record the step bodies read
//! and write: step index, waypoint list, current waypoint, timing marks and
//! the last status line.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use shuttle_kernel::{BatteryThresholds, ExecutionBudget};
use shuttle_perception::obstruction::{
    DEFAULT_CONE_DEG, DEFAULT_DEPARTURE_PRIORITY, ObstructionOracle,
};
use shuttle_types::{Direction, ShuttleError, Vec3, Waypoint};

/// Longest accepted parking period or step timeout (one year).
pub const MAX_WAIT_SECS: i64 = 365 * 24 * 60 * 60;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Centre and radius of the orbit flown in orbit mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitSettings {
    pub center: Vec3,
    pub radius: f64,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            radius: 50_000.0,
        }
    }
}

/// Every tunable the engine reads.
///
/// Distances are in metres, durations in seconds unless the field name says
/// otherwise, capacities are ratios in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Visiting order in linear mode.
    pub waypoints: Vec<Waypoint>,
    /// How long the shuttle parks at a stop waypoint.
    pub parking_period_secs: i64,
    pub min_capacity: f64,
    pub target_capacity: f64,
    pub critical_capacity: f64,
    pub orbit_mode: bool,
    pub orbit: OrbitSettings,
    /// Distance from the dock after which the departure burn stops.
    pub safe_distance_from_dock: f64,
    /// A waypoint closer than this counts as reached.
    pub arrival_radius: f64,
    /// The autopilot is only engaged for targets farther than this.
    pub autopilot_engage_distance: f64,
    pub undock_timeout_secs: i64,
    pub docking_timeout_secs: i64,
    /// Thrust overrides stop growing above this speed (m/s).
    pub move_away_max_speed: f64,
    /// Newtons added to a departure thruster override every tick.
    pub thrust_step: f64,
    /// Newtons added on top of the current thrust when it exceeds the override.
    pub thrust_boost: f64,
    /// The battery step only evaluates on ticks that are a multiple of this.
    pub battery_check_every: u64,
    /// Ticks between hardware handle re-validations.
    pub revalidate_every: u64,
    pub max_run_ms: i64,
    pub max_load: f64,
    pub obstruction_cone_deg: f64,
    pub departure_priority: Vec<Direction>,
    /// Identity carried by state broadcasts.
    pub grid_id: i64,
    pub grid_name: String,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            waypoints: Vec::new(),
            parking_period_secs: 10,
            min_capacity: 0.5,
            target_capacity: 0.95,
            critical_capacity: 0.1,
            orbit_mode: false,
            orbit: OrbitSettings::default(),
            safe_distance_from_dock: 20.0,
            arrival_radius: 100.0,
            autopilot_engage_distance: 50.0,
            undock_timeout_secs: 10,
            docking_timeout_secs: 30,
            move_away_max_speed: 5.0,
            thrust_step: 2_000.0,
            thrust_boost: 5_000.0,
            battery_check_every: 2,
            revalidate_every: 100,
            max_run_ms: 35,
            max_load: 0.8,
            obstruction_cone_deg: DEFAULT_CONE_DEG,
            departure_priority: DEFAULT_DEPARTURE_PRIORITY.to_vec(),
            grid_id: 0,
            grid_name: "Shuttle".to_string(),
        }
    }
}

impl MissionConfig {
    pub fn thresholds(&self) -> BatteryThresholds {
        BatteryThresholds {
            min: self.min_capacity,
            target: self.target_capacity,
            critical: self.critical_capacity,
        }
    }

    pub fn budget(&self) -> ExecutionBudget {
        ExecutionBudget::new(Duration::milliseconds(self.max_run_ms), self.max_load)
    }

    pub fn oracle(&self) -> ObstructionOracle {
        ObstructionOracle::new(self.obstruction_cone_deg, self.departure_priority.clone())
    }

    /// Reject settings the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ShuttleError::Config`] naming the first offending setting.
    pub fn validate(&self) -> Result<(), ShuttleError> {
        self.thresholds().validate()?;

        let bad = |msg: String| Err(ShuttleError::Config(msg));
        for (name, secs) in [
            ("parking period", self.parking_period_secs),
            ("undock timeout", self.undock_timeout_secs),
            ("docking timeout", self.docking_timeout_secs),
        ] {
            if !(0..=MAX_WAIT_SECS).contains(&secs) {
                return bad(format!(
                    "{name} must lie in [0, {MAX_WAIT_SECS}] seconds, got {secs}"
                ));
            }
        }
        if self.orbit_mode && !(self.orbit.radius > 0.0) {
            return bad(format!("orbit radius must be positive, got {}", self.orbit.radius));
        }
        if !(self.arrival_radius > 0.0) {
            return bad(format!("arrival radius must be positive, got {}", self.arrival_radius));
        }
        if self.battery_check_every == 0 || self.revalidate_every == 0 {
            return bad("tick cadences must be at least 1".to_string());
        }
        if !(self.obstruction_cone_deg > 0.0 && self.obstruction_cone_deg < 180.0) {
            return bad(format!(
                "obstruction cone must lie in (0, 180) degrees, got {}",
                self.obstruction_cone_deg
            ));
        }
        if self.departure_priority.is_empty() {
            return bad("departure priority must name at least one direction".to_string());
        }
        if self.max_run_ms <= 0 || !(self.max_load > 0.0) {
            return bad("execution budget must be positive".to_string());
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// Everything that changes between ticks.
#[derive(Debug, Clone)]
pub struct MissionState {
    /// Index into [`ProcessStep::ALL`](crate::steps::ProcessStep::ALL).
    pub step: usize,
    /// Editable at runtime with `add-waypoint`.
    pub waypoints: Vec<Waypoint>,
    /// A copy of a list entry, or a synthetic orbit point.
    pub current_waypoint: Option<Waypoint>,
    /// When the step index last changed.
    pub previous_step_end: DateTime<Utc>,
    /// When the current tick started.
    pub cycle_start: DateTime<Utc>,
    /// Reference-point position when the step index last changed.
    pub last_ship_position: Vec3,
    pub status_text: String,
    /// Whether the host should keep ticking.
    pub running: bool,
    pub tick: u64,
}

impl MissionState {
    pub fn new(waypoints: Vec<Waypoint>, now: DateTime<Utc>) -> Self {
        Self {
            step: 0,
            waypoints,
            current_waypoint: None,
            previous_step_end: now,
            cycle_start: now,
            last_ship_position: Vec3::ZERO,
            status_text: String::new(),
            running: false,
            tick: 0,
        }
    }

    pub fn find_waypoint(&self, name: &str) -> Option<&Waypoint> {
        self.waypoints.iter().find(|w| w.name() == name)
    }

    /// The waypoint after the current one, looked up by name so edits to the
    /// list are honoured.  Falls back to the first waypoint when the current
    /// one is unset or no longer listed.
    pub fn next_waypoint(&self) -> Option<&Waypoint> {
        let len = self.waypoints.len();
        if len == 0 {
            return None;
        }
        let next = self
            .current_waypoint
            .as_ref()
            .and_then(|current| self.waypoints.iter().position(|w| w.name() == current.name()))
            .map_or(0, |i| (i + 1) % len);
        self.waypoints.get(next)
    }
}
