//! [`FlightController`] – the remote-control block driving the autopilot.
//!
//! The controller is also the shuttle's reference point: its position is the
//! position used for distances, arrival checks and state broadcasts.

use shuttle_types::{ShuttleError, Vec3};

/// How the autopilot treats its waypoint list once the last one is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlightMode {
    /// Fly to the last waypoint and stop.
    #[default]
    OneWay,
    /// Fly back and forth along the list.
    Patrol,
    /// Loop over the list forever.
    Circle,
}

/// Autopilot behaviour flags applied before a leg is flown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutopilotSettings {
    pub collision_avoidance: bool,
    pub flight_mode: FlightMode,
    /// Slow, precise approach aligned to the docking connector.
    pub precision_docking: bool,
}

impl AutopilotSettings {
    /// Settings for a leg that ends at `stop` (docking) or flies through.
    pub fn for_leg(stop: bool) -> Self {
        Self {
            collision_avoidance: true,
            flight_mode: FlightMode::OneWay,
            precision_docking: stop,
        }
    }
}

/// A remote-control block with an autopilot.
pub trait FlightController: Send + Sync {
    /// Stable identifier, e.g. `"remote_control"`.
    fn id(&self) -> &str;

    /// `false` once the block is damaged or removed from the grid.
    fn is_working(&self) -> bool;

    /// World-space position of the block.
    fn position(&self) -> Vec3;

    /// Current ship speed in m/s.
    fn speed(&self) -> f64;

    /// Coordinates of the waypoint the autopilot is currently heading for.
    fn current_target(&self) -> Option<Vec3>;

    fn configure(&mut self, settings: &AutopilotSettings) -> Result<(), ShuttleError>;

    /// Append a waypoint to the autopilot list.
    fn add_waypoint(&mut self, coords: Vec3, name: &str) -> Result<(), ShuttleError>;

    fn clear_waypoints(&mut self) -> Result<(), ShuttleError>;

    fn set_autopilot_enabled(&mut self, enabled: bool) -> Result<(), ShuttleError>;

    fn is_autopilot_enabled(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_legs_use_precision_docking() {
        let stop = AutopilotSettings::for_leg(true);
        assert!(stop.precision_docking);
        assert!(stop.collision_avoidance);
        assert_eq!(stop.flight_mode, FlightMode::OneWay);

        assert!(!AutopilotSettings::for_leg(false).precision_docking);
    }
}
