//! The fixed, cyclic list of mission steps and their bodies.
//!
//! A lap runs every [`ProcessStep`] in [`ProcessStep::ALL`] order.  Each step
//! declares its [`Guard`]s; the engine evaluates them before the body and the
//! body only ever sees a step that applies.  Bodies report what happened with
//! a [`StepOutcome`] and never touch the step index themselves.
//!
//! | Step | Guards | Completes when |
//! |---|---|---|
//! | `ResetControl` | | immediately |
//! | `FindNextWaypoint` | | a waypoint is selected |
//! | `WaitBeforeUndock` | orbit, no grid, undock timeout | the timeout skips it |
//! | `DoBeforeUndock` | orbit, no grid | immediately |
//! | `Undock` | orbit, no grid | the connector is released |
//! | `MoveAwayFromDock` | orbit, no grid | the safe distance is reached |
//! | `ResetThrustOverride` | | immediately |
//! | `GoToWaypoint` | docked | the autopilot is armed |
//! | `TravelToWaypoint` | docked, pass-through | stopped inside the arrival radius |
//! | `DockToStation` | orbit, docked | the docking script is started |
//! | `WaitDockingCompletion` | orbit, docking timeout | the connector locks |
//! | `DisconnectConnector` | orbit, docked | a partial lock is released |
//! | `DoAfterDocking` | orbit | immediately |
//! | `RechargeBatteries` | orbit, cadence, not connected | charge is back above target |
//! | `WaitAtWaypoint` | | the parking period elapsed |

use chrono::{DateTime, Duration, Utc};
use shuttle_hal::{AutopilotSettings, ShipRegistry};
use shuttle_kernel::{BatteryManager, BatteryReading, Guard};
use shuttle_perception::obstruction::{EntityFilter, ObstructionOracle};
use shuttle_perception::orbit::OrbitGenerator;
use shuttle_types::{
    BlockTag, ChargeMode, ConnectorStatus, DetectedEntity, Direction, SensorSettings,
    ShuttleError,
};
use tracing::{debug, info, warn};

use crate::mission::{MissionConfig, MissionState};

// ─────────────────────────────────────────────────────────────────────────────
// Outcome and context
// ─────────────────────────────────────────────────────────────────────────────

/// What a step body did this tick.  Faults travel on the `Err` arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Work finished; move to the next step.
    Advance,
    /// The step does not apply; move to the next step.
    Skip(String),
    /// No progress yet; run the same step next tick.
    Retry(String),
}

/// Everything a step body may read or mutate.
pub struct StepContext<'a> {
    pub config: &'a MissionConfig,
    pub state: &'a mut MissionState,
    pub ship: &'a mut ShipRegistry,
    pub battery: &'a mut BatteryManager,
    pub orbit: &'a mut OrbitGenerator,
    pub oracle: &'a ObstructionOracle,
    pub now: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Step list
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessStep {
    ResetControl,
    FindNextWaypoint,
    WaitBeforeUndock,
    DoBeforeUndock,
    Undock,
    MoveAwayFromDock,
    ResetThrustOverride,
    GoToWaypoint,
    TravelToWaypoint,
    DockToStation,
    WaitDockingCompletion,
    DisconnectConnector,
    DoAfterDocking,
    RechargeBatteries,
    WaitAtWaypoint,
}

impl ProcessStep {
    /// Execution order of one lap.
    pub const ALL: [ProcessStep; 15] = [
        ProcessStep::ResetControl,
        ProcessStep::FindNextWaypoint,
        ProcessStep::WaitBeforeUndock,
        ProcessStep::DoBeforeUndock,
        ProcessStep::Undock,
        ProcessStep::MoveAwayFromDock,
        ProcessStep::ResetThrustOverride,
        ProcessStep::GoToWaypoint,
        ProcessStep::TravelToWaypoint,
        ProcessStep::DockToStation,
        ProcessStep::WaitDockingCompletion,
        ProcessStep::DisconnectConnector,
        ProcessStep::DoAfterDocking,
        ProcessStep::RechargeBatteries,
        ProcessStep::WaitAtWaypoint,
    ];

    /// Step at `index`, wrapping past the end.
    pub fn at(index: usize) -> ProcessStep {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn name(self) -> &'static str {
        match self {
            ProcessStep::ResetControl => "ResetControl",
            ProcessStep::FindNextWaypoint => "FindNextWaypoint",
            ProcessStep::WaitBeforeUndock => "WaitBeforeUndock",
            ProcessStep::DoBeforeUndock => "DoBeforeUndock",
            ProcessStep::Undock => "Undock",
            ProcessStep::MoveAwayFromDock => "MoveAwayFromDock",
            ProcessStep::ResetThrustOverride => "ResetThrustOverride",
            ProcessStep::GoToWaypoint => "GoToWaypoint",
            ProcessStep::TravelToWaypoint => "TravelToWaypoint",
            ProcessStep::DockToStation => "DockToStation",
            ProcessStep::WaitDockingCompletion => "WaitDockingCompletion",
            ProcessStep::DisconnectConnector => "DisconnectConnector",
            ProcessStep::DoAfterDocking => "DoAfterDocking",
            ProcessStep::RechargeBatteries => "RechargeBatteries",
            ProcessStep::WaitAtWaypoint => "WaitAtWaypoint",
        }
    }

    /// Preconditions evaluated in order before the body runs.
    pub fn guards(self, config: &MissionConfig) -> Vec<Guard> {
        match self {
            ProcessStep::WaitBeforeUndock => vec![
                Guard::OrbitMode,
                Guard::NoGridNearby,
                Guard::Timeout(config.undock_timeout_secs),
            ],
            ProcessStep::DoBeforeUndock | ProcessStep::Undock | ProcessStep::MoveAwayFromDock => {
                vec![Guard::OrbitMode, Guard::NoGridNearby]
            }
            ProcessStep::GoToWaypoint => vec![Guard::Docked],
            ProcessStep::TravelToWaypoint => vec![Guard::Docked, Guard::WaypointWithoutStop],
            ProcessStep::DockToStation | ProcessStep::DisconnectConnector => {
                vec![Guard::OrbitMode, Guard::Docked]
            }
            ProcessStep::WaitDockingCompletion => vec![
                Guard::OrbitMode,
                Guard::Timeout(config.docking_timeout_secs),
            ],
            ProcessStep::DoAfterDocking => vec![Guard::OrbitMode],
            ProcessStep::RechargeBatteries => vec![
                Guard::OrbitMode,
                Guard::RunEvery(config.battery_check_every),
                Guard::NotConnected,
            ],
            ProcessStep::ResetControl
            | ProcessStep::FindNextWaypoint
            | ProcessStep::ResetThrustOverride
            | ProcessStep::WaitAtWaypoint => Vec::new(),
        }
    }

    /// Run the body once.
    ///
    /// # Errors
    ///
    /// Propagates hardware errors unchanged; the engine decides whether they
    /// stall the step or fault the mission.
    pub fn run(self, cx: &mut StepContext<'_>) -> Result<StepOutcome, ShuttleError> {
        match self {
            ProcessStep::ResetControl => reset_control(cx),
            ProcessStep::FindNextWaypoint => find_next_waypoint(cx),
            ProcessStep::WaitBeforeUndock => wait_before_undock(cx),
            ProcessStep::DoBeforeUndock => {
                run_actions(cx, BlockTag::BeforeUndocking, BlockTag::ToggleBeforeUndocking)
            }
            ProcessStep::Undock => undock(cx),
            ProcessStep::MoveAwayFromDock => move_away_from_dock(cx),
            ProcessStep::ResetThrustOverride => {
                cx.ship.set_all_thrust_overrides(0.0)?;
                Ok(StepOutcome::Advance)
            }
            ProcessStep::GoToWaypoint => go_to_waypoint(cx),
            ProcessStep::TravelToWaypoint => travel_to_waypoint(cx),
            ProcessStep::DockToStation => dock_to_station(cx),
            ProcessStep::WaitDockingCompletion => wait_docking_completion(cx),
            ProcessStep::DisconnectConnector => disconnect_connector(cx),
            ProcessStep::DoAfterDocking => {
                run_actions(cx, BlockTag::AfterDocking, BlockTag::ToggleAfterDocking)
            }
            ProcessStep::RechargeBatteries => recharge_batteries(cx),
            ProcessStep::WaitAtWaypoint => wait_at_waypoint(cx),
        }
    }
}

impl std::fmt::Display for ProcessStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Step bodies
// ─────────────────────────────────────────────────────────────────────────────

fn no_waypoint() -> StepOutcome {
    StepOutcome::Retry("no current waypoint".to_string())
}

/// Entities from the sensor, or none when no sensor is installed.
pub(crate) fn detected_entities(ship: &ShipRegistry) -> Vec<DetectedEntity> {
    ship.sensor()
        .map(|s| s.detected_entities())
        .unwrap_or_default()
}

fn reset_control(cx: &mut StepContext<'_>) -> Result<StepOutcome, ShuttleError> {
    for battery in cx.ship.batteries_mut().iter_mut() {
        battery.set_charge_mode(ChargeMode::Auto)?;
    }
    if let Some(sensor) = cx.ship.sensor_mut() {
        sensor.configure(&SensorSettings::default())?;
    }
    cx.battery.reset_charge_latch();
    Ok(StepOutcome::Advance)
}

fn find_next_waypoint(cx: &mut StepContext<'_>) -> Result<StepOutcome, ShuttleError> {
    if cx.config.orbit_mode {
        let position = cx.ship.flight_controller()?.position();
        let waypoint = cx.orbit.next_waypoint(position);
        cx.state.current_waypoint = Some(waypoint);
        return Ok(StepOutcome::Advance);
    }

    if cx.state.waypoints.is_empty() {
        return Ok(StepOutcome::Retry("No waypoint defined".to_string()));
    }

    let reached = match &cx.state.current_waypoint {
        None => true,
        Some(current) => {
            let position = cx.ship.flight_controller()?.position();
            position.distance(current.coords()) < cx.config.arrival_radius
        }
    };
    if reached {
        let next = cx.state.next_waypoint().cloned();
        if let Some(next) = next {
            info!(waypoint = next.name(), "next waypoint selected");
            cx.state.current_waypoint = Some(next);
        }
    }
    Ok(StepOutcome::Advance)
}

fn wait_before_undock(cx: &mut StepContext<'_>) -> Result<StepOutcome, ShuttleError> {
    cx.state.status_text = "Doors are closing".to_string();
    Ok(StepOutcome::Retry("waiting for undock timeout".to_string()))
}

fn run_actions(
    cx: &mut StepContext<'_>,
    timers: BlockTag,
    toggles: BlockTag,
) -> Result<StepOutcome, ShuttleError> {
    let fired = cx.ship.trigger_timers(timers)?;
    let toggled = cx.ship.toggle_blocks(toggles)?;
    debug!(?timers, fired, ?toggles, toggled, "block actions run");
    Ok(StepOutcome::Advance)
}

fn undock(cx: &mut StepContext<'_>) -> Result<StepOutcome, ShuttleError> {
    let connector = cx.ship.connector_mut()?;
    connector.disconnect()?;
    connector.set_pull_strength(0.0)?;
    if connector.status() == ConnectorStatus::Connected {
        Ok(StepOutcome::Retry("connector still locked".to_string()))
    } else {
        Ok(StepOutcome::Advance)
    }
}

fn move_away_from_dock(cx: &mut StepContext<'_>) -> Result<StepOutcome, ShuttleError> {
    let orientation = cx.ship.connector()?.orientation();
    let controller = cx.ship.flight_controller()?;
    let origin = controller.position();
    let speed = controller.speed();
    let entities = detected_entities(cx.ship);

    let Some(direction) = cx.oracle.departure_direction(origin, &orientation, &entities) else {
        cx.ship.set_all_thrust_overrides(0.0)?;
        return Ok(StepOutcome::Retry(
            "Ship is obstructed, waiting clearance".to_string(),
        ));
    };

    let distance = cx.state.last_ship_position.distance(origin);
    if distance > cx.config.safe_distance_from_dock {
        return Ok(StepOutcome::Advance);
    }
    if speed < cx.config.move_away_max_speed {
        // Exhaust points away from the travel direction.
        let exhaust = orientation.axis(direction.opposite());
        let mut pushed = 0;
        for thruster in cx
            .ship
            .thrusters_mut()
            .iter_mut()
            .filter(|t| t.facing().approx_eq(exhaust, 1e-3))
        {
            let mut value = thruster.thrust_override();
            if thruster.current_thrust() > value {
                value = thruster.current_thrust() + cx.config.thrust_boost;
            }
            thruster.set_thrust_override(value + cx.config.thrust_step)?;
            pushed += 1;
        }
        debug!(?direction, pushed, distance, "pushing away from dock");
    }
    Ok(StepOutcome::Retry(format!(
        "moving {direction:?}, {distance:.0}m from dock"
    )))
}

fn go_to_waypoint(cx: &mut StepContext<'_>) -> Result<StepOutcome, ShuttleError> {
    let Some(waypoint) = cx.state.current_waypoint.clone() else {
        return Ok(no_waypoint());
    };
    let controller = cx.ship.flight_controller_mut()?;

    if controller
        .current_target()
        .is_some_and(|t| t.approx_eq(waypoint.coords(), 1e-6))
    {
        debug!(waypoint = waypoint.name(), "autopilot already targets waypoint");
        return Ok(StepOutcome::Advance);
    }

    controller.configure(&AutopilotSettings::for_leg(waypoint.stop_at_waypoint()))?;
    controller.clear_waypoints()?;
    if controller.position().distance(waypoint.coords()) > cx.config.autopilot_engage_distance {
        controller.add_waypoint(waypoint.coords(), waypoint.name())?;
        controller.set_autopilot_enabled(true)?;
        info!(waypoint = waypoint.name(), "autopilot engaged");
    }
    Ok(StepOutcome::Advance)
}

fn travel_to_waypoint(cx: &mut StepContext<'_>) -> Result<StepOutcome, ShuttleError> {
    let Some(waypoint) = cx.state.current_waypoint.clone() else {
        return Ok(no_waypoint());
    };
    let controller = cx.ship.flight_controller_mut()?;
    let distance = controller.position().distance(waypoint.coords());
    let speed = controller.speed();

    cx.state.status_text = if speed > 0.0 {
        format!("Arriving at {} in {:.0}s", waypoint.name(), distance / speed)
    } else {
        format!("Arriving at {}", waypoint.name())
    };

    if speed.round() == 0.0 && distance < cx.config.arrival_radius {
        controller.set_autopilot_enabled(false)?;
        info!(waypoint = waypoint.name(), "arrived");
        return Ok(StepOutcome::Advance);
    }
    Ok(StepOutcome::Retry(format!("{distance:.0}m to {}", waypoint.name())))
}

fn dock_to_station(cx: &mut StepContext<'_>) -> Result<StepOutcome, ShuttleError> {
    let Some(waypoint) = cx.state.current_waypoint.clone() else {
        return Ok(no_waypoint());
    };

    match cx.ship.docking_script() {
        Some(script) if script.is_working() => {
            if script.is_running() {
                return Ok(StepOutcome::Skip("Docking script already running".to_string()));
            }
        }
        _ => {
            warn!("docking script not found");
            return Ok(StepOutcome::Skip("Docking script not found".to_string()));
        }
    }

    let orientation = cx.ship.connector()?.orientation();
    let origin = cx.ship.flight_controller()?.position();
    let entities = detected_entities(cx.ship);
    if cx.oracle.is_obstructed(
        origin,
        orientation.axis(Direction::Forward),
        &entities,
        EntityFilter::SmallGrid,
    ) {
        return Ok(StepOutcome::Retry(
            "Path obstructed, waiting for docking".to_string(),
        ));
    }

    let started = match cx.ship.docking_script_mut() {
        Some(script) => script.run(waypoint.name())?,
        None => false,
    };
    if !started {
        return Ok(StepOutcome::Retry("docking script refused to start".to_string()));
    }
    info!(waypoint = waypoint.name(), "docking script started");
    Ok(StepOutcome::Advance)
}

fn wait_docking_completion(cx: &mut StepContext<'_>) -> Result<StepOutcome, ShuttleError> {
    if let Some(waypoint) = &cx.state.current_waypoint {
        cx.state.status_text = format!("Docking at {}", waypoint.name());
    }
    let connector = cx.ship.connector_mut()?;
    match connector.status() {
        ConnectorStatus::Connectable => {
            connector.connect()?;
            Ok(StepOutcome::Advance)
        }
        ConnectorStatus::Connected => Ok(StepOutcome::Advance),
        ConnectorStatus::Unconnected => Ok(StepOutcome::Retry("waiting for docking".to_string())),
    }
}

fn disconnect_connector(cx: &mut StepContext<'_>) -> Result<StepOutcome, ShuttleError> {
    let connector = cx.ship.connector_mut()?;
    connector.disconnect()?;
    if connector.status() == ConnectorStatus::Connected {
        Ok(StepOutcome::Retry("Connector still connected".to_string()))
    } else {
        Ok(StepOutcome::Advance)
    }
}

fn recharge_batteries(cx: &mut StepContext<'_>) -> Result<StepOutcome, ShuttleError> {
    let units: Vec<(usize, BatteryReading)> = cx
        .ship
        .batteries_mut()
        .iter()
        .enumerate()
        .filter(|(_, b)| b.is_functional())
        .map(|(i, b)| (i, BatteryReading::new(b.current_stored(), b.max_stored())))
        .collect();
    let readings: Vec<BatteryReading> = units.iter().map(|(_, r)| *r).collect();

    let Some(intent) = cx.battery.update_charge_intent(&readings) else {
        return Ok(StepOutcome::Skip("no batteries found".to_string()));
    };

    let batteries = cx.ship.batteries_mut();
    for ((index, _), mode) in units.iter().zip(&intent.modes) {
        if let Some(battery) = batteries.get_mut(*index)
            && battery.charge_mode() != *mode
        {
            battery.set_charge_mode(*mode)?;
        }
    }

    if intent.charging {
        cx.state.status_text = format!("Charging batteries: {:.0}%", intent.ratio * 100.0);
        Ok(StepOutcome::Retry(cx.state.status_text.clone()))
    } else {
        Ok(StepOutcome::Advance)
    }
}

fn wait_at_waypoint(cx: &mut StepContext<'_>) -> Result<StepOutcome, ShuttleError> {
    let stops = cx
        .state
        .current_waypoint
        .as_ref()
        .is_some_and(|w| w.stop_at_waypoint());
    if !stops {
        return Ok(StepOutcome::Advance);
    }

    let parking = Duration::try_seconds(cx.config.parking_period_secs).ok_or_else(|| {
        ShuttleError::Config(format!(
            "parking period {}s out of range",
            cx.config.parking_period_secs
        ))
    })?;
    let elapsed = cx.now - cx.state.previous_step_end;
    if elapsed >= parking {
        return Ok(StepOutcome::Advance);
    }

    let next = cx
        .state
        .next_waypoint()
        .map_or_else(|| "NA".to_string(), |w| w.name().to_string());
    let remaining = (parking - elapsed).num_seconds();
    cx.state.status_text = format!("Departure for {next} in {remaining}s");
    Ok(StepOutcome::Retry(cx.state.status_text.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shuttle_hal::sim::SimShip;
    use shuttle_kernel::BatteryThresholds;
    use shuttle_types::{EntityKind, Vec3, Waypoint};

    struct Fixture {
        config: MissionConfig,
        state: MissionState,
        battery: BatteryManager,
        orbit: OrbitGenerator,
        oracle: ObstructionOracle,
        sim: SimShip,
        ship: ShipRegistry,
    }

    impl Fixture {
        fn new(sim: SimShip) -> Self {
            let config = MissionConfig {
                waypoints: vec![
                    Waypoint::new("Base", Vec3::ZERO, true),
                    Waypoint::new("Outpost", Vec3::new(5_000.0, 0.0, 0.0), true),
                ],
                ..MissionConfig::default()
            };
            let state = MissionState::new(config.waypoints.clone(), sim.now());
            Self {
                battery: BatteryManager::new(config.thresholds()),
                orbit: OrbitGenerator::new(config.orbit.center, config.orbit.radius),
                oracle: config.oracle(),
                ship: sim.build(),
                config,
                state,
                sim,
            }
        }

        fn run(&mut self, step: ProcessStep) -> Result<StepOutcome, ShuttleError> {
            let mut cx = StepContext {
                config: &self.config,
                state: &mut self.state,
                ship: &mut self.ship,
                battery: &mut self.battery,
                orbit: &mut self.orbit,
                oracle: &self.oracle,
                now: self.sim.now(),
            };
            step.run(&mut cx)
        }
    }

    #[test]
    fn step_list_has_fifteen_unique_steps() {
        let mut names: Vec<_> = ProcessStep::ALL.iter().map(|s| s.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 15);
        assert_eq!(ProcessStep::at(15), ProcessStep::ResetControl);
    }

    #[test]
    fn guard_lists_follow_mission_config() {
        let config = MissionConfig {
            docking_timeout_secs: 45,
            ..MissionConfig::default()
        };
        assert_eq!(
            ProcessStep::WaitDockingCompletion.guards(&config),
            vec![Guard::OrbitMode, Guard::Timeout(45)]
        );
        assert!(ProcessStep::ResetControl.guards(&config).is_empty());
    }

    #[test]
    fn reset_control_restores_auto_and_configures_sensor() {
        let mut fx = Fixture::new(SimShip::fully_equipped());
        fx.ship.batteries_mut()[0]
            .set_charge_mode(ChargeMode::Recharge)
            .unwrap();
        assert_eq!(fx.run(ProcessStep::ResetControl).unwrap(), StepOutcome::Advance);
        assert_eq!(fx.sim.battery_modes(), vec![ChargeMode::Auto, ChargeMode::Auto]);
        assert_eq!(fx.sim.sensor_settings(), Some(SensorSettings::default()));
    }

    #[test]
    fn find_next_waypoint_without_waypoints_retries() {
        let mut fx = Fixture::new(SimShip::fully_equipped());
        fx.state.waypoints.clear();
        assert!(matches!(
            fx.run(ProcessStep::FindNextWaypoint).unwrap(),
            StepOutcome::Retry(_)
        ));
        assert!(fx.state.current_waypoint.is_none());
    }

    #[test]
    fn find_next_waypoint_moves_on_only_when_reached() {
        let mut fx = Fixture::new(SimShip::fully_equipped());
        fx.run(ProcessStep::FindNextWaypoint).unwrap();
        assert_eq!(fx.state.current_waypoint.as_ref().unwrap().name(), "Base");

        // Ship sits at Base (origin): the next lap targets Outpost.
        fx.run(ProcessStep::FindNextWaypoint).unwrap();
        assert_eq!(fx.state.current_waypoint.as_ref().unwrap().name(), "Outpost");

        // Still far from Outpost: keep it.
        fx.run(ProcessStep::FindNextWaypoint).unwrap();
        assert_eq!(fx.state.current_waypoint.as_ref().unwrap().name(), "Outpost");
    }

    #[test]
    fn find_next_waypoint_in_orbit_mode_is_synthetic() {
        let mut fx = Fixture::new(SimShip::fully_equipped());
        fx.config.orbit_mode = true;
        fx.sim.set_position(Vec3::new(50_000.0, 0.0, 0.0));
        fx.run(ProcessStep::FindNextWaypoint).unwrap();
        let wp = fx.state.current_waypoint.clone().unwrap();
        assert!(!wp.stop_at_waypoint());
        assert!((wp.coords().length() - 50_000.0).abs() < 1e-6);
    }

    #[test]
    fn find_next_waypoint_needs_a_controller_once_a_waypoint_is_set() {
        let mut fx = Fixture::new(SimShip::new());
        fx.state.current_waypoint = Some(fx.state.waypoints[0].clone());
        assert!(matches!(
            fx.run(ProcessStep::FindNextWaypoint),
            Err(ShuttleError::MissingHardware { .. })
        ));
    }

    #[test]
    fn undock_releases_connector_and_pull() {
        let mut fx = Fixture::new(SimShip::fully_equipped());
        fx.sim.set_connector_status(ConnectorStatus::Connected);
        assert_eq!(fx.run(ProcessStep::Undock).unwrap(), StepOutcome::Advance);
        assert_eq!(fx.sim.connector_status(), ConnectorStatus::Connectable);
        assert_eq!(fx.sim.pull_strength(), 0.0);
    }

    #[test]
    fn move_away_pushes_with_thrusters_facing_forward() {
        let mut fx = Fixture::new(SimShip::fully_equipped());
        // Backward is the first clear direction: push with the forward-facing
        // thruster (index 0 in the sim layout).
        let outcome = fx.run(ProcessStep::MoveAwayFromDock).unwrap();
        assert!(matches!(outcome, StepOutcome::Retry(_)));
        let overrides = fx.sim.thrust_overrides();
        assert_eq!(overrides[0], 2_000.0);
        assert!(overrides[1..].iter().all(|&o| o == 0.0));

        fx.run(ProcessStep::MoveAwayFromDock).unwrap();
        assert_eq!(fx.sim.thrust_overrides()[0], 4_000.0);
    }

    #[test]
    fn move_away_falls_back_to_next_clear_direction() {
        let mut fx = Fixture::new(SimShip::fully_equipped());
        // Connector backward is +Z with the identity orientation.
        fx.sim.add_entity(DetectedEntity::new(
            1,
            "Station",
            EntityKind::LargeGrid,
            Vec3::new(5.0, 0.0, 30.0),
        ));
        fx.run(ProcessStep::ResetControl).unwrap();
        fx.run(ProcessStep::MoveAwayFromDock).unwrap();
        let overrides = fx.sim.thrust_overrides();
        // Forward is next: push with the backward-facing thruster.
        assert_eq!(overrides[1], 2_000.0);
        assert_eq!(overrides[0], 0.0);
    }

    #[test]
    fn move_away_stops_pushing_when_fully_obstructed() {
        let mut fx = Fixture::new(SimShip::fully_equipped());
        let around = [
            Vec3::new(5.0, 5.0, 30.0),
            Vec3::new(5.0, 5.0, -30.0),
            Vec3::new(30.0, 5.0, 5.0),
            Vec3::new(-30.0, 5.0, 5.0),
            Vec3::new(5.0, 30.0, 5.0),
            Vec3::new(5.0, -30.0, 5.0),
        ];
        for (i, p) in around.into_iter().enumerate() {
            fx.sim
                .add_entity(DetectedEntity::new(i as i64, "Debris", EntityKind::SmallGrid, p));
        }
        fx.run(ProcessStep::ResetControl).unwrap();
        fx.ship.set_all_thrust_overrides(1_000.0).unwrap();
        assert_eq!(
            fx.run(ProcessStep::MoveAwayFromDock).unwrap(),
            StepOutcome::Retry("Ship is obstructed, waiting clearance".to_string())
        );
        assert!(fx.sim.thrust_overrides().iter().all(|&o| o == 0.0));
    }

    #[test]
    fn move_away_advances_past_safe_distance() {
        let mut fx = Fixture::new(SimShip::fully_equipped());
        fx.sim.set_position(Vec3::new(0.0, 0.0, 25.0));
        assert_eq!(fx.run(ProcessStep::MoveAwayFromDock).unwrap(), StepOutcome::Advance);
    }

    #[test]
    fn go_to_waypoint_arms_autopilot_for_far_targets() {
        let mut fx = Fixture::new(SimShip::fully_equipped());
        fx.state.current_waypoint = Some(fx.state.waypoints[1].clone());
        assert_eq!(fx.run(ProcessStep::GoToWaypoint).unwrap(), StepOutcome::Advance);
        assert!(fx.sim.autopilot_enabled());
        assert_eq!(fx.sim.autopilot_waypoints().len(), 1);
        assert_eq!(fx.sim.autopilot_settings(), Some(AutopilotSettings::for_leg(true)));

        // Re-running while the autopilot already targets it changes nothing.
        fx.run(ProcessStep::GoToWaypoint).unwrap();
        assert_eq!(fx.sim.autopilot_waypoints().len(), 1);
    }

    #[test]
    fn go_to_waypoint_skips_autopilot_for_close_targets() {
        let mut fx = Fixture::new(SimShip::fully_equipped());
        fx.state.current_waypoint = Some(fx.state.waypoints[0].clone());
        fx.run(ProcessStep::GoToWaypoint).unwrap();
        assert!(!fx.sim.autopilot_enabled());
        assert!(fx.sim.autopilot_waypoints().is_empty());
    }

    #[test]
    fn travel_waits_until_stopped_inside_arrival_radius() {
        let mut fx = Fixture::new(SimShip::fully_equipped());
        fx.state.current_waypoint = Some(fx.state.waypoints[1].clone());
        fx.sim.set_speed(100.0);
        assert!(matches!(
            fx.run(ProcessStep::TravelToWaypoint).unwrap(),
            StepOutcome::Retry(_)
        ));
        assert_eq!(fx.state.status_text, "Arriving at Outpost in 50s");

        fx.sim.set_position(Vec3::new(4_950.0, 0.0, 0.0));
        fx.sim.set_speed(0.2);
        assert_eq!(fx.run(ProcessStep::TravelToWaypoint).unwrap(), StepOutcome::Advance);
        assert!(!fx.sim.autopilot_enabled());
    }

    #[test]
    fn dock_to_station_without_script_skips() {
        let mut fx = Fixture::new(SimShip::new().with_flight_controller().with_connector());
        fx.state.current_waypoint = Some(fx.state.waypoints[0].clone());
        assert!(matches!(
            fx.run(ProcessStep::DockToStation).unwrap(),
            StepOutcome::Skip(_)
        ));
    }

    #[test]
    fn dock_to_station_skips_while_script_runs() {
        let mut fx = Fixture::new(SimShip::fully_equipped());
        fx.state.current_waypoint = Some(fx.state.waypoints[0].clone());
        fx.sim.set_script_running(true);
        assert_eq!(
            fx.run(ProcessStep::DockToStation).unwrap(),
            StepOutcome::Skip("Docking script already running".to_string())
        );
        assert!(fx.sim.docking_runs().is_empty());
    }

    #[test]
    fn broken_controller_is_missing_hardware() {
        let mut fx = Fixture::new(SimShip::fully_equipped());
        fx.state.current_waypoint = Some(fx.state.waypoints[1].clone());
        fx.sim.set_controller_working(false);
        fx.ship.refresh_handles(1);
        assert!(matches!(
            fx.run(ProcessStep::GoToWaypoint),
            Err(ShuttleError::MissingHardware { .. })
        ));
    }

    #[test]
    fn dock_to_station_waits_for_clear_approach() {
        let mut fx = Fixture::new(SimShip::fully_equipped());
        fx.state.current_waypoint = Some(fx.state.waypoints[0].clone());
        fx.sim.add_entity(DetectedEntity::new(
            9,
            "Tug",
            EntityKind::SmallGrid,
            Vec3::new(3.0, 0.0, -30.0),
        ));
        fx.run(ProcessStep::ResetControl).unwrap();
        assert_eq!(
            fx.run(ProcessStep::DockToStation).unwrap(),
            StepOutcome::Retry("Path obstructed, waiting for docking".to_string())
        );
        assert!(fx.sim.docking_runs().is_empty());

        fx.sim.clear_entities();
        assert_eq!(fx.run(ProcessStep::DockToStation).unwrap(), StepOutcome::Advance);
        assert_eq!(fx.sim.docking_runs(), vec!["Base".to_string()]);
    }

    #[test]
    fn wait_docking_completion_locks_connectable_connector() {
        let mut fx = Fixture::new(SimShip::fully_equipped());
        fx.state.current_waypoint = Some(fx.state.waypoints[0].clone());
        assert!(matches!(
            fx.run(ProcessStep::WaitDockingCompletion).unwrap(),
            StepOutcome::Retry(_)
        ));
        assert_eq!(fx.state.status_text, "Docking at Base");

        fx.sim.set_connector_status(ConnectorStatus::Connectable);
        assert_eq!(
            fx.run(ProcessStep::WaitDockingCompletion).unwrap(),
            StepOutcome::Advance
        );
        assert_eq!(fx.sim.connector_status(), ConnectorStatus::Connected);
    }

    #[test]
    fn do_after_docking_fires_tagged_blocks() {
        let sim = SimShip::fully_equipped()
            .with_timer("after", &[BlockTag::AfterDocking])
            .with_timer("before", &[BlockTag::BeforeUndocking])
            .with_block("lights", &[BlockTag::ToggleAfterDocking], false);
        let mut fx = Fixture::new(sim);
        fx.run(ProcessStep::DoAfterDocking).unwrap();
        assert_eq!(fx.sim.timer_triggers("after"), 1);
        assert_eq!(fx.sim.timer_triggers("before"), 0);
        assert_eq!(fx.sim.block_enabled("lights"), Some(true));
    }

    #[test]
    fn recharge_splits_fleet_and_holds() {
        let sim = SimShip::new()
            .with_connector()
            .with_battery(0.4, 1.0)
            .with_battery(0.4, 1.0);
        let mut fx = Fixture::new(sim);
        let outcome = fx.run(ProcessStep::RechargeBatteries).unwrap();
        assert_eq!(outcome, StepOutcome::Retry("Charging batteries: 40%".to_string()));
        let modes = fx.sim.battery_modes();
        assert_eq!(modes.iter().filter(|&&m| m == ChargeMode::Recharge).count(), 1);
        assert_eq!(modes.iter().filter(|&&m| m == ChargeMode::Auto).count(), 1);
        assert!(fx.battery.is_low_latched());
    }

    #[test]
    fn recharge_without_batteries_skips() {
        let mut fx = Fixture::new(SimShip::new().with_connector());
        assert!(matches!(
            fx.run(ProcessStep::RechargeBatteries).unwrap(),
            StepOutcome::Skip(_)
        ));
    }

    #[test]
    fn recharge_advances_when_charged() {
        let sim = SimShip::new().with_battery(9.8, 10.0);
        let mut fx = Fixture::new(sim);
        fx.battery = BatteryManager::new(BatteryThresholds::default());
        assert_eq!(fx.run(ProcessStep::RechargeBatteries).unwrap(), StepOutcome::Advance);
    }

    #[test]
    fn wait_at_waypoint_parks_for_the_period() {
        let mut fx = Fixture::new(SimShip::fully_equipped());
        fx.state.current_waypoint = Some(fx.state.waypoints[0].clone());
        fx.state.previous_step_end = fx.sim.now();

        fx.sim.advance_time(4.0);
        assert!(matches!(
            fx.run(ProcessStep::WaitAtWaypoint).unwrap(),
            StepOutcome::Retry(_)
        ));
        assert_eq!(fx.state.status_text, "Departure for Outpost in 6s");

        fx.sim.advance_time(6.0);
        assert_eq!(fx.run(ProcessStep::WaitAtWaypoint).unwrap(), StepOutcome::Advance);
    }

    #[test]
    fn wait_at_waypoint_passes_through_non_stop_waypoints() {
        let mut fx = Fixture::new(SimShip::fully_equipped());
        fx.state.current_waypoint = Some(Waypoint::new("Orbit", Vec3::UNIT_X, false));
        assert_eq!(fx.run(ProcessStep::WaitAtWaypoint).unwrap(), StepOutcome::Advance);
    }
}
