//! [`SimShip`] – in-process simulated shuttle for tests and the demo CLI.
//!
//! Builds a [`ShipRegistry`] whose every slot is backed by a stub driver that
//! reads and writes one shared [`SimWorld`].  The [`SimShip`] handle keeps a
//! reference to the same world so tests can move the ship, change connector
//! status or drain batteries between ticks, then inspect what the controller
//! commanded.
//!
//! # Stub behaviour
//!
//! | Driver | Stub behaviour |
//! |---|---|
//! | [`FlightController`] | Records settings and queued waypoints; [`SimShip::advance`] flies toward the first waypoint at cruise speed. |
//! | [`DockingConnector`] | `connect` locks a `Connectable` connector; `disconnect` releases it. |
//! | [`Thruster`] | Current thrust equals the override; any override pushes the ship away from the thruster's facing. |
//! | [`ProximitySensor`] | Reports the entities placed with [`SimShip::add_entity`]. |
//! | [`Battery`] | Charges while connected, drains while moving. |
//! | [`DockingScript`] | A run completes on the next [`SimShip::advance`] and leaves the connector `Connectable`. |
//! | [`Announcer`] | Appends every broadcast to a log. |
//!
//! # Example
//!
//! ```rust
//! use shuttle_hal::sim::SimShip;
//!
//! let sim = SimShip::new()
//!     .with_flight_controller()
//!     .with_connector()
//!     .with_thrusters()
//!     .with_battery(5.0, 10.0);
//! let registry = sim.build();
//! assert!(registry.flight_controller().is_ok());
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, TimeZone, Utc};
use shuttle_types::{
    BlockTag, ChargeMode, ConnectorStatus, DetectedEntity, Direction, Event, Orientation,
    SensorSettings, ShuttleError, Vec3,
};

use crate::announcer::Announcer;
use crate::block::{DockingScript, FunctionalBlock, TimerBlock};
use crate::connector::DockingConnector;
use crate::flight::{AutopilotSettings, FlightController};
use crate::host::HostRuntime;
use crate::power::Battery;
use crate::registry::ShipRegistry;
use crate::sensor::ProximitySensor;
use crate::thruster::Thruster;

/// Autopilot cruise speed in m/s.
const CRUISE_SPEED: f64 = 100.0;
/// Drift speed while any thrust override is active, in m/s.
const OVERRIDE_SPEED: f64 = 4.0;
/// Fraction of capacity recharged per simulated second while connected.
const CHARGE_RATE: f64 = 0.01;
/// Fraction of capacity drained per simulated second while moving.
const DRAIN_RATE: f64 = 0.001;

// ─────────────────────────────────────────────────────────────────────────────
// Shared world state
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct SimThrusterState {
    facing: Vec3,
    thrust_override: f64,
}

#[derive(Debug, Clone)]
struct SimBatteryState {
    stored: f64,
    max: f64,
    mode: ChargeMode,
    functional: bool,
}

#[derive(Debug, Clone)]
struct SimBlockState {
    id: String,
    tags: Vec<BlockTag>,
    enabled: bool,
}

#[derive(Debug, Clone)]
struct SimTimerState {
    id: String,
    tags: Vec<BlockTag>,
    triggers: u32,
}

/// Everything the simulated devices read and write.
#[derive(Debug, Clone)]
pub struct SimWorld {
    now: DateTime<Utc>,
    load: f64,
    position: Vec3,
    speed: f64,
    controller_working: bool,
    autopilot_enabled: bool,
    autopilot_settings: Option<AutopilotSettings>,
    autopilot_waypoints: Vec<(String, Vec3)>,
    connector_working: bool,
    connector_status: ConnectorStatus,
    connector_orientation: Orientation,
    pull_strength: f64,
    thrusters: Vec<SimThrusterState>,
    sensor_enabled: bool,
    sensor_settings: Option<SensorSettings>,
    entities: Vec<DetectedEntity>,
    batteries: Vec<SimBatteryState>,
    blocks: Vec<SimBlockState>,
    timers: Vec<SimTimerState>,
    script_running: bool,
    script_runs: Vec<String>,
    announcements: Vec<(String, Event)>,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self {
            now: Utc.with_ymd_and_hms(2020, 7, 24, 12, 0, 0).single().unwrap_or_default(),
            load: 0.0,
            position: Vec3::ZERO,
            speed: 0.0,
            controller_working: true,
            autopilot_enabled: false,
            autopilot_settings: None,
            autopilot_waypoints: Vec::new(),
            connector_working: true,
            connector_status: ConnectorStatus::Unconnected,
            connector_orientation: Orientation::identity(),
            pull_strength: 1.0,
            thrusters: Vec::new(),
            sensor_enabled: false,
            sensor_settings: None,
            entities: Vec::new(),
            batteries: Vec::new(),
            blocks: Vec::new(),
            timers: Vec::new(),
            script_running: false,
            script_runs: Vec::new(),
            announcements: Vec::new(),
        }
    }
}

type Shared = Arc<Mutex<SimWorld>>;

fn lock(world: &Shared) -> MutexGuard<'_, SimWorld> {
    world.lock().unwrap_or_else(PoisonError::into_inner)
}

// ─────────────────────────────────────────────────────────────────────────────
// Stub devices
// ─────────────────────────────────────────────────────────────────────────────

struct SimFlightController {
    world: Shared,
}

impl FlightController for SimFlightController {
    fn id(&self) -> &str {
        "sim_remote_control"
    }

    fn is_working(&self) -> bool {
        lock(&self.world).controller_working
    }

    fn position(&self) -> Vec3 {
        lock(&self.world).position
    }

    fn speed(&self) -> f64 {
        lock(&self.world).speed
    }

    fn current_target(&self) -> Option<Vec3> {
        lock(&self.world).autopilot_waypoints.first().map(|(_, c)| *c)
    }

    fn configure(&mut self, settings: &AutopilotSettings) -> Result<(), ShuttleError> {
        lock(&self.world).autopilot_settings = Some(*settings);
        Ok(())
    }

    fn add_waypoint(&mut self, coords: Vec3, name: &str) -> Result<(), ShuttleError> {
        lock(&self.world)
            .autopilot_waypoints
            .push((name.to_string(), coords));
        Ok(())
    }

    fn clear_waypoints(&mut self) -> Result<(), ShuttleError> {
        lock(&self.world).autopilot_waypoints.clear();
        Ok(())
    }

    fn set_autopilot_enabled(&mut self, enabled: bool) -> Result<(), ShuttleError> {
        lock(&self.world).autopilot_enabled = enabled;
        Ok(())
    }

    fn is_autopilot_enabled(&self) -> bool {
        lock(&self.world).autopilot_enabled
    }
}

struct SimConnector {
    world: Shared,
}

impl SimConnector {
    fn ensure_working(&self) -> Result<(), ShuttleError> {
        if lock(&self.world).connector_working {
            Ok(())
        } else {
            Err(ShuttleError::MissingHardware {
                component: "sim_connector".to_string(),
            })
        }
    }
}

impl DockingConnector for SimConnector {
    fn id(&self) -> &str {
        "sim_connector"
    }

    fn is_working(&self) -> bool {
        lock(&self.world).connector_working
    }

    fn status(&self) -> ConnectorStatus {
        lock(&self.world).connector_status
    }

    fn connect(&mut self) -> Result<(), ShuttleError> {
        self.ensure_working()?;
        let mut world = lock(&self.world);
        if world.connector_status == ConnectorStatus::Connectable {
            world.connector_status = ConnectorStatus::Connected;
        }
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), ShuttleError> {
        self.ensure_working()?;
        let mut world = lock(&self.world);
        if world.connector_status == ConnectorStatus::Connected {
            world.connector_status = ConnectorStatus::Connectable;
        }
        Ok(())
    }

    fn set_pull_strength(&mut self, strength: f64) -> Result<(), ShuttleError> {
        self.ensure_working()?;
        lock(&self.world).pull_strength = strength.clamp(0.0, 1.0);
        Ok(())
    }

    fn orientation(&self) -> Orientation {
        lock(&self.world).connector_orientation
    }
}

struct SimThruster {
    id: String,
    index: usize,
    world: Shared,
}

impl Thruster for SimThruster {
    fn id(&self) -> &str {
        &self.id
    }

    fn facing(&self) -> Vec3 {
        lock(&self.world)
            .thrusters
            .get(self.index)
            .map_or(Vec3::ZERO, |t| t.facing)
    }

    fn current_thrust(&self) -> f64 {
        self.thrust_override()
    }

    fn thrust_override(&self) -> f64 {
        lock(&self.world)
            .thrusters
            .get(self.index)
            .map_or(0.0, |t| t.thrust_override)
    }

    fn set_thrust_override(&mut self, newtons: f64) -> Result<(), ShuttleError> {
        if let Some(t) = lock(&self.world).thrusters.get_mut(self.index) {
            t.thrust_override = newtons.max(0.0);
        }
        Ok(())
    }
}

struct SimSensor {
    world: Shared,
}

impl ProximitySensor for SimSensor {
    fn id(&self) -> &str {
        "sim_sensor"
    }

    fn is_enabled(&self) -> bool {
        lock(&self.world).sensor_enabled
    }

    fn configure(&mut self, settings: &SensorSettings) -> Result<(), ShuttleError> {
        let mut world = lock(&self.world);
        world.sensor_enabled = true;
        world.sensor_settings = Some(settings.clone());
        Ok(())
    }

    fn detected_entities(&self) -> Vec<DetectedEntity> {
        let world = lock(&self.world);
        if world.sensor_enabled {
            world.entities.clone()
        } else {
            Vec::new()
        }
    }
}

struct SimBattery {
    id: String,
    index: usize,
    world: Shared,
}

impl SimBattery {
    fn read<T>(&self, default: T, f: impl FnOnce(&SimBatteryState) -> T) -> T {
        lock(&self.world).batteries.get(self.index).map_or(default, f)
    }
}

impl Battery for SimBattery {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_functional(&self) -> bool {
        self.read(false, |b| b.functional)
    }

    fn current_stored(&self) -> f64 {
        self.read(0.0, |b| b.stored)
    }

    fn max_stored(&self) -> f64 {
        self.read(0.0, |b| b.max)
    }

    fn charge_mode(&self) -> ChargeMode {
        self.read(ChargeMode::Auto, |b| b.mode)
    }

    fn set_charge_mode(&mut self, mode: ChargeMode) -> Result<(), ShuttleError> {
        if let Some(b) = lock(&self.world).batteries.get_mut(self.index) {
            b.mode = mode;
        }
        Ok(())
    }
}

struct SimBlock {
    id: String,
    tags: Vec<BlockTag>,
    index: usize,
    world: Shared,
}

impl FunctionalBlock for SimBlock {
    fn id(&self) -> &str {
        &self.id
    }

    fn tags(&self) -> &[BlockTag] {
        &self.tags
    }

    fn is_enabled(&self) -> bool {
        lock(&self.world)
            .blocks
            .get(self.index)
            .is_some_and(|b| b.enabled)
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), ShuttleError> {
        if let Some(b) = lock(&self.world).blocks.get_mut(self.index) {
            b.enabled = enabled;
        }
        Ok(())
    }
}

struct SimTimer {
    id: String,
    tags: Vec<BlockTag>,
    index: usize,
    world: Shared,
}

impl TimerBlock for SimTimer {
    fn id(&self) -> &str {
        &self.id
    }

    fn tags(&self) -> &[BlockTag] {
        &self.tags
    }

    fn trigger(&mut self) -> Result<(), ShuttleError> {
        if let Some(t) = lock(&self.world).timers.get_mut(self.index) {
            t.triggers += 1;
        }
        Ok(())
    }
}

struct SimDockingScript {
    world: Shared,
}

impl DockingScript for SimDockingScript {
    fn id(&self) -> &str {
        "sim_docking_script"
    }

    fn is_working(&self) -> bool {
        true
    }

    fn is_running(&self) -> bool {
        lock(&self.world).script_running
    }

    fn run(&mut self, argument: &str) -> Result<bool, ShuttleError> {
        let mut world = lock(&self.world);
        if world.script_running {
            return Ok(false);
        }
        world.script_running = true;
        world.script_runs.push(argument.to_string());
        Ok(true)
    }
}

struct SimAnnouncer {
    world: Shared,
}

impl Announcer for SimAnnouncer {
    fn announce(&mut self, tag: &str, event: &Event) -> Result<(), ShuttleError> {
        lock(&self.world)
            .announcements
            .push((tag.to_string(), event.clone()));
        Ok(())
    }
}

/// Manually advanced clock reading the simulated world.
pub struct SimHost {
    world: Shared,
}

impl HostRuntime for SimHost {
    fn now(&self) -> DateTime<Utc> {
        lock(&self.world).now
    }

    fn instruction_load(&self) -> f64 {
        lock(&self.world).load
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SimShip builder and handle
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for a simulated shuttle and handle onto its shared world.
///
/// Cloning a `SimShip` clones the handle, not the world.
#[derive(Clone, Default)]
pub struct SimShip {
    world: Shared,
    has_controller: bool,
    has_connector: bool,
    has_sensor: bool,
    has_script: bool,
    has_announcer: bool,
}

impl SimShip {
    /// Create an empty simulated ship.
    pub fn new() -> Self {
        Self::default()
    }

    /// A ship with every device the autopilot uses: controller, connector,
    /// six thrusters, sensor, docking script, announcer and two half-full
    /// batteries.
    pub fn fully_equipped() -> Self {
        Self::new()
            .with_flight_controller()
            .with_connector()
            .with_thrusters()
            .with_sensor()
            .with_docking_script()
            .with_announcer()
            .with_battery(5.0, 10.0)
            .with_battery(5.0, 10.0)
    }

    pub fn with_flight_controller(mut self) -> Self {
        self.has_controller = true;
        self
    }

    pub fn with_connector(mut self) -> Self {
        self.has_connector = true;
        self
    }

    /// One thruster per block axis of the connector's orientation.
    pub fn with_thrusters(self) -> Self {
        {
            let mut world = lock(&self.world);
            let orientation = world.connector_orientation;
            for dir in [
                Direction::Forward,
                Direction::Backward,
                Direction::Left,
                Direction::Right,
                Direction::Up,
                Direction::Down,
            ] {
                world.thrusters.push(SimThrusterState {
                    facing: orientation.axis(dir),
                    thrust_override: 0.0,
                });
            }
        }
        self
    }

    pub fn with_sensor(mut self) -> Self {
        self.has_sensor = true;
        self
    }

    /// Add a battery holding `stored` of `max` MWh.
    pub fn with_battery(self, stored: f64, max: f64) -> Self {
        lock(&self.world).batteries.push(SimBatteryState {
            stored,
            max,
            mode: ChargeMode::Auto,
            functional: true,
        });
        self
    }

    pub fn with_block(self, id: &str, tags: &[BlockTag], enabled: bool) -> Self {
        lock(&self.world).blocks.push(SimBlockState {
            id: id.to_string(),
            tags: tags.to_vec(),
            enabled,
        });
        self
    }

    pub fn with_timer(self, id: &str, tags: &[BlockTag]) -> Self {
        lock(&self.world).timers.push(SimTimerState {
            id: id.to_string(),
            tags: tags.to_vec(),
            triggers: 0,
        });
        self
    }

    pub fn with_docking_script(mut self) -> Self {
        self.has_script = true;
        self
    }

    pub fn with_announcer(mut self) -> Self {
        self.has_announcer = true;
        self
    }

    /// Build a [`ShipRegistry`] wired to this ship's world.
    pub fn build(&self) -> ShipRegistry {
        let mut registry = ShipRegistry::new();
        let world = lock(&self.world);

        if self.has_controller {
            registry.register_flight_controller(Box::new(SimFlightController {
                world: Arc::clone(&self.world),
            }));
        }
        if self.has_connector {
            registry.register_connector(Box::new(SimConnector {
                world: Arc::clone(&self.world),
            }));
        }
        for index in 0..world.thrusters.len() {
            registry.register_thruster(Box::new(SimThruster {
                id: format!("sim_thruster_{index}"),
                index,
                world: Arc::clone(&self.world),
            }));
        }
        if self.has_sensor {
            registry.register_sensor(Box::new(SimSensor {
                world: Arc::clone(&self.world),
            }));
        }
        for index in 0..world.batteries.len() {
            registry.register_battery(Box::new(SimBattery {
                id: format!("sim_battery_{index}"),
                index,
                world: Arc::clone(&self.world),
            }));
        }
        for (index, block) in world.blocks.iter().enumerate() {
            registry.register_block(Box::new(SimBlock {
                id: block.id.clone(),
                tags: block.tags.clone(),
                index,
                world: Arc::clone(&self.world),
            }));
        }
        for (index, timer) in world.timers.iter().enumerate() {
            registry.register_timer(Box::new(SimTimer {
                id: timer.id.clone(),
                tags: timer.tags.clone(),
                index,
                world: Arc::clone(&self.world),
            }));
        }
        if self.has_script {
            registry.register_docking_script(Box::new(SimDockingScript {
                world: Arc::clone(&self.world),
            }));
        }
        if self.has_announcer {
            registry.register_announcer(Box::new(SimAnnouncer {
                world: Arc::clone(&self.world),
            }));
        }
        registry
    }

    /// Host clock reading this ship's simulated time.
    pub fn host(&self) -> SimHost {
        SimHost {
            world: Arc::clone(&self.world),
        }
    }

    fn world(&self) -> MutexGuard<'_, SimWorld> {
        lock(&self.world)
    }

    // ── Simulation ───────────────────────────────────────────────────────────

    /// Move simulated time forward by `secs` without moving anything.
    pub fn advance_time(&self, secs: f64) {
        let mut world = self.world();
        world.now += Duration::milliseconds((secs * 1000.0).round() as i64);
    }

    /// Move simulated time forward by `secs` and integrate ship motion,
    /// docking and battery charge over that interval.
    pub fn advance(&self, secs: f64) {
        self.advance_time(secs);
        let mut world = self.world();

        if world.script_running {
            world.script_running = false;
            world.connector_status = ConnectorStatus::Connectable;
        }

        let locked = world.connector_status == ConnectorStatus::Connected;
        let pushing: Vec<Vec3> = world
            .thrusters
            .iter()
            .filter(|t| t.thrust_override > 0.0)
            .map(|t| -t.facing)
            .collect();

        if locked {
            world.speed = 0.0;
        } else if world.autopilot_enabled && !world.autopilot_waypoints.is_empty() {
            let target = world.autopilot_waypoints[0].1;
            let remaining = world.position.distance(target);
            let step = CRUISE_SPEED * secs;
            if remaining <= step {
                world.position = target;
                world.speed = 0.0;
                world.autopilot_waypoints.remove(0);
                if world.autopilot_waypoints.is_empty() {
                    world.autopilot_enabled = false;
                }
            } else {
                let dir = (target - world.position).normalize();
                world.position = world.position + dir * step;
                world.speed = CRUISE_SPEED;
            }
        } else if !pushing.is_empty() {
            let dir = pushing
                .into_iter()
                .fold(Vec3::ZERO, |acc, v| acc + v)
                .normalize();
            world.position = world.position + dir * (OVERRIDE_SPEED * secs);
            world.speed = OVERRIDE_SPEED;
            if world.connector_status == ConnectorStatus::Connectable {
                world.connector_status = ConnectorStatus::Unconnected;
            }
        } else {
            world.speed = 0.0;
        }

        let moving = world.speed > 0.0;
        for battery in &mut world.batteries {
            if locked && battery.mode != ChargeMode::Discharge {
                battery.stored = (battery.stored + battery.max * CHARGE_RATE * secs).min(battery.max);
            } else if moving {
                battery.stored = (battery.stored - battery.max * DRAIN_RATE * secs).max(0.0);
            }
        }
    }

    // ── World setters ────────────────────────────────────────────────────────

    pub fn set_position(&self, position: Vec3) {
        self.world().position = position;
    }

    pub fn set_speed(&self, speed: f64) {
        self.world().speed = speed;
    }

    pub fn set_connector_status(&self, status: ConnectorStatus) {
        self.world().connector_status = status;
    }

    pub fn set_connector_working(&self, working: bool) {
        self.world().connector_working = working;
    }

    pub fn set_controller_working(&self, working: bool) {
        self.world().controller_working = working;
    }

    pub fn set_battery_stored(&self, index: usize, stored: f64) {
        if let Some(b) = self.world().batteries.get_mut(index) {
            b.stored = stored;
        }
    }

    pub fn set_load(&self, load: f64) {
        self.world().load = load;
    }

    pub fn set_script_running(&self, running: bool) {
        self.world().script_running = running;
    }

    pub fn add_entity(&self, entity: DetectedEntity) {
        self.world().entities.push(entity);
    }

    pub fn clear_entities(&self) {
        self.world().entities.clear();
    }

    // ── World getters ────────────────────────────────────────────────────────

    pub fn now(&self) -> DateTime<Utc> {
        self.world().now
    }

    pub fn position(&self) -> Vec3 {
        self.world().position
    }

    pub fn connector_status(&self) -> ConnectorStatus {
        self.world().connector_status
    }

    pub fn pull_strength(&self) -> f64 {
        self.world().pull_strength
    }

    pub fn autopilot_enabled(&self) -> bool {
        self.world().autopilot_enabled
    }

    pub fn autopilot_settings(&self) -> Option<AutopilotSettings> {
        self.world().autopilot_settings
    }

    pub fn autopilot_waypoints(&self) -> Vec<(String, Vec3)> {
        self.world().autopilot_waypoints.clone()
    }

    pub fn thrust_overrides(&self) -> Vec<f64> {
        self.world()
            .thrusters
            .iter()
            .map(|t| t.thrust_override)
            .collect()
    }

    pub fn sensor_settings(&self) -> Option<SensorSettings> {
        self.world().sensor_settings.clone()
    }

    pub fn battery_modes(&self) -> Vec<ChargeMode> {
        self.world().batteries.iter().map(|b| b.mode).collect()
    }

    pub fn battery_ratio(&self) -> f64 {
        let world = self.world();
        let max: f64 = world.batteries.iter().map(|b| b.max).sum();
        let stored: f64 = world.batteries.iter().map(|b| b.stored).sum();
        if max > 0.0 { stored / max } else { 0.0 }
    }

    pub fn block_enabled(&self, id: &str) -> Option<bool> {
        self.world()
            .blocks
            .iter()
            .find(|b| b.id == id)
            .map(|b| b.enabled)
    }

    pub fn timer_triggers(&self, id: &str) -> u32 {
        self.world()
            .timers
            .iter()
            .find(|t| t.id == id)
            .map_or(0, |t| t.triggers)
    }

    pub fn docking_runs(&self) -> Vec<String> {
        self.world().script_runs.clone()
    }

    pub fn announcements(&self) -> Vec<(String, Event)> {
        self.world().announcements.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shuttle_types::EntityKind;

    #[test]
    fn build_registers_requested_devices() {
        let sim = SimShip::fully_equipped();
        let mut registry = sim.build();
        assert!(registry.flight_controller().is_ok());
        assert!(registry.connector().is_ok());
        assert_eq!(registry.thrusters_mut().len(), 6);
        assert_eq!(registry.batteries().count(), 2);
        assert!(registry.sensor().is_some());
        assert!(registry.docking_script().is_some());
    }

    #[test]
    fn empty_ship_has_no_hardware() {
        let mut registry = SimShip::new().build();
        assert!(registry.flight_controller().is_err());
        assert!(registry.thrusters_mut().is_empty());
        assert!(registry.sensor().is_none());
    }

    #[test]
    fn connector_locks_only_when_connectable() {
        let sim = SimShip::new().with_connector();
        let mut registry = sim.build();

        registry.connector_mut().unwrap().connect().unwrap();
        assert_eq!(sim.connector_status(), ConnectorStatus::Unconnected);

        sim.set_connector_status(ConnectorStatus::Connectable);
        registry.connector_mut().unwrap().connect().unwrap();
        assert_eq!(sim.connector_status(), ConnectorStatus::Connected);

        registry.connector_mut().unwrap().disconnect().unwrap();
        assert_ne!(sim.connector_status(), ConnectorStatus::Connected);
    }

    #[test]
    fn broken_connector_disappears_from_registry() {
        let sim = SimShip::new().with_connector();
        let mut registry = sim.build();
        registry.refresh_handles(0);
        sim.set_connector_working(false);
        registry.refresh_handles(1);
        assert!(registry.connector().is_err());
    }

    #[test]
    fn autopilot_flies_to_waypoint() {
        let sim = SimShip::new().with_flight_controller();
        let mut registry = sim.build();
        let target = Vec3::new(150.0, 0.0, 0.0);
        {
            let rc = registry.flight_controller_mut().unwrap();
            rc.add_waypoint(target, "Base").unwrap();
            rc.set_autopilot_enabled(true).unwrap();
        }

        sim.advance(1.0);
        assert!(sim.position().approx_eq(Vec3::new(100.0, 0.0, 0.0), 1e-9));
        assert!((registry.flight_controller().unwrap().speed() - CRUISE_SPEED).abs() < 1e-9);

        sim.advance(1.0);
        assert!(sim.position().approx_eq(target, 1e-9));
        assert!(!sim.autopilot_enabled());
        assert_eq!(registry.flight_controller().unwrap().speed(), 0.0);
    }

    #[test]
    fn thrust_override_pushes_away_from_facing() {
        let sim = SimShip::new().with_thrusters();
        let mut registry = sim.build();
        // Thruster 0 faces the connector's forward axis, so it pushes backward.
        registry.thrusters_mut()[0].set_thrust_override(2000.0).unwrap();
        sim.advance(1.0);
        let backward = Orientation::identity().axis(Direction::Backward);
        assert!(sim.position().approx_eq(backward * OVERRIDE_SPEED, 1e-9));
    }

    #[test]
    fn docking_script_leaves_connector_connectable() {
        let sim = SimShip::new().with_connector().with_docking_script();
        let mut registry = sim.build();
        assert!(registry.docking_script_mut().unwrap().run("Base").unwrap());
        assert!(sim.world().script_running);
        // A second run while busy is refused.
        assert!(!registry.docking_script_mut().unwrap().run("Base").unwrap());

        sim.advance(1.0);
        assert_eq!(sim.connector_status(), ConnectorStatus::Connectable);
        assert_eq!(sim.docking_runs(), vec!["Base".to_string()]);
    }

    #[test]
    fn batteries_charge_while_connected() {
        let sim = SimShip::new().with_battery(1.0, 10.0);
        sim.set_connector_status(ConnectorStatus::Connected);
        sim.advance(10.0);
        assert!((sim.battery_ratio() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn sensor_reports_entities_once_configured() {
        let sim = SimShip::new().with_sensor();
        let mut registry = sim.build();
        sim.add_entity(DetectedEntity::new(
            1,
            "Station",
            EntityKind::LargeGrid,
            Vec3::new(0.0, 0.0, 30.0),
        ));
        assert!(registry.sensor().unwrap().detected_entities().is_empty());

        registry
            .sensor_mut()
            .unwrap()
            .configure(&SensorSettings::default())
            .unwrap();
        assert_eq!(registry.sensor().unwrap().detected_entities().len(), 1);
        assert_eq!(sim.sensor_settings(), Some(SensorSettings::default()));
    }

    #[test]
    fn host_follows_simulated_time() {
        let sim = SimShip::new();
        let host = sim.host();
        let start = host.now();
        sim.advance_time(2.5);
        assert_eq!((host.now() - start).num_milliseconds(), 2500);
    }
}
