//! [`ShipRegistry`] – owner of every registered hardware driver.
//!
//! Step bodies never scan the grid themselves.  They ask the registry for the
//! device they need; required devices (flight controller, docking connector)
//! come back as `Result` so a missing unit surfaces as
//! [`ShuttleError::MissingHardware`], optional devices (sensor, docking
//! script, announcer) come back as `Option`.
//!
//! Tag-addressed helpers ([`ShipRegistry::trigger_timers`],
//! [`ShipRegistry::set_blocks_enabled`], [`ShipRegistry::toggle_blocks`])
//! act on every block carrying a [`BlockTag`] and report how many they
//! touched.

use shuttle_types::{BlockTag, Event, ShuttleError};
use tracing::{debug, trace};

use crate::announcer::Announcer;
use crate::block::{DockingScript, FunctionalBlock, TimerBlock};
use crate::connector::DockingConnector;
use crate::flight::FlightController;
use crate::handle::HandleCache;
use crate::power::Battery;
use crate::sensor::ProximitySensor;
use crate::thruster::Thruster;

/// Default number of ticks between hardware handle re-validations.
pub const DEFAULT_REVALIDATION_TICKS: u64 = 100;

/// Central hardware registry for one shuttle.
pub struct ShipRegistry {
    flight_controllers: Vec<Box<dyn FlightController>>,
    connectors: Vec<Box<dyn DockingConnector>>,
    thrusters: Vec<Box<dyn Thruster>>,
    sensor: Option<Box<dyn ProximitySensor>>,
    batteries: Vec<Box<dyn Battery>>,
    blocks: Vec<Box<dyn FunctionalBlock>>,
    timers: Vec<Box<dyn TimerBlock>>,
    docking_script: Option<Box<dyn DockingScript>>,
    announcer: Option<Box<dyn Announcer>>,
    controller_handle: HandleCache,
    connector_handle: HandleCache,
}

impl Default for ShipRegistry {
    fn default() -> Self {
        Self::with_revalidation_interval(DEFAULT_REVALIDATION_TICKS)
    }
}

impl ShipRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry that re-validates its cached flight
    /// controller and connector every `ticks` ticks.
    pub fn with_revalidation_interval(ticks: u64) -> Self {
        Self {
            flight_controllers: Vec::new(),
            connectors: Vec::new(),
            thrusters: Vec::new(),
            sensor: None,
            batteries: Vec::new(),
            blocks: Vec::new(),
            timers: Vec::new(),
            docking_script: None,
            announcer: None,
            controller_handle: HandleCache::new(ticks),
            connector_handle: HandleCache::new(ticks),
        }
    }

    /// Change the re-validation cadence.  Both cached selections are dropped
    /// and rebuilt on the next [`refresh_handles`](Self::refresh_handles).
    pub fn set_revalidation_interval(&mut self, ticks: u64) {
        self.controller_handle = HandleCache::new(ticks);
        self.connector_handle = HandleCache::new(ticks);
    }

    // ── Registration ─────────────────────────────────────────────────────────

    pub fn register_flight_controller(&mut self, controller: Box<dyn FlightController>) {
        self.flight_controllers.push(controller);
        self.controller_handle.invalidate();
    }

    pub fn register_connector(&mut self, connector: Box<dyn DockingConnector>) {
        self.connectors.push(connector);
        self.connector_handle.invalidate();
    }

    pub fn register_thruster(&mut self, thruster: Box<dyn Thruster>) {
        self.thrusters.push(thruster);
    }

    /// Install the proximity sensor, replacing any previous one.
    pub fn register_sensor(&mut self, sensor: Box<dyn ProximitySensor>) {
        self.sensor = Some(sensor);
    }

    pub fn register_battery(&mut self, battery: Box<dyn Battery>) {
        self.batteries.push(battery);
    }

    pub fn register_block(&mut self, block: Box<dyn FunctionalBlock>) {
        self.blocks.push(block);
    }

    pub fn register_timer(&mut self, timer: Box<dyn TimerBlock>) {
        self.timers.push(timer);
    }

    pub fn register_docking_script(&mut self, script: Box<dyn DockingScript>) {
        self.docking_script = Some(script);
    }

    pub fn register_announcer(&mut self, announcer: Box<dyn Announcer>) {
        self.announcer = Some(announcer);
    }

    // ── Handle re-validation ─────────────────────────────────────────────────

    /// Re-select the flight controller and docking connector when their cached
    /// selection is stale at `tick` or the cached unit stopped working.
    pub fn refresh_handles(&mut self, tick: u64) {
        let controllers = &self.flight_controllers;
        let before = self.controller_handle.selected();
        let after = self.controller_handle.refresh_if_stale(
            tick,
            |i| controllers.get(i).is_some_and(|c| c.is_working()),
            || controllers.iter().position(|c| c.is_working()),
        );
        if before != after {
            debug!(tick, ?after, "flight controller re-selected");
        }

        let connectors = &self.connectors;
        let before = self.connector_handle.selected();
        let after = self.connector_handle.refresh_if_stale(
            tick,
            |i| connectors.get(i).is_some_and(|c| c.is_working()),
            || connectors.iter().position(|c| c.is_working()),
        );
        if before != after {
            debug!(tick, ?after, "docking connector re-selected");
        }
    }

    fn controller_index(&self) -> Option<usize> {
        self.controller_handle
            .selected()
            .filter(|&i| i < self.flight_controllers.len())
            .or_else(|| self.flight_controllers.iter().position(|c| c.is_working()))
    }

    fn connector_index(&self) -> Option<usize> {
        self.connector_handle
            .selected()
            .filter(|&i| i < self.connectors.len())
            .or_else(|| self.connectors.iter().position(|c| c.is_working()))
    }

    // ── Required devices ─────────────────────────────────────────────────────

    /// The selected flight controller.
    ///
    /// # Errors
    ///
    /// Returns [`ShuttleError::MissingHardware`] when no working controller
    /// is registered.
    pub fn flight_controller(&self) -> Result<&dyn FlightController, ShuttleError> {
        match self.controller_index().and_then(|i| self.flight_controllers.get(i)) {
            Some(c) => Ok(c.as_ref()),
            None => Err(missing("flight controller")),
        }
    }

    pub fn flight_controller_mut(&mut self) -> Result<&mut dyn FlightController, ShuttleError> {
        let idx = self.controller_index();
        match idx.and_then(|i| self.flight_controllers.get_mut(i)) {
            Some(c) => Ok(c.as_mut()),
            None => Err(missing("flight controller")),
        }
    }

    /// The selected docking connector.
    ///
    /// # Errors
    ///
    /// Returns [`ShuttleError::MissingHardware`] when no working connector is
    /// registered.
    pub fn connector(&self) -> Result<&dyn DockingConnector, ShuttleError> {
        match self.connector_index().and_then(|i| self.connectors.get(i)) {
            Some(c) => Ok(c.as_ref()),
            None => Err(missing("docking connector")),
        }
    }

    pub fn connector_mut(&mut self) -> Result<&mut dyn DockingConnector, ShuttleError> {
        let idx = self.connector_index();
        match idx.and_then(|i| self.connectors.get_mut(i)) {
            Some(c) => Ok(c.as_mut()),
            None => Err(missing("docking connector")),
        }
    }

    // ── Fleets and optional devices ──────────────────────────────────────────

    pub fn thrusters_mut(&mut self) -> &mut [Box<dyn Thruster>] {
        &mut self.thrusters
    }

    /// Set every thruster override to `newtons`.
    pub fn set_all_thrust_overrides(&mut self, newtons: f64) -> Result<(), ShuttleError> {
        for thruster in &mut self.thrusters {
            thruster.set_thrust_override(newtons)?;
        }
        Ok(())
    }

    /// Functional batteries only.
    pub fn batteries(&self) -> impl Iterator<Item = &dyn Battery> {
        self.batteries
            .iter()
            .filter(|b| b.is_functional())
            .map(|b| b.as_ref() as &dyn Battery)
    }

    pub fn batteries_mut(&mut self) -> &mut [Box<dyn Battery>] {
        &mut self.batteries
    }

    pub fn sensor(&self) -> Option<&dyn ProximitySensor> {
        match &self.sensor {
            Some(s) => Some(s.as_ref()),
            None => None,
        }
    }

    pub fn sensor_mut(&mut self) -> Option<&mut dyn ProximitySensor> {
        match &mut self.sensor {
            Some(s) => Some(s.as_mut()),
            None => None,
        }
    }

    pub fn docking_script(&self) -> Option<&dyn DockingScript> {
        match &self.docking_script {
            Some(s) => Some(s.as_ref()),
            None => None,
        }
    }

    pub fn docking_script_mut(&mut self) -> Option<&mut dyn DockingScript> {
        match &mut self.docking_script {
            Some(s) => Some(s.as_mut()),
            None => None,
        }
    }

    // ── Tag-addressed actions ────────────────────────────────────────────────

    /// Trigger every timer tagged `tag`; returns how many fired.
    pub fn trigger_timers(&mut self, tag: BlockTag) -> Result<usize, ShuttleError> {
        let mut fired = 0;
        for timer in self.timers.iter_mut().filter(|t| t.has_tag(tag)) {
            timer.trigger()?;
            fired += 1;
        }
        trace!(?tag, fired, "timers triggered");
        Ok(fired)
    }

    /// Switch every block tagged `tag` on or off; returns how many changed.
    pub fn set_blocks_enabled(&mut self, tag: BlockTag, enabled: bool) -> Result<usize, ShuttleError> {
        let mut changed = 0;
        for block in self.blocks.iter_mut().filter(|b| b.has_tag(tag)) {
            if block.is_enabled() != enabled {
                block.set_enabled(enabled)?;
                changed += 1;
            }
        }
        trace!(?tag, enabled, changed, "blocks switched");
        Ok(changed)
    }

    /// Flip the on/off state of every block tagged `tag`.
    pub fn toggle_blocks(&mut self, tag: BlockTag) -> Result<usize, ShuttleError> {
        let mut toggled = 0;
        for block in self.blocks.iter_mut().filter(|b| b.has_tag(tag)) {
            let enabled = block.is_enabled();
            block.set_enabled(!enabled)?;
            toggled += 1;
        }
        trace!(?tag, toggled, "blocks toggled");
        Ok(toggled)
    }

    /// Broadcast `event` under `tag`.  Returns `Ok(false)` when no announcer
    /// is installed.
    pub fn announce(&mut self, tag: &str, event: &Event) -> Result<bool, ShuttleError> {
        match &mut self.announcer {
            Some(announcer) => {
                announcer.announce(tag, event)?;
                Ok(true)
            }
            None => {
                trace!(tag, "no announcer installed; broadcast dropped");
                Ok(false)
            }
        }
    }
}

fn missing(component: &str) -> ShuttleError {
    ShuttleError::MissingHardware {
        component: component.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shuttle_types::{ConnectorStatus, Orientation, Vec3};

    use crate::flight::AutopilotSettings;

    // ------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------

    struct MockController {
        id: String,
        working: bool,
    }
    impl FlightController for MockController {
        fn id(&self) -> &str {
            &self.id
        }
        fn is_working(&self) -> bool {
            self.working
        }
        fn position(&self) -> Vec3 {
            Vec3::ZERO
        }
        fn speed(&self) -> f64 {
            0.0
        }
        fn current_target(&self) -> Option<Vec3> {
            None
        }
        fn configure(&mut self, _: &AutopilotSettings) -> Result<(), ShuttleError> {
            Ok(())
        }
        fn add_waypoint(&mut self, _: Vec3, _: &str) -> Result<(), ShuttleError> {
            Ok(())
        }
        fn clear_waypoints(&mut self) -> Result<(), ShuttleError> {
            Ok(())
        }
        fn set_autopilot_enabled(&mut self, _: bool) -> Result<(), ShuttleError> {
            Ok(())
        }
        fn is_autopilot_enabled(&self) -> bool {
            false
        }
    }

    struct MockConnector {
        status: ConnectorStatus,
    }
    impl DockingConnector for MockConnector {
        fn id(&self) -> &str {
            "connector"
        }
        fn is_working(&self) -> bool {
            true
        }
        fn status(&self) -> ConnectorStatus {
            self.status
        }
        fn connect(&mut self) -> Result<(), ShuttleError> {
            self.status = ConnectorStatus::Connected;
            Ok(())
        }
        fn disconnect(&mut self) -> Result<(), ShuttleError> {
            self.status = ConnectorStatus::Unconnected;
            Ok(())
        }
        fn set_pull_strength(&mut self, _: f64) -> Result<(), ShuttleError> {
            Ok(())
        }
        fn orientation(&self) -> Orientation {
            Orientation::identity()
        }
    }

    struct MockBlock {
        tags: Vec<BlockTag>,
        enabled: bool,
    }
    impl FunctionalBlock for MockBlock {
        fn id(&self) -> &str {
            "block"
        }
        fn tags(&self) -> &[BlockTag] {
            &self.tags
        }
        fn is_enabled(&self) -> bool {
            self.enabled
        }
        fn set_enabled(&mut self, enabled: bool) -> Result<(), ShuttleError> {
            self.enabled = enabled;
            Ok(())
        }
    }

    fn controller(id: &str, working: bool) -> Box<MockController> {
        Box::new(MockController {
            id: id.to_string(),
            working,
        })
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[test]
    fn missing_controller_is_an_error() {
        let registry = ShipRegistry::new();
        assert!(matches!(
            registry.flight_controller(),
            Err(ShuttleError::MissingHardware { .. })
        ));
        assert!(registry.connector().is_err());
    }

    #[test]
    fn broken_controllers_are_skipped() {
        let mut registry = ShipRegistry::new();
        registry.register_flight_controller(controller("broken", false));
        registry.register_flight_controller(controller("rc", true));
        registry.refresh_handles(0);
        assert_eq!(registry.flight_controller().unwrap().id(), "rc");
    }

    #[test]
    fn connector_mut_reaches_the_device() {
        let mut registry = ShipRegistry::new();
        registry.register_connector(Box::new(MockConnector {
            status: ConnectorStatus::Connectable,
        }));
        registry.connector_mut().unwrap().connect().unwrap();
        assert_eq!(registry.connector().unwrap().status(), ConnectorStatus::Connected);
    }

    #[test]
    fn set_blocks_enabled_only_touches_tagged_blocks() {
        let mut registry = ShipRegistry::new();
        registry.register_block(Box::new(MockBlock {
            tags: vec![BlockTag::DisableOnEmergency],
            enabled: true,
        }));
        registry.register_block(Box::new(MockBlock {
            tags: vec![BlockTag::EmergencyPower],
            enabled: false,
        }));

        let changed = registry
            .set_blocks_enabled(BlockTag::DisableOnEmergency, false)
            .unwrap();
        assert_eq!(changed, 1);
        // Second call is a no-op.
        let changed = registry
            .set_blocks_enabled(BlockTag::DisableOnEmergency, false)
            .unwrap();
        assert_eq!(changed, 0);
    }

    #[test]
    fn toggle_flips_each_block() {
        let mut registry = ShipRegistry::new();
        registry.register_block(Box::new(MockBlock {
            tags: vec![BlockTag::ToggleBeforeUndocking],
            enabled: true,
        }));
        assert_eq!(registry.toggle_blocks(BlockTag::ToggleBeforeUndocking).unwrap(), 1);
        assert_eq!(registry.toggle_blocks(BlockTag::AfterDocking).unwrap(), 0);
    }

    #[test]
    fn announce_without_announcer_is_dropped() {
        let mut registry = ShipRegistry::new();
        let event = Event::new(
            "test",
            chrono::Utc::now(),
            shuttle_types::EventPayload::PowerTransition {
                grid_id: 1,
                state: shuttle_types::PowerState::Normal,
                remaining_ratio: 1.0,
            },
        );
        assert!(!registry.announce("TAG", &event).unwrap());
    }
}
