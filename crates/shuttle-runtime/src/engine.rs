//! [`ProcessEngine`] – the tick-driven step sequencer.
//!
//! Each call to [`ProcessEngine::run_one_tick`]:
//!
//! 1. **Prepare** – bump the tick counter, stamp the cycle start and let the
//!    [`ShipRegistry`] re-validate its cached hardware handles.
//! 2. **Budget** – when the host already reports the tick's time or
//!    instruction budget as spent, the step is deferred to the next tick.
//! 3. **Guard** – the current step's [`Guard`]s run against a fresh
//!    [`GuardContext`]; the first trip skips or holds the step.
//! 4. **Run** – otherwise the step body runs and returns a [`StepOutcome`].
//! 5. **Bookkeep** – on advance the index moves on (wrapping at the end of the
//!    list), the previous-step-end time is stamped and the ship position is
//!    cached.
//! 6. **Sub-process** – one [`SubProcessCycle`] micro-step runs if the budget
//!    allows.
//!
//! # Faults
//!
//! A body returning [`ShuttleError::MissingHardware`] stalls the step: the
//! part may come back, so the step is simply retried next tick.  Any other
//! error is logged, the engine stops running, and the error is returned as
//! [`ShuttleError::StepFault`] for the host to surface.
//!
//! # Example
//!
//! ```rust
//! use shuttle_hal::sim::SimShip;
//! use shuttle_runtime::{MissionConfig, ProcessEngine};
//!
//! let sim = SimShip::fully_equipped();
//! let mut ship = sim.build();
//! let mut engine = ProcessEngine::new(MissionConfig::default(), Box::new(sim.host())).unwrap();
//!
//! let report = engine.run_one_tick(&mut ship).unwrap();
//! assert_eq!(report.step, "ResetControl");
//! assert_eq!(engine.state().step, 1);
//! ```

use chrono::{DateTime, Utc};
use shuttle_hal::{HostRuntime, ShipRegistry};
use shuttle_kernel::{
    BatteryManager, ExecutionBudget, Guard, GuardContext, GuardTrip, first_trip,
};
use shuttle_perception::obstruction::ObstructionOracle;
use shuttle_perception::orbit::OrbitGenerator;
use shuttle_types::{Orientation, PersistedState, ShuttleError};
use tracing::{debug, error, info_span, trace, warn};

use crate::mission::{MissionConfig, MissionState};
use crate::report::{TickOutcome, TickReport};
use crate::steps::{ProcessStep, StepContext, StepOutcome, detected_entities};
use crate::sub_process::{SubProcessContext, SubProcessCycle};

pub struct ProcessEngine {
    config: MissionConfig,
    state: MissionState,
    battery: BatteryManager,
    orbit: OrbitGenerator,
    oracle: ObstructionOracle,
    budget: ExecutionBudget,
    sub_process: SubProcessCycle,
    host: Box<dyn HostRuntime>,
}

impl ProcessEngine {
    /// Build an engine for `config`, reading time and load from `host`.
    ///
    /// # Errors
    ///
    /// Returns [`ShuttleError::Config`] when `config` fails validation.
    pub fn new(config: MissionConfig, host: Box<dyn HostRuntime>) -> Result<Self, ShuttleError> {
        config.validate()?;
        let now = host.now();
        Ok(Self {
            state: MissionState::new(config.waypoints.clone(), now),
            battery: BatteryManager::new(config.thresholds()),
            orbit: OrbitGenerator::new(config.orbit.center, config.orbit.radius),
            oracle: config.oracle(),
            budget: config.budget(),
            sub_process: SubProcessCycle::new(),
            host,
            config,
        })
    }

    pub fn config(&self) -> &MissionConfig {
        &self.config
    }

    pub fn state(&self) -> &MissionState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut MissionState {
        &mut self.state
    }

    pub fn battery(&self) -> &BatteryManager {
        &self.battery
    }

    pub fn current_step(&self) -> ProcessStep {
        ProcessStep::at(self.state.step)
    }

    /// Whether the host should keep calling [`run_one_tick`](Self::run_one_tick).
    pub fn is_running(&self) -> bool {
        self.state.running
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> PersistedState {
        PersistedState {
            current_waypoint: self
                .state
                .current_waypoint
                .as_ref()
                .map(|w| w.name().to_string()),
            running: self.state.running,
            step: self.state.step,
        }
    }

    /// Load a saved state.  An unknown waypoint name leaves the current
    /// waypoint unset; an out-of-range step restarts the lap.
    pub fn restore(&mut self, persisted: &PersistedState) {
        let waypoint = persisted
            .current_waypoint
            .as_deref()
            .and_then(|name| self.state.find_waypoint(name))
            .cloned();
        if waypoint.is_none() && persisted.current_waypoint.is_some() {
            warn!(
                waypoint = persisted.current_waypoint.as_deref(),
                "saved waypoint no longer configured"
            );
        }
        self.state.current_waypoint = waypoint;
        self.state.running = persisted.running;
        self.state.step = if persisted.step < ProcessStep::ALL.len() {
            persisted.step
        } else {
            0
        };
    }

    // ── Tick ─────────────────────────────────────────────────────────────────

    /// Run the current step once, then one sub-process micro-step.
    ///
    /// # Errors
    ///
    /// Returns [`ShuttleError::StepFault`] when the step body fails with
    /// anything but missing hardware, or the sub-process error unchanged.
    /// Either way the engine stops running.
    pub fn run_one_tick(&mut self, ship: &mut ShipRegistry) -> Result<TickReport, ShuttleError> {
        let started = self.host.now();
        self.state.tick = self.state.tick.wrapping_add(1);
        self.state.cycle_start = started;
        let tick = self.state.tick;
        ship.refresh_handles(tick);

        let len = ProcessStep::ALL.len();
        if self.state.step >= len {
            self.state.step = 0;
        }
        let from = self.state.step;
        let step = ProcessStep::at(from);

        let span = info_span!("tick", tick, step = from, step_name = step.name());
        let _enter = span.enter();

        let outcome = if self.budget_spent(started) {
            debug!("execution budget spent; step deferred");
            TickOutcome::Deferred
        } else {
            self.dispatch(step, ship, started)?
        };

        if matches!(outcome, TickOutcome::Advanced | TickOutcome::Skipped(_)) {
            self.state.step = (from + 1) % len;
            self.state.previous_step_end = self.host.now();
            if let Ok(controller) = ship.flight_controller() {
                self.state.last_ship_position = controller.position();
            }
        }

        let sub_process = if self.budget_spent(started) {
            debug!("execution budget spent; sub-process deferred");
            None
        } else {
            let result = {
                let mut cx = SubProcessContext {
                    config: &self.config,
                    state: &self.state,
                    ship: &mut *ship,
                    battery: &mut self.battery,
                    now: started,
                };
                self.sub_process.run_next(&mut cx)
            };
            match result {
                Ok(line) => line,
                Err(err) => {
                    error!(%err, "sub-process failed");
                    self.state.running = false;
                    return Err(err);
                }
            }
        };

        let finished = self.host.now();
        Ok(TickReport {
            tick,
            from,
            to: self.state.step,
            step: step.name(),
            outcome,
            elapsed_ms: (finished - started).num_milliseconds(),
            load: self.host.instruction_load(),
            waypoint_count: self.state.waypoints.len(),
            destination: self.state.current_waypoint.as_ref().map(|w| w.name().to_string()),
            status_text: self.state.status_text.clone(),
            sub_process,
        })
    }

    fn budget_spent(&self, started: DateTime<Utc>) -> bool {
        self.budget
            .is_exhausted(started, self.host.now(), self.host.instruction_load())
    }

    fn dispatch(
        &mut self,
        step: ProcessStep,
        ship: &mut ShipRegistry,
        now: DateTime<Utc>,
    ) -> Result<TickOutcome, ShuttleError> {
        let guards = step.guards(&self.config);
        if let Some((guard, trip)) = self.check_guards(&guards, ship, now) {
            return Ok(match trip {
                GuardTrip::Skip(reason) => {
                    debug!(?guard, %reason, "step skipped");
                    TickOutcome::Skipped(reason)
                }
                GuardTrip::Hold(reason) => {
                    trace!(?guard, %reason, "step held");
                    TickOutcome::Retried(reason)
                }
            });
        }

        let index = self.state.step;
        let mut cx = StepContext {
            config: &self.config,
            state: &mut self.state,
            ship,
            battery: &mut self.battery,
            orbit: &mut self.orbit,
            oracle: &self.oracle,
            now,
        };
        match step.run(&mut cx) {
            Ok(StepOutcome::Advance) => {
                debug!("step completed");
                Ok(TickOutcome::Advanced)
            }
            Ok(StepOutcome::Skip(reason)) => {
                debug!(%reason, "step skipped");
                Ok(TickOutcome::Skipped(reason))
            }
            Ok(StepOutcome::Retry(reason)) => {
                trace!(%reason, "step waiting");
                Ok(TickOutcome::Retried(reason))
            }
            Err(ShuttleError::MissingHardware { component }) => {
                warn!(%component, "required hardware missing; step stalled");
                Ok(TickOutcome::Retried(format!("missing {component}")))
            }
            Err(err) => {
                error!(step = index, step_name = step.name(), %err, "step faulted");
                self.state.running = false;
                Err(ShuttleError::StepFault {
                    step: index,
                    name: step.name().to_string(),
                    details: err.to_string(),
                })
            }
        }
    }

    /// Snapshot what the guards need and return the first trip, if any.
    fn check_guards(
        &self,
        guards: &[Guard],
        ship: &ShipRegistry,
        now: DateTime<Utc>,
    ) -> Option<(Guard, GuardTrip)> {
        if guards.is_empty() {
            return None;
        }
        let entities = detected_entities(ship);
        let connector = ship.connector().ok();
        let ctx = GuardContext {
            tick: self.state.tick,
            now,
            previous_step_end: self.state.previous_step_end,
            orbit_mode: self.config.orbit_mode,
            connector_status: connector.map(|c| c.status()),
            orientation: connector.map_or_else(Orientation::identity, |c| c.orientation()),
            origin: ship
                .flight_controller()
                .map_or(self.state.last_ship_position, |c| c.position()),
            sensor_present: ship.sensor().is_some(),
            entities: &entities,
            oracle: &self.oracle,
            waypoint_stops: self
                .state
                .current_waypoint
                .as_ref()
                .map(|w| w.stop_at_waypoint()),
        };
        first_trip(guards, &ctx)
    }
}
