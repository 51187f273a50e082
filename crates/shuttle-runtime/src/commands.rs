//! Operator commands.
//!
//! | Command | Effect |
//! |---|---|
//! | `start` | Resume automatic ticking. |
//! | `stop` | Halt automatic ticking; progress is kept. |
//! | `shutdown` | Zero thrust overrides, return batteries to auto, clear the autopilot, stop. |
//! | `reset` | Restart the lap at step 0. |
//! | `step N` | Jump to step `N` and stop automatic ticking. |
//! | `next` | Move to the next step without running the current one. |
//! | `next-waypoint` | Select the next waypoint and restart the lap. |
//! | `add-waypoint GPS:Name:x:y:z:` | Append a waypoint to the route. |

use std::str::FromStr;

use shuttle_hal::ShipRegistry;
use shuttle_types::{ChargeMode, ShuttleError, Waypoint};
use tracing::info;

use crate::engine::ProcessEngine;
use crate::steps::ProcessStep;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start,
    Stop,
    Shutdown,
    Reset,
    Step(usize),
    Next,
    NextWaypoint,
    AddWaypoint(Waypoint),
}

impl FromStr for Command {
    type Err = ShuttleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (verb, arg) = match s.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (s, ""),
        };
        let command = match (verb.to_ascii_lowercase().as_str(), arg.is_empty()) {
            ("start", true) => Command::Start,
            ("stop", true) => Command::Stop,
            ("shutdown", true) => Command::Shutdown,
            ("reset", true) => Command::Reset,
            ("next", true) => Command::Next,
            ("next-waypoint", true) => Command::NextWaypoint,
            ("step", false) => Command::Step(arg.parse().map_err(|_| {
                ShuttleError::UnknownCommand(format!("step expects an index, got `{arg}`"))
            })?),
            ("add-waypoint", false) => Command::AddWaypoint(arg.parse()?),
            _ => return Err(ShuttleError::UnknownCommand(s.to_string())),
        };
        Ok(command)
    }
}

impl ProcessEngine {
    /// Apply an operator command and return a confirmation line.
    ///
    /// # Errors
    ///
    /// [`ShuttleError::InvalidStep`] for a jump outside the step list, or any
    /// hardware error raised while shutting down.
    pub fn apply(&mut self, command: Command, ship: &mut ShipRegistry) -> Result<String, ShuttleError> {
        let len = ProcessStep::ALL.len();
        let message = match command {
            Command::Start => {
                self.state_mut().running = true;
                "Started".to_string()
            }
            Command::Stop => {
                self.state_mut().running = false;
                "Stopped".to_string()
            }
            Command::Shutdown => {
                ship.set_all_thrust_overrides(0.0)?;
                for battery in ship.batteries_mut().iter_mut() {
                    battery.set_charge_mode(ChargeMode::Auto)?;
                }
                if let Ok(controller) = ship.flight_controller_mut() {
                    controller.set_autopilot_enabled(false)?;
                    controller.clear_waypoints()?;
                }
                self.state_mut().running = false;
                "Shut down".to_string()
            }
            Command::Reset => {
                self.state_mut().step = 0;
                "Step reset to 0".to_string()
            }
            Command::Step(step) => {
                if step >= len {
                    return Err(ShuttleError::InvalidStep { step, len });
                }
                let state = self.state_mut();
                state.step = step;
                state.running = false;
                format!("Jumped to step {step} ({})", ProcessStep::at(step))
            }
            Command::Next => {
                let state = self.state_mut();
                state.step = (state.step + 1) % len;
                format!("Moved to step {} ({})", state.step, ProcessStep::at(state.step))
            }
            Command::NextWaypoint => {
                let state = self.state_mut();
                let next = state.next_waypoint().cloned();
                let name = next.as_ref().map_or("NA", |w| w.name()).to_string();
                state.current_waypoint = next;
                state.step = 0;
                format!("Next waypoint: {name}")
            }
            Command::AddWaypoint(waypoint) => {
                let message = format!("Added waypoint {}", waypoint.name());
                self.state_mut().waypoints.push(waypoint);
                message
            }
        };
        info!(%message, "operator command applied");
        Ok(message)
    }
}
