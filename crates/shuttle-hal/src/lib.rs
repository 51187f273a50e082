//! `shuttle-hal` – hardware ports for the shuttle autopilot.
//!
//! Every piece of ship hardware the controller touches is reached through a
//! small trait.  A [`ShipRegistry`] owns the registered drivers and hands the
//! step engine the ones it needs; [`sim::SimShip`] builds a registry backed by
//! an in-process simulation for tests and the CLI.

pub mod announcer;
pub mod block;
pub mod connector;
pub mod flight;
pub mod handle;
pub mod host;
pub mod power;
pub mod registry;
pub mod sensor;
pub mod sim;
pub mod thruster;

pub use announcer::Announcer;
pub use block::{DockingScript, FunctionalBlock, TimerBlock};
pub use connector::DockingConnector;
pub use flight::{AutopilotSettings, FlightController, FlightMode};
pub use handle::HandleCache;
pub use host::{HostRuntime, SystemHost};
pub use power::Battery;
pub use registry::ShipRegistry;
pub use sensor::ProximitySensor;
pub use thruster::Thruster;
