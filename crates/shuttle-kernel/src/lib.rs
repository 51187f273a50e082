//! `shuttle-kernel` – Safety & Regulation
//!
//! The rules the step engine must obey.  Nothing here touches hardware: every
//! check works on plain values handed in by `shuttle-runtime`.
//!
//! # Modules
//!
//! - [`power`] – [`BatteryManager`][power::BatteryManager]: aggregate charge
//!   ratio, the low-capacity hysteresis that decides which units force-recharge,
//!   and the independent critical-power latch.
//! - [`guards`] – [`Guard`][guards::Guard]: preconditions evaluated in order
//!   before a step body runs; the first one that trips skips or holds the step.
//! - [`budget`] – [`ExecutionBudget`][budget::ExecutionBudget]: per-tick time
//!   and instruction-load ceiling.

pub mod budget;
pub mod guards;
pub mod power;

pub use budget::ExecutionBudget;
pub use guards::{Guard, GuardContext, GuardTrip, first_trip};
pub use power::{BatteryManager, BatteryReading, BatteryThresholds, ChargeIntent};
