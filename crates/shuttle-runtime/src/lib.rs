//! `shuttle-runtime` – the autopilot step machine
//!
//! Drives a shuttle through a fixed fifteen-step lap (undock, move away,
//! fly, dock, recharge, park) one step per tick, with a three-step power and
//! broadcast sub-process running after every main step.
//!
//! # Modules
//!
//! - [`engine`] – [`ProcessEngine`]: owns the mission state, battery latches,
//!   orbit generator and execution budget, and advances the lap through
//!   [`ProcessEngine::run_one_tick`].  The engine alone moves the step index.
//! - [`steps`] – [`ProcessStep`]: the fifteen steps, their guards and their
//!   bodies.  A body returns a [`StepOutcome`] and never touches the index.
//! - [`sub_process`] – [`SubProcessCycle`]: critical-power latch, emergency
//!   generators and the state broadcast.
//! - [`mission`] – [`MissionConfig`] (every tunable with its default) and
//!   [`MissionState`] (what survives between ticks).
//! - [`commands`] – [`Command`]: operator commands applied through
//!   [`ProcessEngine::apply`].
//! - [`report`] – [`TickReport`]: the per-tick progress display.
//! - [`telemetry`] – [`init_tracing`]: `tracing` subscriber with an optional
//!   OTLP span exporter.  Set `OTEL_EXPORTER_OTLP_ENDPOINT` to enable it.
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
//! let report = engine.run_one_tick(&mut ship).unwrap();
//! assert_eq!(report.from, 0);
//! ```

pub mod commands;
pub mod engine;
pub mod mission;
pub mod report;
pub mod steps;
pub mod sub_process;
pub mod telemetry;

pub use commands::Command;
pub use engine::ProcessEngine;
pub use mission::{MissionConfig, MissionState, OrbitSettings};
pub use report::{TickOutcome, TickReport};
pub use steps::{ProcessStep, StepOutcome};
pub use sub_process::{SubProcessCycle, SubProcessStep};
pub use telemetry::{TracerProviderGuard, init_tracing};
