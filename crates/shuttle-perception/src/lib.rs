//! `shuttle-perception` – spatial reasoning for the shuttle autopilot.
//!
//! Turns raw positions and sensor detections into the answers the step
//! engine needs: "is this direction clear?" and "where is the next point on
//! the orbit?".
//!
//! # Modules
//!
//! - [`geometry`] – [`Quaternion`][geometry::Quaternion] rotations and the
//!   clamped angle between two directions.
//! - [`obstruction`] – [`ObstructionOracle`][obstruction::ObstructionOracle]:
//!   cone test against detected entities and departure-direction selection.
//! - [`orbit`] – [`OrbitGenerator`][orbit::OrbitGenerator]: synthetic
//!   waypoints stepping around a tilted circular orbit.

pub mod geometry;
pub mod obstruction;
pub mod orbit;
