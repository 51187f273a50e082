//! [`Thruster`] – a single thruster with a manual override.

use shuttle_types::{ShuttleError, Vec3};

/// A thruster block.
///
/// `facing` is the world-space direction the exhaust points; the thruster
/// pushes the ship the opposite way.
pub trait Thruster: Send + Sync {
    /// Stable identifier, e.g. `"thruster_back_1"`.
    fn id(&self) -> &str;

    fn facing(&self) -> Vec3;

    /// Thrust currently produced, in newtons.
    fn current_thrust(&self) -> f64;

    /// Manual override in newtons; `0` hands control back to the autopilot.
    fn thrust_override(&self) -> f64;

    fn set_thrust_override(&mut self, newtons: f64) -> Result<(), ShuttleError>;
}
