//! [`DockingConnector`] – the connector the shuttle docks with.

use shuttle_types::{ConnectorStatus, Orientation, ShuttleError};

/// A docking connector mounted on the shuttle.
///
/// The connector's orientation doubles as the reference frame for obstruction
/// checks: "backward" always means away from whatever the connector faces.
pub trait DockingConnector: Send + Sync {
    /// Stable identifier, e.g. `"connector_main"`.
    fn id(&self) -> &str;

    /// `false` once the block is damaged or removed from the grid.
    fn is_working(&self) -> bool;

    fn status(&self) -> ConnectorStatus;

    /// Lock onto the connector currently in range.
    ///
    /// # Errors
    ///
    /// Returns [`ShuttleError::MissingHardware`] if the block stopped working.
    fn connect(&mut self) -> Result<(), ShuttleError>;

    /// Release any lock.
    ///
    /// # Errors
    ///
    /// Returns [`ShuttleError::MissingHardware`] if the block stopped working.
    fn disconnect(&mut self) -> Result<(), ShuttleError>;

    /// Magnetic pull strength in `[0, 1]`.
    fn set_pull_strength(&mut self, strength: f64) -> Result<(), ShuttleError>;

    /// World-space axes of the connector block.
    fn orientation(&self) -> Orientation;
}
