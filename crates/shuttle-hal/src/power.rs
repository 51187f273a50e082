//! [`Battery`] – an energy storage unit.

use shuttle_types::{ChargeMode, ShuttleError};

/// A battery block.  Stored energy is in MWh.
pub trait Battery: Send + Sync {
    fn id(&self) -> &str;

    /// `false` once the block is damaged; non-functional units are ignored.
    fn is_functional(&self) -> bool;

    fn current_stored(&self) -> f64;

    fn max_stored(&self) -> f64;

    fn charge_mode(&self) -> ChargeMode;

    fn set_charge_mode(&mut self, mode: ChargeMode) -> Result<(), ShuttleError>;
}
