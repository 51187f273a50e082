//! Auxiliary blocks addressed by role tag: switchable blocks, timers and the
//! external docking script.

use shuttle_types::{BlockTag, ShuttleError};

/// Any block with an on/off switch (lights, doors, generators, …).
pub trait FunctionalBlock: Send + Sync {
    fn id(&self) -> &str;

    /// Role tags read from the block's configuration.
    fn tags(&self) -> &[BlockTag];

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool) -> Result<(), ShuttleError>;

    fn has_tag(&self, tag: BlockTag) -> bool {
        self.tags().contains(&tag)
    }
}

/// A timer block whose actions run when triggered.
pub trait TimerBlock: Send + Sync {
    fn id(&self) -> &str;

    fn tags(&self) -> &[BlockTag];

    /// Run the timer's actions immediately.
    fn trigger(&mut self) -> Result<(), ShuttleError>;

    fn has_tag(&self, tag: BlockTag) -> bool {
        self.tags().contains(&tag)
    }
}

/// An external program that performs the final docking approach.
pub trait DockingScript: Send + Sync {
    fn id(&self) -> &str;

    fn is_working(&self) -> bool;

    /// `true` while a previous run has not finished.
    fn is_running(&self) -> bool;

    /// Start the script with `argument`.
    ///
    /// Returns `Ok(false)` when the script refused to start.
    fn run(&mut self, argument: &str) -> Result<bool, ShuttleError>;
}
