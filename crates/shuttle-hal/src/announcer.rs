//! [`Announcer`] – outbound broadcast channel.

use shuttle_types::{Event, ShuttleError};

/// Publishes events to listeners on other grids.
pub trait Announcer: Send + Sync {
    /// Broadcast `event` under `tag`.
    fn announce(&mut self, tag: &str, event: &Event) -> Result<(), ShuttleError>;
}
