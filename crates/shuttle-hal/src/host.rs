//! [`HostRuntime`] – what the host environment tells the controller about
//! itself: wall-clock time and how much of its per-tick budget is used.

use chrono::{DateTime, Utc};

pub trait HostRuntime: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Fraction of the per-tick instruction allowance already consumed.
    fn instruction_load(&self) -> f64 {
        0.0
    }
}

/// Host backed by the system clock; reports no instruction pressure.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHost;

impl HostRuntime for SystemHost {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
