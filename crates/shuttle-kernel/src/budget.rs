//! [`ExecutionBudget`] – per-tick time and load ceiling.
//!
//! The host gives each tick a bounded slice of compute.  The engine checks
//! the budget at fixed points and, when it is spent, stops doing optional
//! work for the rest of the tick instead of overrunning.

use chrono::{DateTime, Duration, Utc};

/// Default wall-clock allowance per tick.
pub const DEFAULT_MAX_RUN_MS: i64 = 35;
/// Default ceiling on the host's instruction-load fraction.
pub const DEFAULT_MAX_LOAD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionBudget {
    max_run: Duration,
    max_load: f64,
}

impl Default for ExecutionBudget {
    fn default() -> Self {
        Self::new(Duration::milliseconds(DEFAULT_MAX_RUN_MS), DEFAULT_MAX_LOAD)
    }
}

impl ExecutionBudget {
    pub fn new(max_run: Duration, max_load: f64) -> Self {
        Self { max_run, max_load }
    }

    /// `true` once the tick that started at `started` has run longer than
    /// allowed at `now` or the host reports more load than allowed.
    pub fn is_exhausted(&self, started: DateTime<Utc>, now: DateTime<Utc>, load: f64) -> bool {
        now - started > self.max_run || load > self.max_load
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tick_is_within_budget() {
        let budget = ExecutionBudget::default();
        let t = Utc::now();
        assert!(!budget.is_exhausted(t, t, 0.1));
    }

    #[test]
    fn overrun_time_exhausts_budget() {
        let budget = ExecutionBudget::default();
        let t = Utc::now();
        assert!(!budget.is_exhausted(t, t + Duration::milliseconds(35), 0.0));
        assert!(budget.is_exhausted(t, t + Duration::milliseconds(36), 0.0));
    }

    #[test]
    fn high_load_exhausts_budget() {
        let budget = ExecutionBudget::default();
        let t = Utc::now();
        assert!(!budget.is_exhausted(t, t, 0.8));
        assert!(budget.is_exhausted(t, t, 0.81));
    }
}
