//! [`BatteryManager`] – charge hysteresis and the critical-power latch.
//!
//! Two independent latches live here:
//!
//! | Latch | Sets when | Clears when | Driven by |
//! |---|---|---|---|
//! | low capacity | ratio < `min` | ratio ≥ `target` | `RechargeBatteries` step |
//! | critical | ratio < `critical` | ratio > `critical` | sub-process critical check |
//!
//! While the low-capacity latch is set, the weaker half of the fleet (rounded
//! up) is forced to recharge and the rest stays on automatic.  The wide
//! `[min, target)` band keeps the fleet from flapping between modes when the
//! ratio hovers near a single threshold.
//!
//! # Example
//!
//! ```rust
//! use shuttle_kernel::power::{BatteryManager, BatteryReading, BatteryThresholds};
//! use shuttle_types::ChargeMode;
//!
//! let mut manager = BatteryManager::new(BatteryThresholds::default());
//! let fleet = [BatteryReading::new(0.4, 1.0), BatteryReading::new(0.4, 1.0)];
//! let intent = manager.update_charge_intent(&fleet).unwrap();
//! assert!(intent.charging);
//! assert_eq!(intent.modes, vec![ChargeMode::Recharge, ChargeMode::Auto]);
//! ```

use shuttle_types::{ChargeMode, PowerState, ShuttleError};
use tracing::{debug, info, warn};

/// Stored and maximum energy of one battery, in MWh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryReading {
    pub stored: f64,
    pub max: f64,
}

impl BatteryReading {
    pub fn new(stored: f64, max: f64) -> Self {
        Self { stored, max }
    }
}

/// Aggregate charge ratio of a fleet, in `[0, 1]`.
///
/// An empty fleet, or one with no capacity at all, reports `0`.
pub fn remaining_ratio(readings: &[BatteryReading]) -> f64 {
    let (stored, max) = readings
        .iter()
        .fold((0.0, 0.0), |(s, m), r| (s + r.stored, m + r.max));
    if max > 0.0 {
        (stored / max).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Charge ratio thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryThresholds {
    /// Start charging below this ratio.
    pub min: f64,
    /// Once charging, keep going until this ratio.
    pub target: f64,
    /// Emergency behaviour below this ratio.
    pub critical: f64,
}

impl Default for BatteryThresholds {
    fn default() -> Self {
        Self {
            min: 0.5,
            target: 0.95,
            critical: 0.1,
        }
    }
}

impl BatteryThresholds {
    /// Check `0 ≤ critical ≤ min ≤ target ≤ 1`.
    ///
    /// # Errors
    ///
    /// Returns [`ShuttleError::Config`] naming the violated ordering.
    pub fn validate(&self) -> Result<(), ShuttleError> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !(in_unit(self.min) && in_unit(self.target) && in_unit(self.critical)) {
            return Err(ShuttleError::Config(format!(
                "battery thresholds must lie in [0, 1] (min {}, target {}, critical {})",
                self.min, self.target, self.critical
            )));
        }
        if self.min > self.target {
            return Err(ShuttleError::Config(format!(
                "min capacity {} exceeds target capacity {}",
                self.min, self.target
            )));
        }
        if self.critical > self.min {
            return Err(ShuttleError::Config(format!(
                "critical capacity {} exceeds min capacity {}",
                self.critical, self.min
            )));
        }
        Ok(())
    }
}

/// Result of one charge-intent update.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeIntent {
    /// Low-capacity latch after the update.
    pub charging: bool,
    pub ratio: f64,
    /// Charge mode for each input reading, in input order.
    pub modes: Vec<ChargeMode>,
}

/// Holds both battery latches across ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryManager {
    thresholds: BatteryThresholds,
    low_latched: bool,
    critical_latched: bool,
}

impl BatteryManager {
    pub fn new(thresholds: BatteryThresholds) -> Self {
        Self {
            thresholds,
            low_latched: false,
            critical_latched: false,
        }
    }

    pub fn thresholds(&self) -> &BatteryThresholds {
        &self.thresholds
    }

    pub fn is_low_latched(&self) -> bool {
        self.low_latched
    }

    pub fn is_critical(&self) -> bool {
        self.critical_latched
    }

    /// Clear the low-capacity latch at the start of a new lap.
    ///
    /// The critical latch only clears on a real recovery above the critical
    /// threshold, otherwise the normal-power transition would be lost.
    pub fn reset_charge_latch(&mut self) {
        self.low_latched = false;
    }

    /// Decide charge modes for the fleet.
    ///
    /// Returns `None` for an empty fleet so the caller can move on instead of
    /// waiting for batteries that do not exist.
    pub fn update_charge_intent(&mut self, readings: &[BatteryReading]) -> Option<ChargeIntent> {
        if readings.is_empty() {
            return None;
        }
        let ratio = remaining_ratio(readings);
        let charging = ratio < self.thresholds.min
            || (ratio < self.thresholds.target && self.low_latched);

        if charging != self.low_latched {
            debug!(ratio, charging, "low-capacity latch changed");
        }
        self.low_latched = charging;

        let mut modes = vec![ChargeMode::Auto; readings.len()];
        if charging {
            let mut order: Vec<usize> = (0..readings.len()).collect();
            order.sort_by(|&a, &b| readings[a].stored.total_cmp(&readings[b].stored));
            let to_charge = readings.len().div_ceil(2);
            for &idx in order.iter().take(to_charge) {
                modes[idx] = ChargeMode::Recharge;
            }
        }

        Some(ChargeIntent {
            charging,
            ratio,
            modes,
        })
    }

    /// Update the critical latch with the current `ratio`.
    ///
    /// Returns the new power state only when the latch flips; equality with
    /// the threshold holds the current state.
    pub fn check_critical(&mut self, ratio: f64) -> Option<PowerState> {
        let critical = self.thresholds.critical;
        if ratio < critical && !self.critical_latched {
            self.critical_latched = true;
            warn!(ratio, critical, "critical power detected");
            Some(PowerState::Critical)
        } else if ratio > critical && self.critical_latched {
            self.critical_latched = false;
            info!(ratio, critical, "normal power re-established");
            Some(PowerState::Normal)
        } else {
            None
        }
    }
}
