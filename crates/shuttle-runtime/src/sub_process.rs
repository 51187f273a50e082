//! [`SubProcessCycle`] – the secondary cycle of power and broadcast checks.
//!
//! Runs one micro-step per tick after the main step, independent of which
//! main step is active:
//!
//! 1. [`SubProcessStep::CriticalPower`] – update the critical latch and, on a
//!    transition, fire the power timers, switch non-essential blocks and
//!    broadcast a [`EventPayload::PowerTransition`].
//! 2. [`SubProcessStep::EmergencyPower`] – keep emergency generators on
//!    exactly while the latch is set.
//! 3. [`SubProcessStep::Broadcast`] – announce identity, last known position
//!    and status text under [`STATE_BROADCAST_TAG`].

use chrono::{DateTime, Utc};
use shuttle_hal::ShipRegistry;
use shuttle_kernel::power::remaining_ratio;
use shuttle_kernel::{BatteryManager, BatteryReading};
use shuttle_types::{
    BlockTag, Event, EventPayload, POWER_BROADCAST_TAG, PowerState, STATE_BROADCAST_TAG,
    ShuttleError, ShuttleState,
};
use tracing::{debug, info};

use crate::mission::{MissionConfig, MissionState};

const EVENT_SOURCE: &str = "shuttle-runtime::sub_process";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubProcessStep {
    CriticalPower,
    EmergencyPower,
    Broadcast,
}

impl SubProcessStep {
    pub const ALL: [SubProcessStep; 3] = [
        SubProcessStep::CriticalPower,
        SubProcessStep::EmergencyPower,
        SubProcessStep::Broadcast,
    ];
}

/// What the sub-process checks may touch.
pub struct SubProcessContext<'a> {
    pub config: &'a MissionConfig,
    pub state: &'a MissionState,
    pub ship: &'a mut ShipRegistry,
    pub battery: &'a mut BatteryManager,
    pub now: DateTime<Utc>,
}

/// Round-robin position over [`SubProcessStep::ALL`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubProcessCycle {
    index: usize,
}

impl SubProcessCycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// The micro-step the next call to [`run_next`](Self::run_next) runs.
    pub fn current(&self) -> SubProcessStep {
        SubProcessStep::ALL[self.index % SubProcessStep::ALL.len()]
    }

    /// Run the current micro-step, then move to the next one.  Returns an
    /// optional log line for the progress report.
    ///
    /// # Errors
    ///
    /// Propagates hardware errors; the cycle stays on the failed micro-step.
    pub fn run_next(
        &mut self,
        cx: &mut SubProcessContext<'_>,
    ) -> Result<Option<String>, ShuttleError> {
        let line = match self.current() {
            SubProcessStep::CriticalPower => critical_power(cx)?,
            SubProcessStep::EmergencyPower => emergency_power(cx)?,
            SubProcessStep::Broadcast => broadcast(cx)?,
        };
        self.index = (self.index + 1) % SubProcessStep::ALL.len();
        Ok(line)
    }
}

fn critical_power(cx: &mut SubProcessContext<'_>) -> Result<Option<String>, ShuttleError> {
    let readings: Vec<BatteryReading> = cx
        .ship
        .batteries()
        .map(|b| BatteryReading::new(b.current_stored(), b.max_stored()))
        .collect();
    if readings.is_empty() {
        return Ok(None);
    }
    let ratio = remaining_ratio(&readings);

    if let Some(state) = cx.battery.check_critical(ratio) {
        let (timers, essentials_on) = match state {
            PowerState::Critical => (BlockTag::OnCriticalPower, false),
            PowerState::Normal => (BlockTag::OnNormalPower, true),
        };
        let fired = cx.ship.trigger_timers(timers)?;
        let switched = cx
            .ship
            .set_blocks_enabled(BlockTag::DisableOnEmergency, essentials_on)?;
        debug!(?state, fired, switched, "power transition handled");

        let event = Event::new(
            EVENT_SOURCE,
            cx.now,
            EventPayload::PowerTransition {
                grid_id: cx.config.grid_id,
                state,
                remaining_ratio: ratio,
            },
        );
        cx.ship.announce(POWER_BROADCAST_TAG, &event)?;
    }

    let mut line = format!("Battery capacity: {:.0}%", ratio * 100.0);
    if cx.battery.is_critical() {
        line.insert_str(0, "Critical power detected. ");
    }
    Ok(Some(line))
}

fn emergency_power(cx: &mut SubProcessContext<'_>) -> Result<Option<String>, ShuttleError> {
    let critical = cx.battery.is_critical();
    let switched = cx.ship.set_blocks_enabled(BlockTag::EmergencyPower, critical)?;
    if switched > 0 {
        info!(critical, switched, "emergency generators switched");
    }
    Ok(critical.then(|| "Emergency power on".to_string()))
}

fn broadcast(cx: &mut SubProcessContext<'_>) -> Result<Option<String>, ShuttleError> {
    let event = Event::new(
        EVENT_SOURCE,
        cx.now,
        EventPayload::ShuttleState(ShuttleState {
            grid_id: cx.config.grid_id,
            grid_name: cx.config.grid_name.clone(),
            position: cx.state.last_ship_position,
            status_text: cx.state.status_text.clone(),
        }),
    );
    cx.ship.announce(STATE_BROADCAST_TAG, &event)?;
    Ok(None)
}
