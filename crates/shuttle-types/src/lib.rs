//! `shuttle-types` – shared value types for the shuttle autopilot.
//!
//! Everything that crosses a crate boundary lives here: world-space
//! geometry, waypoints, hardware status values, broadcast payloads, the
//! persisted-state record and the global [`ShuttleError`].

pub mod device;
pub mod geometry;
pub mod waypoint;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use device::{
    BlockTag, ChargeMode, ConnectorStatus, DetectedEntity, EntityKind, SensorSettings,
};
pub use geometry::{Direction, Orientation, Vec3};
pub use waypoint::Waypoint;

/// Broadcast tag carried by every shuttle state announcement.
pub const STATE_BROADCAST_TAG: &str = "SHUTTLE_STATE";

/// Broadcast tag carried by critical/normal power transitions.
pub const POWER_BROADCAST_TAG: &str = "SHUTTLE_POWER";

/// Unified envelope for everything the shuttle announces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "shuttle-runtime::sub_process"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(source: impl Into<String>, timestamp: DateTime<Utc>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            source: source.into(),
            payload,
        }
    }
}

/// Structured broadcast payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum EventPayload {
    /// Periodic identity + position + status announcement.
    ShuttleState(ShuttleState),
    /// Battery charge crossed the critical threshold in either direction.
    PowerTransition {
        grid_id: i64,
        state: PowerState,
        remaining_ratio: f64,
    },
}

/// Vehicle identity, last-known position and human-readable status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShuttleState {
    pub grid_id: i64,
    pub grid_name: String,
    pub position: Vec3,
    pub status_text: String,
}

/// Power condition reported by a [`EventPayload::PowerTransition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    Critical,
    Normal,
}

/// State that survives a restart of the controller.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PersistedState {
    /// Name of the waypoint the shuttle is heading for, if any.
    pub current_waypoint: Option<String>,
    /// Whether automatic ticking was active when the state was saved.
    pub running: bool,
    /// Step index at save time.
    #[serde(default)]
    pub step: usize,
}

/// Global error type spanning hardware problems, bad mission data and step faults.
///
/// `MissingHardware` is the one variant the step engine treats as a stall
/// rather than a fault: the part may be repaired or re-attached later.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShuttleError {
    #[error("Missing hardware: {component}")]
    MissingHardware { component: String },

    #[error("Hardware fault in {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Invalid waypoint: {0}")]
    InvalidWaypoint(String),

    #[error("Fault in step {step} ({name}): {details}")]
    StepFault {
        step: usize,
        name: String,
        details: String,
    },

    #[error("Step {step} out of range (0..{len})")]
    InvalidStep { step: usize, len: usize },

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_event_roundtrip() {
        let event = Event::new(
            "shuttle-runtime::sub_process",
            Utc::now(),
            EventPayload::ShuttleState(ShuttleState {
                grid_id: 42,
                grid_name: "Shuttle A".to_string(),
                position: Vec3::new(1.0, 2.0, 3.0),
                status_text: "Docking at Base".to_string(),
            }),
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event.id, back.id);
        match back.payload {
            EventPayload::ShuttleState(state) => assert_eq!(state.grid_name, "Shuttle A"),
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn power_transition_is_tagged() {
        let payload = EventPayload::PowerTransition {
            grid_id: 7,
            state: PowerState::Critical,
            remaining_ratio: 0.05,
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"kind\":\"PowerTransition\""));
        assert!(json.contains("\"critical\""));
    }

    #[test]
    fn persisted_state_defaults_step() {
        let state: PersistedState =
            serde_json::from_str(r#"{"current_waypoint":"Base","running":true}"#).unwrap();
        assert_eq!(state.current_waypoint.as_deref(), Some("Base"));
        assert!(state.running);
        assert_eq!(state.step, 0);
    }

    #[test]
    fn shuttle_error_display() {
        let err = ShuttleError::StepFault {
            step: 7,
            name: "GoToWaypoint".to_string(),
            details: "autopilot rejected target".to_string(),
        };
        assert!(err.to_string().contains("step 7"));
        assert!(err.to_string().contains("GoToWaypoint"));

        let err = ShuttleError::MissingHardware {
            component: "docking connector".to_string(),
        };
        assert!(err.to_string().contains("docking connector"));
    }
}
