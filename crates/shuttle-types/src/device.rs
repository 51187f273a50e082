//! Plain values read from, or written to, ship hardware.

use serde::{Deserialize, Serialize};

use crate::geometry::Vec3;

/// Docking connector state as reported by the host simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorStatus {
    /// Nothing in range.
    #[default]
    Unconnected,
    /// Another connector is aligned and in range but not locked.
    Connectable,
    /// Locked to another connector.
    Connected,
}

impl ConnectorStatus {
    /// `true` for `Connectable` and `Connected`: the shuttle sits on a dock.
    pub fn is_docked(self) -> bool {
        matches!(self, ConnectorStatus::Connectable | ConnectorStatus::Connected)
    }
}

/// Battery charge behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeMode {
    /// Charge and discharge as the grid demands.
    #[default]
    Auto,
    /// Only accept charge; never supply the grid.
    Recharge,
    /// Only supply the grid.
    Discharge,
}

/// Classification of a sensor-detected entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Stations and large ships.
    LargeGrid,
    SmallGrid,
    CharacterHuman,
    FloatingObject,
    Asteroid,
    Planet,
    Other,
}

/// An entity currently reported by a proximity sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedEntity {
    pub entity_id: i64,
    pub name: String,
    pub kind: EntityKind,
    pub position: Vec3,
}

impl DetectedEntity {
    pub fn new(entity_id: i64, name: impl Into<String>, kind: EntityKind, position: Vec3) -> Self {
        Self {
            entity_id,
            name: name.into(),
            kind,
            position,
        }
    }
}

/// Detection settings applied to the proximity sensor when a lap starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSettings {
    pub detect_friendly: bool,
    pub detect_owner: bool,
    pub detect_stations: bool,
    pub detect_large_ships: bool,
    pub detect_subgrids: bool,
    pub detect_players: bool,
    /// Detection box half-extent on every side, in metres.
    pub extent: f64,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            detect_friendly: true,
            detect_owner: true,
            detect_stations: true,
            detect_large_ships: true,
            detect_subgrids: true,
            detect_players: false,
            extent: 50.0,
        }
    }
}

/// Role tags assigned to auxiliary blocks in their configuration.
///
/// A block can carry several tags; the engine only ever looks blocks up by
/// tag, never by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockTag {
    /// Timer triggered right before undocking.
    BeforeUndocking,
    /// Timer triggered right after docking.
    AfterDocking,
    /// Functional block toggled right before undocking.
    ToggleBeforeUndocking,
    /// Functional block toggled right after docking.
    ToggleAfterDocking,
    /// Timer triggered when battery charge turns critical.
    OnCriticalPower,
    /// Timer triggered when battery charge recovers from critical.
    OnNormalPower,
    /// Non-essential block switched off while charge is critical.
    DisableOnEmergency,
    /// Generator switched on while charge is critical.
    EmergencyPower,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docked_states() {
        assert!(!ConnectorStatus::Unconnected.is_docked());
        assert!(ConnectorStatus::Connectable.is_docked());
        assert!(ConnectorStatus::Connected.is_docked());
    }

    #[test]
    fn connector_status_serializes_lowercase() {
        let json = serde_json::to_string(&ConnectorStatus::Connectable).unwrap();
        assert_eq!(json, "\"connectable\"");
    }

    #[test]
    fn default_sensor_settings_ignore_players() {
        let s = SensorSettings::default();
        assert!(!s.detect_players);
        assert!(s.detect_stations && s.detect_large_ships);
        assert!((s.extent - 50.0).abs() < f64::EPSILON);
    }
}
