//! Persisted autopilot state – `~/.shuttle/state.json`.
//!
//! Written when the operator stops or leaves the shell, read back at startup
//! so a restarted controller resumes the lap it was on.

use shuttle_types::{PersistedState, ShuttleError};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config;

pub fn state_path() -> PathBuf {
    config::shuttle_dir().join("state.json")
}

/// Load the saved state.  Returns `None` if nothing was saved yet.
pub fn load() -> Result<Option<PersistedState>, ShuttleError> {
    load_from(&state_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<PersistedState>, ShuttleError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        ShuttleError::Config(format!("Failed to read state at {}: {e}", path.display()))
    })?;
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| ShuttleError::Serialization(format!("Failed to parse state: {e}")))
}

pub(crate) fn save_to(state: &PersistedState, path: &Path) -> Result<(), ShuttleError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ShuttleError::Config(format!("Failed to create state directory: {e}"))
        })?;
    }
    let raw = serde_json::to_string_pretty(state)
        .map_err(|e| ShuttleError::Serialization(e.to_string()))?;
    fs::write(path, raw).map_err(|e| {
        ShuttleError::Config(format!("Failed to write state at {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join(".shuttle").join("state.json");
        let state = PersistedState {
            current_waypoint: Some("Outpost".to_string()),
            running: true,
            step: 8,
        };
        save_to(&state, &path).expect("save");
        assert_eq!(load_from(&path).expect("load"), Some(state));
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().expect("tmp dir");
        assert_eq!(load_from(&dir.path().join("state.json")).expect("load"), None);
    }

    #[test]
    fn step_defaults_when_absent() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"current_waypoint":null,"running":false}"#).expect("write");
        let state = load_from(&path).expect("load").expect("some");
        assert_eq!(state.step, 0);
    }

    #[test]
    fn corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("state.json");
        fs::write(&path, "not json").expect("write");
        assert!(matches!(load_from(&path), Err(ShuttleError::Serialization(_))));
    }
}
