//! Mission file – reads/writes `~/.shuttle/mission.toml`.
//!
//! ```toml
//! parking_period_secs = 10
//! orbit_mode = false
//! waypoints = [
//!     "GPS:Base:0:0:0:",
//!     { name = "Beacon", x = 1000.0, y = 0.0, z = 0.0, stop = false },
//! ]
//!
//! [orbit]
//! center = [0.0, 0.0, 0.0]
//! radius = 50000.0
//! ```
//!
//! Every other [`MissionConfig`] field may appear at the top level and falls
//! back to its default when absent.

use serde::Deserialize;
use shuttle_runtime::MissionConfig;
use shuttle_types::{ShuttleError, Vec3, Waypoint};
use std::fs;
use std::path::{Path, PathBuf};

/// One entry of the `waypoints` array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WaypointEntry {
    Gps(String),
    Table {
        name: String,
        x: f64,
        y: f64,
        z: f64,
        #[serde(default = "default_stop")]
        stop: bool,
    },
}

fn default_stop() -> bool {
    true
}

impl WaypointEntry {
    fn into_waypoint(self) -> Result<Waypoint, ShuttleError> {
        match self {
            WaypointEntry::Gps(gps) => gps.parse(),
            WaypointEntry::Table { name, x, y, z, stop } => {
                if name.is_empty() || ![x, y, z].iter().all(|v| v.is_finite()) {
                    return Err(ShuttleError::InvalidWaypoint(name));
                }
                Ok(Waypoint::new(name, Vec3::new(x, y, z), stop))
            }
        }
    }
}

/// Return the path to `~/.shuttle/mission.toml`.
pub fn mission_path() -> PathBuf {
    shuttle_dir().join("mission.toml")
}

/// `~/.shuttle`, falling back to the working directory without a home.
pub fn shuttle_dir() -> PathBuf {
    shuttle_dir_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn shuttle_dir_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".shuttle")
}

/// Load the mission from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<MissionConfig>, ShuttleError> {
    load_from(&mission_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<MissionConfig>, ShuttleError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        ShuttleError::Config(format!("Failed to read mission at {}: {e}", path.display()))
    })?;
    let mut mission = parse(&raw)?;
    apply_env_overrides(&mut mission);
    mission.validate()?;
    Ok(Some(mission))
}

/// Parse a mission file body.
pub(crate) fn parse(raw: &str) -> Result<MissionConfig, ShuttleError> {
    let mut table: toml::Table = raw
        .parse()
        .map_err(|e| ShuttleError::Config(format!("Failed to parse mission: {e}")))?;

    let entries: Vec<WaypointEntry> = match table.remove("waypoints") {
        Some(value) => value
            .try_into()
            .map_err(|e| ShuttleError::Config(format!("Invalid waypoint list: {e}")))?,
        None => Vec::new(),
    };

    let mut mission: MissionConfig = toml::Value::Table(table)
        .try_into()
        .map_err(|e| ShuttleError::Config(format!("Invalid mission settings: {e}")))?;
    mission.waypoints = entries
        .into_iter()
        .map(WaypointEntry::into_waypoint)
        .collect::<Result<_, _>>()?;
    Ok(mission)
}

/// Apply `SHUTTLE_*` environment variable overrides to `mission`.
///
/// | Variable | Mission field |
/// |---|---|
/// | `SHUTTLE_PARKING_PERIOD` | `parking_period_secs` |
/// | `SHUTTLE_MIN_CAPACITY` | `min_capacity` |
/// | `SHUTTLE_TARGET_CAPACITY` | `target_capacity` |
/// | `SHUTTLE_CRITICAL_CAPACITY` | `critical_capacity` |
/// | `SHUTTLE_ORBIT_MODE` | `orbit_mode` (`true`/`false`/`1`/`0`) |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(mission: &mut MissionConfig) {
    if let Some(secs) = env_parse::<i64>("SHUTTLE_PARKING_PERIOD") {
        mission.parking_period_secs = secs;
    }
    if let Some(ratio) = env_parse::<f64>("SHUTTLE_MIN_CAPACITY") {
        mission.min_capacity = ratio;
    }
    if let Some(ratio) = env_parse::<f64>("SHUTTLE_TARGET_CAPACITY") {
        mission.target_capacity = ratio;
    }
    if let Some(ratio) = env_parse::<f64>("SHUTTLE_CRITICAL_CAPACITY") {
        mission.critical_capacity = ratio;
    }
    if let Ok(v) = std::env::var("SHUTTLE_ORBIT_MODE") {
        match v.trim() {
            "true" | "1" => mission.orbit_mode = true,
            "false" | "0" => mission.orbit_mode = false,
            _ => {}
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}

/// Save the mission to disk, creating `~/.shuttle/` if necessary.
pub fn save(mission: &MissionConfig) -> Result<(), ShuttleError> {
    save_to(mission, &mission_path())
}

/// Waypoints are written back as GPS strings, or as tables for pass-through
/// waypoints, so the file stays hand-editable.
pub(crate) fn save_to(mission: &MissionConfig, path: &Path) -> Result<(), ShuttleError> {
    let serialize = |e: toml::ser::Error| ShuttleError::Serialization(e.to_string());

    let toml::Value::Table(mut table) = toml::Value::try_from(mission).map_err(serialize)? else {
        return Err(ShuttleError::Serialization(
            "mission did not serialize to a table".to_string(),
        ));
    };
    let waypoints = mission
        .waypoints
        .iter()
        .map(|wp| {
            if wp.stop_at_waypoint() {
                toml::Value::String(wp.to_string())
            } else {
                let c = wp.coords();
                let mut entry = toml::Table::new();
                entry.insert("name".into(), wp.name().into());
                entry.insert("x".into(), c.x.into());
                entry.insert("y".into(), c.y.into());
                entry.insert("z".into(), c.z.into());
                entry.insert("stop".into(), false.into());
                toml::Value::Table(entry)
            }
        })
        .collect();
    table.insert("waypoints".into(), toml::Value::Array(waypoints));

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ShuttleError::Config(format!("Failed to create mission directory: {e}"))
        })?;
    }
    let raw = toml::to_string_pretty(&table).map_err(serialize)?;
    fs::write(path, raw).map_err(|e| {
        ShuttleError::Config(format!("Failed to write mission at {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISSION: &str = r#"
parking_period_secs = 30
min_capacity = 0.4
waypoints = [
    "GPS:Base:0:0:0:",
    { name = "Beacon", x = 1000, y = 0.0, z = -5.5, stop = false },
    { name = "Outpost", x = 2000.0, y = 10.0, z = 0.0 },
]

[orbit]
center = [1.0, 2.0, 3.0]
radius = 8000
"#;

    #[test]
    fn parses_mixed_waypoint_forms() {
        let mission = parse(MISSION).expect("parse");
        assert_eq!(mission.parking_period_secs, 30);
        assert!((mission.min_capacity - 0.4).abs() < 1e-12);
        assert!((mission.target_capacity - 0.95).abs() < 1e-12);

        let names: Vec<&str> = mission.waypoints.iter().map(|w| w.name()).collect();
        assert_eq!(names, vec!["Base", "Beacon", "Outpost"]);
        assert!(mission.waypoints[0].stop_at_waypoint());
        assert!(!mission.waypoints[1].stop_at_waypoint());
        assert!(mission.waypoints[2].stop_at_waypoint());
        assert!(
            mission.waypoints[1]
                .coords()
                .approx_eq(Vec3::new(1000.0, 0.0, -5.5), 1e-12)
        );
    }

    #[test]
    fn parses_orbit_section() {
        let mission = parse(MISSION).expect("parse");
        assert!(mission.orbit.center.approx_eq(Vec3::new(1.0, 2.0, 3.0), 1e-12));
        assert!((mission.orbit.radius - 8000.0).abs() < 1e-9);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let mission = parse("").expect("parse");
        assert_eq!(mission, MissionConfig::default());
    }

    #[test]
    fn bad_gps_string_is_rejected() {
        let err = parse(r#"waypoints = ["Base:0:0:0"]"#).unwrap_err();
        assert!(matches!(err, ShuttleError::InvalidWaypoint(_)));
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        assert!(matches!(parse("radius = ="), Err(ShuttleError::Config(_))));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = shuttle_dir_for_home(&dir.path().to_string_lossy()).join("mission.toml");
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn load_from_rejects_invalid_thresholds() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("mission.toml");
        fs::write(&path, "min_capacity = 0.99\ntarget_capacity = 0.5\n").expect("write");
        assert!(matches!(load_from(&path), Err(ShuttleError::Config(_))));
    }

    #[test]
    fn load_from_rejects_unrepresentable_timeout() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("mission.toml");
        fs::write(&path, format!("undock_timeout_secs = {}\n", i64::MAX / 10)).expect("write");
        assert!(matches!(load_from(&path), Err(ShuttleError::Config(_))));
    }

    #[test]
    fn save_then_load_keeps_route() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = shuttle_dir_for_home(&dir.path().to_string_lossy()).join("mission.toml");

        let mission = parse(MISSION).expect("parse");
        save_to(&mission, &path).expect("save");
        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.contains("GPS:Base:0:0:0:"));

        let loaded = parse(&raw).expect("reparse");
        assert_eq!(loaded.waypoints, mission.waypoints);
        assert_eq!(loaded.parking_period_secs, 30);
    }

    #[test]
    fn env_overrides() {
        // SAFETY: these variables are only touched by this test.
        unsafe {
            std::env::set_var("SHUTTLE_PARKING_PERIOD", "45");
            std::env::set_var("SHUTTLE_CRITICAL_CAPACITY", "0.2");
            std::env::set_var("SHUTTLE_ORBIT_MODE", "1");
            std::env::set_var("SHUTTLE_MIN_CAPACITY", "half");
        }
        let mut mission = MissionConfig::default();
        apply_env_overrides(&mut mission);
        assert_eq!(mission.parking_period_secs, 45);
        assert!((mission.critical_capacity - 0.2).abs() < 1e-12);
        assert!(mission.orbit_mode);
        assert!((mission.min_capacity - 0.5).abs() < 1e-12, "invalid value ignored");
        unsafe {
            std::env::remove_var("SHUTTLE_PARKING_PERIOD");
            std::env::remove_var("SHUTTLE_CRITICAL_CAPACITY");
            std::env::remove_var("SHUTTLE_ORBIT_MODE");
            std::env::remove_var("SHUTTLE_MIN_CAPACITY");
        }
    }
}
