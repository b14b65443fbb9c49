use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runtime tuning for the navigation tracker
///
/// Every field has a default matching production behavior; a TOML file can
/// override any subset of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Minimum movement since the last accepted fix for a new fix to be processed (meters)
    pub min_movement_m: f64,

    /// Window inside which an unmoved fix is debounced; once it elapses a
    /// stationary user still gets a refresh (milliseconds)
    pub refresh_window_ms: i64,

    /// Radius at which the upcoming step counts as reached (meters)
    pub step_reached_radius_m: f64,

    /// Radius at which the final step counts as destination arrival (meters)
    pub arrival_radius_m: f64,

    /// Radius at which an upcoming turn is announced (meters)
    pub turn_approach_radius_m: f64,

    /// Speed assumed for ETA when the fix history cannot provide an estimate
    /// (meters per second; default is walking pace)
    pub default_speed_mps: f64,

    /// Total route distance assumed when the route carries no metadata (meters)
    pub default_total_distance_m: f64,

    /// Sessions idle longer than this are reaped (minutes)
    pub stale_session_minutes: i64,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            min_movement_m: 3.0,
            refresh_window_ms: 10_000,
            step_reached_radius_m: 20.0,
            arrival_radius_m: 20.0,
            turn_approach_radius_m: 50.0,
            default_speed_mps: 1.4,
            default_total_distance_m: 500.0,
            stale_session_minutes: 30,
        }
    }
}

impl NavConfig {
    /// Load configuration from a TOML file, filling unspecified fields with defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NavConfig::default();
        assert_eq!(config.min_movement_m, 3.0);
        assert_eq!(config.refresh_window_ms, 10_000);
        assert_eq!(config.step_reached_radius_m, 20.0);
        assert_eq!(config.default_total_distance_m, 500.0);
    }

    #[test]
    fn test_partial_toml_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rove.toml");
        std::fs::write(&path, "step_reached_radius_m = 25.0\nstale_session_minutes = 10\n")
            .unwrap();

        let config = NavConfig::load(&path).unwrap();
        assert_eq!(config.step_reached_radius_m, 25.0);
        assert_eq!(config.stale_session_minutes, 10);
        // Unspecified fields keep their defaults
        assert_eq!(config.min_movement_m, 3.0);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(NavConfig::load("/nonexistent/rove.toml").is_err());
    }
}
