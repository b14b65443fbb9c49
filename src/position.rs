use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A GPS position fix for a navigating user
/// This is the main domain entity for position updates, agnostic to source
/// (device geolocation callback, replay file) and destination (tracker, sinks)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionFix {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,

    /// Reported horizontal accuracy in meters, if the device provides it
    #[serde(default, alias = "accuracy")]
    pub accuracy_m: Option<f64>,

    /// Device compass heading in degrees, if the device provides it
    #[serde(default, alias = "heading")]
    pub heading_deg: Option<f64>,

    /// Timestamp reported by the positioning source
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl PositionFix {
    /// Create a fix stamped with the current time
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self::at(latitude, longitude, Utc::now())
    }

    /// Create a fix with an explicit timestamp
    pub fn at(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m: None,
            heading_deg: None,
            timestamp,
        }
    }

    /// Whether the coordinates are finite and within valid WGS-84 bounds
    /// Fixes failing this check never mutate session state
    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= 90.0
            && self.longitude.abs() <= 180.0
    }
}
