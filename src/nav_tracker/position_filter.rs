//! Fix acceptance filtering
//!
//! Decides whether a candidate GPS fix should drive a navigation update or be
//! dropped: malformed coordinates are rejected outright, and fixes that barely
//! moved are debounced until the refresh window elapses so transient GPS noise
//! does not churn the guidance state.

use tracing::{trace, warn};

use super::session::NavigationSession;
use crate::config::NavConfig;
use crate::geometry::haversine_distance;
use crate::position::PositionFix;

/// Why a fix was not processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Latitude/longitude non-finite or outside the valid WGS-84 range
    InvalidCoordinates,
    /// Moved less than the movement threshold inside the refresh window
    Debounced,
}

impl RejectReason {
    /// Stable label for metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidCoordinates => "invalid_coordinates",
            Self::Debounced => "debounced",
        }
    }
}

/// Result of checking a candidate fix against session state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterDecision {
    /// Fix should drive a navigation update; carries the distance moved since
    /// the last accepted fix when one exists
    Accepted { moved_m: Option<f64> },
    Rejected(RejectReason),
}

/// Check a candidate fix against the session's last accepted fix
///
/// A fix passes when its coordinates are valid and it either moved at least
/// the movement threshold or the refresh window has elapsed, so a stationary
/// user still gets a periodic update. Elapsed time is measured on fix
/// timestamps, which keeps replays deterministic.
pub fn evaluate_fix(
    session: &NavigationSession,
    fix: &PositionFix,
    config: &NavConfig,
) -> FilterDecision {
    if !fix.has_valid_coordinates() {
        warn!(
            latitude = fix.latitude,
            longitude = fix.longitude,
            "rejecting fix with invalid coordinates"
        );
        return FilterDecision::Rejected(RejectReason::InvalidCoordinates);
    }

    let (Some((last_lat, last_lng)), Some(last_time)) =
        (session.last_position(), session.last_fix_time)
    else {
        // First fix of the session is always processed
        return FilterDecision::Accepted { moved_m: None };
    };

    let moved_m = haversine_distance(last_lat, last_lng, fix.latitude, fix.longitude);
    let elapsed_ms = fix.timestamp.signed_duration_since(last_time).num_milliseconds();

    if moved_m < config.min_movement_m && elapsed_ms < config.refresh_window_ms {
        trace!(moved_m, elapsed_ms, "debouncing stationary fix");
        return FilterDecision::Rejected(RejectReason::Debounced);
    }

    FilterDecision::Accepted {
        moved_m: Some(moved_m),
    }
}
