use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

use crate::geometry::haversine_distance;
use crate::position::PositionFix;
use crate::route::Route;

/// Compact sample kept in the per-session history
/// Much smaller than the full PositionFix - only what speed estimation needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSample {
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lng: f64,
}

impl PositionSample {
    pub fn from_fix(fix: &PositionFix) -> Self {
        Self {
            timestamp: fix.timestamp,
            lat: fix.latitude,
            lng: fix.longitude,
        }
    }
}

/// How many recent samples each session keeps for speed estimation
const RECENT_SAMPLE_CAPACITY: usize = 10;

/// State for one active navigation session
///
/// Created when navigation starts, mutated only by accepted fixes, removed
/// when navigation ends, when a new route replaces it, or by the reaper.
#[derive(Debug, Clone)]
pub struct NavigationSession {
    pub id: Uuid,
    pub route: Route,

    /// Cursor into route steps; only ever moves forward, at most one step per
    /// accepted fix
    current_step_index: usize,

    /// Recent accepted fixes (oldest first), for ground-speed estimation
    pub recent_samples: VecDeque<PositionSample>,

    /// Timestamp of the last accepted fix (debounce clock)
    pub last_fix_time: Option<DateTime<Utc>>,

    /// Wall clock time of the last update (for the stale-session reaper)
    pub last_update_time: DateTime<Utc>,

    /// Upcoming step index that already got a turn-approach notice
    pub last_announced_turn: Option<usize>,

    /// Latched once the destination proximity check passes
    pub arrived: bool,

    pub started_at: DateTime<Utc>,
}

impl NavigationSession {
    pub fn new(id: Uuid, route: Route) -> Self {
        let now = Utc::now();
        Self {
            id,
            route,
            current_step_index: 0,
            recent_samples: VecDeque::with_capacity(RECENT_SAMPLE_CAPACITY),
            last_fix_time: None,
            last_update_time: now,
            last_announced_turn: None,
            arrived: false,
            started_at: now,
        }
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    /// Advance the route cursor by exactly one step, saturating at the final
    /// index. Returns the new index.
    pub fn advance_step(&mut self) -> usize {
        if self.current_step_index < self.route.last_index() {
            self.current_step_index += 1;
        }
        self.current_step_index
    }

    /// Whether the cursor sits on the final step (the destination)
    pub fn is_on_final_step(&self) -> bool {
        self.current_step_index >= self.route.last_index()
    }

    /// Index of the step currently navigated to: the upcoming step while one
    /// exists, otherwise the final step
    pub fn target_step_index(&self) -> usize {
        (self.current_step_index + 1).min(self.route.last_index())
    }

    /// Stamp both update clocks for an accepted fix
    /// Called before any further processing so a re-entrant flood of fixes
    /// debounces against the update already in progress
    pub fn touch(&mut self, fix: &PositionFix) {
        self.last_fix_time = Some(fix.timestamp);
        self.last_update_time = Utc::now();
    }

    /// Append an accepted fix to the bounded history
    pub fn record_sample(&mut self, fix: &PositionFix) {
        if self.recent_samples.len() >= RECENT_SAMPLE_CAPACITY {
            self.recent_samples.pop_front();
        }
        self.recent_samples.push_back(PositionSample::from_fix(fix));
    }

    /// Last accepted position (lat, lng)
    pub fn last_position(&self) -> Option<(f64, f64)> {
        self.recent_samples.back().map(|s| (s.lat, s.lng))
    }

    /// Estimate ground speed from the recent sample history
    /// Uses the first and last sample within the last 60 seconds
    pub fn estimate_speed_mps(&self) -> Option<f64> {
        let most_recent = self.recent_samples.back()?.timestamp;

        let windowed: Vec<&PositionSample> = self
            .recent_samples
            .iter()
            .filter(|s| most_recent.signed_duration_since(s.timestamp).num_seconds() <= 60)
            .collect();

        if windowed.len() < 2 {
            return None;
        }

        let first = windowed.first()?;
        let last = windowed.last()?;
        let elapsed_seconds = (last.timestamp - first.timestamp).num_seconds();

        // Require at least 5 seconds between samples to avoid noise
        if elapsed_seconds < 5 {
            return None;
        }

        let moved_m = haversine_distance(first.lat, first.lng, last.lat, last.lng);
        Some(moved_m / elapsed_seconds as f64)
    }

    /// Summed leg distance already covered (legs behind the cursor)
    pub fn covered_distance_m(&self) -> f64 {
        self.route.legs()[..self.current_step_index.min(self.route.legs().len())]
            .iter()
            .sum()
    }

    /// Summed leg distance beyond the given step
    pub fn remaining_legs_after(&self, step_index: usize) -> f64 {
        self.route.legs()[step_index.min(self.route.legs().len())..]
            .iter()
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_route() -> Route {
        Route::from_json(
            r#"[{"lat": 0.0, "lng": 0.0}, {"lat": 0.0, "lng": 0.001}, {"lat": 0.0, "lng": 0.002}]"#,
        )
        .unwrap()
    }

    fn fix_at(lat: f64, lng: f64, offset_s: i64) -> PositionFix {
        let base = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        PositionFix::at(lat, lng, base + chrono::Duration::seconds(offset_s))
    }

    #[test]
    fn test_advance_saturates_at_final_index() {
        let mut session = NavigationSession::new(Uuid::new_v4(), test_route());
        assert_eq!(session.current_step_index(), 0);
        assert_eq!(session.advance_step(), 1);
        assert_eq!(session.advance_step(), 2);
        // Already on the final step; the cursor never moves past it
        assert_eq!(session.advance_step(), 2);
        assert!(session.is_on_final_step());
    }

    #[test]
    fn test_target_step_index_tracks_upcoming_then_final() {
        let mut session = NavigationSession::new(Uuid::new_v4(), test_route());
        assert_eq!(session.target_step_index(), 1);
        session.advance_step();
        assert_eq!(session.target_step_index(), 2);
        session.advance_step();
        // On the final step the destination itself is the target
        assert_eq!(session.target_step_index(), 2);
    }

    #[test]
    fn test_estimate_speed_from_samples() {
        let mut session = NavigationSession::new(Uuid::new_v4(), test_route());
        // ~111 m east over 10 seconds -> ~11 m/s
        session.record_sample(&fix_at(0.0, 0.0, 0));
        session.record_sample(&fix_at(0.0, 0.001, 10));

        let speed = session.estimate_speed_mps().unwrap();
        assert!((speed - 11.1).abs() < 0.5, "got {speed}");
    }

    #[test]
    fn test_estimate_speed_requires_sample_spacing() {
        let mut session = NavigationSession::new(Uuid::new_v4(), test_route());
        session.record_sample(&fix_at(0.0, 0.0, 0));
        session.record_sample(&fix_at(0.0, 0.001, 2));
        assert!(session.estimate_speed_mps().is_none());
    }

    #[test]
    fn test_estimate_speed_requires_two_samples() {
        let mut session = NavigationSession::new(Uuid::new_v4(), test_route());
        assert!(session.estimate_speed_mps().is_none());
        session.record_sample(&fix_at(0.0, 0.0, 0));
        assert!(session.estimate_speed_mps().is_none());
    }

    #[test]
    fn test_covered_and_remaining_distance() {
        let mut session = NavigationSession::new(Uuid::new_v4(), test_route());
        assert_eq!(session.covered_distance_m(), 0.0);

        let full = session.route.summed_leg_distance_m();
        session.advance_step();
        let covered = session.covered_distance_m();
        assert!(covered > 0.0 && covered < full);
        assert!((covered + session.remaining_legs_after(1) - full).abs() < 1e-9);
    }

    #[test]
    fn test_sample_history_is_bounded() {
        let mut session = NavigationSession::new(Uuid::new_v4(), test_route());
        for i in 0..25 {
            session.record_sample(&fix_at(0.0, 0.0001 * i as f64, i));
        }
        assert_eq!(session.recent_samples.len(), 10);
        // Oldest samples were dropped
        assert_eq!(session.recent_samples.front().unwrap().timestamp, fix_at(0.0, 0.0, 15).timestamp);
    }
}
