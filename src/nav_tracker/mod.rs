mod guidance;
mod position_filter;
mod session;
mod step_advance;
pub(crate) mod utils;

pub use guidance::{
    BannerUpdate, GuidanceSink, GuidanceUpdate, LogGuidanceSink, MarkerUpdate, TurnApproach,
};
pub use position_filter::{FilterDecision, RejectReason};
pub use session::{NavigationSession, PositionSample};
pub use step_advance::StepCheckResult;

use crate::config::NavConfig;
use crate::position::PositionFix;
use crate::route::Route;
use anyhow::{Result, bail};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::Instrument;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Session map using DashMap for concurrent per-session locking
pub(crate) type SessionsMap = Arc<DashMap<Uuid, NavigationSession>>;

/// session_id -> Arc<Mutex<()>>; serializes fix processing per session
pub(crate) type SessionLocksMap = Arc<DashMap<Uuid, Arc<Mutex<()>>>>;

/// Tracks active navigation sessions and drives per-fix guidance updates
///
/// Fix processing for one session is strictly serialized by its lock while
/// distinct sessions proceed independently; callers can push fixes from any
/// task without additional coordination.
#[derive(Clone)]
pub struct NavTracker {
    config: NavConfig,
    sessions: SessionsMap,
    session_locks: SessionLocksMap,
    sinks: Vec<Arc<dyn GuidanceSink>>,
}

impl NavTracker {
    pub fn new(config: NavConfig) -> Self {
        Self {
            config,
            sessions: Arc::new(DashMap::new()),
            session_locks: Arc::new(DashMap::new()),
            sinks: Vec::new(),
        }
    }

    /// Register a guidance sink; call before processing begins
    pub fn add_sink(&mut self, sink: Arc<dyn GuidanceSink>) {
        self.sinks.push(sink);
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    /// Start a navigation session for a computed route
    /// Returns the session handle used for subsequent fix updates
    pub fn start_session(&self, route: Route) -> Result<Uuid> {
        if route.is_empty() {
            bail!("cannot start navigation for a route with no steps");
        }

        let session_id = Uuid::new_v4();
        if route.total_distance_m.is_none() {
            // Progress will be computed against the configured default; make
            // the missing metadata visible instead of silently absorbing it
            warn!(
                session = %session_id,
                fallback_m = self.config.default_total_distance_m,
                "route carries no total distance metadata"
            );
            metrics::counter!("nav_tracker.default_total_distance_used_total").increment(1);
        }

        let session = NavigationSession::new(session_id, route);
        info!(
            session = %session_id,
            steps = session.route.len(),
            "started navigation session"
        );
        self.sessions.insert(session_id, session);
        metrics::counter!("nav_tracker.sessions_started_total").increment(1);
        utils::update_nav_tracker_metrics(&self.sessions, self.config.stale_session_minutes);

        Ok(session_id)
    }

    /// End a session and drop its state. Returns whether it existed.
    pub fn end_session(&self, session_id: Uuid) -> bool {
        let existed = match self.sessions.remove(&session_id) {
            Some((_, session)) => {
                self.cleanup_session_lock(session_id);
                let duration_s = chrono::Utc::now()
                    .signed_duration_since(session.started_at)
                    .num_seconds();
                info!(session = %session_id, duration_s, "ended navigation session");
                true
            }
            None => false,
        };
        utils::update_nav_tracker_metrics(&self.sessions, self.config.stale_session_minutes);
        existed
    }

    /// Number of currently active sessions
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Clone of a session's current state, for inspection and tests
    pub fn snapshot(&self, session_id: Uuid) -> Option<NavigationSession> {
        self.sessions.get(&session_id).map(|entry| entry.value().clone())
    }

    fn cleanup_session_lock(&self, session_id: Uuid) {
        if self.session_locks.remove(&session_id).is_some() {
            trace!(session = %session_id, "cleaned up session lock");
        }
    }

    /// Process one GPS fix for a session
    ///
    /// This is the per-location-tick entry point and never returns an error:
    /// malformed or debounced input is logged, counted, and dropped without
    /// touching session state. Returns the computed guidance update when the
    /// fix was accepted.
    pub async fn process_fix(
        &self,
        session_id: Uuid,
        fix: PositionFix,
    ) -> Option<GuidanceUpdate> {
        // Acquire the per-session lock so fixes for one session are processed
        // strictly in sequence
        let session_lock = self
            .session_locks
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = session_lock.lock().await;

        let processing_start = std::time::Instant::now();

        let mut entry = match self.sessions.get_mut(&session_id) {
            Some(entry) => entry,
            None => {
                warn!(session = %session_id, "fix for unknown navigation session");
                return None;
            }
        };
        let session = entry.value_mut();

        match position_filter::evaluate_fix(session, &fix, &self.config) {
            FilterDecision::Rejected(reason) => {
                metrics::counter!("nav_tracker.fixes_rejected_total", "reason" => reason.as_str())
                    .increment(1);
                return None;
            }
            FilterDecision::Accepted { moved_m } => {
                trace!(session = %session_id, ?moved_m, "accepted fix");
            }
        }

        // Stamp the update clocks before any further processing so a
        // re-entrant flood of fixes debounces against this update
        session.touch(&fix);

        let check = step_advance::check_step_progress(session, &fix, &self.config);

        let mut advanced_to = None;
        let mut arrived_now = false;
        match check {
            StepCheckResult::StepReached { distance_m, .. } => {
                let new_index = session.advance_step();
                debug!(
                    session = %session_id,
                    step = new_index,
                    distance_m = format!("{distance_m:.1}").as_str(),
                    "advanced to next step"
                );
                metrics::counter!("nav_tracker.steps_advanced_total").increment(1);
                advanced_to = Some(new_index);
            }
            StepCheckResult::DestinationReached { distance_m } => {
                if !session.arrived {
                    session.arrived = true;
                    arrived_now = true;
                    info!(
                        session = %session_id,
                        distance_m = format!("{distance_m:.1}").as_str(),
                        "destination reached"
                    );
                    metrics::counter!("nav_tracker.arrivals_total").increment(1);
                }
            }
            StepCheckResult::Approaching { .. } | StepCheckResult::EnRouteToDestination { .. } => {}
        }

        // Announce an upcoming turn once per step, as soon as the fix comes
        // within the approach radius
        let turn_approach = match check {
            StepCheckResult::Approaching { step_index, distance_m }
                if distance_m <= self.config.turn_approach_radius_m
                    && session.last_announced_turn != Some(step_index) =>
            {
                session.last_announced_turn = Some(step_index);
                let step = &session.route.steps[step_index];
                Some(TurnApproach {
                    step_index,
                    instruction: step.instruction.clone(),
                    distance_m,
                })
            }
            _ => None,
        };

        session.record_sample(&fix);

        let marker = guidance::build_marker(session, &fix);
        let banner = guidance::build_banner(session, &fix, &self.config);
        let update = GuidanceUpdate {
            session_id,
            marker,
            banner,
            turn_approach,
            advanced_to,
            arrived: session.arrived,
        };

        // Release the map guard before fanning out to the sinks
        drop(entry);

        for sink in &self.sinks {
            sink.update_marker(session_id, &update.marker);
            sink.update_banner(session_id, &update.banner);
            if let Some(notice) = &update.turn_approach {
                sink.turn_approaching(session_id, notice);
            }
            if arrived_now {
                sink.arrived(session_id, fix.latitude, fix.longitude);
            }
        }

        metrics::counter!("nav_tracker.fixes_processed_total").increment(1);
        metrics::histogram!("nav_tracker.fix_processing_ms")
            .record(processing_start.elapsed().as_micros() as f64 / 1000.0);

        Some(update)
    }

    /// Start a background task that periodically reaps idle sessions
    pub fn start_stale_session_reaper(&self, check_interval_secs: u64) {
        let tracker = self.clone();
        tokio::spawn(
            async move {
                let mut interval =
                    tokio::time::interval(std::time::Duration::from_secs(check_interval_secs));
                // Skip the first tick (immediate execution)
                interval.tick().await;

                loop {
                    interval.tick().await;
                    tracker.reap_stale_sessions();
                }
            }
            .instrument(tracing::info_span!("stale_session_reaper")),
        );
        info!(
            "started stale session reaper (every {} seconds)",
            check_interval_secs
        );
    }

    /// Drop sessions that have not seen an accepted fix within the stale timeout
    pub fn reap_stale_sessions(&self) {
        let stale_threshold = chrono::Duration::minutes(self.config.stale_session_minutes);
        let now = chrono::Utc::now();

        let stale_ids: Vec<Uuid> = self
            .sessions
            .iter()
            .filter_map(|entry| {
                let elapsed = now.signed_duration_since(entry.value().last_update_time);
                if elapsed > stale_threshold {
                    debug!(
                        session = %entry.key(),
                        idle_minutes = elapsed.num_minutes(),
                        "reaping stale navigation session"
                    );
                    Some(*entry.key())
                } else {
                    None
                }
            })
            .collect();

        for session_id in &stale_ids {
            self.sessions.remove(session_id);
            self.cleanup_session_lock(*session_id);
        }

        if !stale_ids.is_empty() {
            info!("reaped {} stale navigation sessions", stale_ids.len());
            metrics::counter!("nav_tracker.sessions_reaped_total")
                .increment(stale_ids.len() as u64);
        }

        utils::update_nav_tracker_metrics(&self.sessions, self.config.stale_session_minutes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn test_route() -> Route {
        Route::from_json(r#"[{"lat": 0.0, "lng": 0.0}, {"lat": 0.0, "lng": 0.01}]"#).unwrap()
    }

    fn fix_at(lat: f64, lng: f64, offset_s: i64) -> PositionFix {
        let base = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        PositionFix::at(lat, lng, base + chrono::Duration::seconds(offset_s))
    }

    #[tokio::test]
    async fn test_fix_for_unknown_session_is_dropped() {
        let tracker = NavTracker::new(NavConfig::default());
        let update = tracker.process_fix(Uuid::new_v4(), fix_at(0.0, 0.0, 0)).await;
        assert!(update.is_none());
    }

    #[tokio::test]
    async fn test_start_and_end_session() {
        let tracker = NavTracker::new(NavConfig::default());
        let session_id = tracker.start_session(test_route()).unwrap();
        assert_eq!(tracker.session_count(), 1);

        assert!(tracker.end_session(session_id));
        assert_eq!(tracker.session_count(), 0);
        // Second end is a no-op
        assert!(!tracker.end_session(session_id));
    }

    #[tokio::test]
    async fn test_invalid_fix_leaves_state_untouched() {
        let tracker = NavTracker::new(NavConfig::default());
        let session_id = tracker.start_session(test_route()).unwrap();

        assert!(tracker.process_fix(session_id, fix_at(95.0, 0.0, 0)).await.is_none());

        let session = tracker.snapshot(session_id).unwrap();
        assert_eq!(session.current_step_index(), 0);
        assert!(session.last_fix_time.is_none());
        assert!(session.recent_samples.is_empty());
    }

    #[tokio::test]
    async fn test_accepted_fix_produces_guidance() {
        let tracker = NavTracker::new(NavConfig::default());
        let session_id = tracker.start_session(test_route()).unwrap();

        let update = tracker
            .process_fix(session_id, fix_at(0.0, 0.0, 0))
            .await
            .expect("first fix should be accepted");

        assert_eq!(update.session_id, session_id);
        // Upcoming step is due east of the fix
        assert!((update.marker.bearing_deg - 90.0).abs() < 0.5);
        assert!(update.banner.remaining_distance_m > 1_000.0);
        assert!(update.advanced_to.is_none());
        assert!(!update.arrived);
    }

    #[tokio::test]
    async fn test_reaper_drops_idle_sessions() {
        let config = NavConfig {
            stale_session_minutes: 0,
            ..NavConfig::default()
        };
        let tracker = NavTracker::new(config);
        let session_id = tracker.start_session(test_route()).unwrap();
        assert_eq!(tracker.session_count(), 1);

        // With a zero-minute timeout every session is immediately stale
        tracker.reap_stale_sessions();
        assert_eq!(tracker.session_count(), 0);
        assert!(tracker.process_fix(session_id, fix_at(0.0, 0.0, 0)).await.is_none());
    }

    #[tokio::test]
    async fn test_reaper_keeps_fresh_sessions() {
        let tracker = NavTracker::new(NavConfig::default());
        tracker.start_session(test_route()).unwrap();

        tracker.reap_stale_sessions();
        assert_eq!(tracker.session_count(), 1);
    }

    #[tokio::test]
    async fn test_cursor_never_decreases() {
        let tracker = NavTracker::new(NavConfig::default());
        let route = Route::from_json(
            r#"[{"lat": 0.0, "lng": 0.0},
                {"lat": 0.0, "lng": 0.001},
                {"lat": 0.0, "lng": 0.002}]"#,
        )
        .unwrap();
        let session_id = tracker.start_session(route).unwrap();

        // Walk forward to the second step, then jump back to the start
        let fixes = [
            fix_at(0.0, 0.0, 0),
            fix_at(0.0, 0.0005, 10),
            fix_at(0.0, 0.001, 20),
            fix_at(0.0, 0.0, 30),
            fix_at(0.0, 0.0002, 40),
        ];

        let mut last_index = 0;
        for fix in fixes {
            tracker.process_fix(session_id, fix).await;
            let index = tracker.snapshot(session_id).unwrap().current_step_index();
            assert!(index >= last_index, "cursor went backwards: {last_index} -> {index}");
            last_index = index;
        }
    }
}
