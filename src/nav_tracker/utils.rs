use chrono::Utc;
use metrics::gauge;

use super::SessionsMap;

/// Update navigation tracker metrics based on current active sessions
/// This should be called regularly to export metrics even when the reaper doesn't run
pub(crate) fn update_nav_tracker_metrics(sessions: &SessionsMap, stale_after_minutes: i64) {
    let now = Utc::now();
    let stale_threshold = chrono::Duration::minutes(stale_after_minutes);

    let total_active = sessions.len();
    let stale_count = sessions
        .iter()
        .filter(|entry| {
            let elapsed = now.signed_duration_since(entry.value().last_update_time);
            elapsed > stale_threshold
        })
        .count();

    gauge!("nav_tracker_active_sessions").set(total_active as f64);
    gauge!("nav_tracker_stale_sessions").set(stale_count as f64);
}
