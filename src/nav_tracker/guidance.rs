//! Guidance update computation and collaborator fan-out
//!
//! Turns an accepted fix plus session state into the concrete updates the UI
//! layer consumes: marker orientation, instruction banner, turn-approach
//! notices, and the arrival notification. Rendering itself lives in
//! [`GuidanceSink`] implementors outside this crate's responsibility.

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::session::NavigationSession;
use crate::config::NavConfig;
use crate::format::{format_distance, format_duration};
use crate::geometry::{haversine_distance, initial_bearing};
use crate::position::PositionFix;

/// Marker orientation update: position plus the compass bearing toward the
/// step currently navigated to
#[derive(Debug, Clone, Serialize)]
pub struct MarkerUpdate {
    pub latitude: f64,
    pub longitude: f64,
    /// Compass bearing in [0, 360), clockwise from north
    pub bearing_deg: f64,
    pub accuracy_m: Option<f64>,
}

/// Banner update for the active instruction
#[derive(Debug, Clone, Serialize)]
pub struct BannerUpdate {
    pub step_index: usize,
    pub instruction: String,
    /// Route distance left: fix to the target step plus the legs beyond it
    pub remaining_distance_m: f64,
    pub estimated_time_s: f64,
    /// Share of the total route distance already covered, 0-100
    pub progress_percent: f64,
}

impl BannerUpdate {
    /// Display string for the remaining distance
    pub fn remaining_display(&self) -> String {
        format_distance(self.remaining_distance_m)
    }

    /// Display string for the estimated remaining time
    pub fn eta_display(&self) -> String {
        format_duration(self.estimated_time_s)
    }
}

/// Notice that the user is close to the upcoming turn
#[derive(Debug, Clone, Serialize)]
pub struct TurnApproach {
    pub step_index: usize,
    pub instruction: String,
    pub distance_m: f64,
}

/// Everything computed for one accepted fix
#[derive(Debug, Clone, Serialize)]
pub struct GuidanceUpdate {
    pub session_id: Uuid,
    pub marker: MarkerUpdate,
    pub banner: BannerUpdate,
    pub turn_approach: Option<TurnApproach>,
    /// New cursor index when this fix advanced the route
    pub advanced_to: Option<usize>,
    pub arrived: bool,
}

/// Collaborator receiving rendered guidance state
///
/// Implementors perform the rendering side effects (map marker, instruction
/// banner, voice prompts). Methods are called on every accepted fix and must
/// not panic.
pub trait GuidanceSink: Send + Sync {
    fn update_marker(&self, session_id: Uuid, update: &MarkerUpdate);
    fn update_banner(&self, session_id: Uuid, update: &BannerUpdate);
    fn turn_approaching(&self, session_id: Uuid, notice: &TurnApproach);
    fn arrived(&self, session_id: Uuid, latitude: f64, longitude: f64);
}

/// Sink that logs guidance updates through tracing
/// Default collaborator for the replay CLI
pub struct LogGuidanceSink;

impl GuidanceSink for LogGuidanceSink {
    fn update_marker(&self, session_id: Uuid, update: &MarkerUpdate) {
        debug!(
            session = %session_id,
            latitude = update.latitude,
            longitude = update.longitude,
            bearing_deg = format!("{:.0}", update.bearing_deg).as_str(),
            "marker update"
        );
    }

    fn update_banner(&self, session_id: Uuid, update: &BannerUpdate) {
        info!(
            session = %session_id,
            step = update.step_index,
            remaining = %update.remaining_display(),
            eta = %update.eta_display(),
            progress = format!("{:.0}%", update.progress_percent).as_str(),
            "{}", update.instruction
        );
    }

    fn turn_approaching(&self, session_id: Uuid, notice: &TurnApproach) {
        info!(
            session = %session_id,
            step = notice.step_index,
            distance = %format_distance(notice.distance_m),
            "approaching: {}", notice.instruction
        );
    }

    fn arrived(&self, session_id: Uuid, latitude: f64, longitude: f64) {
        info!(session = %session_id, latitude, longitude, "arrived at destination");
    }
}

/// Build the marker orientation for an accepted fix
pub(crate) fn build_marker(session: &NavigationSession, fix: &PositionFix) -> MarkerUpdate {
    let target = &session.route.steps[session.target_step_index()];
    let to_target = haversine_distance(
        fix.latitude,
        fix.longitude,
        target.latitude,
        target.longitude,
    );
    // On top of the target the forward azimuth degenerates; fall back to the
    // device heading when one was reported
    let bearing_deg = if to_target < 1.0 {
        fix.heading_deg.unwrap_or(0.0)
    } else {
        initial_bearing(
            fix.latitude,
            fix.longitude,
            target.latitude,
            target.longitude,
        )
    };
    MarkerUpdate {
        latitude: fix.latitude,
        longitude: fix.longitude,
        bearing_deg,
        accuracy_m: fix.accuracy_m,
    }
}

/// Build the instruction banner for an accepted fix
pub(crate) fn build_banner(
    session: &NavigationSession,
    fix: &PositionFix,
    config: &NavConfig,
) -> BannerUpdate {
    let target_index = session.target_step_index();
    let target = &session.route.steps[target_index];

    let to_target = haversine_distance(
        fix.latitude,
        fix.longitude,
        target.latitude,
        target.longitude,
    );
    let remaining_distance_m = to_target + session.remaining_legs_after(target_index);

    let speed_mps = session
        .estimate_speed_mps()
        .filter(|speed| *speed > 0.1)
        .unwrap_or(config.default_speed_mps);
    let estimated_time_s = remaining_distance_m / speed_mps;

    let total_m = session
        .route
        .total_distance_m
        .filter(|total| *total > 0.0)
        .unwrap_or(config.default_total_distance_m);
    let progress_percent = (session.covered_distance_m() / total_m * 100.0).clamp(0.0, 100.0);

    BannerUpdate {
        step_index: target_index,
        instruction: target.instruction.clone(),
        remaining_distance_m,
        estimated_time_s,
        progress_percent,
    }
}
