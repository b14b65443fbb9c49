//! Step advancement and arrival decisions
//!
//! Pure decision logic: given an accepted fix and the session's route cursor,
//! determine whether the upcoming step was reached or the destination
//! proximity check passes. The cursor advances at most one step per fix; when
//! several steps fall inside the radius the rest are picked up on subsequent
//! fixes.

use super::session::NavigationSession;
use crate::config::NavConfig;
use crate::geometry::haversine_distance;
use crate::position::PositionFix;

/// Result of checking an accepted fix against the route cursor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepCheckResult {
    /// Still outside the reach radius of the upcoming step
    Approaching { step_index: usize, distance_m: f64 },
    /// Upcoming step reached; the cursor should advance to it
    StepReached { step_index: usize, distance_m: f64 },
    /// On the final step and outside the arrival radius
    EnRouteToDestination { distance_m: f64 },
    /// On the final step and within the arrival radius
    DestinationReached { distance_m: f64 },
}

/// Check an accepted fix against the route cursor
///
/// While an upcoming step exists the fix is measured against it; within the
/// reach radius the cursor should advance by exactly one. Once the cursor
/// sits on the final step the same proximity check evaluates destination
/// arrival instead.
pub fn check_step_progress(
    session: &NavigationSession,
    fix: &PositionFix,
    config: &NavConfig,
) -> StepCheckResult {
    let route = &session.route;

    if session.is_on_final_step() {
        let destination = &route.steps[route.last_index()];
        let distance_m = haversine_distance(
            fix.latitude,
            fix.longitude,
            destination.latitude,
            destination.longitude,
        );
        return if distance_m <= config.arrival_radius_m {
            StepCheckResult::DestinationReached { distance_m }
        } else {
            StepCheckResult::EnRouteToDestination { distance_m }
        };
    }

    let step_index = session.current_step_index() + 1;
    let upcoming = &route.steps[step_index];
    let distance_m = haversine_distance(
        fix.latitude,
        fix.longitude,
        upcoming.latitude,
        upcoming.longitude,
    );

    if distance_m <= config.step_reached_radius_m {
        StepCheckResult::StepReached {
            step_index,
            distance_m,
        }
    } else {
        StepCheckResult::Approaching {
            step_index,
            distance_m,
        }
    }
}
