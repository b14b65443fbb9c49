//! Shared helpers for integration tests

use chrono::{TimeZone, Utc};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use rove::nav_tracker::{BannerUpdate, GuidanceSink, MarkerUpdate, TurnApproach};
use rove::position::PositionFix;
use rove::route::Route;

/// Create a fix at an offset (in seconds) from a fixed base time
pub fn fix_at(lat: f64, lng: f64, offset_s: i64) -> PositionFix {
    let base = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
    PositionFix::at(lat, lng, base + chrono::Duration::seconds(offset_s))
}

/// Build a route from (lat, lng) waypoints with synthesized instructions
pub fn route_of(points: &[(f64, f64)]) -> Route {
    let steps = points
        .iter()
        .map(|(lat, lng)| rove::route::RouteStep {
            latitude: *lat,
            longitude: *lng,
            instruction: String::new(),
        })
        .collect();
    Route::new(None, steps, None).unwrap()
}

/// Everything a sink can observe, in dispatch order
#[derive(Debug, Clone)]
pub enum SinkEvent {
    Marker(MarkerUpdate),
    Banner(BannerUpdate),
    Turn(TurnApproach),
    Arrived { latitude: f64, longitude: f64 },
}

/// Sink that records every dispatched event for later assertions
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn arrival_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, SinkEvent::Arrived { .. }))
            .count()
    }

    pub fn turn_notices(&self) -> Vec<TurnApproach> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Turn(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl GuidanceSink for RecordingSink {
    fn update_marker(&self, _session_id: Uuid, update: &MarkerUpdate) {
        self.push(SinkEvent::Marker(update.clone()));
    }

    fn update_banner(&self, _session_id: Uuid, update: &BannerUpdate) {
        self.push(SinkEvent::Banner(update.clone()));
    }

    fn turn_approaching(&self, _session_id: Uuid, notice: &TurnApproach) {
        self.push(SinkEvent::Turn(notice.clone()));
    }

    fn arrived(&self, _session_id: Uuid, latitude: f64, longitude: f64) {
        self.push(SinkEvent::Arrived {
            latitude,
            longitude,
        });
    }
}
