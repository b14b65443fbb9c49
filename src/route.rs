//! Route ingestion and normalization
//!
//! Routing backends deliver steps in several shapes: coordinates may live
//! under `latitude`/`longitude`, `lat`/`lng`, a `location` array, or a
//! `coordinates` array. All of that is resolved once here, at ingestion, into
//! a canonical [`RouteStep`] so the tracking hot path never shape-sniffs.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

use crate::geometry::{haversine_distance, initial_bearing};

/// One canonical turn-by-turn instruction after ingestion
/// Immutable once the route is built; consumed read-only by the tracker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteStep {
    pub latitude: f64,
    pub longitude: f64,
    pub instruction: String,
}

/// Turn category at a waypoint, classified from the bearing change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
    Straight,
    SlightLeft,
    Left,
    SharpLeft,
    SlightRight,
    Right,
    SharpRight,
    UTurn,
}

/// A normalized route: ordered non-empty steps plus optional distance metadata
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    pub name: Option<String>,
    pub steps: Vec<RouteStep>,
    /// Total route distance in meters, when the routing backend supplied it
    pub total_distance_m: Option<f64>,
    /// Distance of each leg between consecutive steps, computed at ingestion
    leg_distances_m: Vec<f64>,
}

impl Route {
    /// Build a route from already-canonical steps
    pub fn new(name: Option<String>, steps: Vec<RouteStep>, total_distance_m: Option<f64>) -> Result<Self> {
        if steps.is_empty() {
            bail!("route has no usable steps");
        }
        let mut steps = steps;
        synthesize_instructions(&mut steps);
        let leg_distances_m = leg_distances(&steps);
        Ok(Self {
            name,
            steps,
            total_distance_m,
            leg_distances_m,
        })
    }

    /// Parse a route from its JSON representation
    ///
    /// Accepts either a bare array of raw steps or an object with a `steps`
    /// array plus optional `name` and total-distance metadata. Steps whose
    /// coordinates cannot be extracted are logged and skipped.
    pub fn from_value(value: &Value) -> Result<Self> {
        let (name, total_distance_m, raw_steps) = match value {
            Value::Array(steps) => (None, None, steps.as_slice()),
            Value::Object(map) => {
                let steps = map
                    .get("steps")
                    .or_else(|| map.get("instructions"))
                    .and_then(Value::as_array)
                    .context("route object has no steps array")?;
                let name = map.get("name").and_then(Value::as_str).map(str::to_string);
                let total = ["total_distance_m", "totalDistance", "distance"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_f64));
                (name, total, steps.as_slice())
            }
            _ => bail!("route JSON must be an object or an array of steps"),
        };

        let mut steps = Vec::with_capacity(raw_steps.len());
        for (index, raw) in raw_steps.iter().enumerate() {
            match parse_step(raw) {
                Some(step) => steps.push(step),
                None => warn!(index, "skipping route step with no usable coordinates"),
            }
        }

        let route = Self::new(name, steps, total_distance_m)?;
        debug!(
            steps = route.steps.len(),
            total_distance_m = route.total_distance_m,
            "normalized route"
        );
        Ok(route)
    }

    /// Parse a route from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).context("route is not valid JSON")?;
        Self::from_value(&value)
    }

    /// Load a route from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read route file {}", path.display()))?;
        Self::from_json(&raw)
            .with_context(|| format!("failed to parse route file {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the final step (the destination)
    pub fn last_index(&self) -> usize {
        self.steps.len() - 1
    }

    /// Distance of leg `i` (from step `i` to step `i + 1`) in meters
    pub fn leg_distance_m(&self, leg: usize) -> f64 {
        self.leg_distances_m.get(leg).copied().unwrap_or(0.0)
    }

    /// All leg distances, oldest leg first
    pub fn legs(&self) -> &[f64] {
        &self.leg_distances_m
    }

    /// Summed distance of every leg in the route
    pub fn summed_leg_distance_m(&self) -> f64 {
        self.leg_distances_m.iter().sum()
    }
}

/// Extract a coordinate that may be expressed under several field shapes
/// Tries each candidate in order and uses the first numeric match
fn extract_coordinate(step: &Value, named: &[&str], indexed: &[(&str, usize)]) -> Option<f64> {
    for key in named {
        if let Some(v) = step.get(*key).and_then(Value::as_f64) {
            return Some(v);
        }
    }
    for (key, index) in indexed {
        if let Some(v) = step
            .get(*key)
            .and_then(|array| array.get(*index))
            .and_then(Value::as_f64)
        {
            return Some(v);
        }
    }
    None
}

fn parse_step(raw: &Value) -> Option<RouteStep> {
    let latitude = extract_coordinate(
        raw,
        &["latitude", "lat"],
        &[("location", 0), ("coordinates", 0)],
    )?;
    let longitude = extract_coordinate(
        raw,
        &["longitude", "lng", "lon"],
        &[("location", 1), ("coordinates", 1)],
    )?;
    let instruction = raw
        .get("instruction")
        .or_else(|| raw.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default();

    Some(RouteStep {
        latitude,
        longitude,
        instruction,
    })
}

/// Fill in instruction text for steps that arrived without any
/// The first and last steps get fixed phrases; the rest are classified from
/// the bearing change at the waypoint
fn synthesize_instructions(steps: &mut [RouteStep]) {
    let count = steps.len();
    for index in 0..count {
        if !steps[index].instruction.is_empty() {
            continue;
        }
        steps[index].instruction = if index == 0 {
            "Head out".to_string()
        } else if index == count - 1 {
            "Arrive at your destination".to_string()
        } else {
            let turn = turn_at(&steps[index - 1], &steps[index], &steps[index + 1]);
            turn_instruction(turn).to_string()
        };
    }
}

/// Classify the turn at step B given the approach from A and the exit toward C
pub fn turn_at(a: &RouteStep, b: &RouteStep, c: &RouteStep) -> Turn {
    let inbound = initial_bearing(a.latitude, a.longitude, b.latitude, b.longitude);
    let outbound = initial_bearing(b.latitude, b.longitude, c.latitude, c.longitude);

    // Relative angle: positive = right turn, negative = left turn
    let mut angle = outbound - inbound;
    while angle > 180.0 {
        angle -= 360.0;
    }
    while angle < -180.0 {
        angle += 360.0;
    }

    classify_turn(angle)
}

/// Classify a relative bearing change in [-180, 180] into a turn category
fn classify_turn(angle: f64) -> Turn {
    let magnitude = angle.abs();
    if magnitude > 170.0 {
        Turn::UTurn
    } else if magnitude > 120.0 {
        if angle > 0.0 { Turn::SharpRight } else { Turn::SharpLeft }
    } else if magnitude > 60.0 {
        if angle > 0.0 { Turn::Right } else { Turn::Left }
    } else if magnitude > 20.0 {
        if angle > 0.0 { Turn::SlightRight } else { Turn::SlightLeft }
    } else {
        Turn::Straight
    }
}

fn turn_instruction(turn: Turn) -> &'static str {
    match turn {
        Turn::Straight => "Continue straight",
        Turn::SlightLeft => "Keep slightly left",
        Turn::Left => "Turn left",
        Turn::SharpLeft => "Turn sharp left",
        Turn::SlightRight => "Keep slightly right",
        Turn::Right => "Turn right",
        Turn::SharpRight => "Turn sharp right",
        Turn::UTurn => "Make a U-turn",
    }
}

fn leg_distances(steps: &[RouteStep]) -> Vec<f64> {
    steps
        .windows(2)
        .map(|pair| {
            haversine_distance(
                pair[0].latitude,
                pair[0].longitude,
                pair[1].latitude,
                pair[1].longitude,
            )
        })
        .collect()
}
