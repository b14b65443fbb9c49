//! ROVE - navigation tracking engine for a map-based tourism app
//!
//! This library filters raw GPS fixes, advances a turn-by-turn route cursor,
//! and fans out marker/banner/arrival guidance updates to rendering
//! collaborators supplied by the host application.

pub mod config;
pub mod format;
pub mod geometry;
pub mod metrics;
pub mod nav_tracker;
pub mod position;
pub mod replay;
pub mod route;

pub use config::NavConfig;
pub use nav_tracker::{GuidanceSink, GuidanceUpdate, LogGuidanceSink, NavTracker};
pub use position::PositionFix;
pub use replay::{FileFixSource, FixSource};
pub use route::{Route, RouteStep};
