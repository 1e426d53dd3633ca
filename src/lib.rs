//! Race Timing Core
//!
//! Automatic start/finish detection for on-board motorsport telemetry. Feed it
//! resolved position, heading, speed and acceleration; it decides when a lap,
//! a point-to-point stage or a standing acceleration run starts and ends.
//!
//! ## Features
//!
//! - **Geofenced Lap Timer**: Circuit and point-to-point, works with 1-10 Hz GPS
//! - **Closest-Approach Correction**: Crossing time backdated to the nearest fix
//! - **Acceleration Timer**: 0-100 km/h (or any target) from g-force launch detection
//! - **Typed Events**: Multiple subscribers per event kind
//! - **Skip Diagnostics**: Last rejected trigger and why
//! - **No-std Compatible**: Needs only `alloc` without the `std` feature
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Session (routing, subscribers)         │
//! ├────────────────────┬────────────────────┤
//! │  LapTimer          │  SprintTimer       │
//! ├────────────────────┴────────────────────┤
//! │  Geo math (haversine, heading delta)    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use race_timing::{Event, GeoPoint, PositionSample, Session, SessionConfig, TrackConfig};
//!
//! let start = GeoPoint::new(40.0, -8.0).unwrap();
//! let mut session = Session::new(SessionConfig::default());
//! session.setup_track(TrackConfig::circuit(start, 3.0).unwrap());
//! session.arm();
//!
//! session.subscribe(|event: &Event| println!("{:?}", event));
//!
//! // On every GPS fix:
//! session.update_position(&PositionSample::new(40.0, -8.0, 0.0, 120.0, 1_000));
//! ```
//!
//! ## Modules
//!
//! - [`geo`] - Great-circle distance and heading math
//! - [`config`] - Track geometry and timing thresholds
//! - [`lap_timer`] - Geofenced lap/stage timer
//! - [`sprint_timer`] - Standing-start acceleration timer
//! - [`session`] - Timer ownership, sample routing and event dispatch
//! - [`telemetry`] - Polled snapshot and lap time formatting

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod config;
pub mod diagnostics;
pub mod event;
pub mod geo;
pub mod lap_timer;
pub mod session;
pub mod sprint_timer;
pub mod telemetry;

// Re-export commonly used types
pub use config::{
    ConfigError, LapTimerConfig, SessionConfig, SprintConfig, TrackConfig, TrackType,
    LEGACY_TRIGGER_RADIUS_M, PRECISION_TRIGGER_RADIUS_M,
};
pub use diagnostics::{SkipReason, SkippedTrigger, TriggerPoint};
pub use event::{Event, EventBuf, EventKind, LaunchTrigger};
pub use geo::GeoPoint;
pub use lap_timer::{LapResult, LapTimer, LapTimerState, PositionSample};
pub use session::{ActiveTimer, EventSubscriber, Sample, Session, SubscriptionId};
pub use sprint_timer::{MotionSample, SprintState, SprintTimer};
#[cfg(feature = "std")]
pub use telemetry::SharedTelemetry;
pub use telemetry::{format_lap_time, TelemetrySnapshot};
