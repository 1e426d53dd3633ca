//! Geofenced lap timer with closest-approach crossing detection
//!
//! Detects when the vehicle passes operator-defined start/finish points and
//! tracks lap times. Designed for 1-10 Hz position fixes, where the car can
//! cross the whole geofence between two samples.
//!
//! ## Detection
//!
//! A crossing is the sample at which the distance to a point stops shrinking
//! and starts growing again. At that moment the previous sample is known to be
//! the closest approach, so the crossing is timestamped with the previous
//! sample rather than the current one. That gains up to one sample period of
//! accuracy at the cost of reporting it one update late.
//!
//! The closest approach must fall inside a tight inner bound, which rejects
//! passes that only graze the outer trigger radius.
//!
//! ## Features
//!
//! - Circuit (continuous lapping) and point-to-point stages
//! - Heading check against the start heading to reject reverse passes
//! - Cooldown between triggers
//! - Last rejected candidate kept for diagnostics
//!
//! ## Usage
//!
//! ```rust
//! use race_timing::{GeoPoint, LapTimer, LapTimerConfig, PositionSample, TrackConfig};
//!
//! let start = GeoPoint::new(40.0, -8.0).unwrap();
//! let mut timer = LapTimer::new(LapTimerConfig::default());
//! timer.setup_track(TrackConfig::circuit(start, 3.0).unwrap());
//! timer.arm();
//!
//! // On every GPS fix:
//! let fix = PositionSample::new(40.0, -8.0, 0.0, 120.0, 1_000);
//! for event in &timer.update(&fix) {
//!     println!("{:?}", event);
//! }
//! ```

#[cfg(feature = "logging")]
use log::{debug, info, warn};

use crate::config::{LapTimerConfig, TrackConfig, TrackType};
use crate::diagnostics::{SkipReason, SkippedTrigger, TriggerPoint};
use crate::event::{Event, EventBuf};
use crate::geo::{self, GeoPoint};

/// Lap timer state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LapTimerState {
    /// Outside the start geofence
    #[default]
    Idle,
    /// Inside the start geofence at speed, watching for closest approach
    Armed,
    /// Timing active
    Running,
    /// Point-to-point stage completed, waiting for reset
    Finished,
}

/// One resolved position fix
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionSample {
    /// `None` until the receiver has a fix
    pub fix: Option<GeoPoint>,
    /// Course over ground, compass degrees (0 = North)
    pub heading_deg: f64,
    pub speed_kmh: f32,
    pub timestamp_ms: u32,
}

impl PositionSample {
    /// Sample from raw coordinates; out-of-range coordinates become "no fix"
    pub fn new(lat: f64, lon: f64, heading_deg: f64, speed_kmh: f32, timestamp_ms: u32) -> Self {
        Self {
            fix: GeoPoint::new(lat, lon),
            heading_deg,
            speed_kmh,
            timestamp_ms,
        }
    }

    pub fn at(fix: GeoPoint, heading_deg: f64, speed_kmh: f32, timestamp_ms: u32) -> Self {
        Self {
            fix: Some(fix),
            heading_deg,
            speed_kmh,
            timestamp_ms,
        }
    }

    pub fn no_fix(timestamp_ms: u32) -> Self {
        Self {
            fix: None,
            heading_deg: 0.0,
            speed_kmh: 0.0,
            timestamp_ms,
        }
    }
}

/// Distances measured on the previous update
///
/// The single sample of history that closest-approach detection needs.
/// Replaced on every update that carries a fix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreviousSample {
    pub distance_to_start_m: f32,
    pub distance_to_finish_m: f32,
    pub timestamp_ms: u32,
}

/// A closest approach found one sample after the fact
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClosestApproach {
    pub distance_m: f32,
    /// Corrected crossing time: the previous sample's timestamp
    pub timestamp_ms: u32,
}

impl PreviousSample {
    pub fn distance_to(&self, point: TriggerPoint) -> f32 {
        match point {
            TriggerPoint::Start => self.distance_to_start_m,
            TriggerPoint::Finish => self.distance_to_finish_m,
        }
    }

    /// Closest approach to `point` if the distance grew on this update
    pub fn closest_approach(&self, point: TriggerPoint, current_m: f32) -> Option<ClosestApproach> {
        let previous_m = self.distance_to(point);
        (current_m > previous_m).then_some(ClosestApproach {
            distance_m: previous_m,
            timestamp_ms: self.timestamp_ms,
        })
    }
}

/// Polled session result
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LapResult {
    /// Completed laps (or completed stage runs)
    pub lap_count: u32,
    pub current_elapsed_ms: u32,
    pub last_lap_ms: Option<u32>,
    pub best_lap_ms: Option<u32>,
}

/// Mutable timing state (separate from track config to avoid borrow conflicts)
#[derive(Clone, Debug, Default)]
struct TimingState {
    state: LapTimerState,
    start_time_ms: u32,
    current_lap_ms: u32,
    lap_count: u32,
    last_lap_ms: Option<u32>,
    best_lap_ms: Option<u32>,
    /// Detection time of the last trigger, cooldown runs from here
    last_trigger_ms: Option<u32>,
    /// Course at race start, reference for the finish heading check
    start_heading_deg: Option<f64>,
    previous: Option<PreviousSample>,
    last_skipped: Option<SkippedTrigger>,
    /// Current geofence pass already triggered or had a rejection recorded
    pass_flagged: bool,
}

impl TimingState {
    fn cooldown_remaining(&self, config: &LapTimerConfig, now_ms: u32) -> Option<u32> {
        let since = now_ms.wrapping_sub(self.last_trigger_ms?);
        (since <= config.cooldown_ms).then(|| config.cooldown_ms - since)
    }

    fn approach(&self, point: TriggerPoint, current_m: f32) -> Option<ClosestApproach> {
        self.previous?.closest_approach(point, current_m)
    }

    fn skip(&mut self, point: TriggerPoint, reason: SkipReason, timestamp_ms: u32) {
        if self.pass_flagged {
            return;
        }
        self.pass_flagged = true;

        #[cfg(feature = "logging")]
        debug!("Lap timer: skipped {:?} trigger at {}ms: {:?}", point, timestamp_ms, reason);

        self.last_skipped = Some(SkippedTrigger {
            point,
            reason,
            timestamp_ms,
        });
    }

    /// Idle/Armed: watch for the start crossing
    fn check_start(
        &mut self,
        config: &LapTimerConfig,
        track: &TrackConfig,
        distance_m: f32,
        sample: &PositionSample,
        events: &mut EventBuf,
    ) {
        let now = sample.timestamp_ms;

        if distance_m >= track.trigger_radius_m {
            self.state = LapTimerState::Idle;
            self.pass_flagged = false;
            return;
        }

        let approach = match self.state {
            LapTimerState::Armed => self.approach(TriggerPoint::Start, distance_m),
            _ => None,
        };

        // Parked or crawling inside the geofence: GPS drift moves the fix
        // around the point without the car going anywhere
        if sample.speed_kmh <= config.min_trigger_speed_kmh {
            if approach.is_some() {
                let reason = SkipReason::BelowTriggerSpeed {
                    speed_kmh: sample.speed_kmh,
                };
                self.skip(TriggerPoint::Start, reason, now);
            }
            return;
        }

        let Some(approach) = approach else {
            self.state = LapTimerState::Armed;
            return;
        };

        if approach.distance_m >= config.inner_bound_m {
            let reason = SkipReason::InnerBoundMissed {
                closest_m: approach.distance_m,
            };
            self.skip(TriggerPoint::Start, reason, approach.timestamp_ms);
            return;
        }

        if let Some(remaining_ms) = self.cooldown_remaining(config, now) {
            self.skip(TriggerPoint::Start, SkipReason::Cooldown { remaining_ms }, now);
            return;
        }

        let start_ms = approach.timestamp_ms;
        self.state = LapTimerState::Running;
        self.start_time_ms = start_ms;
        self.current_lap_ms = now.wrapping_sub(start_ms);
        self.last_trigger_ms = Some(now);
        // No course over ground means no reference for the finish direction check
        self.start_heading_deg = sample.heading_deg.is_finite().then_some(sample.heading_deg);
        // Rest of this pass is inside the cooldown, not a new candidate
        self.pass_flagged = true;

        #[cfg(feature = "logging")]
        {
            if self.start_heading_deg.is_none() {
                debug!("Lap timer: no heading at start, finish direction check disabled");
            }
        }

        #[cfg(feature = "logging")]
        info!(
            "Lap timer: START at {}ms (closest {:.2}m, corrected -{}ms)",
            start_ms,
            approach.distance_m,
            now.wrapping_sub(start_ms)
        );

        events.push(Event::RaceStart {
            timestamp_ms: start_ms,
        });
        events.push(Event::LapStart {
            lap: self.lap_count + 1,
            timestamp_ms: start_ms,
        });
    }

    /// Running: watch for the finish crossing
    fn check_finish(
        &mut self,
        config: &LapTimerConfig,
        track: &TrackConfig,
        distance_m: f32,
        sample: &PositionSample,
        events: &mut EventBuf,
    ) {
        let now = sample.timestamp_ms;
        self.current_lap_ms = now.wrapping_sub(self.start_time_ms);

        if distance_m >= track.trigger_radius_m {
            self.pass_flagged = false;
            return;
        }

        // Still closing in
        let Some(approach) = self.approach(TriggerPoint::Finish, distance_m) else {
            return;
        };

        if let Some(remaining_ms) = self.cooldown_remaining(config, now) {
            self.skip(TriggerPoint::Finish, SkipReason::Cooldown { remaining_ms }, now);
            return;
        }

        if sample.speed_kmh <= config.min_trigger_speed_kmh {
            let reason = SkipReason::BelowTriggerSpeed {
                speed_kmh: sample.speed_kmh,
            };
            self.skip(TriggerPoint::Finish, reason, now);
            return;
        }

        if let Some(start_heading) = self.start_heading_deg {
            if !sample.heading_deg.is_finite() {
                self.skip(TriggerPoint::Finish, SkipReason::InvalidHeading, now);
                return;
            }
            let delta_deg = geo::heading_delta(sample.heading_deg, start_heading);
            if delta_deg > config.max_heading_delta_deg {
                self.skip(TriggerPoint::Finish, SkipReason::ReverseHeading { delta_deg }, now);
                return;
            }
        }

        if approach.distance_m >= config.inner_bound_m {
            let reason = SkipReason::InnerBoundMissed {
                closest_m: approach.distance_m,
            };
            self.skip(TriggerPoint::Finish, reason, approach.timestamp_ms);
            return;
        }

        let finish_ms = approach.timestamp_ms;
        let lap_time = finish_ms.wrapping_sub(self.start_time_ms);

        self.last_trigger_ms = Some(now);
        self.lap_count = self.lap_count.saturating_add(1);
        self.last_lap_ms = Some(lap_time);
        self.pass_flagged = true;

        let is_best = self.best_lap_ms.map_or(true, |best| lap_time < best);
        if is_best {
            self.best_lap_ms = Some(lap_time);
        }

        #[cfg(feature = "logging")]
        info!(
            "Lap timer: LAP {} {}.{:03}s (closest {:.2}m){}",
            self.lap_count,
            lap_time / 1000,
            lap_time % 1000,
            approach.distance_m,
            if is_best { " BEST" } else { "" }
        );

        events.push(Event::LapFinish {
            lap: self.lap_count,
            lap_time_ms: lap_time,
            is_best,
            timestamp_ms: finish_ms,
        });

        match track.track_type {
            TrackType::PointToPoint => {
                self.state = LapTimerState::Finished;
                self.current_lap_ms = lap_time;
                events.push(Event::RaceFinish {
                    timestamp_ms: finish_ms,
                });
            }
            TrackType::Circuit => {
                // This lap's finish is the next lap's start
                self.start_time_ms = finish_ms;
                self.current_lap_ms = now.wrapping_sub(finish_ms);
                events.push(Event::LapStart {
                    lap: self.lap_count + 1,
                    timestamp_ms: finish_ms,
                });
            }
        }
    }
}

/// Geofenced lap/stage timer
pub struct LapTimer {
    config: LapTimerConfig,
    track: Option<TrackConfig>,
    /// Participating in timing (standby / track mode)
    armed: bool,
    timing: TimingState,
}

impl LapTimer {
    /// Create a new lap timer with no track
    pub fn new(config: LapTimerConfig) -> Self {
        Self {
            config,
            track: None,
            armed: false,
            timing: TimingState::default(),
        }
    }

    /// Store a track and reset the session. Leaves the timer disarmed.
    pub fn setup_track(&mut self, track: TrackConfig) {
        #[cfg(feature = "logging")]
        info!(
            "Lap timer: track setup {:?}, radius {:.1}m",
            track.track_type, track.trigger_radius_m
        );

        self.track = Some(track);
        self.armed = false;
        self.reset_session();
    }

    /// Clear results and timing state, keep track and armed flag
    pub fn reset_session(&mut self) {
        self.timing = TimingState::default();
    }

    /// Enter standby: fresh session, waiting for the start crossing
    pub fn arm(&mut self) {
        #[cfg(feature = "logging")]
        {
            if self.track.is_none() {
                warn!("Lap timer: armed without a track, updates will be ignored");
            }
        }

        self.reset_session();
        self.armed = true;
    }

    /// Leave track mode. Takes effect immediately; configuration is kept.
    pub fn disarm(&mut self) {
        self.armed = false;
        self.timing.state = LapTimerState::Idle;

        #[cfg(feature = "logging")]
        info!("Lap timer: disarmed");
    }

    pub fn config(&self) -> &LapTimerConfig {
        &self.config
    }

    /// Replace thresholds. Takes effect on the next update.
    pub fn set_config(&mut self, config: LapTimerConfig) {
        self.config = config;
    }

    /// Feed one position fix. Returns the events this fix produced, in order.
    pub fn update(&mut self, sample: &PositionSample) -> EventBuf {
        let mut events = EventBuf::new();

        if !self.armed {
            return events;
        }
        let (Some(track), Some(pos)) = (self.track, sample.fix) else {
            return events;
        };

        let distance_to_start = geo::distance(&pos, &track.start) as f32;
        let distance_to_finish = if track.finish == track.start {
            distance_to_start
        } else {
            geo::distance(&pos, &track.finish) as f32
        };

        match self.timing.state {
            LapTimerState::Idle | LapTimerState::Armed => {
                self.timing
                    .check_start(&self.config, &track, distance_to_start, sample, &mut events);
            }
            LapTimerState::Running => {
                self.timing
                    .check_finish(&self.config, &track, distance_to_finish, sample, &mut events);
            }
            LapTimerState::Finished => {}
        }

        self.timing.previous = Some(PreviousSample {
            distance_to_start_m: distance_to_start,
            distance_to_finish_m: distance_to_finish,
            timestamp_ms: sample.timestamp_ms,
        });

        events
    }

    /// Advance the live lap clock without a fix (GPS dropout, display refresh)
    pub fn tick(&mut self, now_ms: u32) {
        if self.armed && self.timing.state == LapTimerState::Running {
            self.timing.current_lap_ms = now_ms.wrapping_sub(self.timing.start_time_ms);
        }
    }

    /// Lap time at `now_ms` (0 when not timing, final time once finished)
    pub fn elapsed_at(&self, now_ms: u32) -> u32 {
        match self.timing.state {
            LapTimerState::Running => now_ms.wrapping_sub(self.timing.start_time_ms),
            LapTimerState::Finished => self.timing.current_lap_ms,
            _ => 0,
        }
    }

    /// Lap time as of the last update or tick
    pub fn current_lap_ms(&self) -> u32 {
        match self.timing.state {
            LapTimerState::Running | LapTimerState::Finished => self.timing.current_lap_ms,
            _ => 0,
        }
    }

    pub fn state(&self) -> LapTimerState {
        self.timing.state
    }

    pub fn track(&self) -> Option<&TrackConfig> {
        self.track.as_ref()
    }

    pub fn is_track_setup(&self) -> bool {
        self.track.is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_running(&self) -> bool {
        self.timing.state == LapTimerState::Running
    }

    /// Completed lap count
    pub fn lap_count(&self) -> u32 {
        self.timing.lap_count
    }

    /// 1-based number of the lap in progress (0 before the start)
    pub fn current_lap(&self) -> u32 {
        match self.timing.state {
            LapTimerState::Running => self.timing.lap_count + 1,
            LapTimerState::Finished => self.timing.lap_count,
            _ => 0,
        }
    }

    /// Corrected start time of the lap in progress
    pub fn start_time_ms(&self) -> Option<u32> {
        matches!(
            self.timing.state,
            LapTimerState::Running | LapTimerState::Finished
        )
        .then_some(self.timing.start_time_ms)
    }

    pub fn last_lap_ms(&self) -> Option<u32> {
        self.timing.last_lap_ms
    }

    pub fn best_lap_ms(&self) -> Option<u32> {
        self.timing.best_lap_ms
    }

    pub fn result(&self) -> LapResult {
        LapResult {
            lap_count: self.timing.lap_count,
            current_elapsed_ms: self.current_lap_ms(),
            last_lap_ms: self.timing.last_lap_ms,
            best_lap_ms: self.timing.best_lap_ms,
        }
    }

    /// Most recent candidate trigger that was rejected, and why
    pub fn last_skipped(&self) -> Option<&SkippedTrigger> {
        self.timing.last_skipped.as_ref()
    }

    pub fn previous_sample(&self) -> Option<&PreviousSample> {
        self.timing.previous.as_ref()
    }
}

impl Default for LapTimer {
    fn default() -> Self {
        Self::new(LapTimerConfig::default())
    }
}
