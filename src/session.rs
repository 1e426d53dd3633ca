//! Timing session
//!
//! Owns one lap timer and one sprint timer, routes samples to whichever is
//! active, and notifies subscribers of every event the timers emit.
//!
//! ```text
//! samples ──> Session ──> LapTimer / SprintTimer
//!                │
//!                └──> subscribers (logger, audio cue, UI refresh, ...)
//! ```
//!
//! `update` is the only writer. Readers poll the accessors, or take a
//! [`TelemetrySnapshot`] when they run on another thread.

use alloc::boxed::Box;
use alloc::vec::Vec;

#[cfg(feature = "logging")]
use log::info;

use crate::config::{SessionConfig, TrackConfig};
use crate::diagnostics::SkippedTrigger;
use crate::event::{Event, EventBuf, EventKind};
use crate::lap_timer::{LapTimer, PositionSample};
use crate::sprint_timer::{MotionSample, SprintTimer};
use crate::telemetry::TelemetrySnapshot;

/// Receives timing events
///
/// Implemented for any `FnMut(&Event)` closure.
pub trait EventSubscriber {
    fn on_event(&mut self, event: &Event);
}

impl<F> EventSubscriber for F
where
    F: FnMut(&Event),
{
    fn on_event(&mut self, event: &Event) {
        self(event)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u32);

struct Subscription {
    id: SubscriptionId,
    /// None receives every event
    kind: Option<EventKind>,
    subscriber: Box<dyn EventSubscriber>,
}

/// One sample from the fusion layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    /// GPS-rate position fix, for the lap timer
    Position(PositionSample),
    /// IMU-rate speed and acceleration, for the sprint timer
    Motion(MotionSample),
}

/// Which timer receives samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActiveTimer {
    #[default]
    Lap,
    Sprint,
}

/// Timing session
pub struct Session {
    lap: LapTimer,
    sprint: SprintTimer,
    active: ActiveTimer,
    subscribers: Vec<Subscription>,
    next_id: u32,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            lap: LapTimer::new(config.lap),
            sprint: SprintTimer::new(config.sprint),
            active: ActiveTimer::Lap,
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    // ========================================================================
    // Control
    // ========================================================================

    /// Store a track and reset the session. Leaves the lap timer disarmed.
    pub fn setup_track(&mut self, track: TrackConfig) {
        self.lap.setup_track(track);
    }

    /// Clear results. Track and armed state are kept.
    pub fn reset_session(&mut self) {
        self.lap.reset_session();
        self.sprint.reset();
    }

    /// Enter track mode with a fresh session
    pub fn arm(&mut self) {
        self.select(ActiveTimer::Lap);
        self.lap.arm();
    }

    /// Leave track mode. No Running transition happens after this returns.
    pub fn disarm(&mut self) {
        self.lap.disarm();
    }

    /// Route samples to `timer`
    ///
    /// Leaving the lap timer disarms it. Leaving the sprint timer drops any
    /// run in progress.
    pub fn select(&mut self, timer: ActiveTimer) {
        if timer == self.active {
            return;
        }

        match self.active {
            ActiveTimer::Lap => self.lap.disarm(),
            ActiveTimer::Sprint => self.sprint.reset(),
        }
        self.active = timer;

        #[cfg(feature = "logging")]
        info!("Session: {:?} timer active", timer);
    }

    pub fn active(&self) -> ActiveTimer {
        self.active
    }

    /// Replace all thresholds. Takes effect on the next sample.
    pub fn set_config(&mut self, config: SessionConfig) {
        self.lap.set_config(config.lap);
        self.sprint.set_config(config.sprint);
    }

    // ========================================================================
    // Update path
    // ========================================================================

    /// Feed one sample to the active timer and notify subscribers
    ///
    /// Samples meant for the inactive timer are ignored. Returns the events
    /// this sample produced, in dispatch order.
    pub fn update(&mut self, sample: Sample) -> EventBuf {
        let events = match (self.active, sample) {
            (ActiveTimer::Lap, Sample::Position(fix)) => self.lap.update(&fix),
            (ActiveTimer::Sprint, Sample::Motion(motion)) => {
                let mut events = EventBuf::new();
                if let Some(event) = self.sprint.update(&motion) {
                    events.push(event);
                }
                events
            }
            _ => EventBuf::new(),
        };

        for event in &events {
            self.dispatch(event);
        }
        events
    }

    pub fn update_position(&mut self, fix: &PositionSample) -> EventBuf {
        self.update(Sample::Position(*fix))
    }

    pub fn update_motion(&mut self, motion: &MotionSample) -> EventBuf {
        self.update(Sample::Motion(*motion))
    }

    /// Advance the live lap clock between fixes
    pub fn tick(&mut self, now_ms: u32) {
        if self.active == ActiveTimer::Lap {
            self.lap.tick(now_ms);
        }
    }

    fn dispatch(&mut self, event: &Event) {
        let kind = event.kind();
        for sub in self.subscribers.iter_mut() {
            if sub.kind.map_or(true, |k| k == kind) {
                sub.subscriber.on_event(event);
            }
        }
    }

    // ========================================================================
    // Subscribers
    // ========================================================================

    /// Receive every event
    pub fn subscribe<S>(&mut self, subscriber: S) -> SubscriptionId
    where
        S: EventSubscriber + 'static,
    {
        self.add_subscription(None, Box::new(subscriber))
    }

    /// Receive events of one kind only
    pub fn subscribe_to<S>(&mut self, kind: EventKind, subscriber: S) -> SubscriptionId
    where
        S: EventSubscriber + 'static,
    {
        self.add_subscription(Some(kind), Box::new(subscriber))
    }

    /// Returns false if `id` was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|sub| sub.id != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn add_subscription(
        &mut self,
        kind: Option<EventKind>,
        subscriber: Box<dyn EventSubscriber>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.subscribers.push(Subscription {
            id,
            kind,
            subscriber,
        });
        id
    }

    // ========================================================================
    // Read accessors
    // ========================================================================

    pub fn is_armed(&self) -> bool {
        self.lap.is_armed()
    }

    /// Active timer is timing
    pub fn is_running(&self) -> bool {
        match self.active {
            ActiveTimer::Lap => self.lap.is_running(),
            ActiveTimer::Sprint => self.sprint.is_running(),
        }
    }

    pub fn is_track_setup(&self) -> bool {
        self.lap.is_track_setup()
    }

    pub fn lap_count(&self) -> u32 {
        self.lap.lap_count()
    }

    pub fn last_lap_ms(&self) -> Option<u32> {
        self.lap.last_lap_ms()
    }

    pub fn best_lap_ms(&self) -> Option<u32> {
        self.lap.best_lap_ms()
    }

    /// Live time of the active timer as of the last update or tick
    pub fn current_elapsed_ms(&self) -> u32 {
        match self.active {
            ActiveTimer::Lap => self.lap.current_lap_ms(),
            ActiveTimer::Sprint => self.sprint.elapsed_ms(),
        }
    }

    pub fn last_skipped(&self) -> Option<&SkippedTrigger> {
        self.lap.last_skipped()
    }

    /// All polled values, consistent with each other
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            armed: self.lap.is_armed(),
            running: self.is_running(),
            track_setup: self.lap.is_track_setup(),
            track_type: self.lap.track().map(|t| t.track_type),
            lap_state: self.lap.state(),
            sprint_state: self.sprint.state(),
            lap_count: self.lap.lap_count(),
            current_elapsed_ms: self.current_elapsed_ms(),
            last_lap_ms: self.lap.last_lap_ms(),
            best_lap_ms: self.lap.best_lap_ms(),
            sprint_elapsed_ms: self.sprint.elapsed_ms(),
            sprint_result_ms: self.sprint.result_ms(),
        }
    }

    pub fn lap_timer(&self) -> &LapTimer {
        &self.lap
    }

    pub fn sprint_timer(&self) -> &SprintTimer {
        &self.sprint
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
