//! Standing-start acceleration timer
//!
//! Times a launch from rest to a target speed (0-100 km/h by default) from
//! speed and longitudinal acceleration alone. No geofence involved: the run
//! starts on a launch impulse and ends on a speed threshold.
//!
//! ## State flow
//!
//! ```text
//! Idle --stopped 2 s--> Ready --g spike or speed--> Running --target--> Finished
//!   ^                     |                            |                    |
//!   +------ rolling ------+------ stall/false start ---+---- slowed down ---+
//! ```
//!
//! `longitudinal_g` must have gravity removed, positive when accelerating.

#[cfg(feature = "logging")]
use log::{info, warn};

use crate::config::SprintConfig;
use crate::event::{Event, LaunchTrigger};

/// Acceleration timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SprintState {
    /// Moving, or not stopped long enough
    #[default]
    Idle,
    /// Stopped, waiting for launch
    Ready,
    Running,
    /// Target reached, result held until the car slows down
    Finished,
}

/// One inertial/speed reading
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotionSample {
    pub speed_kmh: f32,
    pub longitudinal_g: f32,
    pub timestamp_ms: u32,
}

impl MotionSample {
    pub fn new(speed_kmh: f32, longitudinal_g: f32, timestamp_ms: u32) -> Self {
        Self {
            speed_kmh,
            longitudinal_g,
            timestamp_ms,
        }
    }
}

/// Acceleration run state machine
pub struct SprintTimer {
    config: SprintConfig,
    state: SprintState,
    /// Start of the current stationary stretch
    stopped_since_ms: Option<u32>,
    start_ms: u32,
    elapsed_ms: u32,
    result_ms: Option<u32>,
    last_result_ms: Option<u32>,
    last_trigger: Option<LaunchTrigger>,
}

impl SprintTimer {
    pub fn new(config: SprintConfig) -> Self {
        Self {
            config,
            state: SprintState::Idle,
            stopped_since_ms: None,
            start_ms: 0,
            elapsed_ms: 0,
            result_ms: None,
            last_result_ms: None,
            last_trigger: None,
        }
    }

    /// Drop any run in progress and wait for the car to stop again
    pub fn reset(&mut self) {
        self.state = SprintState::Idle;
        self.stopped_since_ms = None;
        self.elapsed_ms = 0;
        self.result_ms = None;
    }

    pub fn config(&self) -> &SprintConfig {
        &self.config
    }

    /// Replace thresholds. Takes effect on the next sample.
    pub fn set_config(&mut self, config: SprintConfig) {
        self.config = config;
    }

    /// Feed one motion sample. Call at sensor rate.
    pub fn update(&mut self, sample: &MotionSample) -> Option<Event> {
        let now = sample.timestamp_ms;
        let speed = sample.speed_kmh;

        match self.state {
            SprintState::Idle | SprintState::Ready => {
                // Launch check comes first: the launch sample itself usually
                // breaks the stationary condition
                if self.state == SprintState::Ready {
                    if let Some(trigger) = self.launch_trigger(sample) {
                        return Some(self.launch(trigger, sample));
                    }
                }

                if speed < self.config.stop_speed_kmh {
                    let since = *self.stopped_since_ms.get_or_insert(now);
                    if self.state == SprintState::Idle
                        && now.wrapping_sub(since) >= self.config.ready_hold_ms
                    {
                        self.state = SprintState::Ready;

                        #[cfg(feature = "logging")]
                        info!("Sprint: ready to launch");

                        return Some(Event::SprintReady { timestamp_ms: now });
                    }
                } else {
                    // Still rolling
                    self.stopped_since_ms = None;
                    self.state = SprintState::Idle;
                }
                None
            }

            SprintState::Running => {
                self.elapsed_ms = now.wrapping_sub(self.start_ms);

                if speed < self.config.abort_speed_kmh && self.elapsed_ms > self.config.abort_grace_ms {
                    #[cfg(feature = "logging")]
                    warn!("Sprint: stalled {}ms after launch, run aborted", self.elapsed_ms);

                    self.reset();
                    return Some(Event::SprintAbort { timestamp_ms: now });
                }

                if speed >= self.config.target_speed_kmh {
                    let result_ms = self.elapsed_ms;
                    self.state = SprintState::Finished;
                    self.result_ms = Some(result_ms);
                    self.last_result_ms = Some(result_ms);

                    #[cfg(feature = "logging")]
                    info!(
                        "Sprint: FINISH 0-{:.0} in {}.{:03}s",
                        self.config.target_speed_kmh,
                        result_ms / 1000,
                        result_ms % 1000
                    );

                    return Some(Event::SprintFinish {
                        result_ms,
                        timestamp_ms: now,
                    });
                }
                None
            }

            SprintState::Finished => {
                if speed < self.config.reset_speed_kmh {
                    #[cfg(feature = "logging")]
                    info!("Sprint: resetting for next run");

                    self.reset();
                }
                None
            }
        }
    }

    /// g spike is preferred; speed covers a noisy or missing accelerometer
    fn launch_trigger(&self, sample: &MotionSample) -> Option<LaunchTrigger> {
        if sample.longitudinal_g > self.config.g_trigger {
            Some(LaunchTrigger::GForce)
        } else if sample.speed_kmh > self.config.speed_trigger_kmh {
            Some(LaunchTrigger::Speed)
        } else {
            None
        }
    }

    fn launch(&mut self, trigger: LaunchTrigger, sample: &MotionSample) -> Event {
        #[cfg(feature = "logging")]
        info!(
            "Sprint: launch by {:?} ({:.2}g, {:.1}km/h)",
            trigger, sample.longitudinal_g, sample.speed_kmh
        );

        self.state = SprintState::Running;
        self.start_ms = sample.timestamp_ms;
        self.elapsed_ms = 0;
        self.result_ms = None;
        self.stopped_since_ms = None;
        self.last_trigger = Some(trigger);

        Event::SprintLaunch {
            trigger,
            timestamp_ms: sample.timestamp_ms,
        }
    }

    pub fn state(&self) -> SprintState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SprintState::Ready
    }

    pub fn is_running(&self) -> bool {
        self.state == SprintState::Running
    }

    /// Run time as of the last sample; the result once finished
    pub fn elapsed_ms(&self) -> u32 {
        match self.state {
            SprintState::Running => self.elapsed_ms,
            SprintState::Finished => self.result_ms.unwrap_or(0),
            _ => 0,
        }
    }

    /// Run time at `now_ms` for live display
    pub fn elapsed_at(&self, now_ms: u32) -> u32 {
        match self.state {
            SprintState::Running => now_ms.wrapping_sub(self.start_ms),
            _ => self.elapsed_ms(),
        }
    }

    /// Result of the finished run, cleared on auto-reset
    pub fn result_ms(&self) -> Option<u32> {
        self.result_ms
    }

    /// Most recent completed run, kept across resets
    pub fn last_result_ms(&self) -> Option<u32> {
        self.last_result_ms
    }

    pub fn last_launch_trigger(&self) -> Option<LaunchTrigger> {
        self.last_trigger
    }
}

impl Default for SprintTimer {
    fn default() -> Self {
        Self::new(SprintConfig::default())
    }
}
