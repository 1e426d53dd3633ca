//! Polled timing telemetry
//!
//! A display or streaming layer reads these values between updates. The
//! snapshot is taken in one call so a reader never sees a lap count without
//! the best lap that came with it.

use alloc::format;
use alloc::string::String;

use crate::config::TrackType;
use crate::lap_timer::LapTimerState;
use crate::sprint_timer::SprintState;

/// Complete timing data snapshot
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetrySnapshot {
    pub armed: bool,
    pub running: bool,
    pub track_setup: bool,
    /// None until a track is configured
    pub track_type: Option<TrackType>,
    pub lap_state: LapTimerState,
    pub sprint_state: SprintState,
    /// Completed laps
    pub lap_count: u32,
    /// Live time of the active timer (ms)
    pub current_elapsed_ms: u32,
    pub last_lap_ms: Option<u32>,
    pub best_lap_ms: Option<u32>,
    /// Live sprint run time (ms)
    pub sprint_elapsed_ms: u32,
    pub sprint_result_ms: Option<u32>,
}

/// Format a lap time as `mm:ss.mmm`, `--:--.---` when there is none
pub fn format_lap_time(ms: Option<u32>) -> String {
    match ms {
        Some(ms) if ms > 0 => {
            let minutes = ms / 60_000;
            let seconds = (ms / 1_000) % 60;
            let millis = ms % 1_000;
            format!("{:02}:{:02}.{:03}", minutes, seconds, millis)
        }
        _ => String::from("--:--.---"),
    }
}

#[cfg(feature = "std")]
pub use shared::SharedTelemetry;

#[cfg(feature = "std")]
mod shared {
    use std::sync::{Arc, Mutex};

    use super::TelemetrySnapshot;

    /// Telemetry shared between the timing loop and its readers
    ///
    /// The timing loop publishes with `try_lock()` and skips the publish if a
    /// reader holds the lock. The update path never waits on a reader.
    #[derive(Clone, Default)]
    pub struct SharedTelemetry {
        pub(super) data: Arc<Mutex<TelemetrySnapshot>>,
    }

    impl SharedTelemetry {
        pub fn new() -> Self {
            Self::default()
        }

        /// Non-blocking publish. Returns false if skipped.
        pub fn publish(&self, snapshot: TelemetrySnapshot) -> bool {
            match self.data.try_lock() {
                Ok(mut data) => {
                    *data = snapshot;
                    true
                }
                Err(_) => false,
            }
        }

        /// Latest published snapshot. May briefly block during a publish.
        pub fn snapshot(&self) -> TelemetrySnapshot {
            match self.data.lock() {
                Ok(data) => *data,
                // A panicked writer still left a whole snapshot behind
                Err(poisoned) => *poisoned.into_inner(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_lap_time() {
        assert_eq!(format_lap_time(Some(60_000)), "01:00.000");
        assert_eq!(format_lap_time(Some(83_456)), "01:23.456");
        assert_eq!(format_lap_time(Some(999)), "00:00.999");
        assert_eq!(format_lap_time(Some(3_599_999)), "59:59.999");
    }

    #[test]
    fn test_format_lap_time_unset() {
        assert_eq!(format_lap_time(None), "--:--.---");
        assert_eq!(format_lap_time(Some(0)), "--:--.---");
    }

    #[test]
    fn test_format_lap_time_over_an_hour() {
        // Minutes keep counting past 59
        assert_eq!(format_lap_time(Some(3_723_004)), "62:03.004");
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_shared_snapshot_visible_to_reader_thread() {
        let shared = SharedTelemetry::new();
        let snapshot = TelemetrySnapshot {
            armed: true,
            running: true,
            lap_count: 3,
            best_lap_ms: Some(59_800),
            ..Default::default()
        };
        assert!(shared.publish(snapshot));

        let reader = shared.clone();
        let seen = std::thread::spawn(move || reader.snapshot())
            .join()
            .unwrap();
        assert_eq!(seen.lap_count, 3);
        assert_eq!(seen.best_lap_ms, Some(59_800));
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_publish_skips_while_reader_holds_lock() {
        let shared = SharedTelemetry::new();
        let guard = shared.data.lock().unwrap();
        assert!(!shared.publish(TelemetrySnapshot {
            lap_count: 1,
            ..Default::default()
        }));
        drop(guard);
        assert_eq!(shared.snapshot().lap_count, 0);
    }
}
