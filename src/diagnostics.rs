//! Skipped-trigger diagnostics
//!
//! A missed crossing produces no result and no error state. The lap timer
//! records the most recent candidate it rejected so an operator can tell a
//! shallow pass from a cooldown or wrong-way pass. Recording never changes
//! what the state machine does.

/// Why a candidate trigger was rejected
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SkipReason {
    /// Closest sampled approach stayed outside the inner bound
    InnerBoundMissed { closest_m: f32 },
    /// Too soon after the previous trigger
    Cooldown { remaining_ms: u32 },
    /// Heading too far from the heading at race start
    ReverseHeading { delta_deg: f64 },
    /// Heading not finite while a start heading is on record
    InvalidHeading,
    /// Inside the geofence but slower than the trigger speed
    BelowTriggerSpeed { speed_kmh: f32 },
}

/// Which geofence point the rejected candidate belonged to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TriggerPoint {
    Start,
    Finish,
}

/// Most recent rejected trigger
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkippedTrigger {
    pub point: TriggerPoint,
    pub reason: SkipReason,
    /// Sample time of the rejected candidate (ms)
    pub timestamp_ms: u32,
}
