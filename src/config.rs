//! Track geometry and timing thresholds
//!
//! Every threshold the timers use lives here with its documented default, so
//! tests and field setups can override any of them.

use core::fmt;

use crate::geo::GeoPoint;

/// Trigger radius for 10 Hz receivers (meters)
///
/// At 200 km/h a 10 Hz fix advances ~5.5 m, so a 6 m wide window still
/// catches a flat-out crossing. Smaller misses, larger false-triggers.
pub const PRECISION_TRIGGER_RADIUS_M: f32 = 3.0;

/// Trigger radius used by older track files and 1 Hz receivers (meters)
pub const LEGACY_TRIGGER_RADIUS_M: f32 = 10.0;

/// Track layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TrackType {
    /// Single start/finish point, continuous lapping
    #[default]
    Circuit,
    /// Separate start and finish points (hill climb, rally stage)
    PointToPoint,
}

impl TrackType {
    /// Code used by the track setup command
    pub fn as_u8(&self) -> u8 {
        match self {
            TrackType::Circuit => 0,
            TrackType::PointToPoint => 1,
        }
    }
}

impl TryFrom<u8> for TrackType {
    type Error = ConfigError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(TrackType::Circuit),
            1 => Ok(TrackType::PointToPoint),
            other => Err(ConfigError::UnknownTrackType(other)),
        }
    }
}

/// Geofence definition for one track
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackConfig {
    pub track_type: TrackType,
    /// Geofence radius around start and finish (meters)
    pub trigger_radius_m: f32,
    pub start: GeoPoint,
    /// Same as `start` for circuits
    pub finish: GeoPoint,
}

impl TrackConfig {
    /// Circuit with a shared start/finish point
    pub fn circuit(start: GeoPoint, trigger_radius_m: f32) -> Result<Self, ConfigError> {
        validate_radius(trigger_radius_m)?;
        Ok(Self {
            track_type: TrackType::Circuit,
            trigger_radius_m,
            start,
            finish: start,
        })
    }

    /// Stage with distinct start and finish points
    pub fn point_to_point(
        start: GeoPoint,
        finish: GeoPoint,
        trigger_radius_m: f32,
    ) -> Result<Self, ConfigError> {
        validate_radius(trigger_radius_m)?;
        Ok(Self {
            track_type: TrackType::PointToPoint,
            trigger_radius_m,
            start,
            finish,
        })
    }

    /// Build from the fields of a track setup command
    ///
    /// Field order matches the command: type code, radius, start lat/lon,
    /// end lat/lon. The end point is ignored for circuits.
    pub fn from_command(
        type_code: u8,
        trigger_radius_m: f32,
        start_lat: f64,
        start_lon: f64,
        end_lat: f64,
        end_lon: f64,
    ) -> Result<Self, ConfigError> {
        let start = GeoPoint::new(start_lat, start_lon).ok_or(ConfigError::InvalidStart)?;
        match TrackType::try_from(type_code)? {
            TrackType::Circuit => Self::circuit(start, trigger_radius_m),
            TrackType::PointToPoint => {
                let finish = GeoPoint::new(end_lat, end_lon).ok_or(ConfigError::InvalidFinish)?;
                Self::point_to_point(start, finish, trigger_radius_m)
            }
        }
    }
}

fn validate_radius(radius_m: f32) -> Result<(), ConfigError> {
    if radius_m.is_finite() && radius_m > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidRadius)
    }
}

/// Geofenced lap timer thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LapTimerConfig {
    /// Speed required inside the geofence (km/h), rejects GPS drift while parked
    pub min_trigger_speed_kmh: f32,
    /// Closest approach must be below this to count as a crossing (meters)
    pub inner_bound_m: f32,
    /// Minimum time between two triggers (ms)
    pub cooldown_ms: u32,
    /// Finish heading tolerance relative to the start heading (degrees)
    pub max_heading_delta_deg: f64,
}

impl Default for LapTimerConfig {
    fn default() -> Self {
        Self {
            min_trigger_speed_kmh: 8.0,
            inner_bound_m: 1.5,
            cooldown_ms: 5_000,
            max_heading_delta_deg: 90.0,
        }
    }
}

/// Standing-start acceleration timer thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SprintConfig {
    pub stop_speed_kmh: f32,      // below this the car counts as stopped
    pub ready_hold_ms: u32,       // stopped this long before Ready
    pub g_trigger: f32,           // g, preferred launch trigger
    pub speed_trigger_kmh: f32,   // fallback launch trigger
    pub target_speed_kmh: f32,    // run ends here
    pub abort_speed_kmh: f32,     // stall/false-start detection
    pub abort_grace_ms: u32,      // no abort this soon after launch
    pub reset_speed_kmh: f32,     // Finished clears below this
}

impl Default for SprintConfig {
    fn default() -> Self {
        Self {
            stop_speed_kmh: 1.5,
            ready_hold_ms: 2_000,
            g_trigger: 0.15, // clear shove in the back
            speed_trigger_kmh: 5.0,
            target_speed_kmh: 100.0,
            abort_speed_kmh: 1.0,
            abort_grace_ms: 2_000,
            reset_speed_kmh: 10.0,
        }
    }
}

impl SprintConfig {
    /// 0-100 km/h preset with a different target (e.g. 0-60 km/h, 0-200 km/h)
    pub fn with_target(target_speed_kmh: f32) -> Self {
        Self {
            target_speed_kmh,
            ..Default::default()
        }
    }
}

/// Master configuration for a timing session
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionConfig {
    pub lap: LapTimerConfig,
    pub sprint: SprintConfig,
}

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    UnknownTrackType(u8),
    InvalidRadius,
    InvalidStart,
    InvalidFinish,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownTrackType(code) => write!(f, "unknown track type code {}", code),
            ConfigError::InvalidRadius => f.write_str("trigger radius must be a positive number of meters"),
            ConfigError::InvalidStart => f.write_str("start point out of range"),
            ConfigError::InvalidFinish => f.write_str("finish point out of range"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_type_codes() {
        assert_eq!(TrackType::try_from(0), Ok(TrackType::Circuit));
        assert_eq!(TrackType::try_from(1), Ok(TrackType::PointToPoint));
        assert_eq!(TrackType::try_from(2), Err(ConfigError::UnknownTrackType(2)));
        assert_eq!(TrackType::PointToPoint.as_u8(), 1);
    }

    #[test]
    fn test_circuit_finish_equals_start() {
        let start = GeoPoint::new(40.0, -8.0).unwrap();
        let track = TrackConfig::circuit(start, PRECISION_TRIGGER_RADIUS_M).unwrap();
        assert_eq!(track.finish, track.start);
        assert_eq!(track.track_type, TrackType::Circuit);
    }

    #[test]
    fn test_from_command_circuit_ignores_end_point() {
        let track = TrackConfig::from_command(0, 3.0, 40.0, -8.0, 999.0, 999.0).unwrap();
        assert_eq!(track.finish, track.start);
    }

    #[test]
    fn test_from_command_point_to_point() {
        let track = TrackConfig::from_command(1, 10.0, 40.0, -8.0, 40.01, -8.02).unwrap();
        assert_eq!(track.track_type, TrackType::PointToPoint);
        assert_eq!(track.finish, GeoPoint::new(40.01, -8.02).unwrap());
        assert_eq!(track.trigger_radius_m, LEGACY_TRIGGER_RADIUS_M);
    }

    #[test]
    fn test_from_command_rejects_bad_fields() {
        assert_eq!(
            TrackConfig::from_command(7, 3.0, 40.0, -8.0, 0.0, 0.0),
            Err(ConfigError::UnknownTrackType(7))
        );
        assert_eq!(
            TrackConfig::from_command(0, 0.0, 40.0, -8.0, 0.0, 0.0),
            Err(ConfigError::InvalidRadius)
        );
        assert_eq!(
            TrackConfig::from_command(0, f32::NAN, 40.0, -8.0, 0.0, 0.0),
            Err(ConfigError::InvalidRadius)
        );
        assert_eq!(
            TrackConfig::from_command(0, 3.0, 95.0, -8.0, 0.0, 0.0),
            Err(ConfigError::InvalidStart)
        );
        assert_eq!(
            TrackConfig::from_command(1, 3.0, 40.0, -8.0, 40.0, 200.0),
            Err(ConfigError::InvalidFinish)
        );
    }

    #[test]
    fn test_defaults() {
        let lap = LapTimerConfig::default();
        assert_eq!(lap.min_trigger_speed_kmh, 8.0);
        assert_eq!(lap.inner_bound_m, 1.5);
        assert_eq!(lap.cooldown_ms, 5_000);

        let sprint = SprintConfig::default();
        assert_eq!(sprint.target_speed_kmh, 100.0);
        assert_eq!(SprintConfig::with_target(60.0).target_speed_kmh, 60.0);
        assert_eq!(SprintConfig::with_target(60.0).g_trigger, 0.15);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_track_config_from_json() {
        let json = r#"{
            "track_type": "PointToPoint",
            "trigger_radius_m": 3.0,
            "start": { "lat": 40.0, "lon": -8.0 },
            "finish": { "lat": 40.01, "lon": -8.0 }
        }"#;
        let track: TrackConfig = serde_json::from_str(json).unwrap();
        assert_eq!(track.track_type, TrackType::PointToPoint);
        assert_eq!(track.finish.lat, 40.01);
    }
}
