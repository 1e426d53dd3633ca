//! Great-circle helpers for geofence tests
//!
//! Pure functions over WGS-84 degrees. Uses `libm` so the crate builds
//! without `std`.

use libm::{atan2, cos, fabs, fmod, sin, sqrt};

/// Mean Earth radius (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Validated point, `None` when outside |lat| <= 90, |lon| <= 180 or not finite
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let valid = lat.is_finite() && lon.is_finite() && fabs(lat) <= 90.0 && fabs(lon) <= 180.0;
        valid.then_some(Self { lat, lon })
    }

    /// Interpret a driver reading that reports (0, 0) before the first fix
    ///
    /// Receivers without a fix flag emit zeros until they lock. Anything within
    /// 0.1° of the origin on both axes is treated as "no fix". Drivers that do
    /// report fix validity should use [`GeoPoint::new`] instead, since this
    /// rejects real positions in the Gulf of Guinea.
    pub fn from_legacy(lat: f64, lon: f64) -> Option<Self> {
        if fabs(lat) < 0.1 && fabs(lon) < 0.1 {
            return None;
        }
        Self::new(lat, lon)
    }

    /// Distance to another point (meters)
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        distance(self, other)
    }
}

/// Haversine great-circle distance in meters
pub fn distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let s_lat = sin(d_lat / 2.0);
    let s_lon = sin(d_lon / 2.0);

    let h = s_lat * s_lat + cos(a.lat.to_radians()) * cos(b.lat.to_radians()) * s_lon * s_lon;
    // Rounding can push h a hair past 1 for antipodal points
    let h = h.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_M * atan2(sqrt(h), sqrt(1.0 - h))
}

/// Smallest angle between two compass headings, in [0, 180] degrees
pub fn heading_delta(h1: f64, h2: f64) -> f64 {
    let diff = normalize_heading(h1 - h2);
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Wrap a heading into [0, 360)
pub fn normalize_heading(heading: f64) -> f64 {
    let wrapped = fmod(heading, 360.0);
    if wrapped < 0.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}
