// src/core/attendance/location.rs
use serde::{Deserialize, Serialize};

use crate::utils::error::{AttendanceError, Result};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && self.longitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance in meters (haversine).
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }
}

/// Fails when `reported` is farther than `radius_m` from `classroom`.
pub fn ensure_within_radius(classroom: &GeoPoint, reported: &GeoPoint, radius_m: f64) -> Result<()> {
    let distance_m = classroom.distance_to(reported);
    if distance_m <= radius_m {
        Ok(())
    } else {
        Err(AttendanceError::LocationOutOfRange { distance_m, radius_m })
    }
}
