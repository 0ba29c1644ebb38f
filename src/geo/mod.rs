use serde::{Deserialize, Serialize};

use crate::error::AppError;

const EARTH_RADIUS_KM: f64 = 6_371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(AppError::InvalidArgument(format!(
                "latitude {} out of range [-90, 90]",
                self.lat
            )));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(AppError::InvalidArgument(format!(
                "longitude {} out of range [-180, 180]",
                self.lng
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrafficClass {
    Low,
    #[default]
    Medium,
    High,
}

impl TrafficClass {
    /// Assumed average speed in km/h for the class.
    pub fn speed_kmh(&self) -> f64 {
        match self {
            TrafficClass::Low => 40.0,
            TrafficClass::Medium => 25.0,
            TrafficClass::High => 15.0,
        }
    }
}

pub fn haversine_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lng = (b.lng - a.lng).to_radians();

    let sin_lat = (delta_lat / 2.0).sin();
    let sin_lng = (delta_lng / 2.0).sin();

    let haversine = sin_lat * sin_lat + lat1.cos() * lat2.cos() * sin_lng * sin_lng;
    let central_angle = 2.0 * haversine.sqrt().asin();

    EARTH_RADIUS_KM * central_angle
}

pub fn estimate_travel_minutes(distance_km: f64, traffic: TrafficClass) -> Result<f64, AppError> {
    if distance_km < 0.0 || !distance_km.is_finite() {
        return Err(AppError::InvalidArgument(format!(
            "distance must be a non-negative number, got {distance_km}"
        )));
    }

    Ok(distance_km / traffic.speed_kmh() * 60.0)
}
