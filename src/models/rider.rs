use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleKind {
    Bicycle,
    Motorbike,
    Car,
    Van,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiderStatus {
    Available,
    OnDelivery,
    Offline,
    Suspended,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rider {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub vehicle: VehicleKind,
    pub location: Coordinate,
    pub last_updated: DateTime<Utc>,
    pub status: RiderStatus,
    /// Set iff status == OnDelivery; points at a non-terminal delivery.
    pub current_delivery_id: Option<u64>,
    pub rating: f64,
    pub completed_deliveries: u64,
    pub is_active: bool,
    pub is_verified: bool,
}

/// The subset of rider fields exposed on the public tracking endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RiderPublicProfile {
    pub name: String,
    pub vehicle: VehicleKind,
    pub rating: f64,
    pub location: Coordinate,
}

impl From<&Rider> for RiderPublicProfile {
    fn from(rider: &Rider) -> Self {
        Self {
            name: rider.name.clone(),
            vehicle: rider.vehicle,
            rating: rider.rating,
            location: rider.location,
        }
    }
}
