use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::{haversine_km, Coordinate};
use crate::models::rider::{Rider, RiderStatus, VehicleKind};

/// Owns every rider record. Availability is the most contended resource in
/// the system, so every mutation goes through this type and executes under
/// the map's per-entry lock.
pub struct RiderDirectory {
    riders: DashMap<Uuid, Rider>,
}

pub struct NewRider {
    pub name: String,
    pub phone: String,
    pub vehicle: VehicleKind,
    pub location: Coordinate,
    pub rating: f64,
}

impl RiderDirectory {
    pub fn new() -> Self {
        Self {
            riders: DashMap::new(),
        }
    }

    pub fn register(&self, new: NewRider) -> Rider {
        let rider = Rider {
            id: Uuid::new_v4(),
            name: new.name,
            phone: new.phone,
            vehicle: new.vehicle,
            location: new.location,
            last_updated: Utc::now(),
            status: RiderStatus::Available,
            current_delivery_id: None,
            rating: new.rating.clamp(0.0, 5.0),
            completed_deliveries: 0,
            is_active: true,
            is_verified: true,
        };
        self.riders.insert(rider.id, rider.clone());
        rider
    }

    pub fn get(&self, rider_id: Uuid) -> Option<Rider> {
        self.riders.get(&rider_id).map(|r| r.clone())
    }

    pub fn all(&self) -> Vec<Rider> {
        self.riders.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.riders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.riders.is_empty()
    }

    /// Snapshot query: available, active, verified riders within `radius_km`
    /// of `center`, rating at least `min_rating`, ordered by rating
    /// descending with ties broken by freshest location. Staleness is
    /// acceptable here; correctness is enforced later by `try_reserve`.
    pub fn find_available(&self, center: &Coordinate, radius_km: f64, min_rating: f64) -> Vec<Rider> {
        let mut candidates: Vec<Rider> = self
            .riders
            .iter()
            .filter_map(|entry| {
                let rider = entry.value();
                let eligible = rider.status == RiderStatus::Available
                    && rider.is_active
                    && rider.is_verified
                    && rider.rating >= min_rating
                    && haversine_km(&rider.location, center) <= radius_km;
                eligible.then(|| rider.clone())
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.rating
                .total_cmp(&a.rating)
                .then(b.last_updated.cmp(&a.last_updated))
        });

        candidates
    }

    /// Atomic claim of a rider for a delivery. Succeeds only from Available;
    /// on success the status flip and the delivery binding happen in one
    /// step under the entry lock. Returns false without side effects when
    /// the rider is already reserved, offline, suspended, or not eligible.
    pub fn try_reserve(&self, rider_id: Uuid, delivery_id: u64) -> bool {
        let Some(mut rider) = self.riders.get_mut(&rider_id) else {
            return false;
        };

        if rider.status != RiderStatus::Available || !rider.is_active || !rider.is_verified {
            return false;
        }

        rider.status = RiderStatus::OnDelivery;
        rider.current_delivery_id = Some(delivery_id);
        rider.last_updated = Utc::now();
        true
    }

    /// Returns the rider to the available pool and counts the finished trip.
    /// Idempotent: releasing a rider who is not on a delivery is a no-op.
    /// Returns true when a reservation was actually cleared.
    pub fn release(&self, rider_id: Uuid) -> bool {
        let Some(mut rider) = self.riders.get_mut(&rider_id) else {
            return false;
        };

        if rider.status != RiderStatus::OnDelivery {
            return false;
        }

        rider.status = RiderStatus::Available;
        rider.current_delivery_id = None;
        rider.completed_deliveries += 1;
        rider.last_updated = Utc::now();
        true
    }

    pub fn update_location(&self, rider_id: Uuid, location: Coordinate) -> Result<Rider, AppError> {
        location.validate()?;

        let mut rider = self
            .riders
            .get_mut(&rider_id)
            .ok_or_else(|| AppError::NotFound(format!("rider {rider_id} not found")))?;

        rider.location = location;
        rider.last_updated = Utc::now();
        Ok(rider.clone())
    }

    /// Manual status toggles (going online/offline, suspension). OnDelivery
    /// is owned by the reserve/release pair and cannot be entered or left
    /// through this path.
    pub fn set_status(&self, rider_id: Uuid, status: RiderStatus) -> Result<Rider, AppError> {
        if status == RiderStatus::OnDelivery {
            return Err(AppError::InvalidArgument(
                "on-delivery is set by assignment, not directly".to_string(),
            ));
        }

        let mut rider = self
            .riders
            .get_mut(&rider_id)
            .ok_or_else(|| AppError::NotFound(format!("rider {rider_id} not found")))?;

        if rider.status == RiderStatus::OnDelivery {
            return Err(AppError::IllegalTransition(format!(
                "rider {rider_id} is on delivery {:?} and must be released first",
                rider.current_delivery_id
            )));
        }

        rider.status = status;
        rider.last_updated = Utc::now();
        Ok(rider.clone())
    }
}

impl Default for RiderDirectory {
    fn default() -> Self {
        Self::new()
    }
}
