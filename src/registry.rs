use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::Coordinate;
use crate::models::delivery::{
    Delivery, DeliveryStatus, PackageSpec, Pricing, StatusUpdate, Timeline, Waypoint,
};

/// The two failure kinds are distinct on purpose: a stale expectation is a
/// lost race the caller may retry after re-reading, an illegal transition is
/// a caller bug and must not be retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("delivery {0} not found")]
    NotFound(u64),

    #[error("expected status {expected:?} but delivery is {actual:?}")]
    Stale {
        expected: DeliveryStatus,
        actual: DeliveryStatus,
    },

    #[error("transition {from:?} -> {to:?} is not allowed")]
    Illegal {
        from: DeliveryStatus,
        to: DeliveryStatus,
    },
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::NotFound(id) => AppError::NotFound(format!("delivery {id} not found")),
            TransitionError::Stale { .. } => AppError::StaleStatus(err.to_string()),
            TransitionError::Illegal { .. } => AppError::IllegalTransition(err.to_string()),
        }
    }
}

pub struct NewDelivery {
    pub order_id: Uuid,
    pub business_id: Uuid,
    pub pickup: Waypoint,
    pub dropoff: Waypoint,
    pub package: PackageSpec,
    pub pricing: Pricing,
    pub estimated_delivery: DateTime<Utc>,
}

/// Owns every delivery record and its append-only status log. Status is
/// mutated only through the compare-and-set entry points below; there is no
/// way to write the field directly from outside this module.
pub struct DeliveryRegistry {
    deliveries: DashMap<u64, Delivery>,
    next_id: AtomicU64,
}

impl DeliveryRegistry {
    pub fn new() -> Self {
        Self {
            deliveries: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn create(&self, spec: NewDelivery) -> Delivery {
        let now = Utc::now();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let delivery = Delivery {
            id,
            order_id: spec.order_id,
            business_id: spec.business_id,
            pickup: spec.pickup,
            dropoff: spec.dropoff,
            package: spec.package,
            pricing: spec.pricing,
            timeline: Timeline {
                estimated_pickup: now,
                actual_pickup: None,
                estimated_delivery: spec.estimated_delivery,
                actual_delivery: None,
            },
            status: DeliveryStatus::Pending,
            updates: vec![StatusUpdate {
                status: DeliveryStatus::Pending,
                note: Some("delivery requested".to_string()),
                location: None,
                at: now,
            }],
            rider_id: None,
            rating: None,
            created_at: now,
        };

        self.deliveries.insert(id, delivery.clone());
        delivery
    }

    pub fn get(&self, id: u64) -> Option<Delivery> {
        self.deliveries.get(&id).map(|d| d.clone())
    }

    pub fn len(&self) -> usize {
        self.deliveries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    /// Atomic status move. Succeeds only if the stored status equals
    /// `expected` and the move is in the allowed-transitions table; appends
    /// the log entry and stamps actual pickup/delivery times, all under the
    /// entry lock.
    pub fn compare_and_transition(
        &self,
        id: u64,
        expected: DeliveryStatus,
        next: DeliveryStatus,
        note: Option<String>,
        location: Option<Coordinate>,
    ) -> Result<Delivery, TransitionError> {
        let mut delivery = self
            .deliveries
            .get_mut(&id)
            .ok_or(TransitionError::NotFound(id))?;

        Self::apply_transition(&mut delivery, expected, next, note, location)?;
        Ok(delivery.clone())
    }

    /// The pending -> assigned move plus the rider binding, in one step.
    /// Only the assignment flow calls this; a bare status PATCH cannot bind
    /// a rider.
    pub fn compare_and_assign(
        &self,
        id: u64,
        rider_id: Uuid,
        note: Option<String>,
    ) -> Result<Delivery, TransitionError> {
        let mut delivery = self
            .deliveries
            .get_mut(&id)
            .ok_or(TransitionError::NotFound(id))?;

        Self::apply_transition(
            &mut delivery,
            DeliveryStatus::Pending,
            DeliveryStatus::Assigned,
            note,
            None,
        )?;
        delivery.rider_id = Some(rider_id);
        Ok(delivery.clone())
    }

    fn apply_transition(
        delivery: &mut Delivery,
        expected: DeliveryStatus,
        next: DeliveryStatus,
        note: Option<String>,
        location: Option<Coordinate>,
    ) -> Result<(), TransitionError> {
        if delivery.status != expected {
            return Err(TransitionError::Stale {
                expected,
                actual: delivery.status,
            });
        }

        if !delivery.status.can_transition_to(next) {
            return Err(TransitionError::Illegal {
                from: delivery.status,
                to: next,
            });
        }

        let now = Utc::now();
        delivery.status = next;
        delivery.updates.push(StatusUpdate {
            status: next,
            note,
            location,
            at: now,
        });

        // Actuals are written at most once, by the transition that earns them.
        match next {
            DeliveryStatus::PickedUp if delivery.timeline.actual_pickup.is_none() => {
                delivery.timeline.actual_pickup = Some(now);
            }
            DeliveryStatus::Delivered if delivery.timeline.actual_delivery.is_none() => {
                delivery.timeline.actual_delivery = Some(now);
            }
            _ => {}
        }

        Ok(())
    }
}

impl Default for DeliveryRegistry {
    fn default() -> Self {
        Self::new()
    }
}
