pub mod sweep;

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::directory::RiderDirectory;
use crate::error::AppError;
use crate::geo::{estimate_travel_minutes, haversine_km, Coordinate, TrafficClass};
use crate::models::delivery::{Delivery, DeliveryStatus, PackageSpec, PaymentMode, Waypoint};
use crate::models::order::OrderStatus;
use crate::models::rider::{Rider, RiderPublicProfile};
use crate::notify::{Channel, NotificationEvent, NotificationKind, NotificationPort};
use crate::observability::metrics::Metrics;
use crate::pricing;
use crate::registry::{DeliveryRegistry, NewDelivery};
use crate::stores::{BusinessStore, OrderStore};

pub struct DeliveryRequest {
    pub order_id: Uuid,
    pub pickup: Waypoint,
    pub dropoff: Waypoint,
    pub package: PackageSpec,
    pub payment_mode: PaymentMode,
    pub traffic: TrafficClass,
}

/// What the public tracking endpoint exposes: the delivery plus only the
/// rider's public profile fields.
#[derive(Serialize)]
pub struct TrackingView {
    pub delivery: Delivery,
    pub rider: Option<RiderPublicProfile>,
}

/// Orchestrates the dispatch flow. All rider-availability and
/// delivery-status mutation funnels through here; the directory and
/// registry enforce atomicity, this layer enforces the protocol around
/// them (authorization, eligibility, compensation, side effects).
pub struct DispatchService {
    directory: Arc<RiderDirectory>,
    registry: Arc<DeliveryRegistry>,
    orders: Arc<OrderStore>,
    businesses: Arc<BusinessStore>,
    notifier: Arc<dyn NotificationPort>,
    metrics: Metrics,
    default_radius_km: f64,
}

impl DispatchService {
    pub fn new(
        directory: Arc<RiderDirectory>,
        registry: Arc<DeliveryRegistry>,
        orders: Arc<OrderStore>,
        businesses: Arc<BusinessStore>,
        notifier: Arc<dyn NotificationPort>,
        metrics: Metrics,
        default_radius_km: f64,
    ) -> Self {
        Self {
            directory,
            registry,
            orders,
            businesses,
            notifier,
            metrics,
            default_radius_km,
        }
    }

    /// Quote the trip and create the delivery in pending. One delivery per
    /// order: the order-side binding is the CAS gate, and a delivery that
    /// loses that race is immediately failed so no orphan stays pending.
    pub fn request_delivery(
        &self,
        actor: Uuid,
        req: DeliveryRequest,
    ) -> Result<Delivery, AppError> {
        req.pickup.coordinate.validate()?;
        req.dropoff.coordinate.validate()?;

        let order = self
            .orders
            .get(req.order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {} not found", req.order_id)))?;

        let owner = self.businesses.owner_of(order.business_id).ok_or_else(|| {
            AppError::NotFound(format!("business {} not found", order.business_id))
        })?;
        if owner != actor {
            return Err(AppError::Forbidden(
                "only the business owner can request a delivery".to_string(),
            ));
        }

        // Eligibility is checked before anything is created; the bind CAS
        // below re-checks it to settle concurrent requests.
        if order.status != OrderStatus::Confirmed {
            return Err(AppError::OrderNotEligible(format!(
                "order {} is {:?}, not confirmed",
                order.id, order.status
            )));
        }
        if let Some(existing) = order.delivery_id {
            return Err(AppError::OrderNotEligible(format!(
                "order {} already has delivery {existing}",
                order.id
            )));
        }

        let pricing = pricing::quote(
            &req.pickup.coordinate,
            &req.dropoff.coordinate,
            &req.package,
            req.payment_mode,
            order.payable_amount,
        )?;

        let distance_km = haversine_km(&req.pickup.coordinate, &req.dropoff.coordinate);
        let eta_minutes = estimate_travel_minutes(distance_km, req.traffic)?;
        let estimated_delivery = Utc::now() + Duration::seconds((eta_minutes * 60.0).round() as i64);

        let delivery = self.registry.create(NewDelivery {
            order_id: order.id,
            business_id: order.business_id,
            pickup: req.pickup,
            dropoff: req.dropoff,
            package: req.package,
            pricing,
            estimated_delivery,
        });

        if let Err(err) = self.orders.bind_delivery(order.id, delivery.id) {
            // Lost the one-delivery-per-order race; fail the fresh record.
            warn!(
                delivery_id = delivery.id,
                order_id = %order.id,
                "order binding lost, failing the new delivery"
            );
            if let Err(rollback) = self.registry.compare_and_transition(
                delivery.id,
                DeliveryStatus::Pending,
                DeliveryStatus::Failed,
                Some("order already has a delivery".to_string()),
                None,
            ) {
                error!(delivery_id = delivery.id, error = %rollback, "binding rollback failed");
            }
            return Err(err);
        }

        self.metrics.deliveries_in_flight.inc();
        self.notifier.send(NotificationEvent::new(
            Channel::Business,
            Some(owner),
            delivery.id,
            NotificationKind::DeliveryRequested,
            format!(
                "delivery {} created for order {}, quoted at {}",
                delivery.id, order.id, delivery.pricing.total
            ),
        ));

        info!(
            delivery_id = delivery.id,
            order_id = %order.id,
            total = delivery.pricing.total,
            eta_minutes = eta_minutes,
            "delivery requested"
        );

        Ok(delivery)
    }

    /// Best-effort snapshot; staleness is resolved at reservation time.
    pub fn find_candidate_riders(
        &self,
        center: Coordinate,
        radius_km: Option<f64>,
        min_rating: Option<f64>,
    ) -> Result<Vec<Rider>, AppError> {
        center.validate()?;

        let radius = radius_km.unwrap_or(self.default_radius_km);
        if !radius.is_finite() || radius <= 0.0 {
            return Err(AppError::InvalidArgument(format!(
                "search radius must be positive, got {radius}"
            )));
        }

        Ok(self
            .directory
            .find_available(&center, radius, min_rating.unwrap_or(0.0)))
    }

    /// Two-phase reserve-then-commit with a compensating release. The rider
    /// reservation is taken first; if committing the delivery side fails
    /// (lost a race), the reservation is rolled back so the rider never
    /// stays bound to a delivery that refused them.
    pub fn assign_rider(
        &self,
        actor: Uuid,
        delivery_id: u64,
        rider_id: Uuid,
    ) -> Result<Delivery, AppError> {
        let start = Instant::now();
        let result = self.assign_rider_inner(actor, delivery_id, rider_id);

        let outcome = match &result {
            Ok(_) => "success",
            Err(AppError::RiderUnavailable(_)) => "rider_unavailable",
            Err(AppError::StaleStatus(_)) | Err(AppError::IllegalTransition(_)) => "conflict",
            Err(_) => "rejected",
        };
        self.metrics
            .assignment_latency_seconds
            .with_label_values(&[outcome])
            .observe(start.elapsed().as_secs_f64());
        self.metrics
            .assignments_total
            .with_label_values(&[outcome])
            .inc();

        result
    }

    fn assign_rider_inner(
        &self,
        actor: Uuid,
        delivery_id: u64,
        rider_id: Uuid,
    ) -> Result<Delivery, AppError> {
        let delivery = self
            .registry
            .get(delivery_id)
            .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

        self.require_owner(delivery.business_id, actor)?;

        if delivery.status != DeliveryStatus::Pending {
            return Err(AppError::IllegalTransition(format!(
                "delivery {delivery_id} is {:?}, riders can only be assigned while pending",
                delivery.status
            )));
        }

        let rider = self
            .directory
            .get(rider_id)
            .ok_or_else(|| AppError::NotFound(format!("rider {rider_id} not found")))?;

        // Phase one: claim the rider.
        if !self.directory.try_reserve(rider_id, delivery_id) {
            return Err(AppError::RiderUnavailable(format!(
                "rider {rider_id} is not available"
            )));
        }

        // Phase two: commit the pairing on the delivery side.
        match self.registry.compare_and_assign(
            delivery_id,
            rider_id,
            Some(format!("assigned to {}", rider.name)),
        ) {
            Ok(updated) => {
                self.notifier.send(NotificationEvent::new(
                    Channel::Rider,
                    Some(rider_id),
                    delivery_id,
                    NotificationKind::RiderAssigned,
                    format!("you have been assigned delivery {delivery_id}"),
                ));
                self.notifier.send(NotificationEvent::new(
                    Channel::Customer,
                    None,
                    delivery_id,
                    NotificationKind::StatusChanged,
                    format!("{} is on the way to pick up your package", rider.name),
                ));

                info!(delivery_id, rider_id = %rider_id, "rider assigned");
                Ok(updated)
            }
            Err(err) => {
                // Compensating release. A failure here strands the rider
                // on-delivery with no live pairing and must be escalated.
                if self.directory.release(rider_id) {
                    warn!(
                        delivery_id,
                        rider_id = %rider_id,
                        error = %err,
                        "assignment commit lost, reservation rolled back"
                    );
                } else {
                    error!(
                        delivery_id,
                        rider_id = %rider_id,
                        error = %err,
                        "assignment rollback failed, rider may be stranded"
                    );
                    self.metrics
                        .assignments_total
                        .with_label_values(&["rollback_failed"])
                        .inc();
                }
                Err(err.into())
            }
        }
    }

    /// CAS transition plus the per-transition side effects. Stale vs.
    /// illegal surfaces distinctly: the former is retryable after a
    /// re-read, the latter is a caller bug.
    pub fn advance_status(
        &self,
        actor: Uuid,
        delivery_id: u64,
        expected: DeliveryStatus,
        next: DeliveryStatus,
        note: Option<String>,
        location: Option<Coordinate>,
    ) -> Result<Delivery, AppError> {
        let delivery = self
            .registry
            .get(delivery_id)
            .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

        let owner = self.businesses.owner_of(delivery.business_id);
        let is_owner = owner == Some(actor);
        let is_assigned_rider = delivery.rider_id == Some(actor);
        if !is_owner && !is_assigned_rider {
            return Err(AppError::Forbidden(
                "only the business owner or the assigned rider can update a delivery".to_string(),
            ));
        }

        // Assignment carries a rider binding and goes through assign_rider.
        if next == DeliveryStatus::Assigned {
            return Err(AppError::IllegalTransition(
                "assignment must go through the assign operation".to_string(),
            ));
        }

        if let Some(loc) = &location {
            loc.validate()?;
        }

        let updated = self
            .registry
            .compare_and_transition(delivery_id, expected, next, note, location)?;

        self.metrics
            .status_transitions_total
            .with_label_values(&[next.as_str()])
            .inc();

        match next {
            DeliveryStatus::Delivered => {
                if let Some(rider_id) = updated.rider_id {
                    self.directory.release(rider_id);
                }
                self.metrics.deliveries_in_flight.dec();
                self.notifier.send(NotificationEvent::new(
                    Channel::Customer,
                    None,
                    delivery_id,
                    NotificationKind::Delivered,
                    "your package has been delivered".to_string(),
                ));
                self.notifier.send(NotificationEvent::new(
                    Channel::Business,
                    owner,
                    delivery_id,
                    NotificationKind::Delivered,
                    format!("delivery {delivery_id} completed"),
                ));
            }
            DeliveryStatus::Failed => {
                if let Some(rider_id) = updated.rider_id {
                    self.directory.release(rider_id);
                }
                self.metrics.deliveries_in_flight.dec();
                self.notifier.send(NotificationEvent::new(
                    Channel::Business,
                    owner,
                    delivery_id,
                    NotificationKind::Failed,
                    format!("delivery {delivery_id} failed"),
                ));
            }
            _ => {
                self.notifier.send(NotificationEvent::new(
                    Channel::Customer,
                    None,
                    delivery_id,
                    NotificationKind::StatusChanged,
                    format!("delivery {delivery_id} is now {}", next.as_str()),
                ));
            }
        }

        info!(delivery_id, status = next.as_str(), "delivery status advanced");
        Ok(updated)
    }

    pub fn track(&self, delivery_id: u64) -> Result<TrackingView, AppError> {
        let delivery = self
            .registry
            .get(delivery_id)
            .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

        let rider = delivery
            .rider_id
            .and_then(|id| self.directory.get(id))
            .map(|r| RiderPublicProfile::from(&r));

        Ok(TrackingView { delivery, rider })
    }

    fn require_owner(&self, business_id: Uuid, actor: Uuid) -> Result<(), AppError> {
        match self.businesses.owner_of(business_id) {
            Some(owner) if owner == actor => Ok(()),
            Some(_) => Err(AppError::Forbidden(
                "only the business owner can perform this action".to_string(),
            )),
            None => Err(AppError::NotFound(format!(
                "business {business_id} not found"
            ))),
        }
    }
}
