use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageSize {
    Small,
    Medium,
    Large,
    Xlarge,
}

impl PackageSize {
    pub fn size_fee(&self) -> u64 {
        match self {
            PackageSize::Small | PackageSize::Medium => 0,
            PackageSize::Large => 200,
            PackageSize::Xlarge => 500,
        }
    }
}

/// Immutable once the delivery is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSpec {
    pub size: PackageSize,
    pub weight_kg: Option<f64>,
    pub items: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMode {
    Prepaid,
    CashOnDelivery,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub base_fee: u64,
    pub distance_fee: u64,
    pub size_fee: u64,
    pub total: u64,
    pub payment_mode: PaymentMode,
    /// Cash the rider collects at dropoff; non-zero only for CashOnDelivery,
    /// where it equals the order's payable amount.
    pub cod_amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    pub estimated_pickup: DateTime<Utc>,
    pub actual_pickup: Option<DateTime<Utc>>,
    pub estimated_delivery: DateTime<Utc>,
    pub actual_delivery: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    Pending,
    Assigned,
    PickedUp,
    InTransit,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Assigned => "assigned",
            DeliveryStatus::PickedUp => "picked_up",
            DeliveryStatus::InTransit => "in_transit",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
        }
    }

    /// The allowed-transitions table. Everything not listed here is illegal,
    /// including any transition out of a terminal state.
    pub fn can_transition_to(&self, next: DeliveryStatus) -> bool {
        use DeliveryStatus::*;
        matches!(
            (self, next),
            (Pending, Assigned)
                | (Pending, Failed)
                | (Assigned, PickedUp)
                | (Assigned, Failed)
                | (PickedUp, InTransit)
                | (PickedUp, Failed)
                | (InTransit, Delivered)
                | (InTransit, Failed)
        )
    }
}

/// Append-only log entry; entries are never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: DeliveryStatus,
    pub note: Option<String>,
    pub location: Option<Coordinate>,
    pub at: DateTime<Utc>,
}

/// A pickup or dropoff point: coordinate plus the human-facing details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    pub coordinate: Coordinate,
    pub address: String,
    pub contact_name: String,
    pub contact_phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    /// Business-facing sequential id, allocated by the registry.
    pub id: u64,
    pub order_id: Uuid,
    pub business_id: Uuid,
    pub pickup: Waypoint,
    pub dropoff: Waypoint,
    pub package: PackageSpec,
    pub pricing: Pricing,
    pub timeline: Timeline,
    pub status: DeliveryStatus,
    pub updates: Vec<StatusUpdate>,
    /// Weak reference; the rider record lives in the directory.
    pub rider_id: Option<Uuid>,
    pub rating: Option<f64>,
    pub created_at: DateTime<Utc>,
}
