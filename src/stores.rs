use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{Business, Order, OrderStatus};

/// External collaborator boundary: order records live here so dispatch can
/// check eligibility and bind exactly one delivery per order.
pub struct OrderStore {
    orders: DashMap<Uuid, Order>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
        }
    }

    pub fn insert(
        &self,
        business_id: Uuid,
        status: OrderStatus,
        payable_amount: u64,
        customer_phone: String,
    ) -> Order {
        let order = Order {
            id: Uuid::new_v4(),
            business_id,
            status,
            payable_amount,
            customer_phone,
            delivery_id: None,
            created_at: Utc::now(),
        };
        self.orders.insert(order.id, order.clone());
        order
    }

    pub fn get(&self, order_id: Uuid) -> Option<Order> {
        self.orders.get(&order_id).map(|o| o.clone())
    }

    /// CAS gate for the one-delivery-per-order invariant: binds only if the
    /// order is confirmed and has no delivery yet.
    pub fn bind_delivery(&self, order_id: Uuid, delivery_id: u64) -> Result<Order, AppError> {
        let mut order = self
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

        if order.status != OrderStatus::Confirmed {
            return Err(AppError::OrderNotEligible(format!(
                "order {order_id} is {:?}, not confirmed",
                order.status
            )));
        }

        if let Some(existing) = order.delivery_id {
            return Err(AppError::OrderNotEligible(format!(
                "order {order_id} already has delivery {existing}"
            )));
        }

        order.delivery_id = Some(delivery_id);
        Ok(order.clone())
    }
}

impl Default for OrderStore {
    fn default() -> Self {
        Self::new()
    }
}

pub struct BusinessStore {
    businesses: DashMap<Uuid, Business>,
}

impl BusinessStore {
    pub fn new() -> Self {
        Self {
            businesses: DashMap::new(),
        }
    }

    pub fn insert(&self, name: String, owner_id: Uuid) -> Business {
        let business = Business {
            id: Uuid::new_v4(),
            name,
            owner_id,
            created_at: Utc::now(),
        };
        self.businesses.insert(business.id, business.clone());
        business
    }

    pub fn owner_of(&self, business_id: Uuid) -> Option<Uuid> {
        self.businesses.get(&business_id).map(|b| b.owner_id)
    }
}

impl Default for BusinessStore {
    fn default() -> Self {
        Self::new()
    }
}
