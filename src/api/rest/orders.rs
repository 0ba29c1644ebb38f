use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::order::{Business, Order, OrderStatus};
use crate::state::AppState;

/// Thin seeding surface for the external collaborators (orders and
/// businesses live in the wider platform); enough to exercise dispatch
/// end to end.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/businesses", post(create_business))
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
}

#[derive(Deserialize)]
pub struct CreateBusinessRequest {
    pub name: String,
    pub owner_id: Uuid,
}

async fn create_business(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBusinessRequest>,
) -> Result<Json<Business>, AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::InvalidArgument("name cannot be empty".to_string()));
    }

    Ok(Json(state.businesses.insert(payload.name, payload.owner_id)))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub business_id: Uuid,
    #[serde(default = "default_order_status")]
    pub status: OrderStatus,
    pub payable_amount: u64,
    pub customer_phone: String,
}

fn default_order_status() -> OrderStatus {
    OrderStatus::Confirmed
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(state.orders.insert(
        payload.business_id,
        payload.status,
        payload.payable_amount,
        payload.customer_phone,
    )))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    Ok(Json(order))
}
