use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::actor_id;
use crate::dispatch::{DeliveryRequest, TrackingView};
use crate::error::AppError;
use crate::geo::{Coordinate, TrafficClass};
use crate::models::delivery::{Delivery, DeliveryStatus, PackageSpec, PaymentMode, Waypoint};
use crate::models::rider::Rider;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/delivery/request", post(request_delivery))
        .route("/delivery/riders", get(find_riders))
        .route("/delivery/:id/track", get(track_delivery))
        .route("/delivery/:id/assign", post(assign_rider))
        .route("/delivery/:id/status", patch(update_status))
}

#[derive(Deserialize)]
pub struct RequestDeliveryBody {
    pub order_id: Uuid,
    pub pickup: Waypoint,
    pub dropoff: Waypoint,
    pub package: PackageSpec,
    pub payment_mode: PaymentMode,
    #[serde(default)]
    pub traffic: TrafficClass,
}

async fn request_delivery(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<RequestDeliveryBody>,
) -> Result<(StatusCode, Json<Delivery>), AppError> {
    let actor = actor_id(&headers)?;

    let delivery = state.dispatch.request_delivery(
        actor,
        DeliveryRequest {
            order_id: body.order_id,
            pickup: body.pickup,
            dropoff: body.dropoff,
            package: body.package,
            payment_mode: body.payment_mode,
            traffic: body.traffic,
        },
    )?;

    Ok((StatusCode::CREATED, Json(delivery)))
}

#[derive(Deserialize)]
pub struct FindRidersQuery {
    pub lat: f64,
    pub lng: f64,
    pub max_distance: Option<f64>,
    pub min_rating: Option<f64>,
}

async fn find_riders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FindRidersQuery>,
) -> Result<Json<Vec<Rider>>, AppError> {
    let riders = state.dispatch.find_candidate_riders(
        Coordinate {
            lat: query.lat,
            lng: query.lng,
        },
        query.max_distance,
        query.min_rating,
    )?;

    Ok(Json(riders))
}

/// Public tracker; no identity required.
async fn track_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<TrackingView>, AppError> {
    Ok(Json(state.dispatch.track(id)?))
}

#[derive(Deserialize)]
pub struct AssignRiderBody {
    pub rider_id: Uuid,
}

async fn assign_rider(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(body): Json<AssignRiderBody>,
) -> Result<Json<Delivery>, AppError> {
    let actor = actor_id(&headers)?;
    let delivery = state.dispatch.assign_rider(actor, id, body.rider_id)?;
    Ok(Json(delivery))
}

#[derive(Deserialize)]
pub struct UpdateStatusBody {
    pub expected_status: DeliveryStatus,
    pub status: DeliveryStatus,
    pub note: Option<String>,
    pub location: Option<Coordinate>,
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<Delivery>, AppError> {
    let actor = actor_id(&headers)?;
    let delivery = state.dispatch.advance_status(
        actor,
        id,
        body.expected_status,
        body.status,
        body.note,
        body.location,
    )?;
    Ok(Json(delivery))
}
