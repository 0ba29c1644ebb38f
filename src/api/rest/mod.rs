pub mod deliveries;
pub mod orders;
pub mod riders;
pub mod ws;

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(deliveries::router())
        .merge(riders::router())
        .merge(orders::router())
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Caller identity for authorization checks; the surrounding platform
/// authenticates and forwards the subject id in this header.
pub fn actor_id(headers: &HeaderMap) -> Result<Uuid, AppError> {
    headers
        .get("x-actor-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.parse::<Uuid>().ok())
        .ok_or_else(|| AppError::Forbidden("missing or invalid x-actor-id header".to_string()))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    riders: usize,
    deliveries: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        riders: state.directory.len(),
        deliveries: state.registry.len(),
    })
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err).into_response(),
    }
}
