use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("order not eligible: {0}")]
    OrderNotEligible(String),

    #[error("rider unavailable: {0}")]
    RiderUnavailable(String),

    #[error("illegal transition: {0}")]
    IllegalTransition(String),

    #[error("stale status: {0}")]
    StaleStatus(String),

    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable machine-readable kind, carried next to the HTTP status so
    /// callers can tell the two 409 cases apart (retry vs. reject).
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden(_) => "forbidden",
            AppError::InvalidArgument(_) => "invalid_argument",
            AppError::OrderNotEligible(_) => "order_not_eligible",
            AppError::RiderUnavailable(_) => "rider_unavailable",
            AppError::IllegalTransition(_) => "illegal_transition",
            AppError::StaleStatus(_) => "stale_status",
            AppError::DependencyUnavailable(_) => "dependency_unavailable",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidArgument(_) | AppError::OrderNotEligible(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::RiderUnavailable(_)
            | AppError::IllegalTransition(_)
            | AppError::StaleStatus(_) => StatusCode::CONFLICT,
            AppError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}
