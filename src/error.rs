use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("directions provider unavailable: {0}")]
    RouteUnavailable(String),

    #[error("pricing unavailable: {0}")]
    PricingUnavailable(String),

    #[error("no pricing rule configured; create one via POST /pricing/rules")]
    RuleNotConfigured,

    #[error("no complexity fee seeded for classification {0}")]
    FeeNotFound(String),

    #[error("pricing snapshot already exists for transport {0}")]
    SnapshotAlreadyExists(Uuid),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::RouteUnavailable(_) => "ROUTE_UNAVAILABLE",
            AppError::PricingUnavailable(_) => "PRICING_UNAVAILABLE",
            AppError::RuleNotConfigured => "RULE_NOT_CONFIGURED",
            AppError::FeeNotFound(_) => "FEE_NOT_FOUND",
            AppError::SnapshotAlreadyExists(_) => "SNAPSHOT_EXISTS",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::RouteUnavailable(_) | AppError::PricingUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::RuleNotConfigured => StatusCode::CONFLICT,
            AppError::FeeNotFound(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::SnapshotAlreadyExists(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}
