use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

/// The closed set of failures the core can surface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A referenced route/stop/run id does not exist.
    #[error("{0}")]
    NotFound(String),
    /// A run creation request violates a schedule consistency rule.
    #[error("{0}")]
    InvalidRunData(String),
    /// A route stop list references unknown stops.
    #[error("{0}")]
    InvalidTopology(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// JSON body attached to every non-2xx response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRunData(_) | AppError::InvalidTopology(_) => StatusCode::BAD_REQUEST,
            AppError::Database(e) => {
                tracing::error!(error = %e, "unexpected database failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
