// HTTP error responses: `{message}` for client errors, `{message, error}` for store failures.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Host ID is required")]
    MissingHostId,
    #[error("Instance not found")]
    NotFound,
    #[error("Unauthorized")]
    Unauthorized,
    /// Upstream message is passed through verbatim in `error`.
    #[error("{message}")]
    Store {
        message: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingHostId => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            ApiError::Store { message, source } => serde_json::json!({
                "message": message,
                "error": source.to_string(),
            }),
            other => serde_json::json!({ "message": other.to_string() }),
        };
        (self.status(), Json(body)).into_response()
    }
}
