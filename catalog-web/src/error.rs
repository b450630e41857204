use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use catalog_core::CatalogError;
use serde_json::json;

/// Error body shared by every API route: `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        let status = match &err {
            CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
            CatalogError::Storage(_) | CatalogError::Unknown(_) => {
                tracing::error!("Catalog operation failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::BAD_REQUEST,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
