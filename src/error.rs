use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::store::StoreError;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    NotFound(String),
    /// The request clashes with stored state; `reasons` lists every cause.
    Conflict {
        message: String,
        reasons: Vec<String>,
    },
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::Conflict { message, reasons } => (
                StatusCode::CONFLICT,
                json!({ "error": message, "reasons": reasons }),
            ),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError::BadRequest(value.body_text())
    }
}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Validation(_) | StoreError::MalformedId { .. } => {
                ApiError::BadRequest(value.to_string())
            }
            StoreError::NotFound(_) => ApiError::NotFound(value.to_string()),
            StoreError::Rejected(rejection) => ApiError::Conflict {
                message: rejection.to_string(),
                reasons: rejection.messages(),
            },
            StoreError::Conflict(message) => ApiError::Conflict {
                reasons: vec![message.clone()],
                message,
            },
            StoreError::Backend(message) => {
                error!("Storage failure: {message}");
                ApiError::Internal(message)
            }
        }
    }
}
