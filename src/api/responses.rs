//! Standardized API response envelope: `ApiResponse<T>`/`ApiError`/`FieldError`
//! mapped onto the scheduler's own error taxonomy.

use crate::error::SchedulerError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, request_id: Option<String>) -> Self {
        Self { success: true, data: Some(data), error: None, timestamp: chrono::Utc::now(), request_id }
    }
}

impl ApiError {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self { code: code.to_string(), message: message.into() }
    }
}

/// Maps `SchedulerError`'s taxonomy onto HTTP status codes, one arm per
/// kind named in the error handling design: validation and conflict are
/// client-caused (4xx); not-found is its own 404; persistent/internal
/// failures and a component still hydrating are server-caused (5xx/503).
pub struct ApiFailure(pub StatusCode, pub ApiError);

impl From<SchedulerError> for ApiFailure {
    fn from(err: SchedulerError) -> Self {
        let (status, code) = match &err {
            SchedulerError::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            SchedulerError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            SchedulerError::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
            SchedulerError::TransientUpstream { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "TRANSIENT_UPSTREAM_ERROR")
            }
            SchedulerError::PersistentUpstream { .. } => {
                (StatusCode::BAD_GATEWAY, "PERSISTENT_UPSTREAM_ERROR")
            }
            SchedulerError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            SchedulerError::Configuration { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CONFIGURATION_ERROR")
            }
            SchedulerError::Persistence { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR"),
            SchedulerError::Queue { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "QUEUE_ERROR"),
            SchedulerError::NotReady { .. } => (StatusCode::SERVICE_UNAVAILABLE, "NOT_READY"),
        };
        ApiFailure(status, ApiError::new(code, err.to_string()))
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body: ApiResponse<()> = ApiResponse {
            success: false,
            data: None,
            error: Some(self.1),
            timestamp: chrono::Utc::now(),
            request_id: None,
        };
        (self.0, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiFailure>;

pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data, None)))
}

pub fn ok_created<T: Serialize>(data: T) -> Result<(StatusCode, Json<ApiResponse<T>>), ApiFailure> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data, None))))
}
