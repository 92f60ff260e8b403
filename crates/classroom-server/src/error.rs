//! HTTP mapping for classroom errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use classroom_coordination::ClassroomError;

/// A [`ClassroomError`] rendered as `{ "code", "error" }` with a matching status.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub ClassroomError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ClassroomError::NotFound { .. } => StatusCode::NOT_FOUND,
            ClassroomError::InvalidState { .. } | ClassroomError::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }
            ClassroomError::InvalidPhase { .. }
            | ClassroomError::InvalidChoice { .. }
            | ClassroomError::Validation(_) => StatusCode::BAD_REQUEST,
            ClassroomError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        let body = json!({
            "code": self.0.code(),
            "error": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
