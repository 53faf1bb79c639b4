//! Domain error to HTTP response mapping

use super::dto::{ApiResponse, PartialFailureResponse};
use crate::domain::shared::error::DomainError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

/// Handler error wrapping a [`DomainError`]
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::InvalidState(_) | DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::ValidationError(_) => StatusCode::BAD_REQUEST,
            DomainError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::PartialFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("API: {}", self.0);
        } else {
            warn!("API: {}", self.0);
        }

        let message = self.0.to_string();
        match self.0 {
            DomainError::PartialFailure {
                original_call_id,
                created_call_id,
                ..
            } => {
                let body = PartialFailureResponse {
                    original_call_id,
                    created_call_id,
                };
                (status, Json(ApiResponse::failure(message, body))).into_response()
            }
            _ => (status, Json(ApiResponse::<()>::error(message))).into_response(),
        }
    }
}
