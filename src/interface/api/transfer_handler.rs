//! Transfer API handlers

use super::dto::{ApiResponse, CallResponse, TransferRequest};
use super::error::ApiError;
use super::state::AppState;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::value_objects::CallId;
use crate::domain::transfer::TransferSession;
use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;
use uuid::Uuid;

/// Blind transfer
pub async fn blind_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<ApiResponse<CallResponse>>, ApiError> {
    let call_id = CallId::from_uuid(id);
    info!("API: Blind transfer of call {} to {}", call_id, request.target);

    let new_call = state
        .orchestrator
        .blind_transfer(
            call_id,
            &request.initiator,
            &request.target,
            request.target_label.as_deref(),
        )
        .await?;

    Ok(Json(ApiResponse::success(new_call.into())))
}

/// Start an attended transfer
pub async fn start_attended_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<ApiResponse<TransferSession>>, ApiError> {
    let call_id = CallId::from_uuid(id);
    info!("API: Attended transfer of call {} to {}", call_id, request.target);

    let session = state
        .orchestrator
        .start_attended_transfer(call_id, &request.initiator, &request.target, request.target_label)
        .await?;

    Ok(Json(ApiResponse::success(session)))
}

/// Attended transfer currently in flight for a call
pub async fn get_attended_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TransferSession>>, ApiError> {
    let session = current_session(&state, CallId::from_uuid(id)).await?;
    Ok(Json(ApiResponse::success(session)))
}

/// Complete an attended transfer
pub async fn complete_attended_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CallResponse>>, ApiError> {
    let session = current_session(&state, CallId::from_uuid(id)).await?;
    let replacement = state.orchestrator.complete_attended_transfer(&session).await?;
    Ok(Json(ApiResponse::success(replacement.into())))
}

/// Cancel an attended transfer and return to the original call
pub async fn cancel_attended_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    let session = current_session(&state, CallId::from_uuid(id)).await?;
    state.orchestrator.cancel_attended_transfer(&session).await?;
    Ok(Json(ApiResponse::success("cancelled")))
}

async fn current_session(state: &AppState, call_id: CallId) -> Result<TransferSession, ApiError> {
    state.orchestrator.session(call_id).await.ok_or_else(|| {
        ApiError(DomainError::NotFound(format!(
            "no attended transfer for call {}",
            call_id
        )))
    })
}
