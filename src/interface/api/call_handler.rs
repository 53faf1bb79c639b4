//! Call record and inbound routing API handlers

use super::dto::{ApiResponse, CallResponse, RingStepRequest, RouteRequest};
use super::error::ApiError;
use super::state::AppState;
use crate::application::RoutingDecision;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::value_objects::{CallId, PartyId};
use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;
use uuid::Uuid;

pub async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("OK"))
}

/// Get call record by ID
pub async fn get_call(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CallResponse>>, ApiError> {
    let call_id = CallId::from_uuid(id);

    match state.store.get(call_id).await? {
        Some(record) => Ok(Json(ApiResponse::success(record.into()))),
        None => Err(DomainError::NotFound(format!("call {}", call_id)).into()),
    }
}

/// Route a ringing call through the callee's forwarding rules
pub async fn route_call(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RouteRequest>,
) -> Result<Json<ApiResponse<RoutingDecision>>, ApiError> {
    let call_id = CallId::from_uuid(id);
    info!("API: Routing call {}", call_id);

    let call = state
        .store
        .get(call_id)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("call {}", call_id)))?;

    let decision = state
        .inbound
        .route(
            &call,
            &request.rules,
            &request.context,
            request.ring_group.as_ref(),
            request.mode,
        )
        .await;

    Ok(Json(ApiResponse::success(decision)))
}

/// Ring the next sequential target after a decline or ring timeout
pub async fn advance_ring(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RingStepRequest>,
) -> Json<ApiResponse<Option<PartyId>>> {
    let next = state
        .inbound
        .advance(CallId::from_uuid(id), &request.plan, request.after_index)
        .await;
    Json(ApiResponse::success(next))
}
