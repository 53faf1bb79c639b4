//! Ring group API handlers

use super::dto::{ApiResponse, ExpandRequest, RingStepRequest};
use crate::domain::ring_group::{RingGroupManager, RingPlan};
use crate::domain::shared::value_objects::PartyId;
use axum::Json;

/// Expand a ring group into the plan for one mode
pub async fn expand_ring_group(Json(request): Json<ExpandRequest>) -> Json<ApiResponse<RingPlan>> {
    Json(ApiResponse::success(RingGroupManager::expand(
        &request.config,
        request.mode,
    )))
}

/// Next sequential target, or null when the plan is exhausted
pub async fn next_target(Json(request): Json<RingStepRequest>) -> Json<ApiResponse<Option<PartyId>>> {
    let next = RingGroupManager::next(&request.plan, request.after_index).cloned();
    Json(ApiResponse::success(next))
}
