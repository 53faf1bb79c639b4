//! Control API DTOs

use crate::domain::call::{CallRecord, LifecycleState, MediaKind, TransferMetadata};
use crate::domain::call_forwarding::{EvaluationContext, ForwardingRule};
use crate::domain::ring_group::{RingGroupConfig, RingMode, RingPlan};
use crate::domain::shared::value_objects::{CallId, PartyId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }

    /// Error that still carries data the caller needs to reconcile
    pub fn failure(message: String, data: T) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(message),
        }
    }
}

/// Call record response
#[derive(Debug, Serialize, Deserialize)]
pub struct CallResponse {
    pub id: CallId,
    pub caller_identity: PartyId,
    pub receiver_identity: PartyId,
    pub media_kind: MediaKind,
    pub lifecycle_state: LifecycleState,
    pub created_at: DateTime<Utc>,
    pub connected_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub linked_call_id: Option<CallId>,
    pub transfer_metadata: Option<TransferMetadata>,
}

impl From<CallRecord> for CallResponse {
    fn from(record: CallRecord) -> Self {
        CallResponse {
            id: record.id(),
            caller_identity: record.caller_identity().clone(),
            receiver_identity: record.receiver_identity().clone(),
            media_kind: record.media_kind(),
            lifecycle_state: record.lifecycle_state(),
            created_at: record.created_at(),
            connected_at: record.connected_at(),
            ended_at: record.ended_at(),
            linked_call_id: record.linked_call_id(),
            transfer_metadata: record.transfer_metadata().cloned(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub rules: Vec<ForwardingRule>,
    pub context: EvaluationContext,
}

#[derive(Debug, Deserialize)]
pub struct RuleSetRequest {
    pub rules: Vec<ForwardingRule>,
}

/// Armed no-answer timer
#[derive(Debug, Serialize, Deserialize)]
pub struct NoAnswerResponse {
    pub rule: ForwardingRule,
    pub delay_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct ExpandRequest {
    pub config: RingGroupConfig,
    pub mode: RingMode,
}

/// A declined or timed-out position in a plan
#[derive(Debug, Deserialize)]
pub struct RingStepRequest {
    pub plan: RingPlan,
    pub after_index: usize,
}

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub rules: Vec<ForwardingRule>,
    pub context: EvaluationContext,
    #[serde(default)]
    pub ring_group: Option<RingGroupConfig>,
    #[serde(default = "default_ring_mode")]
    pub mode: RingMode,
}

fn default_ring_mode() -> RingMode {
    RingMode::Sequential
}

/// Blind or attended transfer request
#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub initiator: PartyId,
    pub target: PartyId,
    pub target_label: Option<String>,
}

/// Both sides of a half-finished operation
#[derive(Debug, Serialize, Deserialize)]
pub struct PartialFailureResponse {
    pub original_call_id: CallId,
    pub created_call_id: Option<CallId>,
}
