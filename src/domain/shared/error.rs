//! Domain errors

use crate::domain::shared::value_objects::CallId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Referenced call record is absent
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Operation not permitted from the current phase or lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Record store call failed; callers may retry with backoff
    #[error("Record store unavailable: {0}")]
    StoreUnavailable(String),

    /// A multi-step operation completed some but not all of its steps
    #[error("Partial failure on call {original_call_id}: {message}")]
    PartialFailure {
        original_call_id: CallId,
        created_call_id: Option<CallId>,
        message: String,
    },

    /// Another transfer already owns this call
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl DomainError {
    /// Whether the caller should retry the operation with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::StoreUnavailable(_))
    }
}
