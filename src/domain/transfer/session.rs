//! Attended transfer session

use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{CallId, PartyId, TransferSessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of an attended transfer. Committed and cancelled sessions are
/// destroyed rather than kept in a terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPhase {
    Idle,
    /// Original held, consult call offered to the target
    Consulting,
    /// Handoff in progress
    Committing,
    /// Returning to the original call
    Cancelling,
}

impl TransferPhase {
    /// `Committing`/`Cancelling` may fall back to `Consulting` when the step
    /// fails before anything irreversible happened.
    pub fn can_transition_to(&self, next: TransferPhase) -> bool {
        use TransferPhase::*;

        matches!(
            (self, next),
            (Idle, Consulting)
                | (Consulting, Committing)
                | (Consulting, Cancelling)
                | (Committing, Consulting)
                | (Cancelling, Consulting)
        )
    }
}

impl fmt::Display for TransferPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransferPhase::Idle => "idle",
            TransferPhase::Consulting => "consulting",
            TransferPhase::Committing => "committing",
            TransferPhase::Cancelling => "cancelling",
        };
        f.write_str(name)
    }
}

/// Coordination handle over the original and consult call records of one
/// attended transfer. Process-local; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferSession {
    pub id: TransferSessionId,
    pub original_call_id: CallId,
    /// Set once the consult call has been created
    pub consult_call_id: Option<CallId>,
    pub initiator_identity: PartyId,
    pub target_identity: PartyId,
    pub target_label: Option<String>,
    pub phase: TransferPhase,
    pub started_at: DateTime<Utc>,
}

impl TransferSession {
    pub fn new(
        original_call_id: CallId,
        initiator_identity: PartyId,
        target_identity: PartyId,
        target_label: Option<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransferSessionId::new(),
            original_call_id,
            consult_call_id: None,
            initiator_identity,
            target_identity,
            target_label,
            phase: TransferPhase::Idle,
            started_at,
        }
    }

    /// Move to `next`, rejecting anything the phase table does not allow
    pub fn advance(&mut self, next: TransferPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(DomainError::InvalidState(format!(
                "transfer of call {} is {}, cannot move to {}",
                self.original_call_id, self.phase, next
            )));
        }

        self.phase = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_session() -> TransferSession {
        TransferSession::new(
            CallId::new(),
            PartyId::from("userA"),
            PartyId::from("userB"),
            Some("Bob".to_string()),
            Utc::now(),
        )
    }

    #[test]
    fn test_session_phase_flow() {
        let mut session = create_test_session();
        assert_eq!(session.phase, TransferPhase::Idle);

        session.advance(TransferPhase::Consulting).unwrap();
        session.advance(TransferPhase::Committing).unwrap();
        // failed before the point of no return
        session.advance(TransferPhase::Consulting).unwrap();
        session.advance(TransferPhase::Cancelling).unwrap();
        assert_eq!(session.phase, TransferPhase::Cancelling);
    }

    #[test]
    fn test_commit_and_cancel_need_consulting() {
        let mut session = create_test_session();
        assert!(session.advance(TransferPhase::Committing).is_err());
        assert!(session.advance(TransferPhase::Cancelling).is_err());

        session.advance(TransferPhase::Consulting).unwrap();
        session.advance(TransferPhase::Committing).unwrap();
        let result = session.advance(TransferPhase::Cancelling);
        assert!(matches!(result, Err(DomainError::InvalidState(_))));
        assert_eq!(session.phase, TransferPhase::Committing);
    }
}
