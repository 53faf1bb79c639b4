//! Call record entity

use crate::domain::call::value_object::{LifecycleState, MediaKind, TransferMetadata};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{CallId, PartyId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted record of a single call leg between two parties.
///
/// Records live in the external record store. Every adapter funnels updates
/// through [`CallRecord::apply`], so the lifecycle rules hold no matter which
/// backend is configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub(crate) id: CallId,
    pub(crate) caller_identity: PartyId,
    pub(crate) receiver_identity: PartyId,
    pub(crate) media_kind: MediaKind,
    pub(crate) lifecycle_state: LifecycleState,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) connected_at: Option<DateTime<Utc>>,
    pub(crate) ended_at: Option<DateTime<Utc>>,
    pub(crate) linked_call_id: Option<CallId>,
    pub(crate) transfer_metadata: Option<TransferMetadata>,
}

impl CallRecord {
    /// Materialize a new record once the store has assigned its id
    pub fn from_new(id: CallId, new: NewCallRecord) -> Self {
        Self {
            id,
            caller_identity: new.caller_identity,
            receiver_identity: new.receiver_identity,
            media_kind: new.media_kind,
            lifecycle_state: new.lifecycle_state,
            created_at: new.created_at,
            connected_at: new.connected_at,
            ended_at: None,
            linked_call_id: new.linked_call_id,
            transfer_metadata: None,
        }
    }

    /// Apply a patch, enforcing forward-only lifecycle moves and write-once
    /// transfer metadata. Nothing is changed if the patch is rejected.
    pub fn apply(&mut self, patch: &CallRecordPatch) -> Result<()> {
        let next_state = patch.lifecycle_state.unwrap_or(self.lifecycle_state);

        if let Some(next) = patch.lifecycle_state {
            if !self.lifecycle_state.can_transition_to(next) {
                return Err(DomainError::InvalidState(format!(
                    "call {} cannot move from {} to {}",
                    self.id, self.lifecycle_state, next
                )));
            }
        }

        if patch.transfer_metadata.is_some() {
            if self.transfer_metadata.is_some() {
                return Err(DomainError::InvalidState(format!(
                    "call {} already carries transfer metadata",
                    self.id
                )));
            }
            if next_state != LifecycleState::Transferred {
                return Err(DomainError::InvalidState(format!(
                    "transfer metadata requires call {} to end as transferred",
                    self.id
                )));
            }
        }

        self.lifecycle_state = next_state;
        if let Some(connected_at) = patch.connected_at {
            self.connected_at = Some(connected_at);
        }
        if let Some(ended_at) = patch.ended_at {
            self.ended_at = Some(ended_at);
        }
        if let Some(ref metadata) = patch.transfer_metadata {
            self.transfer_metadata = Some(metadata.clone());
        }

        Ok(())
    }

    /// The party on this call that is not `initiator`
    pub fn other_party(&self, initiator: &PartyId) -> Result<&PartyId> {
        if *initiator == self.caller_identity {
            Ok(&self.receiver_identity)
        } else if *initiator == self.receiver_identity {
            Ok(&self.caller_identity)
        } else {
            Err(DomainError::InvalidState(format!(
                "{} is not a party on call {}",
                initiator, self.id
            )))
        }
    }

    // Getters
    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn caller_identity(&self) -> &PartyId {
        &self.caller_identity
    }

    pub fn receiver_identity(&self) -> &PartyId {
        &self.receiver_identity
    }

    pub fn media_kind(&self) -> MediaKind {
        self.media_kind
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle_state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn connected_at(&self) -> Option<DateTime<Utc>> {
        self.connected_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn linked_call_id(&self) -> Option<CallId> {
        self.linked_call_id
    }

    pub fn transfer_metadata(&self) -> Option<&TransferMetadata> {
        self.transfer_metadata.as_ref()
    }
}

/// Everything a record needs except the id the store assigns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCallRecord {
    pub caller_identity: PartyId,
    pub receiver_identity: PartyId,
    pub media_kind: MediaKind,
    pub lifecycle_state: LifecycleState,
    pub created_at: DateTime<Utc>,
    pub connected_at: Option<DateTime<Utc>>,
    pub linked_call_id: Option<CallId>,
}

impl NewCallRecord {
    /// A call that starts out alerting the receiver
    pub fn ringing(
        caller_identity: PartyId,
        receiver_identity: PartyId,
        media_kind: MediaKind,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            caller_identity,
            receiver_identity,
            media_kind,
            lifecycle_state: LifecycleState::Ringing,
            created_at,
            connected_at: None,
            linked_call_id: None,
        }
    }

    /// A call that is connected from the moment it is recorded
    pub fn active(
        caller_identity: PartyId,
        receiver_identity: PartyId,
        media_kind: MediaKind,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            lifecycle_state: LifecycleState::Active,
            connected_at: Some(created_at),
            ..Self::ringing(caller_identity, receiver_identity, media_kind, created_at)
        }
    }

    pub fn linked_to(mut self, call_id: CallId) -> Self {
        self.linked_call_id = Some(call_id);
        self
    }
}

/// Partial update sent to the record store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecordPatch {
    pub lifecycle_state: Option<LifecycleState>,
    pub connected_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub transfer_metadata: Option<TransferMetadata>,
}

impl CallRecordPatch {
    pub fn state(lifecycle_state: LifecycleState) -> Self {
        Self {
            lifecycle_state: Some(lifecycle_state),
            ..Default::default()
        }
    }

    /// Close a record because it was handed off
    pub fn transferred(ended_at: DateTime<Utc>, metadata: TransferMetadata) -> Self {
        Self {
            lifecycle_state: Some(LifecycleState::Transferred),
            ended_at: Some(ended_at),
            transfer_metadata: Some(metadata),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::call::value_object::TransferType;

    fn create_test_record() -> CallRecord {
        let new = NewCallRecord::active(
            PartyId::from("userA"),
            PartyId::from("userC"),
            MediaKind::Video,
            Utc::now(),
        );
        CallRecord::from_new(CallId::new(), new)
    }

    #[test]
    fn test_call_record_lifecycle() {
        let mut record = create_test_record();
        assert_eq!(record.lifecycle_state(), LifecycleState::Active);
        assert!(record.connected_at().is_some());

        record.apply(&CallRecordPatch::state(LifecycleState::Held)).unwrap();
        assert_eq!(record.lifecycle_state(), LifecycleState::Held);

        record.apply(&CallRecordPatch::state(LifecycleState::Active)).unwrap();

        let metadata = TransferMetadata::new(PartyId::from("userB"), TransferType::Blind);
        record
            .apply(&CallRecordPatch::transferred(Utc::now(), metadata.clone()))
            .unwrap();
        assert_eq!(record.lifecycle_state(), LifecycleState::Transferred);
        assert!(record.ended_at().is_some());
        assert_eq!(record.transfer_metadata(), Some(&metadata));
    }

    #[test]
    fn test_rejected_patch_leaves_record_untouched() {
        let mut record = create_test_record();
        record.apply(&CallRecordPatch::state(LifecycleState::Ended)).unwrap();
        let before = record.clone();

        let result = record.apply(&CallRecordPatch::state(LifecycleState::Active));
        assert!(matches!(result, Err(DomainError::InvalidState(_))));
        assert_eq!(record, before);
    }

    #[test]
    fn test_transfer_metadata_requires_transferred_state() {
        let mut record = create_test_record();
        let patch = CallRecordPatch {
            transfer_metadata: Some(TransferMetadata::new(
                PartyId::from("userB"),
                TransferType::Attended,
            )),
            ..Default::default()
        };

        assert!(record.apply(&patch).is_err());
        assert!(record.transfer_metadata().is_none());
    }

    #[test]
    fn test_other_party() {
        let record = create_test_record();
        assert_eq!(record.other_party(&PartyId::from("userA")).unwrap().as_str(), "userC");
        assert_eq!(record.other_party(&PartyId::from("userC")).unwrap().as_str(), "userA");
        assert!(record.other_party(&PartyId::from("mallory")).is_err());
    }
}
