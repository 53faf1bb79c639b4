//! Transfer Orchestrator
//!
//! Moves a connected call from one party to another. Blind transfers hand the
//! call off immediately; attended transfers hold the original, consult the
//! target on a separate voice call, and only then commit or cancel.
//!
//! The record store is not transactional across records, so every multi-step
//! operation orders its writes so that a failure part-way through is either
//! rolled back or reported as `DomainError::PartialFailure`.

use crate::domain::call::{
    CallRecord, CallRecordPatch, CallRecordStore, LifecycleState, MediaKind, NewCallRecord,
    SignalDispatcher, TransferMetadata, TransferType,
};
use crate::domain::clock::Clock;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::{CallId, PartyId};
use crate::domain::transfer::session::{TransferPhase, TransferSession};
use metrics::counter;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

fn record_transfer(transfer_type: TransferType, outcome: &'static str) {
    counter!(
        "call_transfers_total",
        "type" => transfer_type.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Drives blind and attended transfers over the record store.
///
/// Holds the registry of in-flight attended transfers, keyed by original
/// call, which guarantees at most one session per call.
pub struct TransferOrchestrator {
    store: Arc<dyn CallRecordStore>,
    dispatcher: Arc<dyn SignalDispatcher>,
    clock: Arc<dyn Clock>,
    /// Active sessions (original call id -> session)
    sessions: Arc<RwLock<HashMap<CallId, TransferSession>>>,
    /// Original calls with a blind transfer under way. Only touched while
    /// the `sessions` write lock is held, so the two stay consistent.
    blind_in_flight: Arc<Mutex<HashSet<CallId>>>,
}

/// Holds a call in `blind_in_flight` until dropped
struct BlindReservation {
    calls: Arc<Mutex<HashSet<CallId>>>,
    call_id: CallId,
}

impl Drop for BlindReservation {
    fn drop(&mut self) {
        lock_calls(&self.calls).remove(&self.call_id);
    }
}

fn lock_calls(calls: &Mutex<HashSet<CallId>>) -> std::sync::MutexGuard<'_, HashSet<CallId>> {
    calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TransferOrchestrator {
    pub fn new(
        store: Arc<dyn CallRecordStore>,
        dispatcher: Arc<dyn SignalDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            clock,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            blind_in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Hand `original_call_id` off to `target` without consulting them.
    ///
    /// The party that is not `initiator` becomes the caller of a new ringing
    /// call to `target`; the original ends as `transferred`.
    pub async fn blind_transfer(
        &self,
        original_call_id: CallId,
        initiator: &PartyId,
        target: &PartyId,
        target_label: Option<&str>,
    ) -> Result<CallRecord> {
        info!(
            "Blind transfer of call {} by {} to {} ({})",
            original_call_id,
            initiator,
            target,
            target_label.unwrap_or("-")
        );

        let _reservation = self.reserve_blind(original_call_id).await?;

        let original = self.fetch(original_call_id).await?;
        if !original.lifecycle_state().is_connected() {
            return Err(DomainError::InvalidState(format!(
                "call {} is {}, only connected calls can be transferred",
                original_call_id,
                original.lifecycle_state()
            )));
        }
        let transfer_from = original.other_party(initiator)?.clone();

        let now = self.clock.now();
        let new_call = self
            .store
            .create(NewCallRecord::ringing(
                transfer_from.clone(),
                target.clone(),
                original.media_kind(),
                now,
            ))
            .await?;
        debug!("Created call {} for blind transfer", new_call.id());

        let close = CallRecordPatch::transferred(
            now,
            TransferMetadata::new(target.clone(), TransferType::Blind),
        );
        if let Err(e) = self.store.update(original_call_id, close).await {
            error!(
                "Blind transfer of call {} created call {} but could not close the original: {}",
                original_call_id,
                new_call.id(),
                e
            );
            record_transfer(TransferType::Blind, "partial_failure");
            return Err(DomainError::PartialFailure {
                original_call_id,
                created_call_id: Some(new_call.id()),
                message: format!("original call not marked transferred: {}", e),
            });
        }

        self.dispatcher.ring(target, new_call.id()).await;
        self.dispatcher
            .notify_transferred(&transfer_from, new_call.id())
            .await;

        record_transfer(TransferType::Blind, "completed");
        info!(
            "Call {} blind transferred: {} -> {} on call {}",
            original_call_id,
            transfer_from,
            target,
            new_call.id()
        );
        Ok(new_call)
    }

    /// Hold the original call and ring `target` on a voice consult call.
    ///
    /// If the consult call cannot be created the original is resumed before
    /// the error is returned.
    pub async fn start_attended_transfer(
        &self,
        original_call_id: CallId,
        initiator: &PartyId,
        target: &PartyId,
        target_label: Option<String>,
    ) -> Result<TransferSession> {
        info!(
            "Starting attended transfer of call {} by {} to {}",
            original_call_id, initiator, target
        );

        let mut session = TransferSession::new(
            original_call_id,
            initiator.clone(),
            target.clone(),
            target_label,
            self.clock.now(),
        );
        session.advance(TransferPhase::Consulting)?;

        {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&original_call_id)
                || lock_calls(&self.blind_in_flight).contains(&original_call_id)
            {
                return Err(DomainError::Conflict(format!(
                    "transfer already in progress for call {}",
                    original_call_id
                )));
            }
            sessions.insert(original_call_id, session.clone());
        }

        let consult = match self.open_consult(&session).await {
            Ok(consult) => consult,
            Err(e) => {
                self.sessions.write().await.remove(&original_call_id);
                warn!(
                    "Attended transfer of call {} failed to start: {}",
                    original_call_id, e
                );
                return Err(e);
            }
        };

        session.consult_call_id = Some(consult.id());
        if let Some(entry) = self.sessions.write().await.get_mut(&original_call_id) {
            entry.consult_call_id = Some(consult.id());
        }

        self.dispatcher.ring(target, consult.id()).await;

        info!(
            "Call {} on hold, consulting {} on call {}",
            original_call_id,
            target,
            consult.id()
        );
        Ok(session)
    }

    /// Commit a consulting transfer: the held party is connected straight to
    /// the target on a new active call and the original ends as
    /// `transferred`.
    pub async fn complete_attended_transfer(&self, session: &TransferSession) -> Result<CallRecord> {
        let session = self.claim(session, TransferPhase::Committing).await?;
        let original_call_id = session.original_call_id;
        let now = self.clock.now();

        let prepared = async {
            let original = self.fetch(original_call_id).await?;
            if original.lifecycle_state() != LifecycleState::Held {
                return Err(DomainError::InvalidState(format!(
                    "call {} is {}, expected held while consulting",
                    original_call_id,
                    original.lifecycle_state()
                )));
            }
            let transfer_from = original.other_party(&session.initiator_identity)?.clone();

            let replacement = self
                .store
                .create(
                    NewCallRecord::active(
                        transfer_from.clone(),
                        session.target_identity.clone(),
                        original.media_kind(),
                        now,
                    )
                    .linked_to(original_call_id),
                )
                .await?;
            Ok::<_, DomainError>((transfer_from, replacement))
        }
        .await;

        let (transfer_from, replacement) = match prepared {
            Ok(prepared) => prepared,
            Err(e) => {
                self.release(original_call_id).await;
                warn!("Could not complete transfer of call {}: {}", original_call_id, e);
                return Err(e);
            }
        };

        // The replacement call exists: no going back from here
        self.sessions.write().await.remove(&original_call_id);

        let close = CallRecordPatch::transferred(
            now,
            TransferMetadata::new(session.target_identity.clone(), TransferType::Attended),
        );
        if let Err(e) = self.store.update(original_call_id, close).await {
            error!(
                "Attended transfer of call {} created call {} but could not close the original: {}",
                original_call_id,
                replacement.id(),
                e
            );
            record_transfer(TransferType::Attended, "partial_failure");
            return Err(DomainError::PartialFailure {
                original_call_id,
                created_call_id: Some(replacement.id()),
                message: format!("original call not marked transferred: {}", e),
            });
        }

        self.dispatcher
            .notify_transferred(&session.target_identity, replacement.id())
            .await;
        self.dispatcher
            .notify_transferred(&transfer_from, replacement.id())
            .await;

        record_transfer(TransferType::Attended, "completed");
        info!(
            "Call {} attended transferred: {} -> {} on call {}",
            original_call_id,
            transfer_from,
            session.target_identity,
            replacement.id()
        );
        Ok(replacement)
    }

    /// Abandon a consulting transfer and resume the original call. The
    /// consult call is left to end on its own.
    pub async fn cancel_attended_transfer(&self, session: &TransferSession) -> Result<()> {
        let session = self.claim(session, TransferPhase::Cancelling).await?;
        let original_call_id = session.original_call_id;

        let original = match self.fetch(original_call_id).await {
            Ok(original) => original,
            Err(e @ DomainError::NotFound(_)) => {
                self.sessions.write().await.remove(&original_call_id);
                return Err(e);
            }
            Err(e) => {
                self.release(original_call_id).await;
                return Err(e);
            }
        };

        match original.lifecycle_state() {
            LifecycleState::Held => {
                if let Err(e) = self
                    .store
                    .update(original_call_id, CallRecordPatch::state(LifecycleState::Active))
                    .await
                {
                    self.release(original_call_id).await;
                    warn!("Could not resume call {}: {}", original_call_id, e);
                    return Err(e);
                }
            }
            LifecycleState::Active => {}
            state => {
                self.sessions.write().await.remove(&original_call_id);
                return Err(DomainError::InvalidState(format!(
                    "call {} is already {}, nothing to resume",
                    original_call_id, state
                )));
            }
        }

        self.sessions.write().await.remove(&original_call_id);
        record_transfer(TransferType::Attended, "cancelled");
        info!("Attended transfer of call {} cancelled, call resumed", original_call_id);
        Ok(())
    }

    /// Cancel consulting sessions that started at least `max_age` ago.
    /// Returns the original calls that were resumed.
    pub async fn cancel_abandoned(&self, max_age: chrono::Duration) -> Vec<CallId> {
        let now = self.clock.now();
        let stale: Vec<TransferSession> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| {
                s.phase == TransferPhase::Consulting
                    && s.consult_call_id.is_some()
                    && s.started_at + max_age <= now
            })
            .cloned()
            .collect();

        let mut resumed = Vec::new();
        for session in stale {
            match self.cancel_attended_transfer(&session).await {
                Ok(()) => {
                    record_transfer(TransferType::Attended, "abandoned");
                    resumed.push(session.original_call_id);
                }
                Err(e) => {
                    warn!(
                        "Failed to cancel abandoned transfer of call {}: {}",
                        session.original_call_id, e
                    );
                }
            }
        }

        if !resumed.is_empty() {
            info!("Cancelled {} abandoned transfer(s)", resumed.len());
        }
        resumed
    }

    /// Current session for an original call
    pub async fn session(&self, original_call_id: CallId) -> Option<TransferSession> {
        self.sessions.read().await.get(&original_call_id).cloned()
    }

    pub async fn active_sessions(&self) -> Vec<TransferSession> {
        self.sessions.read().await.values().cloned().collect()
    }

    /// Claim `original_call_id` for a blind transfer; released when the
    /// returned reservation is dropped, on every exit path
    async fn reserve_blind(&self, original_call_id: CallId) -> Result<BlindReservation> {
        let sessions = self.sessions.write().await;
        let mut in_flight = lock_calls(&self.blind_in_flight);
        if sessions.contains_key(&original_call_id) || !in_flight.insert(original_call_id) {
            return Err(DomainError::Conflict(format!(
                "transfer already in progress for call {}",
                original_call_id
            )));
        }

        Ok(BlindReservation {
            calls: self.blind_in_flight.clone(),
            call_id: original_call_id,
        })
    }

    async fn fetch(&self, id: CallId) -> Result<CallRecord> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("call {}", id)))
    }

    /// Take ownership of a registered session by moving it to `next`
    async fn claim(&self, handle: &TransferSession, next: TransferPhase) -> Result<TransferSession> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(&handle.original_call_id)
            .filter(|entry| entry.id == handle.id)
            .ok_or_else(|| {
                DomainError::InvalidState(format!(
                    "no transfer session {} for call {}",
                    handle.id, handle.original_call_id
                ))
            })?;

        if entry.consult_call_id.is_none() {
            return Err(DomainError::InvalidState(format!(
                "transfer of call {} is still starting",
                handle.original_call_id
            )));
        }

        entry.advance(next)?;
        Ok(entry.clone())
    }

    /// Put a claimed session back to consulting after a recoverable failure
    async fn release(&self, original_call_id: CallId) {
        if let Some(entry) = self.sessions.write().await.get_mut(&original_call_id) {
            if let Err(e) = entry.advance(TransferPhase::Consulting) {
                warn!("Could not release transfer of call {}: {}", original_call_id, e);
            }
        }
    }

    async fn open_consult(&self, session: &TransferSession) -> Result<CallRecord> {
        let original_call_id = session.original_call_id;
        let original = self.fetch(original_call_id).await?;
        if original.lifecycle_state() != LifecycleState::Active {
            return Err(DomainError::InvalidState(format!(
                "call {} is {}, only active calls can start an attended transfer",
                original_call_id,
                original.lifecycle_state()
            )));
        }
        original.other_party(&session.initiator_identity)?;

        self.store
            .update(original_call_id, CallRecordPatch::state(LifecycleState::Held))
            .await?;

        // Consult calls are always voice, whatever the original carries
        let consult = NewCallRecord::ringing(
            session.initiator_identity.clone(),
            session.target_identity.clone(),
            MediaKind::Voice,
            self.clock.now(),
        )
        .linked_to(original_call_id);

        match self.store.create(consult).await {
            Ok(consult) => Ok(consult),
            Err(create_err) => {
                warn!(
                    "Consult call for {} failed ({}), resuming original",
                    original_call_id, create_err
                );
                match self
                    .store
                    .update(original_call_id, CallRecordPatch::state(LifecycleState::Active))
                    .await
                {
                    Ok(_) => Err(create_err),
                    Err(resume_err) => {
                        error!(
                            "Call {} left on hold: consult failed ({}) and resume failed ({})",
                            original_call_id, create_err, resume_err
                        );
                        Err(DomainError::PartialFailure {
                            original_call_id,
                            created_call_id: None,
                            message: format!(
                                "consult call failed ({}) and original could not be resumed ({})",
                                create_err, resume_err
                            ),
                        })
                    }
                }
            }
        }
    }
}
