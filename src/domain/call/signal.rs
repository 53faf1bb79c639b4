//! Signal dispatcher interface

use crate::domain::shared::value_objects::{CallId, PartyId};
use async_trait::async_trait;

/// Delivers call signals to parties.
///
/// Fire-and-forget: delivery failures are logged by the implementation and
/// never retried by call control.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalDispatcher: Send + Sync {
    /// Alert `target` that `call_id` is ringing for them
    async fn ring(&self, target: &PartyId, call_id: CallId);

    /// Tell `target` that they are now on `call_id` because of a transfer
    async fn notify_transferred(&self, target: &PartyId, call_id: CallId);
}
