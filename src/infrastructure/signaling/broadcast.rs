/// In-process signal fan-out over a tokio broadcast channel
use crate::domain::call::SignalDispatcher;
use crate::domain::shared::value_objects::{CallId, PartyId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Signal addressed to one party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallSignal {
    /// The party is being alerted about a call
    Ring {
        target: PartyId,
        call_id: CallId,
        timestamp: i64,
    },
    /// The party now sits on a call created by a transfer
    Transferred {
        target: PartyId,
        call_id: CallId,
        timestamp: i64,
    },
}

impl CallSignal {
    pub fn target(&self) -> &PartyId {
        match self {
            CallSignal::Ring { target, .. } | CallSignal::Transferred { target, .. } => target,
        }
    }

    pub fn call_id(&self) -> CallId {
        match self {
            CallSignal::Ring { call_id, .. } | CallSignal::Transferred { call_id, .. } => *call_id,
        }
    }
}

/// Publishes call signals to every subscriber. Transport adapters subscribe
/// and deliver to the addressed party.
pub struct BroadcastSignalDispatcher {
    tx: broadcast::Sender<CallSignal>,
}

impl BroadcastSignalDispatcher {
    /// Create new dispatcher with specified capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to signals
    pub fn subscribe(&self) -> broadcast::Receiver<CallSignal> {
        self.tx.subscribe()
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn publish(&self, signal: CallSignal) {
        debug!("Signal {:?}", signal);
        if let Err(e) = self.tx.send(signal) {
            // Fire-and-forget: nobody is listening for this party
            warn!(
                "Signal for {} on call {} not delivered: no subscribers",
                e.0.target(),
                e.0.call_id()
            );
        }
    }
}

impl Default for BroadcastSignalDispatcher {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl SignalDispatcher for BroadcastSignalDispatcher {
    async fn ring(&self, target: &PartyId, call_id: CallId) {
        self.publish(CallSignal::Ring {
            target: target.clone(),
            call_id,
            timestamp: chrono::Utc::now().timestamp(),
        });
    }

    async fn notify_transferred(&self, target: &PartyId, call_id: CallId) {
        self.publish(CallSignal::Transferred {
            target: target.clone(),
            call_id,
            timestamp: chrono::Utc::now().timestamp(),
        });
    }
}
