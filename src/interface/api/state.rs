//! Shared handler state

use crate::application::InboundCallRouter;
use crate::config::ForwardingSettings;
use crate::domain::call::CallRecordStore;
use crate::domain::transfer::TransferOrchestrator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CallRecordStore>,
    pub orchestrator: Arc<TransferOrchestrator>,
    pub inbound: Arc<InboundCallRouter>,
    pub forwarding: ForwardingSettings,
}
