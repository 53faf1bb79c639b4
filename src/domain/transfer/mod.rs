//! Transfer bounded context - blind and attended call transfer

pub mod orchestrator;
pub mod session;

pub use orchestrator::TransferOrchestrator;
pub use session::{TransferPhase, TransferSession};
