//! Call bounded context - call records and the ports call control drives

pub mod record;
pub mod repository;
pub mod signal;
pub mod value_object;

pub use record::{CallRecord, CallRecordPatch, NewCallRecord};
pub use repository::CallRecordStore;
pub use signal::SignalDispatcher;
pub use value_object::{LifecycleState, MediaKind, TransferMetadata, TransferType};
