//! Signal dispatcher implementations

pub mod broadcast;

pub use broadcast::{BroadcastSignalDispatcher, CallSignal};
