//! Infrastructure layer: store and signaling adapters

pub mod persistence;
pub mod signaling;
