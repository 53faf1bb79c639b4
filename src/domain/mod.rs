//! Domain layer - Core call control rules
//!
//! This layer contains:
//! - Call records and the ports to the record store and signal dispatcher
//! - Forwarding rule evaluation
//! - Ring group expansion
//! - The transfer state machine

pub mod call;
pub mod call_forwarding;
pub mod clock;
pub mod ring_group;
pub mod shared;
pub mod transfer;

// Re-export commonly used types
pub use shared::{DomainError, Result};
