//! callctl - call control for forwarding, ring groups and transfers
//!
//! Decides where an incoming call rings, expands ring groups into ordered
//! targets, and moves established calls between parties with blind and
//! attended transfers. Calls live in an external record store and parties
//! are reached through a signal dispatcher; both sit behind traits in
//! [`domain::call`].

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::DomainError;
pub use domain::shared::result::Result;
