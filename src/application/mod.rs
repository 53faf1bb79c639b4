//! Application layer - Use cases and application services
//!
//! This layer orchestrates domain objects to fulfill use cases:
//! routing an inbound call through forwarding rules and ring groups to the
//! signal dispatcher.

pub mod inbound;

pub use inbound::{InboundCallRouter, RoutingDecision};
