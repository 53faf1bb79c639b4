//! Control API

pub mod call_handler;
pub mod dto;
pub mod error;
pub mod forwarding_handler;
pub mod metrics_handler;
pub mod ring_group_handler;
pub mod router;
pub mod state;
pub mod transfer_handler;

pub use dto::ApiResponse;
pub use error::ApiError;
pub use metrics_handler::{describe_metrics, init_metrics};
pub use router::build_router;
pub use state::AppState;
