//! API Router configuration

use super::call_handler::{advance_ring, get_call, health_check, route_call};
use super::forwarding_handler::{evaluate_rules, no_answer_rule, validate_rules};
use super::metrics_handler::metrics_handler;
use super::ring_group_handler::{expand_ring_group, next_target};
use super::state::AppState;
use super::transfer_handler::{
    blind_transfer, cancel_attended_transfer, complete_attended_transfer,
    get_attended_transfer, start_attended_transfer,
};
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the API router
pub fn build_router(state: AppState, prometheus_handle: PrometheusHandle) -> Router {
    let health_routes = Router::new().route("/health", get(health_check));

    // Stateless decision routes
    let forwarding_routes = Router::new()
        .route("/forwarding/evaluate", post(evaluate_rules))
        .route("/forwarding/no-answer", post(no_answer_rule))
        .route("/forwarding/validate", post(validate_rules));

    let ring_group_routes = Router::new()
        .route("/ring-groups/expand", post(expand_ring_group))
        .route("/ring-groups/next", post(next_target));

    // Call routes
    let call_routes = Router::new()
        .route("/calls/:call_id", get(get_call))
        .route("/calls/:call_id/route", post(route_call))
        .route("/calls/:call_id/ring/advance", post(advance_ring))
        .route("/calls/:call_id/transfer/blind", post(blind_transfer))
        .route(
            "/calls/:call_id/transfer/attended",
            post(start_attended_transfer).get(get_attended_transfer),
        )
        .route(
            "/calls/:call_id/transfer/attended/complete",
            post(complete_attended_transfer),
        )
        .route(
            "/calls/:call_id/transfer/attended/cancel",
            post(cancel_attended_transfer),
        );

    // Metrics route (separate state)
    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prometheus_handle);

    Router::new()
        .merge(health_routes)
        .merge(forwarding_routes)
        .merge(ring_group_routes)
        .merge(call_routes)
        .with_state(state)
        .merge(metrics_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
