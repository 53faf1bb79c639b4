//! Forwarding rule API handlers

use super::dto::{ApiResponse, EvaluateRequest, NoAnswerResponse, RuleSetRequest};
use super::error::ApiError;
use super::state::AppState;
use crate::domain::call_forwarding::{ForwardingRule, ForwardingRuleEvaluator};
use axum::{extract::State, Json};
use tracing::debug;

/// Pick the rule that redirects an incoming call
pub async fn evaluate_rules(
    Json(request): Json<EvaluateRequest>,
) -> Json<ApiResponse<Option<ForwardingRule>>> {
    debug!("API: Evaluating {} forwarding rule(s)", request.rules.len());

    let rule = ForwardingRuleEvaluator::evaluate(&request.rules, &request.context).cloned();
    Json(ApiResponse::success(rule))
}

/// Enabled no-answer rule and how long to ring before applying it
pub async fn no_answer_rule(
    State(state): State<AppState>,
    Json(request): Json<RuleSetRequest>,
) -> Result<Json<ApiResponse<Option<NoAnswerResponse>>>, ApiError> {
    // A zero ring count would forward before the callee is ever alerted
    ForwardingRuleEvaluator::validate_rule_set(&request.rules)?;

    let timer = ForwardingRuleEvaluator::no_answer_rule(&request.rules).map(|rule| {
        let delay = ForwardingRuleEvaluator::no_answer_delay(
            rule,
            state.forwarding.ring_cycle(),
            state.forwarding.default_rings_before_forward,
        );
        NoAnswerResponse {
            rule: rule.clone(),
            delay_secs: delay.as_secs(),
        }
    });

    Ok(Json(ApiResponse::success(timer)))
}

/// Check a rule set before it is saved
pub async fn validate_rules(
    Json(request): Json<RuleSetRequest>,
) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    ForwardingRuleEvaluator::validate_rule_set(&request.rules)?;
    Ok(Json(ApiResponse::success("valid")))
}
