//! Inbound call routing
//!
//! Runs the inbound control flow: evaluate the callee's forwarding rules,
//! expand the forwarding target into a ring plan, and ring the plan's first
//! targets. Timers stay with the caller, which comes back through
//! [`InboundCallRouter::advance`] when a sequential target declines or times
//! out.

use crate::domain::call::{CallRecord, SignalDispatcher};
use crate::domain::call_forwarding::{EvaluationContext, ForwardingRule, ForwardingRuleEvaluator};
use crate::domain::ring_group::{RingGroupConfig, RingGroupManager, RingMode, RingPlan};
use crate::domain::shared::value_objects::{CallId, PartyId};
use futures::future::join_all;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Where an inbound call goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RoutingDecision {
    /// No rule applies; ring the callee as usual
    Deliver { target: PartyId },
    /// Redirected by `rule` to the targets in `plan`
    Forward { rule: ForwardingRule, plan: RingPlan },
}

pub struct InboundCallRouter {
    dispatcher: Arc<dyn SignalDispatcher>,
}

impl InboundCallRouter {
    pub fn new(dispatcher: Arc<dyn SignalDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Decide where `call` rings and ring the first targets.
    ///
    /// `ring_group` is the destination's group, if it has one; `mode` picks
    /// which of its two lists applies. Without a group (or with an empty
    /// list) the rule's destination rings alone.
    pub async fn route(
        &self,
        call: &CallRecord,
        rules: &[ForwardingRule],
        context: &EvaluationContext,
        ring_group: Option<&RingGroupConfig>,
        mode: RingMode,
    ) -> RoutingDecision {
        let Some(rule) = ForwardingRuleEvaluator::evaluate(rules, context) else {
            counter!("call_forwarding_decisions_total", "rule_type" => "none").increment(1);
            debug!("Call {} delivered to {}", call.id(), call.receiver_identity());
            self.dispatcher.ring(call.receiver_identity(), call.id()).await;
            return RoutingDecision::Deliver {
                target: call.receiver_identity().clone(),
            };
        };

        counter!("call_forwarding_decisions_total", "rule_type" => rule.rule_type.as_str())
            .increment(1);

        let plan = ring_group
            .map(|config| RingGroupManager::expand(config, mode))
            .filter(|plan| !plan.is_empty())
            .unwrap_or_else(|| RingPlan::single(rule.destination_identity.clone()));

        info!(
            "Call {} for {} forwarded ({}) to {} target(s)",
            call.id(),
            call.receiver_identity(),
            rule.rule_type.as_str(),
            plan.targets.len()
        );

        join_all(
            plan.initial_targets()
                .iter()
                .map(|target| self.dispatcher.ring(target, call.id())),
        )
        .await;

        RoutingDecision::Forward {
            rule: rule.clone(),
            plan,
        }
    }

    /// Ring the sequential target after `after_index`, if there is one
    pub async fn advance(&self, call_id: CallId, plan: &RingPlan, after_index: usize) -> Option<PartyId> {
        let next = RingGroupManager::next(plan, after_index)?.clone();
        debug!("Call {} advancing to {}", call_id, next);
        self.dispatcher.ring(&next, call_id).await;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::call::signal::MockSignalDispatcher;
    use crate::domain::call::{MediaKind, NewCallRecord};
    use crate::domain::call_forwarding::RuleType;
    use chrono::{NaiveDate, Utc};
    use std::sync::Mutex;

    fn incoming_call() -> CallRecord {
        CallRecord::from_new(
            CallId::new(),
            NewCallRecord::ringing(
                PartyId::from("caller"),
                PartyId::from("callee"),
                MediaKind::Voice,
                Utc::now(),
            ),
        )
    }

    fn context() -> EvaluationContext {
        let now = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        EvaluationContext::new(now)
    }

    fn recording_dispatcher() -> (MockSignalDispatcher, Arc<Mutex<Vec<String>>>) {
        let rung = Arc::new(Mutex::new(Vec::new()));
        let log = rung.clone();
        let mut dispatcher = MockSignalDispatcher::new();
        dispatcher.expect_ring().returning(move |target, _| {
            log.lock().unwrap().push(target.to_string());
        });
        (dispatcher, rung)
    }

    #[tokio::test]
    async fn test_no_rule_rings_callee() {
        let (dispatcher, rung) = recording_dispatcher();
        let router = InboundCallRouter::new(Arc::new(dispatcher));

        let decision = router
            .route(&incoming_call(), &[], &context(), None, RingMode::Simultaneous)
            .await;

        assert_eq!(
            decision,
            RoutingDecision::Deliver {
                target: PartyId::from("callee")
            }
        );
        assert_eq!(*rung.lock().unwrap(), vec!["callee".to_string()]);
    }

    #[tokio::test]
    async fn test_forward_rings_whole_simultaneous_group() {
        let (dispatcher, rung) = recording_dispatcher();
        let router = InboundCallRouter::new(Arc::new(dispatcher));
        let rules = vec![ForwardingRule::new(RuleType::Busy, PartyId::from("team"))];
        let group = RingGroupConfig::new()
            .with_simultaneous([PartyId::from("desk"), PartyId::from("mobile")]);

        let decision = router
            .route(
                &incoming_call(),
                &rules,
                &context().busy(),
                Some(&group),
                RingMode::Simultaneous,
            )
            .await;

        assert!(matches!(decision, RoutingDecision::Forward { .. }));
        let mut rung = rung.lock().unwrap().clone();
        rung.sort();
        assert_eq!(rung, vec!["desk".to_string(), "mobile".to_string()]);
    }

    #[tokio::test]
    async fn test_forward_without_group_rings_destination() {
        let (dispatcher, rung) = recording_dispatcher();
        let router = InboundCallRouter::new(Arc::new(dispatcher));
        let rules = vec![ForwardingRule::new(RuleType::Always, PartyId::from("voicemail"))];
        let empty_group = RingGroupConfig::new();

        let decision = router
            .route(
                &incoming_call(),
                &rules,
                &context(),
                Some(&empty_group),
                RingMode::Sequential,
            )
            .await;

        match decision {
            RoutingDecision::Forward { rule, plan } => {
                assert_eq!(rule.rule_type, RuleType::Always);
                assert_eq!(plan, RingPlan::single(PartyId::from("voicemail")));
            }
            other => panic!("expected forward, got {:?}", other),
        }
        assert_eq!(*rung.lock().unwrap(), vec!["voicemail".to_string()]);
    }

    #[tokio::test]
    async fn test_advance_rings_next_sequential_target() {
        let (dispatcher, rung) = recording_dispatcher();
        let router = InboundCallRouter::new(Arc::new(dispatcher));
        let group = RingGroupConfig::new().with_sequential([
            PartyId::from("x"),
            PartyId::from("y"),
        ]);
        let plan = RingGroupManager::expand(&group, RingMode::Sequential);

        assert_eq!(router.advance(CallId::new(), &plan, 0).await, Some(PartyId::from("y")));
        assert_eq!(router.advance(CallId::new(), &plan, 1).await, None);
        assert_eq!(*rung.lock().unwrap(), vec!["y".to_string()]);
    }
}
