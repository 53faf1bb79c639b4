//! Call Forwarding domain model
//!
//! Per-user forwarding rules and the evaluator that picks which rule, if any,
//! redirects an incoming call. Unconditional (`always`) rules may carry a
//! weekly schedule; busy and unreachable rules depend on the callee's
//! condition; no-answer rules are timer driven and only looked up here.

use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use crate::domain::shared::value_objects::PartyId;
use chrono::{Datelike, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Forwarding rule type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Forward all calls, optionally only inside a schedule
    Always,
    /// Forward when the callee is busy
    Busy,
    /// Forward after a number of unanswered ring cycles
    NoAnswer,
    /// Forward when the callee cannot be reached
    Unreachable,
}

impl RuleType {
    /// Get a human-readable description
    pub fn description(&self) -> &str {
        match self {
            RuleType::Always => "Forward all calls",
            RuleType::Busy => "Forward when busy",
            RuleType::NoAnswer => "Forward on no answer",
            RuleType::Unreachable => "Forward when unreachable",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Always => "always",
            RuleType::Busy => "busy",
            RuleType::NoAnswer => "no_answer",
            RuleType::Unreachable => "unreachable",
        }
    }
}

/// Local wall-clock time of day, `HH:MM`, zero padded, 24 hour.
///
/// Only this fixed-width form is accepted, which is what lets schedule
/// windows be checked by comparing the strings lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WallClockTime(String);

impl WallClockTime {
    pub fn parse(value: &str) -> Result<Self> {
        let bytes = value.as_bytes();
        let well_formed = bytes.len() == 5
            && bytes[2] == b':'
            && [0, 1, 3, 4].iter().all(|&i| bytes[i].is_ascii_digit());
        if !well_formed {
            return Err(DomainError::ValidationError(format!(
                "time must be HH:MM, got {:?}",
                value
            )));
        }

        let hours = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');
        let minutes = (bytes[3] - b'0') * 10 + (bytes[4] - b'0');
        if hours > 23 || minutes > 59 {
            return Err(DomainError::ValidationError(format!(
                "time out of range: {}",
                value
            )));
        }

        Ok(Self(value.to_string()))
    }

    /// Time of day of a local date-time in the same `HH:MM` form
    pub fn of(now: &NaiveDateTime) -> Self {
        Self(now.format("%H:%M").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for WallClockTime {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<WallClockTime> for String {
    fn from(time: WallClockTime) -> Self {
        time.0
    }
}

impl fmt::Display for WallClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Weekly window for an `always` rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingSchedule {
    pub enabled: bool,
    pub start_time: Option<WallClockTime>,
    pub end_time: Option<WallClockTime>,
    pub active_days: HashSet<Weekday>,
}

impl ForwardingSchedule {
    pub fn new(active_days: impl IntoIterator<Item = Weekday>) -> Self {
        Self {
            enabled: true,
            start_time: None,
            end_time: None,
            active_days: active_days.into_iter().collect(),
        }
    }

    pub fn between(mut self, start: WallClockTime, end: WallClockTime) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Weekday must be active; the time window is only checked when both
    /// bounds are set, so a half-open window matches the whole day
    /// (`validate_rule_set` rejects those). Bounds are inclusive.
    pub fn contains(&self, now: &NaiveDateTime) -> bool {
        if !self.active_days.contains(&now.weekday()) {
            return false;
        }

        match (&self.start_time, &self.end_time) {
            (Some(start), Some(end)) => {
                let time = WallClockTime::of(now);
                *start <= time && time <= *end
            }
            _ => true,
        }
    }
}

/// Call forwarding rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingRule {
    /// Unique rule identifier
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub rule_type: RuleType,
    pub enabled: bool,
    /// Party that receives forwarded calls
    pub destination_identity: PartyId,
    /// Display label for the destination
    pub destination_label: Option<String>,
    /// Unanswered ring cycles before forwarding (no_answer only)
    pub rings_before_forward: Option<u32>,
    /// Weekly window (always only)
    pub schedule: Option<ForwardingSchedule>,
}

impl ForwardingRule {
    pub fn new(rule_type: RuleType, destination_identity: PartyId) -> Self {
        Self {
            id: Uuid::new_v4(),
            rule_type,
            enabled: true,
            destination_identity,
            destination_label: None,
            rings_before_forward: None,
            schedule: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.destination_label = Some(label.into());
        self
    }

    pub fn with_rings_before_forward(mut self, rings: u32) -> Self {
        self.rings_before_forward = Some(rings);
        self
    }

    pub fn with_schedule(mut self, schedule: ForwardingSchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether an enabled `always` rule is in force at `now`
    fn always_applies_at(&self, now: &NaiveDateTime) -> bool {
        match self.schedule {
            Some(ref schedule) if schedule.enabled => schedule.contains(now),
            _ => true,
        }
    }
}

/// Callee condition at the time an incoming call is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationContext {
    pub is_busy: bool,
    pub is_unreachable: bool,
    /// Callee's local wall-clock date-time
    pub now: NaiveDateTime,
}

impl EvaluationContext {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            is_busy: false,
            is_unreachable: false,
            now,
        }
    }

    pub fn busy(mut self) -> Self {
        self.is_busy = true;
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.is_unreachable = true;
        self
    }
}

/// Forwarding decisions over a user's rule set.
///
/// Callers must persist at most one enabled rule per [`RuleType`] per user
/// (see [`ForwardingRuleEvaluator::validate_rule_set`]); when that does not
/// hold the first enabled rule of a type in list order wins.
pub struct ForwardingRuleEvaluator;

impl ForwardingRuleEvaluator {
    /// Pick the rule that redirects an incoming call, if any.
    ///
    /// Order: `always` (subject to its schedule), then `busy`, then
    /// `unreachable`. An `always` rule whose schedule excludes `now` is
    /// skipped as if it were absent, so busy/unreachable rules still apply.
    /// `no_answer` is never returned; see [`Self::no_answer_rule`].
    pub fn evaluate<'a>(
        rules: &'a [ForwardingRule],
        context: &EvaluationContext,
    ) -> Option<&'a ForwardingRule> {
        if let Some(always) = Self::enabled_rule(rules, RuleType::Always) {
            if always.always_applies_at(&context.now) {
                return Some(always);
            }
        }

        if context.is_busy {
            if let Some(busy) = Self::enabled_rule(rules, RuleType::Busy) {
                return Some(busy);
            }
        }

        if context.is_unreachable {
            if let Some(unreachable) = Self::enabled_rule(rules, RuleType::Unreachable) {
                return Some(unreachable);
            }
        }

        None
    }

    /// The enabled `no_answer` rule the caller should arm a timer for
    pub fn no_answer_rule(rules: &[ForwardingRule]) -> Option<&ForwardingRule> {
        Self::enabled_rule(rules, RuleType::NoAnswer)
    }

    /// How long the caller's no-answer timer should run for `rule`
    pub fn no_answer_delay(rule: &ForwardingRule, ring_cycle: Duration, default_rings: u32) -> Duration {
        ring_cycle * rule.rings_before_forward.unwrap_or(default_rings)
    }

    /// Check the preconditions the evaluator relies on before rules are saved
    pub fn validate_rule_set(rules: &[ForwardingRule]) -> Result<()> {
        let mut seen = HashSet::new();
        for rule in rules.iter().filter(|r| r.enabled) {
            if !seen.insert(rule.rule_type) {
                return Err(DomainError::ValidationError(format!(
                    "more than one enabled {} rule",
                    rule.rule_type.as_str()
                )));
            }
        }

        for rule in rules {
            if rule.rule_type == RuleType::NoAnswer && rule.rings_before_forward == Some(0) {
                return Err(DomainError::ValidationError(
                    "rings_before_forward must be at least 1".to_string(),
                ));
            }

            if let Some(ref schedule) = rule.schedule {
                match (&schedule.start_time, &schedule.end_time) {
                    (Some(start), Some(end)) if start > end => {
                        return Err(DomainError::ValidationError(format!(
                            "schedule window {}-{} crosses midnight",
                            start, end
                        )));
                    }
                    (Some(_), None) | (None, Some(_)) => {
                        return Err(DomainError::ValidationError(
                            "schedule window needs both start_time and end_time".to_string(),
                        ));
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }

    fn enabled_rule(rules: &[ForwardingRule], rule_type: RuleType) -> Option<&ForwardingRule> {
        rules.iter().find(|r| r.enabled && r.rule_type == rule_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(date: (i32, u32, u32), time: (u32, u32)) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(date.0, date.1, date.2)
            .unwrap()
            .and_hms_opt(time.0, time.1, 0)
            .unwrap()
    }

    // 2026-10-19 is a Monday
    fn monday(hour: u32, minute: u32) -> NaiveDateTime {
        at((2026, 10, 19), (hour, minute))
    }

    fn tuesday(hour: u32, minute: u32) -> NaiveDateTime {
        at((2026, 10, 20), (hour, minute))
    }

    fn office_hours() -> ForwardingSchedule {
        ForwardingSchedule::new([Weekday::Mon]).between(
            WallClockTime::parse("09:00").unwrap(),
            WallClockTime::parse("17:00").unwrap(),
        )
    }

    #[test]
    fn test_unscheduled_always_wins_regardless_of_condition() {
        let rules = vec![
            ForwardingRule::new(RuleType::Busy, PartyId::from("busy-dest")),
            ForwardingRule::new(RuleType::Unreachable, PartyId::from("vm")),
            ForwardingRule::new(RuleType::Always, PartyId::from("A")),
        ];

        for (busy, unreachable) in [(false, false), (true, false), (false, true), (true, true)] {
            let context = EvaluationContext {
                is_busy: busy,
                is_unreachable: unreachable,
                now: monday(3, 0),
            };
            let rule = ForwardingRuleEvaluator::evaluate(&rules, &context).unwrap();
            assert_eq!(rule.rule_type, RuleType::Always);
        }
    }

    #[test]
    fn test_disabled_always_falls_to_busy() {
        let rules = vec![
            ForwardingRule::new(RuleType::Always, PartyId::from("A")).disabled(),
            ForwardingRule::new(RuleType::Busy, PartyId::from("B")),
        ];
        let context = EvaluationContext::new(monday(10, 0)).busy();

        let rule = ForwardingRuleEvaluator::evaluate(&rules, &context).unwrap();
        assert_eq!(rule.rule_type, RuleType::Busy);
        assert_eq!(rule.destination_identity.as_str(), "B");
    }

    #[test]
    fn test_schedule_outside_window_returns_none() {
        let rules = vec![ForwardingRule::new(RuleType::Always, PartyId::from("A"))
            .with_schedule(office_hours())];

        let context = EvaluationContext::new(tuesday(10, 0));
        assert!(ForwardingRuleEvaluator::evaluate(&rules, &context).is_none());
    }

    #[test]
    fn test_schedule_window_bounds_are_inclusive() {
        let rules = vec![ForwardingRule::new(RuleType::Always, PartyId::from("A"))
            .with_schedule(office_hours())];

        for now in [monday(9, 0), monday(12, 30), monday(17, 0)] {
            assert!(ForwardingRuleEvaluator::evaluate(&rules, &EvaluationContext::new(now)).is_some());
        }
        for now in [monday(8, 59), monday(17, 1)] {
            assert!(ForwardingRuleEvaluator::evaluate(&rules, &EvaluationContext::new(now)).is_none());
        }
    }

    #[test]
    fn test_scheduled_always_falls_through_like_it_was_absent() {
        let with_always = vec![
            ForwardingRule::new(RuleType::Always, PartyId::from("A")).with_schedule(office_hours()),
            ForwardingRule::new(RuleType::Busy, PartyId::from("B")),
            ForwardingRule::new(RuleType::Unreachable, PartyId::from("U")),
        ];
        let without_always = with_always[1..].to_vec();

        let contexts = [
            EvaluationContext::new(tuesday(10, 0)),
            EvaluationContext::new(tuesday(10, 0)).busy(),
            EvaluationContext::new(monday(20, 0)).unreachable(),
            EvaluationContext::new(monday(20, 0)).busy().unreachable(),
        ];
        for context in contexts {
            assert_eq!(
                ForwardingRuleEvaluator::evaluate(&with_always, &context),
                ForwardingRuleEvaluator::evaluate(&without_always, &context),
            );
        }
    }

    #[test]
    fn test_disabled_schedule_means_unconditional() {
        let rules = vec![ForwardingRule::new(RuleType::Always, PartyId::from("A"))
            .with_schedule(office_hours().disabled())];

        let context = EvaluationContext::new(tuesday(23, 0));
        assert!(ForwardingRuleEvaluator::evaluate(&rules, &context).is_some());
    }

    #[test]
    fn test_schedule_without_times_checks_days_only() {
        let schedule = ForwardingSchedule::new([Weekday::Sat, Weekday::Sun]);
        let rules = vec![ForwardingRule::new(RuleType::Always, PartyId::from("A")).with_schedule(schedule)];

        let saturday = at((2026, 10, 24), (4, 0));
        assert!(ForwardingRuleEvaluator::evaluate(&rules, &EvaluationContext::new(saturday)).is_some());
        assert!(ForwardingRuleEvaluator::evaluate(&rules, &EvaluationContext::new(monday(4, 0))).is_none());
    }

    #[test]
    fn test_busy_before_unreachable() {
        let rules = vec![
            ForwardingRule::new(RuleType::Unreachable, PartyId::from("U")),
            ForwardingRule::new(RuleType::Busy, PartyId::from("B")),
        ];
        let context = EvaluationContext::new(monday(10, 0)).busy().unreachable();

        let rule = ForwardingRuleEvaluator::evaluate(&rules, &context).unwrap();
        assert_eq!(rule.rule_type, RuleType::Busy);
    }

    #[test]
    fn test_condition_rules_need_their_condition() {
        let rules = vec![
            ForwardingRule::new(RuleType::Busy, PartyId::from("B")),
            ForwardingRule::new(RuleType::Unreachable, PartyId::from("U")),
            ForwardingRule::new(RuleType::NoAnswer, PartyId::from("N")),
        ];
        let context = EvaluationContext::new(monday(10, 0));
        assert!(ForwardingRuleEvaluator::evaluate(&rules, &context).is_none());
    }

    #[test]
    fn test_no_answer_rule_skips_disabled() {
        let rules = vec![
            ForwardingRule::new(RuleType::NoAnswer, PartyId::from("old")).disabled(),
            ForwardingRule::new(RuleType::NoAnswer, PartyId::from("new")).with_rings_before_forward(3),
        ];
        let rule = ForwardingRuleEvaluator::no_answer_rule(&rules).unwrap();
        assert!(rule.enabled);
        assert_eq!(rule.destination_identity.as_str(), "new");

        let only_disabled = vec![ForwardingRule::new(RuleType::NoAnswer, PartyId::from("x")).disabled()];
        assert!(ForwardingRuleEvaluator::no_answer_rule(&only_disabled).is_none());
    }

    #[test]
    fn test_no_answer_delay() {
        let ring_cycle = Duration::from_secs(6);
        let explicit = ForwardingRule::new(RuleType::NoAnswer, PartyId::from("vm")).with_rings_before_forward(3);
        let implicit = ForwardingRule::new(RuleType::NoAnswer, PartyId::from("vm"));

        assert_eq!(ForwardingRuleEvaluator::no_answer_delay(&explicit, ring_cycle, 4), Duration::from_secs(18));
        assert_eq!(ForwardingRuleEvaluator::no_answer_delay(&implicit, ring_cycle, 4), Duration::from_secs(24));
    }

    #[test]
    fn test_wall_clock_time_parsing() {
        assert!(WallClockTime::parse("00:00").is_ok());
        assert!(WallClockTime::parse("23:59").is_ok());
        assert!(WallClockTime::parse("9:00").is_err());
        assert!(WallClockTime::parse("24:00").is_err());
        assert!(WallClockTime::parse("12:60").is_err());
        assert!(WallClockTime::parse("12-30").is_err());

        let time: WallClockTime = serde_json::from_str("\"08:05\"").unwrap();
        assert_eq!(time.as_str(), "08:05");
        assert!(serde_json::from_str::<WallClockTime>("\"8:05\"").is_err());
    }

    #[test]
    fn test_validate_rule_set() {
        let valid = vec![
            ForwardingRule::new(RuleType::Always, PartyId::from("A")).with_schedule(office_hours()),
            ForwardingRule::new(RuleType::Busy, PartyId::from("B")),
            ForwardingRule::new(RuleType::Busy, PartyId::from("B2")).disabled(),
        ];
        assert!(ForwardingRuleEvaluator::validate_rule_set(&valid).is_ok());

        let duplicate = vec![
            ForwardingRule::new(RuleType::Busy, PartyId::from("B")),
            ForwardingRule::new(RuleType::Busy, PartyId::from("B2")),
        ];
        assert!(matches!(
            ForwardingRuleEvaluator::validate_rule_set(&duplicate),
            Err(DomainError::ValidationError(_))
        ));

        let overnight = vec![ForwardingRule::new(RuleType::Always, PartyId::from("A")).with_schedule(
            ForwardingSchedule::new([Weekday::Fri]).between(
                WallClockTime::parse("22:00").unwrap(),
                WallClockTime::parse("06:00").unwrap(),
            ),
        )];
        assert!(ForwardingRuleEvaluator::validate_rule_set(&overnight).is_err());
    }

    #[test]
    fn test_validate_rejects_half_open_window() {
        let mut evenings = ForwardingSchedule::new([Weekday::Mon]);
        evenings.start_time = Some(WallClockTime::parse("18:00").unwrap());
        let rules = vec![
            ForwardingRule::new(RuleType::Always, PartyId::from("A")).with_schedule(evenings.clone())
        ];
        assert!(matches!(
            ForwardingRuleEvaluator::validate_rule_set(&rules),
            Err(DomainError::ValidationError(_))
        ));

        let mut mornings = ForwardingSchedule::new([Weekday::Mon]);
        mornings.end_time = Some(WallClockTime::parse("09:00").unwrap());
        let rules = vec![ForwardingRule::new(RuleType::Always, PartyId::from("A")).with_schedule(mornings)];
        assert!(ForwardingRuleEvaluator::validate_rule_set(&rules).is_err());

        // Unvalidated, a half-open window does not restrict the time of day
        assert!(evenings.contains(&at((2026, 10, 19), (12, 0))));
    }

    #[test]
    fn test_rule_type_description() {
        assert_eq!(RuleType::Always.description(), "Forward all calls");
        assert_eq!(RuleType::NoAnswer.as_str(), "no_answer");
    }
}
