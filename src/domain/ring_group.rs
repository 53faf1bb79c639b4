//! Ring group domain model
//!
//! A ring group offers a call to several identities, either all at once or
//! one after another. Sequential ringing is driven by the caller's timer:
//! the manager only answers "who is next".

use crate::domain::shared::value_objects::PartyId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Fan-out strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RingMode {
    /// Every target rings at once
    Simultaneous,
    /// Targets ring in order, advancing on decline or ring timeout
    Sequential,
}

/// Configured ring group targets. The two lists are independent strategies
/// and are never merged into one plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingGroupConfig {
    #[serde(default)]
    pub simultaneous_targets: Vec<PartyId>,
    #[serde(default)]
    pub sequential_targets: Vec<PartyId>,
}

impl RingGroupConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_simultaneous(mut self, targets: impl IntoIterator<Item = PartyId>) -> Self {
        self.simultaneous_targets = targets.into_iter().collect();
        self
    }

    pub fn with_sequential(mut self, targets: impl IntoIterator<Item = PartyId>) -> Self {
        self.sequential_targets = targets.into_iter().collect();
        self
    }

    pub fn targets(&self, mode: RingMode) -> &[PartyId] {
        match mode {
            RingMode::Simultaneous => &self.simultaneous_targets,
            RingMode::Sequential => &self.sequential_targets,
        }
    }
}

/// Ordered destinations for one call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingPlan {
    pub mode: RingMode,
    pub targets: Vec<PartyId>,
}

impl RingPlan {
    /// Plan that rings a single party
    pub fn single(target: PartyId) -> Self {
        Self {
            mode: RingMode::Sequential,
            targets: vec![target],
        }
    }

    /// Targets offered as soon as the plan starts
    pub fn initial_targets(&self) -> &[PartyId] {
        match self.mode {
            RingMode::Simultaneous => &self.targets,
            RingMode::Sequential => &self.targets[..self.targets.len().min(1)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Expands ring group configuration into ring plans
pub struct RingGroupManager;

impl RingGroupManager {
    /// Build the plan for `mode`. Repeated identities are dropped, keeping
    /// the first occurrence, so no party is offered the same call twice.
    pub fn expand(config: &RingGroupConfig, mode: RingMode) -> RingPlan {
        let mut seen = HashSet::new();
        let targets = config
            .targets(mode)
            .iter()
            .filter(|target| seen.insert((*target).clone()))
            .cloned()
            .collect();

        RingPlan { mode, targets }
    }

    /// Target to ring after the one at `after_index` declined or timed out.
    /// Simultaneous plans have no next target.
    pub fn next(plan: &RingPlan, after_index: usize) -> Option<&PartyId> {
        match plan.mode {
            RingMode::Simultaneous => None,
            RingMode::Sequential => plan.targets.get(after_index.checked_add(1)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parties(ids: &[&str]) -> Vec<PartyId> {
        ids.iter().map(|id| PartyId::from(*id)).collect()
    }

    #[test]
    fn test_sequential_next() {
        let config = RingGroupConfig::new().with_sequential(parties(&["x", "y", "z"]));
        let plan = RingGroupManager::expand(&config, RingMode::Sequential);

        assert_eq!(RingGroupManager::next(&plan, 0), Some(&PartyId::from("y")));
        assert_eq!(RingGroupManager::next(&plan, 1), Some(&PartyId::from("z")));
        assert_eq!(RingGroupManager::next(&plan, 2), None);
        assert_eq!(RingGroupManager::next(&plan, usize::MAX), None);
    }

    #[test]
    fn test_lists_are_never_merged() {
        let config = RingGroupConfig::new()
            .with_simultaneous(parties(&["desk", "mobile"]))
            .with_sequential(parties(&["x", "y"]));

        let simultaneous = RingGroupManager::expand(&config, RingMode::Simultaneous);
        assert_eq!(simultaneous.mode, RingMode::Simultaneous);
        assert_eq!(simultaneous.targets, parties(&["desk", "mobile"]));

        let sequential = RingGroupManager::expand(&config, RingMode::Sequential);
        assert_eq!(sequential.targets, parties(&["x", "y"]));
    }

    #[test]
    fn test_expand_drops_repeats_in_order() {
        let config = RingGroupConfig::new().with_sequential(parties(&["x", "y", "x", "z", "y"]));
        let plan = RingGroupManager::expand(&config, RingMode::Sequential);
        assert_eq!(plan.targets, parties(&["x", "y", "z"]));
    }

    #[test]
    fn test_simultaneous_has_no_next() {
        let config = RingGroupConfig::new().with_simultaneous(parties(&["a", "b"]));
        let plan = RingGroupManager::expand(&config, RingMode::Simultaneous);
        assert_eq!(RingGroupManager::next(&plan, 0), None);
        assert_eq!(plan.initial_targets(), parties(&["a", "b"]).as_slice());
    }

    #[test]
    fn test_initial_targets() {
        let config = RingGroupConfig::new().with_sequential(parties(&["x", "y"]));
        let plan = RingGroupManager::expand(&config, RingMode::Sequential);
        assert_eq!(plan.initial_targets(), parties(&["x"]).as_slice());

        let empty = RingGroupManager::expand(&RingGroupConfig::new(), RingMode::Sequential);
        assert!(empty.is_empty());
        assert!(empty.initial_targets().is_empty());
    }
}
