//! Rule storage for a single state machine.

use crate::error::CoreError;
use crate::rule::TransitionRule;
use crate::state::names_match;
use parking_lot::RwLock;

/// Thread-safe, insertion-ordered collection of transition rules.
///
/// Rules are keyed by their `(from_state, to_state)` pair, compared
/// case-insensitively. Every accessor copies out of the lock, so callers
/// never evaluate conditions while the store is locked.
#[derive(Debug, Default)]
pub struct RuleStore {
    rules: RwLock<Vec<TransitionRule>>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `rules` in the given order.
    pub fn with_rules(rules: Vec<TransitionRule>) -> Self {
        Self {
            rules: RwLock::new(rules),
        }
    }

    /// Returns active rules leaving `state`, highest priority first.
    ///
    /// Rules with equal priority keep their insertion order.
    pub fn rules_for(&self, state: &str) -> Vec<TransitionRule> {
        let mut rules: Vec<TransitionRule> = self
            .rules
            .read()
            .iter()
            .filter(|r| r.is_active && names_match(&r.from_state, state))
            .cloned()
            .collect();
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        rules
    }

    /// Returns true if an active rule connects `from` to `to`.
    pub fn has_active(&self, from: &str, to: &str) -> bool {
        self.rules
            .read()
            .iter()
            .any(|r| r.is_active && r.matches(from, to))
    }

    /// Appends a rule. Fails if a rule with the same key is already stored.
    pub fn add(&self, rule: TransitionRule) -> Result<(), CoreError> {
        let mut rules = self.rules.write();
        if rules
            .iter()
            .any(|r| r.matches(&rule.from_state, &rule.to_state))
        {
            return Err(CoreError::RuleExists {
                from: rule.from_state,
                to: rule.to_state,
            });
        }
        rules.push(rule);
        Ok(())
    }

    /// Removes the rule keyed by `(from, to)`. Returns false if none matched.
    pub fn remove(&self, from: &str, to: &str) -> bool {
        let mut rules = self.rules.write();
        match rules.iter().position(|r| r.matches(from, to)) {
            Some(index) => {
                rules.remove(index);
                true
            }
            None => false,
        }
    }

    /// Replaces the rule with the same key in place, keeping its position.
    /// Returns false if none matched.
    pub fn update(&self, rule: TransitionRule) -> bool {
        let mut rules = self.rules.write();
        match rules
            .iter_mut()
            .find(|r| r.matches(&rule.from_state, &rule.to_state))
        {
            Some(existing) => {
                *existing = rule;
                true
            }
            None => false,
        }
    }

    /// Removes every rule with `state` as either endpoint. Returns the
    /// number of rules removed.
    pub fn remove_touching(&self, state: &str) -> usize {
        let mut rules = self.rules.write();
        let before = rules.len();
        rules.retain(|r| !r.touches(state));
        before - rules.len()
    }

    /// Swaps the whole rule list in one step.
    pub fn replace_all(&self, rules: Vec<TransitionRule>) {
        *self.rules.write() = rules;
    }

    /// Returns every rule, active or not, in storage order.
    pub fn all_rules(&self) -> Vec<TransitionRule> {
        self.rules.read().clone()
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }
}
