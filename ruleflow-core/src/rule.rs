//! Transition rules.

use crate::condition::{Condition, ConditionExpr};
use crate::error::ConditionError;
use crate::snapshot::EntitySnapshot;
use crate::state::names_match;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A directed, prioritized, conditional edge between two states.
#[derive(Debug, Clone)]
pub struct TransitionRule {
    /// Source state.
    pub from_state: String,

    /// Target state.
    pub to_state: String,

    /// Predicate deciding whether the automatic engine takes this edge.
    pub condition: Condition,

    /// Higher priorities are evaluated first.
    pub priority: i32,

    /// Human-readable description.
    pub description: String,

    /// Inactive rules are ignored by evaluation and legality checks.
    pub is_active: bool,
}

impl TransitionRule {
    /// Creates an active rule with the `never` condition and priority 0.
    pub fn new(from_state: impl Into<String>, to_state: impl Into<String>) -> Self {
        Self {
            from_state: from_state.into(),
            to_state: to_state.into(),
            condition: Condition::default(),
            priority: 0,
            description: String::new(),
            is_active: true,
        }
    }

    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    /// Returns true if this rule is keyed by `(from, to)`.
    pub fn matches(&self, from: &str, to: &str) -> bool {
        names_match(&self.from_state, from) && names_match(&self.to_state, to)
    }

    /// Returns true if either endpoint is `state`.
    pub fn touches(&self, state: &str) -> bool {
        names_match(&self.from_state, state) || names_match(&self.to_state, state)
    }

    pub fn evaluate(
        &self,
        snapshot: &EntitySnapshot,
        now: DateTime<Utc>,
    ) -> Result<bool, ConditionError> {
        self.condition.evaluate(snapshot, now)
    }

    pub fn info(&self) -> RuleInfo {
        RuleInfo {
            from_state: self.from_state.clone(),
            to_state: self.to_state.clone(),
            condition: self.condition.expression().to_string(),
            priority: self.priority,
            description: self.description.clone(),
            is_active: self.is_active,
        }
    }
}

/// Fluent construction of a [`TransitionRule`].
#[derive(Debug, Clone, Default)]
pub struct RuleBuilder {
    from_state: String,
    to_state: String,
    condition: Condition,
    priority: i32,
    description: String,
    inactive: bool,
}

impl RuleBuilder {
    pub fn from(mut self, state: impl Into<String>) -> Self {
        self.from_state = state.into();
        self
    }

    pub fn to(mut self, state: impl Into<String>) -> Self {
        self.to_state = state.into();
        self
    }

    /// Uses a token from the declarative vocabulary.
    pub fn condition(mut self, expr: ConditionExpr) -> Self {
        self.condition = Condition::Expr(expr);
        self
    }

    /// Uses an arbitrary fallible predicate.
    pub fn when<F>(mut self, label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&EntitySnapshot, DateTime<Utc>) -> Result<bool, ConditionError>
            + Send
            + Sync
            + 'static,
    {
        self.condition = Condition::from_fn(label, predicate);
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.inactive = !active;
        self
    }

    pub fn build(self) -> TransitionRule {
        TransitionRule {
            from_state: self.from_state,
            to_state: self.to_state,
            condition: self.condition,
            priority: self.priority,
            description: self.description,
            is_active: !self.inactive,
        }
    }
}

/// Introspectable view of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleInfo {
    pub from_state: String,
    pub to_state: String,
    pub condition: String,
    pub priority: i32,
    pub description: String,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let rule = TransitionRule::builder().from("New").to("Done").build();

        assert_eq!(rule.from_state, "New");
        assert_eq!(rule.to_state, "Done");
        assert_eq!(rule.priority, 0);
        assert!(rule.is_active);
        assert_eq!(rule.condition.expression(), "never");
    }

    #[test]
    fn test_builder_all_fields() {
        let rule = TransitionRule::builder()
            .from("New")
            .to("InProgress")
            .condition(ConditionExpr::HasName)
            .priority(10)
            .description("start work")
            .active(false)
            .build();

        let info = rule.info();
        assert_eq!(info.condition, "has_name");
        assert_eq!(info.priority, 10);
        assert_eq!(info.description, "start work");
        assert!(!info.is_active);
    }

    #[test]
    fn test_matches_and_touches() {
        let rule = TransitionRule::new("New", "InProgress");

        assert!(rule.matches("new", "INPROGRESS"));
        assert!(!rule.matches("InProgress", "New"));
        assert!(rule.touches("inprogress"));
        assert!(rule.touches("NEW"));
        assert!(!rule.touches("Done"));
    }

    #[test]
    fn test_evaluate_delegates_to_condition() {
        let rule = TransitionRule::builder()
            .from("New")
            .to("Cancelled")
            .when("fails", |_: &EntitySnapshot, _| {
                Err(ConditionError::failed("clock unavailable"))
            })
            .build();

        assert!(rule.evaluate(&EntitySnapshot::new("New"), Utc::now()).is_err());
    }
}
