//! Declarative state machine definitions.
//!
//! Definitions use a JSON (or YAML) document:
//!
//! ```json
//! {
//!   "id": "review",
//!   "name": "Document review",
//!   "initialState": "Draft",
//!   "states": ["Draft", {"name": "Review", "description": "Awaiting review"}, "Done"],
//!   "transitions": [
//!     {"fromState": "Draft", "toState": "Review", "conditionExpression": "has_name", "priority": 10},
//!     {"fromState": "Review", "toState": "Done", "conditionExpression": "older_than_1_day"}
//!   ]
//! }
//! ```
//!
//! States may be bare names or objects. `isFinal` and `isTerminal` are kept
//! for round-tripping but have no effect on evaluation.

use crate::condition::{Condition, ConditionExpr};
use crate::error::CoreError;
use crate::rule::TransitionRule;
use crate::state::StateSet;
use serde::{Deserialize, Serialize};

/// Id of the machine every registry is bootstrapped with.
pub const DEFAULT_MACHINE_ID: &str = "default-workflow";

/// A state entry in a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDefinition {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub is_final: bool,

    #[serde(default)]
    pub is_terminal: bool,
}

impl StateDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            is_final: false,
            is_terminal: false,
        }
    }
}

impl From<&str> for StateDefinition {
    fn from(name: &str) -> Self {
        Self::new(name, "")
    }
}

/// A transition entry in a definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionDefinition {
    pub from_state: String,

    pub to_state: String,

    /// Condition token, see [`crate::condition`].
    #[serde(default = "default_condition")]
    pub condition_expression: String,

    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub description: String,
}

fn default_condition() -> String {
    ConditionExpr::Never.as_str().to_string()
}

impl TransitionDefinition {
    pub fn new(
        from_state: impl Into<String>,
        to_state: impl Into<String>,
        condition_expression: impl Into<String>,
        priority: i32,
        description: impl Into<String>,
    ) -> Self {
        Self {
            from_state: from_state.into(),
            to_state: to_state.into(),
            condition_expression: condition_expression.into(),
            priority,
            description: description.into(),
        }
    }
}

fn deserialize_states<'de, D>(deserializer: D) -> Result<Vec<StateDefinition>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StateEntry {
        Name(String),
        Full(StateDefinition),
    }

    let entries = Vec::<StateEntry>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .map(|entry| match entry {
            StateEntry::Name(name) => StateDefinition::new(name, ""),
            StateEntry::Full(def) => def,
        })
        .collect())
}

/// A complete machine definition as supplied by callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineDefinition {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    pub initial_state: String,

    #[serde(deserialize_with = "deserialize_states")]
    pub states: Vec<StateDefinition>,

    #[serde(default)]
    pub transitions: Vec<TransitionDefinition>,
}

/// A definition that passed validation, ready to be swapped into a machine.
#[derive(Debug, Clone)]
pub struct ValidatedDefinition {
    pub id: String,
    pub name: String,
    pub initial_state: String,
    pub states: StateSet,
    pub rules: Vec<TransitionRule>,
    pub checksum: String,
}

impl MachineDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        initial_state: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            initial_state: initial_state.into(),
            states: Vec::new(),
            transitions: Vec::new(),
        }
    }

    pub fn with_state(mut self, state: impl Into<StateDefinition>) -> Self {
        self.states.push(state.into());
        self
    }

    pub fn with_transition(mut self, transition: TransitionDefinition) -> Self {
        self.transitions.push(transition);
        self
    }

    /// The machine registered under [`DEFAULT_MACHINE_ID`] at startup.
    pub fn default_workflow() -> Self {
        Self::new(DEFAULT_MACHINE_ID, "Default Workflow", "New")
            .with_state(StateDefinition::new("New", "Initial state"))
            .with_state(StateDefinition::new("InProgress", "Work in progress"))
            .with_state(StateDefinition::new("Completed", "Work completed"))
            .with_state(StateDefinition::new("Cancelled", "Work cancelled"))
            .with_state(StateDefinition::new("Archived", "Work archived"))
            .with_transition(TransitionDefinition::new(
                "New",
                "InProgress",
                "has_name",
                10,
                "Move to InProgress when name is provided",
            ))
            .with_transition(TransitionDefinition::new(
                "New",
                "Cancelled",
                "no_name",
                5,
                "Cancel when name is not provided",
            ))
            .with_transition(TransitionDefinition::new(
                "InProgress",
                "Completed",
                "older_than_10_minutes",
                10,
                "Complete after 10 minutes of work",
            ))
            .with_transition(TransitionDefinition::new(
                "Completed",
                "Archived",
                "older_than_1_day",
                10,
                "Archive after 1 day",
            ))
    }

    /// Parses a definition from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parses a definition from a JSON value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, CoreError> {
        Ok(serde_json::from_value(value.clone())?)
    }

    pub fn to_json(&self) -> Result<serde_json::Value, CoreError> {
        Ok(serde_json::to_value(self)?)
    }

    /// CRC32C of the JSON encoding, as eight hex digits.
    pub fn checksum(&self) -> Result<String, CoreError> {
        let json_bytes = serde_json::to_vec(self)?;
        Ok(format!("{:08x}", crc32c::crc32c(&json_bytes)))
    }

    /// Checks the whole definition and compiles its rules.
    ///
    /// Nothing is mutated here; a machine only applies the result once
    /// every check has passed.
    pub fn validate(&self) -> Result<ValidatedDefinition, CoreError> {
        let mut states = StateSet::new();
        for state in &self.states {
            if state.name.trim().is_empty() {
                return Err(CoreError::invalid("state names must not be blank"));
            }
            states.insert(state.name.clone());
        }

        let initial_state = states
            .get(&self.initial_state)
            .ok_or_else(|| {
                CoreError::invalid(format!(
                    "initial state '{}' is not defined in the states list",
                    self.initial_state
                ))
            })?
            .to_string();

        let mut rules: Vec<TransitionRule> = Vec::with_capacity(self.transitions.len());
        for t in &self.transitions {
            let from = states.get(&t.from_state).ok_or_else(|| {
                CoreError::invalid(format!("from state '{}' is not defined", t.from_state))
            })?;
            let to = states.get(&t.to_state).ok_or_else(|| {
                CoreError::invalid(format!("to state '{}' is not defined", t.to_state))
            })?;

            if rules.iter().any(|r| r.matches(from, to)) {
                return Err(CoreError::invalid(format!(
                    "duplicate transition from '{}' to '{}'",
                    from, to
                )));
            }

            let condition = ConditionExpr::parse(&t.condition_expression)?;
            rules.push(TransitionRule {
                from_state: from.to_string(),
                to_state: to.to_string(),
                condition: Condition::Expr(condition),
                priority: t.priority,
                description: t.description.clone(),
                is_active: true,
            });
        }

        Ok(ValidatedDefinition {
            id: self.id.clone(),
            name: self.name.clone(),
            initial_state,
            states,
            rules,
            checksum: self.checksum()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_definition() -> serde_json::Value {
        serde_json::json!({
            "id": "review",
            "name": "Document review",
            "initialState": "draft",
            "states": [
                "Draft",
                {"name": "Review", "description": "Awaiting review", "isFinal": false},
                {"name": "Done", "isTerminal": true}
            ],
            "transitions": [
                {"fromState": "Draft", "toState": "Review", "conditionExpression": "HAS_NAME", "priority": 10},
                {"fromState": "review", "toState": "done", "conditionExpression": "older_than_1_day"}
            ]
        })
    }

    #[test]
    fn test_parse_definition() {
        let def = MachineDefinition::from_value(&sample_definition()).unwrap();

        assert_eq!(def.id, "review");
        assert_eq!(def.states.len(), 3);
        assert_eq!(def.states[0].name, "Draft");
        assert_eq!(def.states[1].description, "Awaiting review");
        assert!(def.states[2].is_terminal);
        assert_eq!(def.transitions[1].priority, 0);
    }

    #[test]
    fn test_validate_canonicalizes_names() {
        let validated = MachineDefinition::from_value(&sample_definition())
            .unwrap()
            .validate()
            .unwrap();

        assert_eq!(validated.initial_state, "Draft");
        assert_eq!(validated.rules.len(), 2);
        assert_eq!(validated.rules[1].from_state, "Review");
        assert_eq!(validated.rules[1].to_state, "Done");
        assert_eq!(validated.rules[0].condition.expression(), "has_name");
        assert_eq!(validated.checksum.len(), 8);
    }

    #[test]
    fn test_missing_condition_defaults_to_never() {
        let def = MachineDefinition::from_json(
            r#"{"initialState": "a", "states": ["a", "b"],
                "transitions": [{"fromState": "a", "toState": "b"}]}"#,
        )
        .unwrap();

        assert_eq!(def.transitions[0].condition_expression, "never");
        assert!(def.validate().is_ok());
    }

    #[test]
    fn test_invalid_initial_state() {
        let def = MachineDefinition::new("m", "M", "c")
            .with_state("a")
            .with_state("b");

        let result = def.validate();
        assert!(matches!(result, Err(CoreError::InvalidDefinition { .. })));
    }

    #[test]
    fn test_invalid_transition_source() {
        let def = MachineDefinition::new("m", "M", "a")
            .with_state("a")
            .with_state("b")
            .with_transition(TransitionDefinition::new("x", "b", "always", 0, ""));

        let result = def.validate();
        assert!(matches!(result, Err(CoreError::InvalidDefinition { .. })));
    }

    #[test]
    fn test_invalid_transition_target() {
        let def = MachineDefinition::new("m", "M", "a")
            .with_state("a")
            .with_transition(TransitionDefinition::new("a", "z", "always", 0, ""));

        assert!(matches!(
            def.validate(),
            Err(CoreError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_unknown_condition_rejected() {
        let def = MachineDefinition::new("m", "M", "a")
            .with_state("a")
            .with_state("b")
            .with_transition(TransitionDefinition::new("a", "b", "when_ready", 0, ""));

        match def.validate() {
            Err(CoreError::InvalidDefinition { reason }) => {
                assert!(reason.contains("when_ready"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_transition_rejected() {
        let def = MachineDefinition::new("m", "M", "a")
            .with_state("a")
            .with_state("b")
            .with_transition(TransitionDefinition::new("a", "b", "always", 1, ""))
            .with_transition(TransitionDefinition::new("A", "B", "never", 2, ""));

        assert!(matches!(
            def.validate(),
            Err(CoreError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_blank_state_rejected() {
        let def = MachineDefinition::new("m", "M", "a")
            .with_state("a")
            .with_state("  ");

        assert!(matches!(
            def.validate(),
            Err(CoreError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_default_workflow_is_valid() {
        let validated = MachineDefinition::default_workflow().validate().unwrap();

        assert_eq!(validated.id, DEFAULT_MACHINE_ID);
        assert_eq!(validated.initial_state, "New");
        assert_eq!(validated.states.len(), 5);
        assert_eq!(validated.rules.len(), 4);
    }

    #[test]
    fn test_checksum_is_stable() {
        let a = MachineDefinition::default_workflow();
        let b = MachineDefinition::default_workflow();
        assert_eq!(a.checksum().unwrap(), b.checksum().unwrap());

        let c = a.clone().with_state("Extra");
        assert_ne!(a.checksum().unwrap(), c.checksum().unwrap());
    }
}
