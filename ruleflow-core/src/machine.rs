//! State machine instances.
//!
//! A [`StateMachineInstance`] owns its state set, initial state and rule
//! store. Callers reach it through two capability traits: [`TransitionQuery`]
//! for read-only decisions and [`MachineManager`] for changes to the
//! machine itself.

use crate::definition::{MachineDefinition, StateDefinition};
use crate::error::CoreError;
use crate::rule::{RuleInfo, TransitionRule};
use crate::snapshot::EntitySnapshot;
use crate::state::{names_match, StateSet};
use crate::store::RuleStore;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Read-only transition decisions.
pub trait TransitionQuery: Send + Sync {
    /// State new entities start in.
    fn initial_state(&self) -> String;

    fn state_exists(&self, name: &str) -> bool;

    fn all_states(&self) -> Vec<String>;

    /// Returns true if an active rule connects `current` to `next`.
    ///
    /// This is a structural check: the rule's condition is not evaluated.
    fn can_transition(&self, current: &str, next: &str) -> bool;

    /// Picks the automatic next state for `snapshot`, if any rule fires.
    fn next_state(&self, snapshot: &EntitySnapshot) -> Option<String>;

    /// Target states of active rules leaving `state`, in evaluation order.
    fn available_transitions(&self, state: &str) -> Vec<String>;
}

/// Mutating operations on a machine.
pub trait MachineManager: Send + Sync {
    /// Replaces states, initial state and rules with `definition`.
    fn define(&self, definition: &MachineDefinition) -> Result<(), CoreError>;

    fn add_state(&self, state: &StateDefinition) -> Result<(), CoreError>;

    /// Removes a state and every rule that references it.
    fn remove_state(&self, name: &str) -> Result<(), CoreError>;

    fn add_rule(&self, rule: TransitionRule) -> Result<(), CoreError>;

    fn update_rule(&self, rule: TransitionRule) -> Result<(), CoreError>;

    fn remove_rule(&self, from: &str, to: &str) -> Result<(), CoreError>;

    fn info(&self) -> MachineInfo;
}

/// Full description of a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineInfo {
    pub id: String,
    pub name: String,
    pub initial_state: String,
    pub states: Vec<String>,
    pub rules: Vec<RuleInfo>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    /// Checksum of the last applied definition.
    pub checksum: String,
}

/// Condensed description used for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineSummary {
    pub id: String,
    pub name: String,
    pub initial_state: String,
    pub state_count: usize,
    pub rule_count: usize,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Debug)]
struct MachineState {
    id: String,
    name: String,
    initial_state: String,
    states: StateSet,
    checksum: String,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

/// A single configured state machine.
///
/// Lock order is always the machine lock first, then the rule store.
#[derive(Debug)]
pub struct StateMachineInstance {
    inner: RwLock<MachineState>,
    rules: RuleStore,
}

impl StateMachineInstance {
    /// Builds a machine from `definition`. `fallback_id` is used when the
    /// definition carries no id of its own.
    pub fn new(fallback_id: &str, definition: &MachineDefinition) -> Result<Self, CoreError> {
        let validated = definition.validate()?;
        let now = Utc::now();
        let id = if validated.id.trim().is_empty() {
            fallback_id.to_string()
        } else {
            validated.id
        };

        Ok(Self {
            inner: RwLock::new(MachineState {
                id,
                name: validated.name,
                initial_state: validated.initial_state,
                states: validated.states,
                checksum: validated.checksum,
                created_at: now,
                modified_at: now,
            }),
            rules: RuleStore::with_rules(validated.rules),
        })
    }

    pub fn id(&self) -> String {
        self.inner.read().id.clone()
    }

    pub fn name(&self) -> String {
        self.inner.read().name.clone()
    }

    /// Like [`TransitionQuery::next_state`] with an explicit clock.
    ///
    /// Rules are tried highest priority first and the first whose condition
    /// holds wins. A condition that fails is logged and treated as false.
    pub fn next_state_at(&self, snapshot: &EntitySnapshot, now: DateTime<Utc>) -> Option<String> {
        let (machine_id, rules) = {
            let inner = self.inner.read();
            (inner.id.clone(), self.rules.rules_for(&snapshot.state))
        };

        for rule in &rules {
            match rule.evaluate(snapshot, now) {
                Ok(true) => {
                    tracing::debug!(
                        "[{}] rule '{}' -> '{}' matched (priority {})",
                        machine_id,
                        rule.from_state,
                        rule.to_state,
                        rule.priority
                    );
                    return Some(rule.to_state.clone());
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        machine = %machine_id,
                        from = %rule.from_state,
                        to = %rule.to_state,
                        "Skipping rule '{}': {}",
                        rule.description,
                        e
                    );
                }
            }
        }

        None
    }

    /// Lists every rule leaving `state`, active or not, in storage order.
    pub fn rules_for_state(&self, state: &str) -> Result<Vec<RuleInfo>, CoreError> {
        let inner = self.inner.read();
        if !inner.states.contains(state) {
            return Err(CoreError::StateNotFound {
                state: state.to_string(),
            });
        }
        Ok(self
            .rules
            .all_rules()
            .iter()
            .filter(|r| names_match(&r.from_state, state))
            .map(TransitionRule::info)
            .collect())
    }

    pub fn summary(&self) -> MachineSummary {
        let inner = self.inner.read();
        MachineSummary {
            id: inner.id.clone(),
            name: inner.name.clone(),
            initial_state: inner.initial_state.clone(),
            state_count: inner.states.len(),
            rule_count: self.rules.len(),
            created_at: inner.created_at,
            modified_at: inner.modified_at,
        }
    }

    /// Resolves both endpoints of `rule` to their stored spelling.
    fn canonicalize(
        states: &StateSet,
        mut rule: TransitionRule,
    ) -> Result<TransitionRule, CoreError> {
        for endpoint in [&mut rule.from_state, &mut rule.to_state] {
            let stored = states
                .get(endpoint.as_str())
                .ok_or_else(|| CoreError::StateNotFound {
                    state: endpoint.clone(),
                })?;
            *endpoint = stored.to_string();
        }
        Ok(rule)
    }
}

impl TransitionQuery for StateMachineInstance {
    fn initial_state(&self) -> String {
        self.inner.read().initial_state.clone()
    }

    fn state_exists(&self, name: &str) -> bool {
        self.inner.read().states.contains(name)
    }

    fn all_states(&self) -> Vec<String> {
        self.inner.read().states.to_vec()
    }

    fn can_transition(&self, current: &str, next: &str) -> bool {
        if current.trim().is_empty() || next.trim().is_empty() {
            return false;
        }

        let inner = self.inner.read();
        if !inner.states.contains(current) || !inner.states.contains(next) {
            return false;
        }
        self.rules.has_active(current, next)
    }

    fn next_state(&self, snapshot: &EntitySnapshot) -> Option<String> {
        self.next_state_at(snapshot, Utc::now())
    }

    fn available_transitions(&self, state: &str) -> Vec<String> {
        let _inner = self.inner.read();
        self.rules
            .rules_for(state)
            .into_iter()
            .map(|r| r.to_state)
            .collect()
    }
}

impl MachineManager for StateMachineInstance {
    fn define(&self, definition: &MachineDefinition) -> Result<(), CoreError> {
        let validated = definition.validate()?;

        let mut inner = self.inner.write();
        let now = Utc::now();
        if !validated.id.trim().is_empty() {
            inner.id = validated.id;
        }
        inner.name = validated.name;
        inner.initial_state = validated.initial_state;
        inner.states = validated.states;
        inner.checksum = validated.checksum;
        inner.created_at = now;
        inner.modified_at = now;
        let rule_count = validated.rules.len();
        self.rules.replace_all(validated.rules);

        tracing::info!(
            "Defined state machine '{}': {} states, {} rules",
            inner.id,
            inner.states.len(),
            rule_count
        );
        Ok(())
    }

    fn add_state(&self, state: &StateDefinition) -> Result<(), CoreError> {
        if state.name.trim().is_empty() {
            return Err(CoreError::invalid("state names must not be blank"));
        }

        let mut inner = self.inner.write();
        if !inner.states.insert(state.name.clone()) {
            return Err(CoreError::StateExists {
                state: state.name.clone(),
            });
        }
        inner.modified_at = Utc::now();
        Ok(())
    }

    fn remove_state(&self, name: &str) -> Result<(), CoreError> {
        let mut inner = self.inner.write();
        if !inner.states.contains(name) {
            return Err(CoreError::StateNotFound {
                state: name.to_string(),
            });
        }
        if names_match(&inner.initial_state, name) {
            return Err(CoreError::ProtectedState {
                state: inner.initial_state.clone(),
            });
        }

        let removed = self.rules.remove_touching(name);
        inner.states.remove(name);
        inner.modified_at = Utc::now();

        tracing::debug!(
            "[{}] removed state '{}' and {} rule(s)",
            inner.id,
            name,
            removed
        );
        Ok(())
    }

    fn add_rule(&self, rule: TransitionRule) -> Result<(), CoreError> {
        let mut inner = self.inner.write();
        let rule = Self::canonicalize(&inner.states, rule)?;
        self.rules.add(rule)?;
        inner.modified_at = Utc::now();
        Ok(())
    }

    fn update_rule(&self, rule: TransitionRule) -> Result<(), CoreError> {
        let mut inner = self.inner.write();
        let rule = Self::canonicalize(&inner.states, rule)?;
        let (from, to) = (rule.from_state.clone(), rule.to_state.clone());
        if !self.rules.update(rule) {
            return Err(CoreError::RuleNotFound { from, to });
        }
        inner.modified_at = Utc::now();
        Ok(())
    }

    fn remove_rule(&self, from: &str, to: &str) -> Result<(), CoreError> {
        let mut inner = self.inner.write();
        if !self.rules.remove(from, to) {
            return Err(CoreError::RuleNotFound {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        inner.modified_at = Utc::now();
        Ok(())
    }

    fn info(&self) -> MachineInfo {
        let inner = self.inner.read();
        MachineInfo {
            id: inner.id.clone(),
            name: inner.name.clone(),
            initial_state: inner.initial_state.clone(),
            states: inner.states.to_vec(),
            rules: self.rules.all_rules().iter().map(TransitionRule::info).collect(),
            created_at: inner.created_at,
            modified_at: inner.modified_at,
            checksum: inner.checksum.clone(),
        }
    }
}
