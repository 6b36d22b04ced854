//! Registry of state machines keyed by id.

use crate::definition::{MachineDefinition, DEFAULT_MACHINE_ID};
use crate::error::CoreError;
use crate::machine::{MachineManager, MachineSummary, StateMachineInstance, TransitionQuery};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Maps machine ids (case-insensitive) to machines.
///
/// Shard locks are only held for the map operation itself; a machine's own
/// lock is never taken while a shard lock is held.
pub struct StateMachineRegistry {
    /// Machines indexed by lowercased id.
    machines: DashMap<String, Arc<StateMachineInstance>>,

    /// Id that cannot be deleted.
    default_id: String,
}

impl StateMachineRegistry {
    /// Creates a registry holding the built-in default workflow.
    pub fn new() -> Result<Self, CoreError> {
        Self::with_default(MachineDefinition::default_workflow())
    }

    /// Creates a registry whose protected default machine is `definition`.
    ///
    /// The machine is registered under the definition's id, or
    /// [`DEFAULT_MACHINE_ID`] if it has none.
    pub fn with_default(definition: MachineDefinition) -> Result<Self, CoreError> {
        let default_id = if definition.id.trim().is_empty() {
            DEFAULT_MACHINE_ID.to_string()
        } else {
            definition.id.clone()
        };

        let registry = Self {
            machines: DashMap::new(),
            default_id: default_id.clone(),
        };
        registry.create(&default_id, &definition)?;
        Ok(registry)
    }

    fn key(id: &str) -> String {
        id.trim().to_lowercase()
    }

    pub fn default_machine_id(&self) -> &str {
        &self.default_id
    }

    /// A definition may omit its id, but it cannot name another machine.
    fn check_definition_id(id: &str, definition: &MachineDefinition) -> Result<(), CoreError> {
        if definition.id.trim().is_empty() || Self::key(&definition.id) == Self::key(id) {
            return Ok(());
        }
        Err(CoreError::invalid(format!(
            "definition id '{}' does not match machine id '{}'",
            definition.id, id
        )))
    }

    fn is_default(&self, id: &str) -> bool {
        Self::key(id) == Self::key(&self.default_id)
    }

    /// Gets a machine by id.
    pub fn get(&self, id: &str) -> Option<Arc<StateMachineInstance>> {
        self.machines.get(&Self::key(id)).map(|r| r.value().clone())
    }

    /// Gets the read-only view of a machine.
    pub fn query(&self, id: &str) -> Option<Arc<dyn TransitionQuery>> {
        self.get(id).map(|m| m as Arc<dyn TransitionQuery>)
    }

    /// Gets a machine or fails with `MachineNotFound`.
    pub fn require(&self, id: &str) -> Result<Arc<StateMachineInstance>, CoreError> {
        self.get(id).ok_or_else(|| CoreError::MachineNotFound { id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.machines.contains_key(&Self::key(id))
    }

    /// Registers a new machine built from `definition`.
    pub fn create(&self, id: &str, definition: &MachineDefinition) -> Result<(), CoreError> {
        let key = Self::key(id);
        if key.is_empty() {
            return Err(CoreError::invalid("state machine id must not be blank"));
        }
        if self.machines.contains_key(&key) {
            return Err(CoreError::MachineExists { id: id.to_string() });
        }
        Self::check_definition_id(id, definition)?;

        let machine = Arc::new(StateMachineInstance::new(id, definition)?);

        match self.machines.entry(key) {
            Entry::Occupied(_) => Err(CoreError::MachineExists { id: id.to_string() }),
            Entry::Vacant(slot) => {
                slot.insert(machine);
                tracing::info!("Created state machine '{}'", id);
                Ok(())
            }
        }
    }

    /// Redefines an existing machine in place.
    pub fn update(&self, id: &str, definition: &MachineDefinition) -> Result<(), CoreError> {
        let machine = self.require(id)?;
        Self::check_definition_id(id, definition)?;
        machine.define(definition)?;
        tracing::info!("Updated state machine '{}'", id);
        Ok(())
    }

    /// Removes a machine. The default machine cannot be removed.
    pub fn delete(&self, id: &str) -> Result<(), CoreError> {
        if !self.contains(id) {
            return Err(CoreError::MachineNotFound { id: id.to_string() });
        }
        if self.is_default(id) {
            return Err(CoreError::ProtectedMachine {
                id: self.default_id.clone(),
            });
        }

        self.machines
            .remove(&Self::key(id))
            .ok_or_else(|| CoreError::MachineNotFound { id: id.to_string() })?;
        tracing::info!("Deleted state machine '{}'", id);
        Ok(())
    }

    /// Summaries of every registered machine, ordered by id.
    pub fn list_summaries(&self) -> Vec<MachineSummary> {
        let mut machines: Vec<(String, Arc<StateMachineInstance>)> = self
            .machines
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        machines.sort_by(|a, b| a.0.cmp(&b.0));

        machines.into_iter().map(|(_, m)| m.summary()).collect()
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }
}
