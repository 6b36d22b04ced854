//! # ruleflow-core
//!
//! Rule-based state machine engine for ruleflow.
//!
//! This crate provides:
//! - Declarative machine definitions and their validation
//! - Condition compilation from a fixed token vocabulary
//! - Priority-ordered rule storage
//! - Transition legality checks and automatic next-state resolution
//! - A registry of independently configured machines

pub mod condition;
pub mod definition;
pub mod error;
pub mod machine;
pub mod registry;
pub mod rule;
pub mod snapshot;
pub mod state;
pub mod store;

pub use condition::{Condition, ConditionExpr};
pub use definition::{
    MachineDefinition, StateDefinition, TransitionDefinition, ValidatedDefinition,
    DEFAULT_MACHINE_ID,
};
pub use error::{ConditionError, CoreError, ErrorKind};
pub use machine::{
    MachineInfo, MachineManager, MachineSummary, StateMachineInstance, TransitionQuery,
};
pub use registry::StateMachineRegistry;
pub use rule::{RuleBuilder, RuleInfo, TransitionRule};
pub use snapshot::EntitySnapshot;
pub use state::StateSet;
pub use store::RuleStore;
