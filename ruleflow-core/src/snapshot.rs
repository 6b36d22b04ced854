//! Entity snapshots consumed by condition evaluation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The fields of a persisted entity that rule conditions can see.
///
/// The engine never stores snapshots; callers build one from their own
/// record, ask for a decision, and persist the resulting state themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last state change, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Current state name.
    pub state: String,
}

impl EntitySnapshot {
    /// Creates a snapshot in `state`, created now and never updated.
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            name: None,
            created_at: Utc::now(),
            updated_at: None,
            state: state.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Returns true if the name is present and not blank.
    pub fn has_name(&self) -> bool {
        self.name
            .as_deref()
            .map(|n| !n.trim().is_empty())
            .unwrap_or(false)
    }
}
