//! Rule conditions.
//!
//! Declarative definitions name their conditions with a token from a fixed
//! vocabulary (matched case-insensitively):
//!
//! - `has_name` - the entity has a non-blank name
//! - `no_name` - the name is absent or blank
//! - `older_than_10_minutes` - last update is more than 10 minutes ago
//! - `older_than_1_day` - creation is at least one day ago
//! - `always` - constant true
//! - `never` - constant false
//!
//! Unknown tokens are rejected when the definition is validated. Rules built
//! in code may instead carry an arbitrary predicate via [`Condition::from_fn`].

use crate::error::{ConditionError, CoreError};
use crate::snapshot::EntitySnapshot;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;

/// A compiled condition token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConditionExpr {
    HasName,
    NoName,
    OlderThan10Minutes,
    OlderThan1Day,
    Always,
    #[default]
    Never,
}

impl ConditionExpr {
    /// Every token in the vocabulary.
    pub const ALL: [ConditionExpr; 6] = [
        ConditionExpr::HasName,
        ConditionExpr::NoName,
        ConditionExpr::OlderThan10Minutes,
        ConditionExpr::OlderThan1Day,
        ConditionExpr::Always,
        ConditionExpr::Never,
    ];

    /// Compiles a condition token.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let token = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|expr| expr.as_str() == token)
            .ok_or_else(|| CoreError::InvalidDefinition {
                reason: format!("unknown condition expression '{}'", s.trim()),
            })
    }

    /// Returns the canonical token.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionExpr::HasName => "has_name",
            ConditionExpr::NoName => "no_name",
            ConditionExpr::OlderThan10Minutes => "older_than_10_minutes",
            ConditionExpr::OlderThan1Day => "older_than_1_day",
            ConditionExpr::Always => "always",
            ConditionExpr::Never => "never",
        }
    }

    /// Evaluates the condition against a snapshot at instant `now`.
    pub fn evaluate(&self, snapshot: &EntitySnapshot, now: DateTime<Utc>) -> bool {
        match self {
            ConditionExpr::HasName => snapshot.has_name(),
            ConditionExpr::NoName => !snapshot.has_name(),
            ConditionExpr::OlderThan10Minutes => snapshot
                .updated_at
                .map(|updated| now - updated > Duration::minutes(10))
                .unwrap_or(false),
            ConditionExpr::OlderThan1Day => now - snapshot.created_at >= Duration::days(1),
            ConditionExpr::Always => true,
            ConditionExpr::Never => false,
        }
    }
}

impl FromStr for ConditionExpr {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ConditionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type PredicateFn =
    dyn Fn(&EntitySnapshot, DateTime<Utc>) -> Result<bool, ConditionError> + Send + Sync;

/// The predicate attached to a transition rule.
#[derive(Clone)]
pub enum Condition {
    /// A token from the declarative vocabulary.
    Expr(ConditionExpr),
    /// A predicate supplied in code, identified by `label` in introspection.
    Custom {
        label: String,
        predicate: Arc<PredicateFn>,
    },
}

impl Condition {
    /// Wraps a fallible predicate.
    pub fn from_fn<F>(label: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&EntitySnapshot, DateTime<Utc>) -> Result<bool, ConditionError>
            + Send
            + Sync
            + 'static,
    {
        Condition::Custom {
            label: label.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Returns the token or label describing this condition.
    pub fn expression(&self) -> &str {
        match self {
            Condition::Expr(expr) => expr.as_str(),
            Condition::Custom { label, .. } => label,
        }
    }

    /// Evaluates the condition. A panicking custom predicate is reported as
    /// [`ConditionError::Panicked`].
    ///
    /// The process panic hook still runs before the panic is caught, so the
    /// default hook prints its message to stderr. Install a quieter hook with
    /// [`std::panic::set_hook`] if that output is unwanted.
    pub fn evaluate(
        &self,
        snapshot: &EntitySnapshot,
        now: DateTime<Utc>,
    ) -> Result<bool, ConditionError> {
        match self {
            Condition::Expr(expr) => Ok(expr.evaluate(snapshot, now)),
            Condition::Custom { predicate, .. } => {
                panic::catch_unwind(AssertUnwindSafe(|| predicate(snapshot, now))).unwrap_or_else(
                    |payload| {
                        let message = payload
                            .downcast_ref::<&str>()
                            .map(|s| s.to_string())
                            .or_else(|| payload.downcast_ref::<String>().cloned())
                            .unwrap_or_else(|| "unknown panic".to_string());
                        Err(ConditionError::Panicked { message })
                    },
                )
            }
        }
    }
}

impl Default for Condition {
    fn default() -> Self {
        Condition::Expr(ConditionExpr::Never)
    }
}

impl From<ConditionExpr> for Condition {
    fn from(expr: ConditionExpr) -> Self {
        Condition::Expr(expr)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Expr(expr) => f.debug_tuple("Expr").field(expr).finish(),
            Condition::Custom { label, .. } => {
                f.debug_struct("Custom").field("label", label).finish()
            }
        }
    }
}
