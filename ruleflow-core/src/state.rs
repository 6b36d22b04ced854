//! Case-insensitive state name sets.

use serde::{Deserialize, Serialize};

/// Returns true if two state names refer to the same state.
pub fn names_match(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// An ordered set of state names with case-insensitive identity.
///
/// The first spelling inserted for a name is the one that is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSet {
    names: Vec<String>,
}

impl StateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored spelling of `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|n| names_match(n, name))
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Inserts a name. Returns false if it was already present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    /// Removes a name. Returns false if it was not present.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.names.len();
        self.names.retain(|n| !names_match(n, name));
        self.names.len() != before
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.names.clone()
    }
}

impl<S: Into<String>> FromIterator<S> for StateSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = StateSet::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}
