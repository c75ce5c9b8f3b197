//! Corpus-wide set of defined names.

use crate::method::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Every definition name seen anywhere in the corpus.
///
/// Built once from the definitions-only pass and then only read. Call-site
/// detection consults it to tell a sibling method from a local variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinedMethodRegistry {
    names: BTreeSet<String>,
}

impl DefinedMethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the names of the given definitions.
    pub fn from_methods<'a>(methods: impl IntoIterator<Item = &'a Method>) -> Self {
        let mut registry = Self::new();
        registry.extend_from_methods(methods);
        registry
    }

    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    /// Import, export and template records are skipped: they name a module
    /// or a file, not something a call site can reach.
    pub fn extend_from_methods<'a>(&mut self, methods: impl IntoIterator<Item = &'a Method>) {
        self.names.extend(
            methods
                .into_iter()
                .filter(|m| m.kind.is_resolvable())
                .map(|m| m.name.clone()),
        );
    }

    /// Merge another registry into this one.
    pub fn union(&mut self, other: &DefinedMethodRegistry) {
        self.names.extend(other.names.iter().cloned());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl FromIterator<String> for DefinedMethodRegistry {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for DefinedMethodRegistry {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(String::from).collect(),
        }
    }
}
