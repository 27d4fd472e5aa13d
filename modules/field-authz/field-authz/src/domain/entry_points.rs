use std::collections::HashMap;
use std::sync::Arc;

use field_authz_sdk::{ConfigError, PredicateRef};

use super::registry::{PredicateList, PredicateRegistry};

/// A privileged operation (node lookup, mutation) and the predicates that
/// must allow the caller before it runs.
#[derive(Debug, Clone)]
pub struct EntryPoint {
    name: Arc<str>,
    requirements: PredicateList,
}

impl EntryPoint {
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, requirements: PredicateList) -> Self {
        Self {
            name: name.into(),
            requirements,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn requirements(&self) -> &PredicateList {
        &self.requirements
    }
}

/// Named entry points, resolved at startup.
#[derive(Debug)]
pub struct EntryPointRegistry {
    registry: Arc<PredicateRegistry>,
    entries: HashMap<Arc<str>, EntryPoint>,
}

impl EntryPointRegistry {
    #[must_use]
    pub fn new(registry: Arc<PredicateRegistry>) -> Self {
        Self {
            registry,
            entries: HashMap::new(),
        }
    }

    /// # Errors
    ///
    /// - [`ConfigError::DuplicateEntryPoint`] if `name` is already registered
    /// - [`ConfigError::UnknownRole`] / [`ConfigError::UndefinedPredicate`]
    ///   if a requirement does not resolve
    pub fn register<I, R>(&mut self, name: &str, refs: I) -> Result<EntryPoint, ConfigError>
    where
        I: IntoIterator<Item = R>,
        R: Into<PredicateRef>,
    {
        if self.entries.contains_key(name) {
            return Err(ConfigError::DuplicateEntryPoint(name.to_owned()));
        }
        let entry = EntryPoint::new(name, self.registry.resolve(refs)?);
        self.entries.insert(entry.name.clone(), entry.clone());
        Ok(entry)
    }

    /// # Errors
    ///
    /// [`ConfigError::UnknownEntryPoint`] if nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<&EntryPoint, ConfigError> {
        self.entries
            .get(name)
            .ok_or_else(|| ConfigError::UnknownEntryPoint(name.to_owned()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
