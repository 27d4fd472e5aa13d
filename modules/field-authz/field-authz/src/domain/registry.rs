//! Predicate registry and per-request memoization.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use field_authz_sdk::{ConfigError, EvaluationError, Predicate, PredicateRef};
use graphguard_security::{Entity, PermissionCacheKey, RequestContext};

use super::builtins;
use super::group::PermissionGroup;

/// Ordered, immutable list of resolved predicates.
#[derive(Debug, Clone, Default)]
pub struct PredicateList(Arc<[Predicate]>);

impl PredicateList {
    pub fn iter(&self) -> impl Iterator<Item = &Predicate> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(Predicate::name)
    }
}

impl<'a> IntoIterator for &'a PredicateList {
    type Item = &'a Predicate;
    type IntoIter = std::slice::Iter<'a, Predicate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Every predicate the schema may reference, by name.
///
/// Built once at startup. Always contains the built-ins (`public`,
/// `logged_in`, `staff`, `self`) plus every registered [`PermissionGroup`].
///
/// [`PredicateRegistry::evaluate`] is the single path through which
/// predicates run: results for an object are memoized on the
/// [`RequestContext`], failures are not.
#[derive(Debug)]
pub struct PredicateRegistry {
    predicates: HashMap<Arc<str>, Predicate>,
}

impl PredicateRegistry {
    #[must_use]
    pub fn builder() -> PredicateRegistryBuilder {
        PredicateRegistryBuilder::default()
    }

    /// Look up a predicate by name (role aliases included).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Predicate> {
        self.predicates.get(builtins::canonical(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Resolve schema references into callable predicates.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::UnknownRole`] for a name nothing is registered under
    /// - [`ConfigError::UndefinedPredicate`] for a handle that is not the
    ///   registered predicate of that name
    pub fn resolve<I, R>(&self, refs: I) -> Result<PredicateList, ConfigError>
    where
        I: IntoIterator<Item = R>,
        R: Into<PredicateRef>,
    {
        let resolved = refs
            .into_iter()
            .map(|r| self.resolve_one(r.into()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PredicateList(resolved.into()))
    }

    fn resolve_one(&self, r: PredicateRef) -> Result<Predicate, ConfigError> {
        match r {
            PredicateRef::Named(name) => self
                .get(&name)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownRole(name.into_owned())),
            PredicateRef::Predicate(p) => match self.get(p.name()) {
                Some(registered) if registered.is_same(&p) => Ok(p),
                _ => Err(ConfigError::UndefinedPredicate(p.name().to_owned())),
            },
        }
    }

    /// Evaluate one predicate for one object within a request.
    ///
    /// With an object, the predicate is answered from the request's
    /// permission cache when possible; otherwise it runs and its answer is
    /// stored under `(type, id, predicate)` for the rest of the request. This
    /// holds for request-scoped predicates too. Without an object nothing is
    /// cached.
    ///
    /// # Errors
    ///
    /// [`EvaluationError::PredicateFailed`] if the predicate body fails. The
    /// failure is not cached, so the next check re-invokes the predicate.
    pub fn evaluate(
        &self,
        predicate: &Predicate,
        entity: Option<&dyn Entity>,
        ctx: &RequestContext,
    ) -> Result<bool, EvaluationError> {
        let key = entity.map(|entity| PermissionCacheKey::for_entity(entity, predicate.shared_name()));

        if let Some(hit) = key.as_ref().and_then(|k| ctx.cached_permission(k)) {
            return Ok(hit);
        }

        let allowed =
            predicate
                .invoke(entity, ctx)
                .map_err(|source| EvaluationError::PredicateFailed {
                    predicate: predicate.name().to_owned(),
                    source,
                })?;

        Ok(match key {
            Some(key) => ctx.cache_permission(key, allowed),
            None => allowed,
        })
    }

    /// [`Self::evaluate`] by predicate name.
    ///
    /// # Errors
    ///
    /// - [`EvaluationError::UnknownPredicate`] if nothing is registered under `name`
    /// - [`EvaluationError::PredicateFailed`] if the predicate body fails
    pub fn evaluate_named(
        &self,
        name: &str,
        entity: Option<&dyn Entity>,
        ctx: &RequestContext,
    ) -> Result<bool, EvaluationError> {
        let predicate = self
            .get(name)
            .ok_or_else(|| EvaluationError::UnknownPredicate(name.to_owned()))?;
        self.evaluate(predicate, entity, ctx)
    }
}

#[derive(Default)]
pub struct PredicateRegistryBuilder {
    predicates: Vec<Predicate>,
}

impl PredicateRegistryBuilder {
    /// Register every check of a permission group.
    #[must_use]
    pub fn group(mut self, group: &PermissionGroup) -> Self {
        self.predicates.extend(group.predicates().cloned());
        self
    }

    /// Register a standalone predicate.
    #[must_use]
    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// # Errors
    ///
    /// [`ConfigError::DuplicatePredicate`] if two predicates share a name or a
    /// predicate shadows a built-in.
    pub fn build(self) -> Result<PredicateRegistry, ConfigError> {
        let mut predicates = HashMap::new();
        for predicate in builtins::all().into_iter().chain(self.predicates) {
            let name = predicate.shared_name();
            if name.as_ref() == builtins::IS_STAFF {
                return Err(ConfigError::DuplicatePredicate(name.to_string()));
            }
            match predicates.entry(name) {
                Entry::Occupied(e) => {
                    return Err(ConfigError::DuplicatePredicate(e.key().to_string()));
                }
                Entry::Vacant(e) => {
                    e.insert(predicate);
                }
            }
        }
        Ok(PredicateRegistry { predicates })
    }
}
