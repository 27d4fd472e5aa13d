//! Permission groups: the predicates relevant to one object type.

use std::any::Any;
use std::marker::PhantomData;

use field_authz_sdk::{ConfigError, Predicate, PredicateFailure};
use graphguard_security::{Entity, EntityRef, RequestContext};

/// A named set of predicates over one entity type.
///
/// Each check is registered explicitly through [`PermissionGroupBuilder::check`]
/// and published under the qualified name `"<group>.<check>"`, which is also
/// the predicate part of its permission cache key.
///
/// # Example
///
/// ```ignore
/// let deal_perms = PermissionGroup::builder::<Deal>("deal")
///     .check("seller_in_deal", |deal, ctx| {
///         Ok(ctx.principal().is_some_and(|p| deal.seller_ids.iter().any(|id| p.is(&seller(*id)))))
///     })
///     .build();
///
/// let seller_in_deal = deal_perms.require("seller_in_deal")?;
/// ```
#[derive(Debug, Clone)]
pub struct PermissionGroup {
    name: String,
    entity_type: &'static str,
    checks: Vec<(String, Predicate)>,
}

impl PermissionGroup {
    #[must_use]
    pub fn builder<E: Entity>(name: impl Into<String>) -> PermissionGroupBuilder<E> {
        PermissionGroupBuilder {
            name: name.into(),
            checks: Vec::new(),
            _entity: PhantomData,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust type the group's predicates expect.
    #[must_use]
    pub fn entity_type(&self) -> &'static str {
        self.entity_type
    }

    /// Look up a predicate by its short check name.
    #[must_use]
    pub fn get(&self, check: &str) -> Option<&Predicate> {
        self.checks
            .iter()
            .find(|(name, _)| name == check)
            .map(|(_, p)| p)
    }

    /// Like [`Self::get`], for schema declarations that must not reference
    /// missing checks.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UndefinedPredicate`] if the group has no such check.
    pub fn require(&self, check: &str) -> Result<Predicate, ConfigError> {
        self.get(check)
            .cloned()
            .ok_or_else(|| ConfigError::UndefinedPredicate(format!("{}.{check}", self.name)))
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.checks.iter().map(|(_, p)| p)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

pub struct PermissionGroupBuilder<E> {
    name: String,
    checks: Vec<(String, Predicate)>,
    _entity: PhantomData<fn(&E)>,
}

impl<E: Entity> PermissionGroupBuilder<E> {
    /// Register one typed check.
    ///
    /// The stored predicate downcasts the object it is handed; an object of
    /// another type fails with [`PredicateFailure::EntityMismatch`].
    #[must_use]
    pub fn check<F>(mut self, check: &str, f: F) -> Self
    where
        F: Fn(&E, &RequestContext) -> Result<bool, PredicateFailure> + Send + Sync + 'static,
    {
        let qualified = format!("{}.{check}", self.name);
        let predicate = Predicate::object(qualified, move |entity, ctx| {
            let any: &dyn Any = entity;
            let typed =
                any.downcast_ref::<E>()
                    .ok_or_else(|| PredicateFailure::EntityMismatch {
                        expected: std::any::type_name::<E>(),
                        found: entity.type_name().to_owned(),
                    })?;
            f(typed, ctx)
        });
        self.checks.push((check.to_owned(), predicate));
        self
    }

    /// Register a check that needs only the object's identity.
    ///
    /// Unlike [`Self::check`] it accepts a loaded row or a bare
    /// [`EntityRef`], so it can guard an entry point before the row is read.
    #[must_use]
    pub fn check_ref<F>(mut self, check: &str, f: F) -> Self
    where
        F: Fn(&EntityRef, &RequestContext) -> Result<bool, PredicateFailure> + Send + Sync + 'static,
    {
        let qualified = format!("{}.{check}", self.name);
        let predicate = Predicate::object(qualified, move |entity, ctx| f(&entity.entity_ref(), ctx));
        self.checks.push((check.to_owned(), predicate));
        self
    }

    #[must_use]
    pub fn build(self) -> PermissionGroup {
        PermissionGroup {
            name: self.name,
            entity_type: std::any::type_name::<E>(),
            checks: self.checks,
        }
    }
}
