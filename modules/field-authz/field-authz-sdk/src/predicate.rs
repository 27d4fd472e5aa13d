//! Named permission predicates and references to them.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use graphguard_security::{Entity, RequestContext};

use crate::error::StoreError;

type RequestCheck = dyn Fn(&RequestContext) -> Result<bool, PredicateFailure> + Send + Sync;
type ObjectCheck =
    dyn Fn(&dyn Entity, &RequestContext) -> Result<bool, PredicateFailure> + Send + Sync;

#[derive(Clone)]
enum Check {
    Request(Arc<RequestCheck>),
    Object(Arc<ObjectCheck>),
}

/// What a predicate's answer depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateScope {
    /// Depends on the request only (principal, authentication status).
    /// Never stored in the per-object permission cache.
    Request,
    /// Depends on the object being checked. Memoized per (object, predicate).
    Object,
}

/// Failure raised from inside a predicate body.
///
/// Surfaced to callers as [`crate::EvaluationError::PredicateFailed`] and never cached.
#[derive(Debug, thiserror::Error)]
pub enum PredicateFailure {
    /// A typed predicate was handed an object of another type.
    #[error("expected a {expected} entity, got {found}")]
    EntityMismatch {
        expected: &'static str,
        found: String,
    },

    /// A relation lookup through the entity store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Other(String),
}

impl PredicateFailure {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// A named, side-effect free authorization check.
///
/// Cloning is cheap (`Arc` inside). Two handles are the same predicate only if
/// they were cloned from one another; see [`Predicate::is_same`].
#[derive(Clone)]
pub struct Predicate {
    name: Arc<str>,
    check: Check,
}

impl Predicate {
    /// Predicate over the request alone (e.g. `logged_in`, `staff`).
    pub fn request<F>(name: impl Into<Arc<str>>, check: F) -> Self
    where
        F: Fn(&RequestContext) -> Result<bool, PredicateFailure> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Check::Request(Arc::new(check)),
        }
    }

    /// Predicate over an object (e.g. `self`, `deal.seller_in_deal`).
    pub fn object<F>(name: impl Into<Arc<str>>, check: F) -> Self
    where
        F: Fn(&dyn Entity, &RequestContext) -> Result<bool, PredicateFailure>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            check: Check::Object(Arc::new(check)),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared name, used as the predicate part of a permission cache key.
    #[must_use]
    pub fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    #[must_use]
    pub fn scope(&self) -> PredicateScope {
        match self.check {
            Check::Request(_) => PredicateScope::Request,
            Check::Object(_) => PredicateScope::Object,
        }
    }

    /// Whether both handles point at the same registered check.
    #[must_use]
    pub fn is_same(&self, other: &Self) -> bool {
        self.name == other.name
            && match (&self.check, &other.check) {
                (Check::Request(a), Check::Request(b)) => Arc::ptr_eq(a, b),
                (Check::Object(a), Check::Object(b)) => Arc::ptr_eq(a, b),
                _ => false,
            }
    }

    /// Run the check once, without any memoization.
    ///
    /// An object predicate with no object to look at does not pass.
    ///
    /// # Errors
    ///
    /// Whatever the predicate body raises.
    pub fn invoke(
        &self,
        entity: Option<&dyn Entity>,
        ctx: &RequestContext,
    ) -> Result<bool, PredicateFailure> {
        match (&self.check, entity) {
            (Check::Request(check), _) => check(ctx),
            (Check::Object(check), Some(entity)) => check(entity, ctx),
            (Check::Object(_), None) => Ok(false),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("name", &self.name)
            .field("scope", &self.scope())
            .finish_non_exhaustive()
    }
}

/// Reference to a predicate as written in a schema declaration.
///
/// Either a role / built-in name (`"public"`, `"staff"`, `"self"`,
/// `"deal.seller_in_deal"`) or a predicate handle. Resolved against the
/// predicate registry once, at registration time.
#[derive(Clone, Debug)]
pub enum PredicateRef {
    Named(Cow<'static, str>),
    Predicate(Predicate),
}

impl PredicateRef {
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self::Named(name.into())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Predicate(p) => p.name(),
        }
    }
}

impl From<&'static str> for PredicateRef {
    fn from(name: &'static str) -> Self {
        Self::Named(Cow::Borrowed(name))
    }
}

impl From<String> for PredicateRef {
    fn from(name: String) -> Self {
        Self::Named(Cow::Owned(name))
    }
}

impl From<Predicate> for PredicateRef {
    fn from(p: Predicate) -> Self {
        Self::Predicate(p)
    }
}

impl From<&Predicate> for PredicateRef {
    fn from(p: &Predicate) -> Self {
        Self::Predicate(p.clone())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use graphguard_security::{EntityRef, Principal};

    use super::*;

    #[test]
    fn request_predicate_ignores_entity() {
        let p = Predicate::request("logged_in", |ctx| Ok(ctx.is_authenticated()));
        let ctx = RequestContext::new(Some(Principal::builder().build()));

        assert_eq!(p.scope(), PredicateScope::Request);
        assert!(p.invoke(None, &ctx).unwrap());
        assert!(p.invoke(Some(&EntityRef::new("Deal", 1)), &ctx).unwrap());
    }

    #[test]
    fn object_predicate_without_entity_does_not_pass() {
        let p = Predicate::object("always", |_, _| Ok(true));
        let ctx = RequestContext::anonymous();

        assert_eq!(p.scope(), PredicateScope::Object);
        assert!(!p.invoke(None, &ctx).unwrap());
        assert!(p.invoke(Some(&EntityRef::new("Deal", 1)), &ctx).unwrap());
    }

    #[test]
    fn identity_follows_clones_not_names() {
        let a = Predicate::object("same_name", |_, _| Ok(true));
        let b = Predicate::object("same_name", |_, _| Ok(true));

        assert!(a.is_same(&a.clone()));
        assert!(!a.is_same(&b));
    }

    #[test]
    fn failures_propagate_from_invoke() {
        let p = Predicate::object("broken", |_, _| Err(PredicateFailure::other("db down")));
        let err = p
            .invoke(Some(&EntityRef::new("Deal", 1)), &RequestContext::anonymous())
            .unwrap_err();
        assert_eq!(err.to_string(), "db down");
    }

    #[test]
    fn refs_from_names_and_handles() {
        let p = Predicate::request("public", |_| Ok(true));

        assert!(matches!(PredicateRef::from("staff"), PredicateRef::Named(_)));
        assert_eq!(PredicateRef::from("staff").name(), "staff");
        assert_eq!(PredicateRef::from(String::from("self")).name(), "self");
        assert_eq!(PredicateRef::from(&p).name(), "public");
        assert!(matches!(PredicateRef::from(p), PredicateRef::Predicate(_)));
    }

    #[test]
    fn debug_shows_name_and_scope() {
        let p = Predicate::object("deal.seller_in_deal", |_, _| Ok(false));
        let dbg = format!("{p:?}");
        assert!(dbg.contains("deal.seller_in_deal"));
        assert!(dbg.contains("Object"));
    }
}
