use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use crate::entity::{Entity, EntityId};
use crate::principal::Principal;

/// Decides whether the request's principal counts as authenticated.
///
/// Consulted at most once per [`RequestContext`]; the answer is memoized on
/// the context.
pub trait Authenticator: Send + Sync {
    fn is_authenticated(&self, principal: Option<&Principal>) -> bool;
}

/// Default [`Authenticator`]: a request is authenticated iff a principal is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttachedPrincipal;

impl Authenticator for AttachedPrincipal {
    fn is_authenticated(&self, principal: Option<&Principal>) -> bool {
        principal.is_some()
    }
}

/// Memoization key for one predicate evaluated against one object.
///
/// Structured (type, id, predicate) triple so distinct triples can never
/// collide the way concatenated string keys can.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionCacheKey {
    entity_type: Box<str>,
    entity_id: EntityId,
    predicate: Arc<str>,
}

impl PermissionCacheKey {
    #[must_use]
    pub fn new(entity_type: &str, entity_id: EntityId, predicate: Arc<str>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id,
            predicate,
        }
    }

    /// Key for `predicate` evaluated against `entity`.
    #[must_use]
    pub fn for_entity(entity: &dyn Entity, predicate: Arc<str>) -> Self {
        Self::new(entity.type_name(), entity.primary_key(), predicate)
    }

    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    #[must_use]
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    #[must_use]
    pub fn predicate(&self) -> &str {
        &self.predicate
    }
}

/// `RequestContext` carries everything authorization needs for one request.
///
/// Created by the host at request start and dropped at request end; never
/// shared across requests. Both caches are typed fields initialized up front:
///
/// - authentication status, computed on first use and then fixed
/// - permission results keyed by [`PermissionCacheKey`], growing monotonically
///
/// The permission cache tolerates concurrent field checks within the request.
/// Racing writers for the same key store the same value; the first write wins.
pub struct RequestContext {
    principal: Option<Principal>,
    authenticator: Arc<dyn Authenticator>,
    authenticated: OnceLock<bool>,
    permission_cache: DashMap<PermissionCacheKey, bool>,
}

impl RequestContext {
    /// Context for a request made by `principal` (or anonymously when `None`).
    #[must_use]
    pub fn new(principal: Option<Principal>) -> Self {
        Self::builder().principal_opt(principal).build()
    }

    /// Context for an anonymous request.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::new(None)
    }

    #[must_use]
    pub fn builder() -> RequestContextBuilder {
        RequestContextBuilder::default()
    }

    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Authentication status, computed once per request.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        *self.authenticated.get_or_init(|| {
            self.authenticator
                .is_authenticated(self.principal.as_ref())
        })
    }

    /// Previously memoized permission result, if any.
    #[must_use]
    pub fn cached_permission(&self, key: &PermissionCacheKey) -> Option<bool> {
        self.permission_cache.get(key).map(|v| *v)
    }

    /// Memoize a permission result and return the value now held for `key`.
    ///
    /// An existing entry is never overwritten.
    pub fn cache_permission(&self, key: PermissionCacheKey, allowed: bool) -> bool {
        *self.permission_cache.entry(key).or_insert(allowed)
    }

    /// Number of memoized permission results.
    #[must_use]
    pub fn cached_permission_count(&self) -> usize {
        self.permission_cache.len()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("principal", &self.principal)
            .field("authenticated", &self.authenticated.get())
            .field("cached_permissions", &self.permission_cache.len())
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct RequestContextBuilder {
    principal: Option<Principal>,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl RequestContextBuilder {
    #[must_use]
    pub fn principal(mut self, principal: Principal) -> Self {
        self.principal = Some(principal);
        self
    }

    #[must_use]
    pub fn principal_opt(mut self, principal: Option<Principal>) -> Self {
        self.principal = principal;
        self
    }

    /// Override how authentication status is derived (default: [`AttachedPrincipal`]).
    #[must_use]
    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    #[must_use]
    pub fn build(self) -> RequestContext {
        RequestContext {
            principal: self.principal,
            authenticator: self
                .authenticator
                .unwrap_or_else(|| Arc::new(AttachedPrincipal)),
            authenticated: OnceLock::new(),
            permission_cache: DashMap::new(),
        }
    }
}
