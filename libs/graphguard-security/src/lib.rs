#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Request-scoped security primitives shared by the field authorization module.
//!
//! - [`Principal`] - the authenticated actor attached to a request
//! - [`Entity`], [`EntityRef`], [`EntityId`] - object identity as seen by predicates
//! - [`RequestContext`] - per-request principal, authentication status and permission cache
//! - [`PermissionCacheKey`] - structured memoization key

pub mod context;
pub mod entity;
pub mod principal;

pub use context::{AttachedPrincipal, Authenticator, PermissionCacheKey, RequestContext};
pub use entity::{Entity, EntityId, EntityIdParseError, EntityRef};
pub use principal::{Principal, PrincipalBuilder};
