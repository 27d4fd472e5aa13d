#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Field `AuthZ` SDK
//!
//! Public contract of the `field_authz` module:
//!
//! - [`Predicate`], [`PredicateRef`] - named permission checks and references to them
//! - [`AuthorizationDecision`] - allow/deny plus the deciding predicate
//! - [`ConfigError`], [`EvaluationError`], [`AuthorizationError`], [`EntryPointError`] - error taxonomy
//! - [`EntityStore`] - lookup seam predicates use to inspect relations
//!
//! ## Usage
//!
//! ```ignore
//! use field_authz_sdk::{PredicateFailure, PredicateRef};
//!
//! // Role shorthands resolve to built-in predicates at registration time.
//! let buyer_lookup: Vec<PredicateRef> = vec!["staff".into(), "self".into()];
//!
//! // Schema fields reference predicates from a permission group.
//! let deal_value = vec![PredicateRef::from(deal_perms.require("seller_in_deal")?)];
//! ```

pub mod decision;
pub mod error;
pub mod predicate;
pub mod store;

pub use decision::AuthorizationDecision;
pub use error::{
    AuthorizationError, ConfigError, EntryPointError, EvaluationError, GuardedError, StoreError,
};
pub use predicate::{Predicate, PredicateFailure, PredicateRef, PredicateScope};
pub use store::EntityStore;
