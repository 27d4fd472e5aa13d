//! Field `AuthZ` Module
//!
//! Decides, per request and per object, whether a principal may see a field
//! or call a privileged entry point:
//!
//! - [`PermissionGroup`] / [`PredicateRegistry`] - explicit predicate registration
//!   and per-request memoization
//! - [`PredicateEvaluator`] - ordered any-pass evaluation
//! - [`FieldAuthorizationMap`] - `type.field` to predicate list
//! - [`ResolutionGuard`] - field redaction and entry-point enforcement
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod domain;

pub use config::{FieldAuthzConfig, ReadErrorPolicy, UnmappedFieldPolicy};
pub use domain::builtins;
pub use domain::entry_points::{EntryPoint, EntryPointRegistry};
pub use domain::evaluator::PredicateEvaluator;
pub use domain::field_map::FieldAuthorizationMap;
pub use domain::group::{PermissionGroup, PermissionGroupBuilder};
pub use domain::guard::{ResolutionGuard, ResolutionGuardBuilder};
pub use domain::registry::{PredicateList, PredicateRegistry, PredicateRegistryBuilder};
