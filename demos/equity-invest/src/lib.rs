//! Equity investment schema
//!
//! Funds, deals and buyers exposed through a graph API, with field-level
//! authorization enforced by [`field_authz::ResolutionGuard`]:
//!
//! - `Deal.share_price` is visible to any logged-in user, `Deal.name` only to
//!   the deal's sellers, `Deal.deal_value` to sellers and buyers holding a
//!   transaction
//! - `Buyer.investment_entity` is visible to staff and the buyer themselves
//! - node lookups and `createFund` are entry points checked before any read
//!   or write
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod error;
pub mod model;
pub mod permissions;
pub mod schema;
pub mod store;

pub use error::SchemaError;
pub use schema::EquityInvestSchema;
pub use store::InMemoryStore;
