//! Entity store seam consumed by predicates and resolvers.

use std::sync::Arc;

use graphguard_security::{Entity, EntityId, EntityRef};

use crate::error::StoreError;

/// Read access to the relational data behind the graph.
///
/// Implemented by the host's storage layer. Predicates capture an
/// `Arc<dyn EntityStore>` when their permission group is built and may call it
/// synchronously; latency is the predicate author's concern.
pub trait EntityStore: Send + Sync {
    /// Load one object by type name and primary key.
    ///
    /// # Errors
    ///
    /// - [`StoreError::NotFound`] if no such object exists
    /// - [`StoreError::Unavailable`] if the backend cannot be reached
    fn find_by_id(&self, type_name: &str, id: &EntityId) -> Result<Arc<dyn Entity>, StoreError>;

    /// Identities of objects reachable from `entity` through `relation`
    /// (e.g. the buyers holding a transaction on a deal).
    ///
    /// # Errors
    ///
    /// - [`StoreError::Unavailable`] if the backend cannot be reached
    fn query_related(&self, entity: &EntityRef, relation: &str)
    -> Result<Vec<EntityRef>, StoreError>;
}
