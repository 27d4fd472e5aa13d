use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{Entity, EntityRef};

/// `Principal` is the already-authenticated actor a request runs on behalf of.
///
/// Built by the host's authentication layer and attached to the
/// [`crate::RequestContext`]; immutable for the lifetime of the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Principal ID (user or service account).
    id: Uuid,
    /// Staff members pass the built-in `staff` predicate.
    #[serde(default)]
    staff: bool,
    /// Domain objects this principal "is" (e.g. owns a buyer profile).
    /// Backs the built-in `self` predicate.
    #[serde(default)]
    identities: Vec<EntityRef>,
}

impl Principal {
    /// Create a new `Principal` builder
    #[must_use]
    pub fn builder() -> PrincipalBuilder {
        PrincipalBuilder::default()
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn is_staff(&self) -> bool {
        self.staff
    }

    /// Entities the principal self-identifies as.
    #[must_use]
    pub fn identities(&self) -> &[EntityRef] {
        &self.identities
    }

    /// Whether the self-identification relation includes `entity`.
    #[must_use]
    pub fn is(&self, entity: &dyn Entity) -> bool {
        let type_name = entity.type_name();
        let id = entity.primary_key();
        self.identities
            .iter()
            .any(|r| r.type_name() == type_name && *r.id() == id)
    }

    /// Identities of one object type, e.g. every buyer profile the principal owns.
    pub fn identities_of<'a>(&'a self, type_name: &'a str) -> impl Iterator<Item = &'a EntityRef> {
        self.identities
            .iter()
            .filter(move |r| r.type_name() == type_name)
    }
}

#[derive(Default)]
pub struct PrincipalBuilder {
    id: Option<Uuid>,
    staff: bool,
    identities: Vec<EntityRef>,
}

impl PrincipalBuilder {
    #[must_use]
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn staff(mut self, staff: bool) -> Self {
        self.staff = staff;
        self
    }

    /// Add one self-identification entry.
    #[must_use]
    pub fn identity(mut self, entity: EntityRef) -> Self {
        self.identities.push(entity);
        self
    }

    #[must_use]
    pub fn identities(mut self, entities: Vec<EntityRef>) -> Self {
        self.identities = entities;
        self
    }

    /// A missing id gets a fresh random one.
    #[must_use]
    pub fn build(self) -> Principal {
        Principal {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            staff: self.staff,
            identities: self.identities,
        }
    }
}
