use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Primary key of an exposed object.
///
/// Predicates and the permission cache only need identity, never the row
/// itself, so the value is kept as a small typed scalar.
///
/// Textual ids are canonicalized through [`FromStr`] when converted or
/// deserialized, so `"42"` and `42` name the same object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged, try_from = "RawEntityId")]
pub enum EntityId {
    /// Integer key (serial / bigint primary keys).
    Int(i64),
    /// UUID key.
    Uuid(Uuid),
    /// Any other textual key.
    String(String),
}

impl EntityId {
    /// Try to extract an integer key.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::String(s) => s.parse().ok(),
            Self::Uuid(_) => None,
        }
    }

    /// Try to extract a UUID key.
    ///
    /// Returns `Some` for `EntityId::Uuid` directly, and for
    /// `EntityId::String` if the string is a valid UUID.
    #[must_use]
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(u) => Some(*u),
            Self::String(s) => Uuid::parse_str(s).ok(),
            Self::Int(_) => None,
        }
    }
}

/// Wire form of an [`EntityId`] before canonicalization.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntityId {
    Int(i64),
    Text(String),
}

impl TryFrom<RawEntityId> for EntityId {
    type Error = EntityIdParseError;

    fn try_from(raw: RawEntityId) -> Result<Self, Self::Error> {
        match raw {
            RawEntityId::Int(n) => Ok(Self::Int(n)),
            RawEntityId::Text(s) => s.parse(),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for EntityId {
    #[inline]
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for EntityId {
    #[inline]
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<Uuid> for EntityId {
    #[inline]
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<&Uuid> for EntityId {
    #[inline]
    fn from(u: &Uuid) -> Self {
        Self::Uuid(*u)
    }
}

impl From<String> for EntityId {
    /// Canonical form of `s`; an empty string stays textual.
    fn from(s: String) -> Self {
        s.parse().unwrap_or(Self::String(s))
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| Self::String(String::new()))
    }
}

impl FromStr for EntityId {
    type Err = EntityIdParseError;

    /// Integers first, then UUIDs, anything else stays textual.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(EntityIdParseError::EmptyId);
        }
        if let Ok(n) = s.parse::<i64>() {
            return Ok(Self::Int(n));
        }
        if let Ok(u) = Uuid::parse_str(s) {
            return Ok(Self::Uuid(u));
        }
        Ok(Self::String(s.to_owned()))
    }
}

/// Errors from parsing an [`EntityId`] or a global [`EntityRef`] (`Type:id`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityIdParseError {
    #[error("entity id is empty")]
    EmptyId,

    #[error("global id '{0}' is not of the form 'Type:id'")]
    MalformedGlobalId(String),

    #[error("global id '{0}' does not carry an integer key")]
    NotAnInteger(String),
}

/// Identity of an object: its type name plus primary key.
///
/// Also usable as a stand-in [`Entity`] when only the identity is known, e.g.
/// a node lookup that must be authorized before the row is loaded.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "type")]
    type_name: Cow<'static, str>,
    id: EntityId,
}

impl EntityRef {
    #[must_use]
    pub fn new(type_name: impl Into<Cow<'static, str>>, id: impl Into<EntityId>) -> Self {
        Self {
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn id(&self) -> &EntityId {
        &self.id
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_name, self.id)
    }
}

impl FromStr for EntityRef {
    type Err = EntityIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (type_name, id) = s
            .split_once(':')
            .filter(|(t, _)| !t.is_empty())
            .ok_or_else(|| EntityIdParseError::MalformedGlobalId(s.to_owned()))?;
        Ok(Self::new(type_name.to_owned(), id.parse::<EntityId>()?))
    }
}

/// An object exposed through the graph API that permission predicates can
/// reason about.
///
/// `type_name` and `primary_key` together form the object half of a
/// [`crate::PermissionCacheKey`]; implementations must return stable values
/// for the lifetime of a request.
///
/// # Example
/// ```
/// use graphguard_security::{Entity, EntityId};
///
/// struct Deal {
///     id: i64,
/// }
///
/// impl Entity for Deal {
///     fn type_name(&self) -> &str {
///         "Deal"
///     }
///     fn primary_key(&self) -> EntityId {
///         EntityId::Int(self.id)
///     }
/// }
///
/// let deal = Deal { id: 7 };
/// assert_eq!(deal.entity_ref().to_string(), "Deal:7");
/// ```
pub trait Entity: Any + Send + Sync + 'static {
    /// Object type name as exposed in the schema (e.g. `"Deal"`).
    fn type_name(&self) -> &str;

    /// Primary key of this instance.
    fn primary_key(&self) -> EntityId;

    /// Identity of this instance.
    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.type_name().to_owned(), self.primary_key())
    }
}

impl Entity for EntityRef {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn primary_key(&self) -> EntityId {
        self.id.clone()
    }

    fn entity_ref(&self) -> EntityRef {
        self.clone()
    }
}
