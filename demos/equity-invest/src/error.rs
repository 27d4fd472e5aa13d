use field_authz_sdk::{ConfigError, EntryPointError, EvaluationError, GuardedError, StoreError};
use graphguard_security::EntityIdParseError;
use thiserror::Error;

/// Errors surfaced to the graph API caller.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Entry-point rejection. Denials render as the opaque "permission denied".
    #[error(transparent)]
    Rejected(#[from] EntryPointError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid node id: {0}")]
    InvalidId(#[from] EntityIdParseError),

    #[error("unknown node type: {0}")]
    UnknownType(String),
}

impl SchemaError {
    /// Whether the caller was refused by an authorization check.
    #[must_use]
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Rejected(e) if e.is_denied())
    }
}

impl From<GuardedError<StoreError>> for SchemaError {
    fn from(e: GuardedError<StoreError>) -> Self {
        match e {
            GuardedError::Rejected(e) => Self::Rejected(e),
            GuardedError::Operation(e) => Self::Store(e),
        }
    }
}
