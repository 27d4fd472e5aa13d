//! Error types for the field `AuthZ` module.
//!
//! Field-level denial is not an error: it is expressed as a denied
//! [`crate::AuthorizationDecision`] and the field is redacted. Entry-point
//! denial is always an error.

use thiserror::Error;

/// Startup-time configuration errors. Fatal; never shown to end users.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("field '{type_name}.{field}' is already registered")]
    DuplicateField { type_name: String, field: String },

    #[error("predicate '{0}' is registered more than once")]
    DuplicatePredicate(String),

    #[error("unknown role or predicate name '{0}'")]
    UnknownRole(String),

    #[error("predicate '{0}' was not registered with the predicate registry")]
    UndefinedPredicate(String),

    #[error("entry point '{0}' is already registered")]
    DuplicateEntryPoint(String),

    #[error("unknown entry point '{0}'")]
    UnknownEntryPoint(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A predicate could not produce an answer.
///
/// Never cached: a later check in the same request re-invokes the predicate.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("predicate '{predicate}' failed: {source}")]
    PredicateFailed {
        predicate: String,
        #[source]
        source: crate::predicate::PredicateFailure,
    },

    #[error("unknown predicate '{0}'")]
    UnknownPredicate(String),
}

/// Entry-point denial.
///
/// Deliberately opaque: the message never says which requirement failed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("permission denied")]
    Denied,
}

/// Error from checking an entry point.
#[derive(Debug, Error)]
pub enum EntryPointError {
    /// No requirement passed. The operation must not run.
    #[error(transparent)]
    Denied(#[from] AuthorizationError),

    /// A requirement failed to evaluate. Propagated rather than treated as a
    /// deny so a mutation never proceeds or fails silently.
    #[error("authorization check failed: {0}")]
    Evaluation(#[from] EvaluationError),
}

impl EntryPointError {
    #[must_use]
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::Denied(_))
    }
}

/// Error from an operation executed behind an entry-point check.
#[derive(Debug, Error)]
pub enum GuardedError<E> {
    /// The check rejected the call; the operation was never started.
    #[error(transparent)]
    Rejected(#[from] EntryPointError),

    /// The operation itself failed after being authorized.
    #[error("operation failed: {0}")]
    Operation(#[source] E),
}

/// Errors from the entity store seam.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{type_name} not found: {id}")]
    NotFound { type_name: String, id: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::predicate::PredicateFailure;

    #[test]
    fn authorization_error_does_not_leak_predicates() {
        let err = EntryPointError::from(AuthorizationError::Denied);
        assert!(err.is_denied());
        assert_eq!(err.to_string(), "permission denied");
    }

    #[test]
    fn evaluation_error_keeps_source() {
        let err = EvaluationError::PredicateFailed {
            predicate: "deal.buyer_has_transaction".to_owned(),
            source: PredicateFailure::Store(StoreError::Unavailable("timeout".to_owned())),
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("store unavailable: timeout"));

        let wrapped = EntryPointError::from(err);
        assert!(!wrapped.is_denied());
    }

    #[test]
    fn guarded_error_from_rejection() {
        let err: GuardedError<std::io::Error> =
            EntryPointError::from(AuthorizationError::Denied).into();
        assert!(matches!(err, GuardedError::Rejected(e) if e.is_denied()));
    }
}
