//! Transient authorization outcomes.

use std::sync::Arc;

/// Outcome of evaluating a predicate list.
///
/// `decided_by` names the predicate that passed, for diagnostics only. It is
/// never put into an error surfaced to end users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDecision {
    allowed: bool,
    decided_by: Option<Arc<str>>,
}

impl AuthorizationDecision {
    /// Allowed because `predicate` passed.
    #[must_use]
    pub fn allow(predicate: Arc<str>) -> Self {
        Self {
            allowed: true,
            decided_by: Some(predicate),
        }
    }

    /// Allowed with no predicate involved (unrestricted field).
    #[must_use]
    pub fn unrestricted() -> Self {
        Self {
            allowed: true,
            decided_by: None,
        }
    }

    #[must_use]
    pub fn deny() -> Self {
        Self {
            allowed: false,
            decided_by: None,
        }
    }

    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    #[must_use]
    pub fn is_denied(&self) -> bool {
        !self.allowed
    }

    #[must_use]
    pub fn decided_by(&self) -> Option<&str> {
        self.decided_by.as_deref()
    }
}
