use std::sync::Arc;

use field_authz_sdk::{AuthorizationDecision, EvaluationError};
use graphguard_security::{Entity, RequestContext};

use super::registry::{PredicateList, PredicateRegistry};

/// Ordered any-pass evaluation of a predicate list.
///
/// Predicates run in declaration order and evaluation stops at the first one
/// that passes. An empty list denies.
///
/// A failing predicate ends evaluation: its error is returned and the
/// remaining predicates never run.
#[derive(Debug, Clone)]
pub struct PredicateEvaluator {
    registry: Arc<PredicateRegistry>,
}

impl PredicateEvaluator {
    #[must_use]
    pub fn new(registry: Arc<PredicateRegistry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<PredicateRegistry> {
        &self.registry
    }

    /// # Errors
    ///
    /// The first [`EvaluationError`] raised by a predicate reached before
    /// any passed.
    pub fn authorize(
        &self,
        predicates: &PredicateList,
        entity: Option<&dyn Entity>,
        ctx: &RequestContext,
    ) -> Result<AuthorizationDecision, EvaluationError> {
        for predicate in predicates {
            let allowed = self
                .registry
                .evaluate(predicate, entity, ctx)
                .inspect_err(|e| {
                    tracing::debug!(predicate = predicate.name(), error = %e, "predicate failed");
                })?;
            if allowed {
                return Ok(AuthorizationDecision::allow(predicate.shared_name()));
            }
        }
        Ok(AuthorizationDecision::deny())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use field_authz_sdk::{Predicate, PredicateFailure, PredicateRef};
    use graphguard_security::{EntityRef, Principal};

    use super::*;

    struct Fixture {
        evaluator: PredicateEvaluator,
        calls: Arc<AtomicUsize>,
    }

    /// Registers `yes`, `no`, `boom` and a counted `counted` predicate.
    fn fixture() -> Fixture {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let registry = PredicateRegistry::builder()
            .predicate(Predicate::object("yes", |_, _| Ok(true)))
            .predicate(Predicate::object("no", |_, _| Ok(false)))
            .predicate(Predicate::object("boom", |_, _| {
                Err(PredicateFailure::other("backend down"))
            }))
            .predicate(Predicate::object("counted", move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }))
            .build()
            .unwrap();
        Fixture {
            evaluator: PredicateEvaluator::new(Arc::new(registry)),
            calls,
        }
    }

    fn list(f: &Fixture, names: &[&'static str]) -> PredicateList {
        f.evaluator
            .registry()
            .resolve(names.iter().copied().map(PredicateRef::from))
            .unwrap()
    }

    #[test]
    fn empty_list_denies() {
        let f = fixture();
        let deal = EntityRef::new("Deal", 1);
        let d = f
            .evaluator
            .authorize(&PredicateList::default(), Some(&deal), &RequestContext::anonymous())
            .unwrap();
        assert!(d.is_denied());
    }

    #[test]
    fn first_passing_predicate_decides() {
        let f = fixture();
        let deal = EntityRef::new("Deal", 1);
        let d = f
            .evaluator
            .authorize(&list(&f, &["no", "yes", "counted"]), Some(&deal), &RequestContext::anonymous())
            .unwrap();
        assert!(d.is_allowed());
        assert_eq!(d.decided_by(), Some("yes"));
        assert_eq!(f.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn all_false_denies() {
        let f = fixture();
        let deal = EntityRef::new("Deal", 1);
        let d = f
            .evaluator
            .authorize(&list(&f, &["no", "self"]), Some(&deal), &RequestContext::anonymous())
            .unwrap();
        assert!(d.is_denied());
        assert_eq!(d.decided_by(), None);
    }

    #[test]
    fn failure_stops_evaluation_even_if_a_later_predicate_would_pass() {
        let f = fixture();
        let deal = EntityRef::new("Deal", 1);
        let err = f
            .evaluator
            .authorize(&list(&f, &["no", "boom", "counted"]), Some(&deal), &RequestContext::anonymous())
            .unwrap_err();
        assert!(matches!(err, EvaluationError::PredicateFailed { predicate, .. } if predicate == "boom"));
        assert_eq!(f.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn pass_before_a_failing_predicate_wins() {
        let f = fixture();
        let deal = EntityRef::new("Deal", 1);
        let d = f
            .evaluator
            .authorize(&list(&f, &["yes", "boom"]), Some(&deal), &RequestContext::anonymous())
            .unwrap();
        assert_eq!(d.decided_by(), Some("yes"));
    }

    #[test]
    fn staff_short_circuits_self() {
        let f = fixture();
        let ctx = RequestContext::new(Some(Principal::builder().staff(true).build()));
        let buyer = EntityRef::new("Buyer", 42);
        let d = f
            .evaluator
            .authorize(&list(&f, &["is_staff", "self"]), Some(&buyer), &ctx)
            .unwrap();
        assert_eq!(d.decided_by(), Some("staff"));
        // Only `staff` ran; `self` left nothing in the cache.
        assert_eq!(ctx.cached_permission_count(), 1);
    }
}
