//! Resolution guard: the single place resolvers ask "may this caller see it?".

use std::future::Future;
use std::sync::Arc;

use field_authz_sdk::{
    AuthorizationDecision, AuthorizationError, ConfigError, EntryPointError, EvaluationError,
    GuardedError, PredicateRef,
};
use graphguard_security::{Entity, RequestContext};
use serde_json::{Map, Value};

use super::entry_points::{EntryPoint, EntryPointRegistry};
use super::evaluator::PredicateEvaluator;
use super::field_map::FieldAuthorizationMap;
use super::registry::PredicateRegistry;
use crate::config::{FieldAuthzConfig, ReadErrorPolicy, UnmappedFieldPolicy};

/// Assembles a [`ResolutionGuard`] from field and entry-point declarations.
///
/// Every declaration is validated as it is added; the first misconfiguration
/// is returned to the caller and aborts startup.
#[derive(Debug)]
pub struct ResolutionGuardBuilder {
    config: FieldAuthzConfig,
    fields: FieldAuthorizationMap,
    entry_points: EntryPointRegistry,
}

impl ResolutionGuardBuilder {
    /// Guard `type_name.field` with `refs`.
    ///
    /// # Errors
    ///
    /// See [`FieldAuthorizationMap::register`].
    pub fn field<I, R>(&mut self, type_name: &str, field: &str, refs: I) -> Result<&mut Self, ConfigError>
    where
        I: IntoIterator<Item = R>,
        R: Into<PredicateRef>,
    {
        self.fields.register(type_name, field, refs)?;
        Ok(self)
    }

    /// Guard several fields of one object type.
    ///
    /// # Errors
    ///
    /// See [`FieldAuthorizationMap::register_type`].
    pub fn object_type<F, I, R>(&mut self, type_name: &str, fields: F) -> Result<&mut Self, ConfigError>
    where
        F: IntoIterator<Item = (&'static str, I)>,
        I: IntoIterator<Item = R>,
        R: Into<PredicateRef>,
    {
        self.fields.register_type(type_name, fields)?;
        Ok(self)
    }

    /// Declare a privileged entry point and return its resolved handle.
    ///
    /// # Errors
    ///
    /// See [`EntryPointRegistry::register`].
    pub fn entry_point<I, R>(&mut self, name: &str, refs: I) -> Result<EntryPoint, ConfigError>
    where
        I: IntoIterator<Item = R>,
        R: Into<PredicateRef>,
    {
        self.entry_points.register(name, refs)
    }

    #[must_use]
    pub fn build(self) -> ResolutionGuard {
        tracing::info!(
            types = self.fields.type_count(),
            fields = self.fields.field_count(),
            entry_points = self.entry_points.len(),
            predicates = self.fields.registry().len(),
            unmapped_fields = ?self.config.unmapped_fields,
            on_read_error = ?self.config.on_read_error,
            "field authorization configured"
        );
        ResolutionGuard {
            evaluator: PredicateEvaluator::new(self.fields.registry().clone()),
            config: self.config,
            fields: self.fields,
            entry_points: self.entry_points,
        }
    }
}

/// Field- and entry-point-level authorization for one schema.
///
/// Immutable after [`ResolutionGuardBuilder::build`]; share it across
/// requests behind an `Arc`. All per-request state lives on the
/// [`RequestContext`] passed to each call.
#[derive(Debug)]
pub struct ResolutionGuard {
    config: FieldAuthzConfig,
    evaluator: PredicateEvaluator,
    fields: FieldAuthorizationMap,
    entry_points: EntryPointRegistry,
}

impl ResolutionGuard {
    #[must_use]
    pub fn builder(registry: Arc<PredicateRegistry>, config: FieldAuthzConfig) -> ResolutionGuardBuilder {
        ResolutionGuardBuilder {
            config,
            fields: FieldAuthorizationMap::new(registry.clone()),
            entry_points: EntryPointRegistry::new(registry),
        }
    }

    #[must_use]
    pub fn config(&self) -> &FieldAuthzConfig {
        &self.config
    }

    #[must_use]
    pub fn fields(&self) -> &FieldAuthorizationMap {
        &self.fields
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<PredicateRegistry> {
        self.evaluator.registry()
    }

    /// Look up a declared entry point.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownEntryPoint`] if `name` was never declared.
    pub fn entry_point(&self, name: &str) -> Result<&EntryPoint, ConfigError> {
        self.entry_points.get(name)
    }

    /// Decide whether `type_name.field` of `entity` is visible to the caller.
    ///
    /// A denied field is redacted by the caller; it never fails the enclosing
    /// object or its siblings.
    ///
    /// # Errors
    ///
    /// [`EvaluationError`] only when [`ReadErrorPolicy::Propagate`] is
    /// configured and a predicate failed before any passed. Under the default
    /// [`ReadErrorPolicy::Redact`] a failing predicate counts as a deny.
    pub fn check_field(
        &self,
        type_name: &str,
        field: &str,
        entity: &dyn Entity,
        ctx: &RequestContext,
    ) -> Result<AuthorizationDecision, EvaluationError> {
        let Some(predicates) = self.fields.get(type_name, field) else {
            let decision = match self.config.unmapped_fields {
                UnmappedFieldPolicy::Allow => AuthorizationDecision::unrestricted(),
                UnmappedFieldPolicy::Deny => AuthorizationDecision::deny(),
            };
            self.log_field(type_name, field, entity, &decision);
            return Ok(decision);
        };

        let decision = match self.evaluator.authorize(predicates, Some(entity), ctx) {
            Ok(decision) => decision,
            Err(e) => match self.config.on_read_error {
                ReadErrorPolicy::Redact => {
                    tracing::warn!(
                        object = %entity.entity_ref(),
                        field = %format_args!("{type_name}.{field}"),
                        error = %e,
                        "field predicate failed, redacting"
                    );
                    AuthorizationDecision::deny()
                }
                ReadErrorPolicy::Propagate => return Err(e),
            },
        };
        self.log_field(type_name, field, entity, &decision);
        Ok(decision)
    }

    /// Run `resolve` only if the field is visible; `None` means redacted.
    ///
    /// # Errors
    ///
    /// See [`Self::check_field`].
    pub fn resolve_field<T, F>(
        &self,
        type_name: &str,
        field: &str,
        entity: &dyn Entity,
        ctx: &RequestContext,
        resolve: F,
    ) -> Result<Option<T>, EvaluationError>
    where
        F: FnOnce() -> T,
    {
        let decision = self.check_field(type_name, field, entity, ctx)?;
        Ok(decision.is_allowed().then(resolve))
    }

    /// Build the response object for `entity`, replacing every field the
    /// caller may not see with `null`.
    ///
    /// # Errors
    ///
    /// See [`Self::check_field`].
    pub fn resolve_object<'a, I>(
        &self,
        entity: &dyn Entity,
        ctx: &RequestContext,
        fields: I,
    ) -> Result<Map<String, Value>, EvaluationError>
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let type_name = entity.type_name();
        let mut out = Map::new();
        for (field, value) in fields {
            let visible = self.check_field(type_name, field, entity, ctx)?.is_allowed();
            out.insert(field.to_owned(), if visible { value } else { Value::Null });
        }
        Ok(out)
    }

    /// Authorize a privileged entry point before it reads or writes anything.
    ///
    /// `candidate` is the object the operation targets, when known (e.g. the
    /// node being looked up). Object-scoped requirements evaluate to false
    /// without one.
    ///
    /// # Errors
    ///
    /// - [`EntryPointError::Denied`] if no requirement passed
    /// - [`EntryPointError::Evaluation`] if a requirement failed before any passed
    #[tracing::instrument(skip_all, fields(entry_point = entry.name()))]
    pub fn check_entry_point(
        &self,
        entry: &EntryPoint,
        ctx: &RequestContext,
        candidate: Option<&dyn Entity>,
    ) -> Result<AuthorizationDecision, EntryPointError> {
        let decision = self
            .evaluator
            .authorize(entry.requirements(), candidate, ctx)
            .inspect_err(|e| tracing::warn!(error = %e, "entry point requirement failed"))?;

        if self.config.log_decisions {
            tracing::debug!(
                allowed = decision.is_allowed(),
                decided_by = decision.decided_by(),
                "entry point decision"
            );
        }

        if decision.is_denied() {
            return Err(AuthorizationError::Denied.into());
        }
        Ok(decision)
    }

    /// Check `entry`, then run `operation` only if the check passed.
    ///
    /// # Errors
    ///
    /// - [`GuardedError::Rejected`] if the check denied or failed; `operation`
    ///   was never called
    /// - [`GuardedError::Operation`] if `operation` itself failed
    pub async fn enforce_entry_point<T, E, F, Fut>(
        &self,
        entry: &EntryPoint,
        ctx: &RequestContext,
        candidate: Option<&dyn Entity>,
        operation: F,
    ) -> Result<T, GuardedError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.check_entry_point(entry, ctx, candidate)?;
        operation().await.map_err(GuardedError::Operation)
    }

    fn log_field(&self, type_name: &str, field: &str, entity: &dyn Entity, decision: &AuthorizationDecision) {
        if self.config.log_decisions {
            tracing::debug!(
                object = %entity.entity_ref(),
                field = %format_args!("{type_name}.{field}"),
                allowed = decision.is_allowed(),
                decided_by = decision.decided_by(),
                "field decision"
            );
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use field_authz_sdk::{Predicate, PredicateFailure};
    use graphguard_security::{EntityRef, Principal};
    use serde_json::json;
    use tracing_test::traced_test;

    use super::*;

    fn registry() -> Arc<PredicateRegistry> {
        Arc::new(
            PredicateRegistry::builder()
                .predicate(Predicate::object("deal.broken", |_, _| {
                    Err(PredicateFailure::other("store unavailable"))
                }))
                .build()
                .unwrap(),
        )
    }

    fn guard(config: FieldAuthzConfig) -> ResolutionGuard {
        let mut b = ResolutionGuard::builder(registry(), config);
        b.object_type(
            "Deal",
            [
                ("id", vec!["public"]),
                ("share_price", vec!["logged_in"]),
                ("name", vec!["deal.broken"]),
                ("deal_value", vec!["deal.broken", "staff"]),
            ],
        )
        .unwrap();
        b.entry_point("deal.create", ["staff"]).unwrap();
        b.entry_point("deal.audit", ["deal.broken"]).unwrap();
        b.entry_point("deal.review", ["deal.broken", "staff"]).unwrap();
        b.build()
    }

    fn member() -> RequestContext {
        RequestContext::new(Some(Principal::builder().build()))
    }

    fn staff() -> RequestContext {
        RequestContext::new(Some(Principal::builder().staff(true).build()))
    }

    #[test]
    fn unmapped_fields_follow_policy() {
        let deal = EntityRef::new("Deal", 1);
        let ctx = RequestContext::anonymous();

        let open = guard(FieldAuthzConfig::default());
        let d = open.check_field("Deal", "notes", &deal, &ctx).unwrap();
        assert!(d.is_allowed());
        assert_eq!(d.decided_by(), None);

        let closed = guard(FieldAuthzConfig {
            unmapped_fields: UnmappedFieldPolicy::Deny,
            ..FieldAuthzConfig::default()
        });
        assert!(closed.check_field("Deal", "notes", &deal, &ctx).unwrap().is_denied());
        // Mapped fields are unaffected.
        assert!(closed.check_field("Deal", "id", &deal, &ctx).unwrap().is_allowed());
    }

    #[test]
    #[traced_test]
    fn failing_predicate_redacts_by_default() {
        let g = guard(FieldAuthzConfig::default());
        let deal = EntityRef::new("Deal", 1);

        let d = g.check_field("Deal", "name", &deal, &member()).unwrap();
        assert!(d.is_denied());
        assert!(logs_contain("field predicate failed, redacting"));

        // The failure ends evaluation, so even staff lose `deal_value`.
        assert!(g.check_field("Deal", "deal_value", &deal, &staff()).unwrap().is_denied());
    }

    #[test]
    fn failing_predicate_propagates_when_configured() {
        let g = guard(FieldAuthzConfig {
            on_read_error: ReadErrorPolicy::Propagate,
            ..FieldAuthzConfig::default()
        });
        let deal = EntityRef::new("Deal", 1);

        let err = g.check_field("Deal", "name", &deal, &member()).unwrap_err();
        assert!(matches!(err, EvaluationError::PredicateFailed { .. }));
        assert!(g.check_field("Deal", "id", &deal, &member()).unwrap().is_allowed());
    }

    #[test]
    fn resolve_field_skips_resolver_when_denied() {
        let g = guard(FieldAuthzConfig::default());
        let deal = EntityRef::new("Deal", 1);
        let calls = AtomicUsize::new(0);
        let resolve = || {
            calls.fetch_add(1, Ordering::SeqCst);
            42
        };

        let anon = RequestContext::anonymous();
        assert_eq!(g.resolve_field("Deal", "share_price", &deal, &anon, resolve).unwrap(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(g.resolve_field("Deal", "share_price", &deal, &member(), resolve).unwrap(), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn resolve_object_nulls_only_denied_fields() {
        let g = guard(FieldAuthzConfig::default());
        let deal = EntityRef::new("Deal", 7);

        let obj = g
            .resolve_object(
                &deal,
                &RequestContext::anonymous(),
                [
                    ("id", json!(7)),
                    ("share_price", json!(12.5)),
                    ("name", json!("Series B")),
                ],
            )
            .unwrap();
        assert_eq!(
            Value::Object(obj),
            json!({ "id": 7, "share_price": null, "name": null })
        );
    }

    #[test]
    fn entry_point_denial_is_opaque() {
        let g = guard(FieldAuthzConfig::default());
        let ep = g.entry_point("deal.create").unwrap();

        let err = g.check_entry_point(ep, &member(), None).unwrap_err();
        assert!(err.is_denied());
        assert_eq!(err.to_string(), "permission denied");

        let d = g.check_entry_point(ep, &staff(), None).unwrap();
        assert_eq!(d.decided_by(), Some("staff"));
    }

    #[test]
    fn entry_point_failures_always_propagate() {
        let g = guard(FieldAuthzConfig::default());
        let ep = g.entry_point("deal.audit").unwrap();
        let deal = EntityRef::new("Deal", 1);

        let err = g.check_entry_point(ep, &staff(), Some(&deal)).unwrap_err();
        assert!(matches!(err, EntryPointError::Evaluation(_)));

        // A passing requirement listed after a broken one does not mask it.
        let ep = g.entry_point("deal.review").unwrap();
        let err = g.check_entry_point(ep, &staff(), Some(&deal)).unwrap_err();
        assert!(matches!(err, EntryPointError::Evaluation(_)));
    }

    #[test]
    fn unknown_entry_point_is_a_config_error() {
        let g = guard(FieldAuthzConfig::default());
        assert_eq!(
            g.entry_point("deal.delete").unwrap_err(),
            ConfigError::UnknownEntryPoint("deal.delete".to_owned())
        );
    }

    #[tokio::test]
    async fn enforce_entry_point_runs_operation_only_when_allowed() {
        let g = guard(FieldAuthzConfig::default());
        let ep = g.entry_point("deal.create").unwrap().clone();
        let calls = &AtomicUsize::new(0);

        let denied: Result<u32, GuardedError<std::io::Error>> = g
            .enforce_entry_point(&ep, &member(), None, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .await;
        assert!(matches!(denied, Err(GuardedError::Rejected(ref e)) if e.is_denied()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let allowed: Result<u32, GuardedError<std::io::Error>> = g
            .enforce_entry_point(&ep, &staff(), None, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .await;
        assert_eq!(allowed.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn operation_errors_are_wrapped() {
        let g = guard(FieldAuthzConfig::default());
        let ep = g.entry_point("deal.create").unwrap().clone();

        let err = g
            .enforce_entry_point(&ep, &staff(), None, || async {
                Err::<(), _>(std::io::Error::other("disk full"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GuardedError::Operation(ref e) if e.to_string() == "disk full"));
    }
}
