use std::collections::HashMap;
use std::sync::Arc;

use field_authz_sdk::{ConfigError, PredicateRef};

use super::registry::{PredicateList, PredicateRegistry};

/// Startup-time mapping of `(object type, field)` to the predicates guarding it.
///
/// Every reference is resolved against the [`PredicateRegistry`] when the
/// field is registered, so a misconfigured schema fails before serving any
/// request.
#[derive(Debug)]
pub struct FieldAuthorizationMap {
    registry: Arc<PredicateRegistry>,
    types: HashMap<String, HashMap<String, PredicateList>>,
}

impl FieldAuthorizationMap {
    #[must_use]
    pub fn new(registry: Arc<PredicateRegistry>) -> Self {
        Self {
            registry,
            types: HashMap::new(),
        }
    }

    /// Guard one field.
    ///
    /// An empty `refs` list is allowed and denies the field for everyone.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::DuplicateField`] if the field is already registered
    /// - [`ConfigError::UnknownRole`] / [`ConfigError::UndefinedPredicate`]
    ///   if a reference does not resolve
    pub fn register<I, R>(&mut self, type_name: &str, field: &str, refs: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = R>,
        R: Into<PredicateRef>,
    {
        if self.get(type_name, field).is_some() {
            return Err(ConfigError::DuplicateField {
                type_name: type_name.to_owned(),
                field: field.to_owned(),
            });
        }
        let predicates = self.registry.resolve(refs)?;
        self.types
            .entry(type_name.to_owned())
            .or_default()
            .insert(field.to_owned(), predicates);
        Ok(())
    }

    /// Guard several fields of one object type. Stops at the first error.
    ///
    /// # Errors
    ///
    /// Same as [`Self::register`].
    pub fn register_type<F, I, R>(&mut self, type_name: &str, fields: F) -> Result<(), ConfigError>
    where
        F: IntoIterator<Item = (&'static str, I)>,
        I: IntoIterator<Item = R>,
        R: Into<PredicateRef>,
    {
        for (field, refs) in fields {
            self.register(type_name, field, refs)?;
        }
        Ok(())
    }

    /// Predicates guarding `type_name.field`, or `None` if the field is unmapped.
    #[must_use]
    pub fn get(&self, type_name: &str, field: &str) -> Option<&PredicateList> {
        self.types.get(type_name)?.get(field)
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<PredicateRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn field_count(&self) -> usize {
        self.types.values().map(HashMap::len).sum()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use field_authz_sdk::Predicate;

    use super::*;

    fn map() -> FieldAuthorizationMap {
        let registry = PredicateRegistry::builder()
            .predicate(Predicate::object("deal.seller", |_, _| Ok(true)))
            .build()
            .unwrap();
        FieldAuthorizationMap::new(Arc::new(registry))
    }

    #[test]
    fn registered_fields_resolve_in_order() {
        let mut m = map();
        m.register("Deal", "name", ["deal.seller", "staff"]).unwrap();
        m.register("Deal", "id", ["public"]).unwrap();
        m.register("Buyer", "id", ["public"]).unwrap();

        let names: Vec<_> = m.get("Deal", "name").unwrap().names().collect();
        assert_eq!(names, vec!["deal.seller", "staff"]);
        assert!(m.get("Deal", "missing").is_none());
        assert!(m.get("Fund", "id").is_none());
        assert_eq!(m.type_count(), 2);
        assert_eq!(m.field_count(), 3);
    }

    #[test]
    fn duplicate_field_is_rejected() {
        let mut m = map();
        m.register("Deal", "name", ["public"]).unwrap();
        let err = m.register("Deal", "name", ["staff"]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::DuplicateField {
                type_name: "Deal".to_owned(),
                field: "name".to_owned(),
            }
        );
        // The original registration is untouched.
        let names: Vec<_> = m.get("Deal", "name").unwrap().names().collect();
        assert_eq!(names, vec!["public"]);
    }

    #[test]
    fn unknown_role_is_rejected_and_nothing_registered() {
        let mut m = map();
        let err = m.register("Deal", "name", ["public", "admin"]).unwrap_err();
        assert_eq!(err, ConfigError::UnknownRole("admin".to_owned()));
        assert!(m.get("Deal", "name").is_none());
    }

    #[test]
    fn empty_list_is_allowed_at_registration() {
        let mut m = map();
        m.register::<_, PredicateRef>("Deal", "secret", []).unwrap();
        assert!(m.get("Deal", "secret").unwrap().is_empty());
    }

    #[test]
    fn register_type_registers_every_field() {
        let mut m = map();
        m.register_type(
            "Buyer",
            [("id", vec!["public"]), ("investment_entity", vec!["staff", "self"])],
        )
        .unwrap();
        assert_eq!(m.field_count(), 2);
    }
}
