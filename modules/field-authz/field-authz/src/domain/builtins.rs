//! Built-in predicates and role shorthands, present in every registry.

use field_authz_sdk::Predicate;
use graphguard_security::Principal;

/// Always passes, even for anonymous requests.
pub const PUBLIC: &str = "public";
/// Passes when the request is authenticated.
pub const LOGGED_IN: &str = "logged_in";
/// Passes for staff principals.
pub const STAFF: &str = "staff";
/// Alias of [`STAFF`].
pub const IS_STAFF: &str = "is_staff";
/// Passes when the principal self-identifies as the object being checked.
pub const SELF: &str = "self";

#[must_use]
pub fn public() -> Predicate {
    Predicate::request(PUBLIC, |_| Ok(true))
}

/// Reads the request's memoized authentication status.
#[must_use]
pub fn logged_in() -> Predicate {
    Predicate::request(LOGGED_IN, |ctx| Ok(ctx.is_authenticated()))
}

#[must_use]
pub fn staff() -> Predicate {
    Predicate::request(STAFF, |ctx| {
        Ok(ctx.principal().is_some_and(Principal::is_staff))
    })
}

#[must_use]
pub fn self_identity() -> Predicate {
    Predicate::object(SELF, |entity, ctx| {
        Ok(ctx.principal().is_some_and(|p| p.is(entity)))
    })
}

pub(crate) fn all() -> [Predicate; 4] {
    [public(), logged_in(), staff(), self_identity()]
}

/// Map role aliases onto registered names.
pub(crate) fn canonical(name: &str) -> &str {
    if name == IS_STAFF { STAFF } else { name }
}
