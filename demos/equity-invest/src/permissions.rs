use std::sync::Arc;

use field_authz::PermissionGroup;
use field_authz_sdk::EntityStore;
use graphguard_security::Entity;

use crate::model::Deal;
use crate::store::{BUYERS_WITH_TRANSACTION, SELLERS};

pub const SELLER_IN_DEAL: &str = "seller_in_deal";
pub const BUYER_HAS_TRANSACTION: &str = "buyer_has_transaction";

/// Predicates over a [`Deal`], published as `deal.<check>`.
///
/// `seller_in_deal` needs only the deal's identity, so `deal.get_node` can
/// check it before loading the row.
pub fn deal_permissions(store: Arc<dyn EntityStore>) -> PermissionGroup {
    let relations = store.clone();
    PermissionGroup::builder::<Deal>("deal")
        .check_ref(SELLER_IN_DEAL, move |deal, ctx| {
            let Some(principal) = ctx.principal() else {
                return Ok(false);
            };
            let sellers = relations.query_related(deal, SELLERS)?;
            Ok(sellers.iter().any(|seller| principal.is(seller)))
        })
        .check(BUYER_HAS_TRANSACTION, move |deal, ctx| {
            let Some(principal) = ctx.principal() else {
                return Ok(false);
            };
            let buyers = store.query_related(&deal.entity_ref(), BUYERS_WITH_TRANSACTION)?;
            Ok(buyers.iter().any(|buyer| principal.is(buyer)))
        })
        .build()
}
