#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use graphguard_security::{EntityId, EntityRef, PermissionCacheKey, Principal, RequestContext};

#[test]
fn concurrent_writers_converge_on_one_value() {
    let ctx = RequestContext::new(Some(Principal::builder().build()));
    let predicate: Arc<str> = Arc::from("deal.buyer_has_transaction");

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for id in 0..64_i64 {
                    let key = PermissionCacheKey::new("Deal", EntityId::Int(id), predicate.clone());
                    let stored = ctx.cache_permission(key, id % 2 == 0);
                    assert_eq!(stored, id % 2 == 0);
                    assert!(ctx.is_authenticated());
                }
            });
        }
    });

    assert_eq!(ctx.cached_permission_count(), 64);
    let key = PermissionCacheKey::new("Deal", EntityId::Int(10), predicate);
    assert_eq!(ctx.cached_permission(&key), Some(true));
}

#[test]
fn contexts_do_not_share_caches() {
    let key = PermissionCacheKey::for_entity(&EntityRef::new("Deal", 1), Arc::from("public"));

    let first = RequestContext::anonymous();
    first.cache_permission(key.clone(), true);

    let second = RequestContext::anonymous();
    assert_eq!(second.cached_permission(&key), None);
    assert_eq!(second.cached_permission_count(), 0);
}
