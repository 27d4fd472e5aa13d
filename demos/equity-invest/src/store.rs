//! In-memory entity store backing the demo schema.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use dashmap::DashMap;
use field_authz_sdk::{EntityStore, StoreError};
use graphguard_security::{Entity, EntityId, EntityRef};

use crate::model::{BUYER, Buyer, DEAL, Deal, FUND, Fund, SELLER, TRANSACTION, Transaction};

/// Relation from a deal to the buyers holding a transaction on it.
pub const BUYERS_WITH_TRANSACTION: &str = "buyers_with_transaction";
/// Relation from a deal to its sellers.
pub const SELLERS: &str = "sellers";
/// Relation from a deal to its transactions.
pub const TRANSACTIONS: &str = "transactions";
/// Relation from a deal to its waitlisted buyers.
pub const WAITLIST_BUYERS: &str = "waitlist_buyers";

/// Thread-safe in-memory tables.
///
/// Counts every row read (lookups and listings) so callers can assert that a
/// rejected entry point never loaded its target. Relation queries are not
/// counted. The store can be switched offline to simulate backend failures.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    funds: DashMap<i64, Arc<Fund>>,
    deals: DashMap<i64, Arc<Deal>>,
    buyers: DashMap<i64, Arc<Buyer>>,
    transactions: DashMap<i64, Arc<Transaction>>,
    next_fund_id: AtomicI64,
    reads: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One fund, two deals, three buyers and a single transaction (buyer 42 on deal 1).
    #[must_use]
    pub fn sample() -> Self {
        let store = Self::new();
        store.insert_fund(Fund {
            id: 1,
            name: "Kemcho Growth I".to_owned(),
            ein: "12-3456789".to_owned(),
        });
        store.insert_deal(Deal {
            id: 1,
            name: "Series B secondary".to_owned(),
            share_price: 26.0,
            deal_value: 1_250_000.0,
            seller_ids: vec![10],
            waitlist_buyer_ids: vec![42, 43],
        });
        store.insert_deal(Deal {
            id: 2,
            name: "Series C primary".to_owned(),
            share_price: 41.5,
            deal_value: 4_000_000.0,
            seller_ids: vec![11],
            waitlist_buyer_ids: vec![],
        });
        for (id, entity) in [(42, "Patel Family Trust"), (43, "Northwind LLC"), (44, "Acme Ventures")] {
            store.insert_buyer(Buyer {
                id,
                investment_entity: entity.to_owned(),
            });
        }
        store.insert_transaction(Transaction {
            id: 100,
            deal_id: 1,
            buyer_id: 42,
        });
        store
    }

    pub fn insert_fund(&self, fund: Fund) {
        self.next_fund_id.fetch_max(fund.id, Ordering::SeqCst);
        self.funds.insert(fund.id, Arc::new(fund));
    }

    pub fn insert_deal(&self, deal: Deal) {
        self.deals.insert(deal.id, Arc::new(deal));
    }

    pub fn insert_buyer(&self, buyer: Buyer) {
        self.buyers.insert(buyer.id, Arc::new(buyer));
    }

    pub fn insert_transaction(&self, tx: Transaction) {
        self.transactions.insert(tx.id, Arc::new(tx));
    }

    /// Create a fund with the next free id.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unavailable`] if the store is offline.
    pub fn create_fund(&self, name: String, ein: String) -> Result<Arc<Fund>, StoreError> {
        self.ensure_available()?;
        let id = self.next_fund_id.fetch_add(1, Ordering::SeqCst) + 1;
        let fund = Arc::new(Fund { id, name, ein });
        self.funds.insert(id, fund.clone());
        Ok(fund)
    }

    /// # Errors
    ///
    /// [`StoreError::NotFound`] or [`StoreError::Unavailable`].
    pub fn fund(&self, id: i64) -> Result<Arc<Fund>, StoreError> {
        self.read(&self.funds, FUND, id)
    }

    /// # Errors
    ///
    /// [`StoreError::NotFound`] or [`StoreError::Unavailable`].
    pub fn deal(&self, id: i64) -> Result<Arc<Deal>, StoreError> {
        self.read(&self.deals, DEAL, id)
    }

    /// # Errors
    ///
    /// [`StoreError::NotFound`] or [`StoreError::Unavailable`].
    pub fn buyer(&self, id: i64) -> Result<Arc<Buyer>, StoreError> {
        self.read(&self.buyers, BUYER, id)
    }

    /// Every deal, ordered by id.
    ///
    /// # Errors
    ///
    /// [`StoreError::Unavailable`] if the store is offline.
    pub fn list_deals(&self) -> Result<Vec<Arc<Deal>>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;
        let mut deals: Vec<_> = self.deals.iter().map(|d| d.value().clone()).collect();
        deals.sort_by_key(|d| d.id);
        Ok(deals)
    }

    /// Number of row reads served (or refused) so far.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store is offline".to_owned()));
        }
        Ok(())
    }

    fn read<T>(&self, table: &DashMap<i64, Arc<T>>, type_name: &str, id: i64) -> Result<Arc<T>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;
        table
            .get(&id)
            .map(|row| row.value().clone())
            .ok_or_else(|| StoreError::NotFound {
                type_name: type_name.to_owned(),
                id: id.to_string(),
            })
    }

    fn deal_transactions(&self, deal_id: i64) -> Vec<Arc<Transaction>> {
        let mut txs: Vec<_> = self
            .transactions
            .iter()
            .filter(|tx| tx.deal_id == deal_id)
            .map(|tx| tx.value().clone())
            .collect();
        txs.sort_by_key(|tx| tx.id);
        txs
    }
}

impl EntityStore for InMemoryStore {
    fn find_by_id(&self, type_name: &str, id: &EntityId) -> Result<Arc<dyn Entity>, StoreError> {
        let not_found = || StoreError::NotFound {
            type_name: type_name.to_owned(),
            id: id.to_string(),
        };
        let id = id.as_int().ok_or_else(not_found)?;
        let entity: Arc<dyn Entity> = match type_name {
            FUND => self.fund(id)?,
            DEAL => self.deal(id)?,
            BUYER => self.buyer(id)?,
            TRANSACTION => self.read(&self.transactions, TRANSACTION, id)?,
            _ => return Err(not_found()),
        };
        Ok(entity)
    }

    fn query_related(&self, entity: &EntityRef, relation: &str) -> Result<Vec<EntityRef>, StoreError> {
        self.ensure_available()?;

        let (DEAL, Some(deal_id)) = (entity.type_name(), entity.id().as_int()) else {
            return Ok(Vec::new());
        };
        let related: Vec<EntityRef> = match relation {
            SELLERS => self
                .deals
                .get(&deal_id)
                .map(|deal| deal.seller_ids.iter().map(|id| EntityRef::new(SELLER, *id)).collect())
                .unwrap_or_default(),
            TRANSACTIONS => self
                .deal_transactions(deal_id)
                .iter()
                .map(|tx| EntityRef::new(TRANSACTION, tx.id))
                .collect(),
            BUYERS_WITH_TRANSACTION => {
                let mut ids: Vec<_> = self.deal_transactions(deal_id).iter().map(|tx| tx.buyer_id).collect();
                ids.sort_unstable();
                ids.dedup();
                ids.into_iter().map(|id| EntityRef::new(BUYER, id)).collect()
            }
            WAITLIST_BUYERS => self
                .deals
                .get(&deal_id)
                .map(|deal| {
                    deal.waitlist_buyer_ids
                        .iter()
                        .map(|id| EntityRef::new(BUYER, *id))
                        .collect()
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        };
        Ok(related)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn find_by_id_dispatches_on_type() {
        let store = InMemoryStore::sample();
        let deal = store.find_by_id(DEAL, &EntityId::Int(1)).unwrap();
        assert_eq!(deal.entity_ref(), EntityRef::new(DEAL, 1));

        assert!(matches!(
            store.find_by_id("Company", &EntityId::Int(1)),
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.find_by_id(DEAL, &EntityId::from("abc")),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn relations_follow_transactions() {
        let store = InMemoryStore::sample();
        let deal = EntityRef::new(DEAL, 1);
        assert_eq!(
            store.query_related(&deal, BUYERS_WITH_TRANSACTION).unwrap(),
            vec![EntityRef::new(BUYER, 42)]
        );
        assert_eq!(
            store.query_related(&deal, TRANSACTIONS).unwrap(),
            vec![EntityRef::new(TRANSACTION, 100)]
        );
        assert_eq!(store.query_related(&deal, WAITLIST_BUYERS).unwrap().len(), 2);
        assert_eq!(
            store.query_related(&deal, SELLERS).unwrap(),
            vec![EntityRef::new(SELLER, 10)]
        );
        assert_eq!(store.reads(), 0);
        assert!(store.query_related(&deal, "unknown").unwrap().is_empty());
    }

    #[test]
    fn offline_store_refuses_reads_and_counts_them() {
        let store = InMemoryStore::sample();
        store.set_available(false);
        assert!(matches!(store.deal(1), Err(StoreError::Unavailable(_))));
        assert_eq!(store.reads(), 1);

        store.set_available(true);
        assert_eq!(store.deal(1).unwrap().name, "Series B secondary");
    }

    #[test]
    fn created_funds_get_fresh_ids() {
        let store = InMemoryStore::sample();
        let fund = store.create_fund("Fund II".to_owned(), "98-7654321".to_owned()).unwrap();
        assert_eq!(fund.id, 2);
        assert_eq!(store.fund(2).unwrap().name, "Fund II");
    }
}
