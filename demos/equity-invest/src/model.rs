//! Rows exposed by the equity investment schema.

use graphguard_security::{Entity, EntityId};
use serde::{Deserialize, Serialize};

pub const FUND: &str = "Fund";
pub const DEAL: &str = "Deal";
pub const BUYER: &str = "Buyer";
pub const TRANSACTION: &str = "Transaction";
/// Principals self-identify as sellers to pass `deal.seller_in_deal`.
pub const SELLER: &str = "Seller";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fund {
    pub id: i64,
    pub name: String,
    pub ein: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: i64,
    pub name: String,
    pub share_price: f64,
    pub deal_value: f64,
    pub seller_ids: Vec<i64>,
    pub waitlist_buyer_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buyer {
    pub id: i64,
    pub investment_entity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub deal_id: i64,
    pub buyer_id: i64,
}

/// Input of the `createFund` mutation.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFundInput {
    pub name: String,
    pub ein: String,
}

macro_rules! impl_entity {
    ($($ty:ty => $name:expr),* $(,)?) => {
        $(
            impl Entity for $ty {
                fn type_name(&self) -> &str {
                    $name
                }

                fn primary_key(&self) -> EntityId {
                    EntityId::Int(self.id)
                }
            }
        )*
    };
}

impl_entity!(
    Fund => FUND,
    Deal => DEAL,
    Buyer => BUYER,
    Transaction => TRANSACTION,
);
