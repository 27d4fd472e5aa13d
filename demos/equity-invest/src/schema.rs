//! Equity investment schema: field tables, entry points and resolvers.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use field_authz::{EntryPoint, FieldAuthzConfig, PredicateRegistry, ResolutionGuard};
use field_authz_sdk::{ConfigError, EntityStore, PredicateRef};
use graphguard_security::{Entity, EntityIdParseError, EntityRef, RequestContext};
use serde_json::{Value, json};

use crate::error::SchemaError;
use crate::model::{BUYER, Buyer, CreateFundInput, DEAL, Deal, FUND, Fund};
use crate::permissions::{BUYER_HAS_TRANSACTION, SELLER_IN_DEAL, deal_permissions};
use crate::store::{BUYERS_WITH_TRANSACTION, InMemoryStore, WAITLIST_BUYERS};

pub const FUND_GET_NODE: &str = "fund.get_node";
pub const BUYER_GET_NODE: &str = "buyer.get_node";
pub const DEAL_GET_NODE: &str = "deal.get_node";
pub const FUND_CREATE: &str = "fund.create";

/// Resolvers for funds, deals and buyers, guarded field by field.
pub struct EquityInvestSchema {
    guard: ResolutionGuard,
    store: Arc<InMemoryStore>,
    fund_get_node: EntryPoint,
    buyer_get_node: EntryPoint,
    deal_get_node: EntryPoint,
    fund_create: EntryPoint,
}

impl EquityInvestSchema {
    /// Register every predicate, field and entry point.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if the declarations are inconsistent.
    pub fn new(store: Arc<InMemoryStore>, config: FieldAuthzConfig) -> Result<Self, ConfigError> {
        let deal = deal_permissions(store.clone() as Arc<dyn EntityStore>);
        let seller_in_deal = deal.require(SELLER_IN_DEAL)?;
        let buyer_has_transaction = deal.require(BUYER_HAS_TRANSACTION)?;
        let registry = Arc::new(PredicateRegistry::builder().group(&deal).build()?);

        let mut builder = ResolutionGuard::builder(registry, config);
        builder.object_type(
            DEAL,
            [
                ("id", vec![PredicateRef::from("public")]),
                ("share_price", vec!["logged_in".into()]),
                ("name", vec![seller_in_deal.clone().into()]),
                (
                    "deal_value",
                    vec![seller_in_deal.clone().into(), buyer_has_transaction.into()],
                ),
                ("buyers_without_transaction", vec!["public".into()]),
                ("waitlist_buyers", vec!["public".into()]),
            ],
        )?;
        builder.object_type(
            BUYER,
            [("id", vec!["public"]), ("investment_entity", vec!["staff", "self"])],
        )?;

        let fund_get_node = builder.entry_point(FUND_GET_NODE, ["staff"])?;
        let buyer_get_node = builder.entry_point(BUYER_GET_NODE, ["staff", "self"])?;
        let deal_get_node =
            builder.entry_point::<_, PredicateRef>(DEAL_GET_NODE, ["is_staff".into(), seller_in_deal.into()])?;
        let fund_create = builder.entry_point(FUND_CREATE, ["staff"])?;

        Ok(Self {
            guard: builder.build(),
            store,
            fund_get_node,
            buyer_get_node,
            deal_get_node,
            fund_create,
        })
    }

    /// Build the schema with configuration read from `config_path` and the
    /// environment.
    ///
    /// # Errors
    ///
    /// Configuration that fails to load or a schema that fails to register.
    pub fn from_config_file(store: Arc<InMemoryStore>, config_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = config_path.as_ref();
        let config = FieldAuthzConfig::load(path)
            .with_context(|| format!("failed to load field authorization config from {}", path.display()))?;
        Self::new(store, config).context("failed to register equity invest schema")
    }

    #[must_use]
    pub fn guard(&self) -> &ResolutionGuard {
        &self.guard
    }

    #[must_use]
    pub fn store(&self) -> &Arc<InMemoryStore> {
        &self.store
    }

    /// Relay-style lookup by global id (`"Deal:1"`).
    ///
    /// # Errors
    ///
    /// - [`SchemaError::InvalidId`] for a malformed or non-integer id
    /// - [`SchemaError::UnknownType`] for a type without a node lookup
    /// - otherwise as the typed lookups
    pub async fn node(&self, ctx: &RequestContext, global_id: &str) -> Result<Value, SchemaError> {
        let node: EntityRef = global_id.parse()?;
        let id = node
            .id()
            .as_int()
            .ok_or_else(|| EntityIdParseError::NotAnInteger(global_id.to_owned()))?;
        match node.type_name() {
            FUND => self.fund(ctx, id).await,
            DEAL => self.deal(ctx, id).await,
            BUYER => self.buyer(ctx, id).await,
            other => Err(SchemaError::UnknownType(other.to_owned())),
        }
    }

    /// `fund.get_node`; staff only. Fund fields carry no field-level rules.
    ///
    /// # Errors
    ///
    /// [`SchemaError::Rejected`] if the caller is not staff, before any read.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn fund(&self, ctx: &RequestContext, id: i64) -> Result<Value, SchemaError> {
        let candidate = EntityRef::new(FUND, id);
        let fund = self
            .guard
            .enforce_entry_point(&self.fund_get_node, ctx, Some(&candidate), move || async move {
                self.store.fund(id)
            })
            .await?;
        self.render_fund(ctx, &fund)
    }

    /// `buyer.get_node`; staff or the buyer themselves.
    ///
    /// # Errors
    ///
    /// [`SchemaError::Rejected`] if neither requirement passes, before any read.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn buyer(&self, ctx: &RequestContext, id: i64) -> Result<Value, SchemaError> {
        let candidate = EntityRef::new(BUYER, id);
        let buyer = self
            .guard
            .enforce_entry_point(&self.buyer_get_node, ctx, Some(&candidate), move || async move {
                self.store.buyer(id)
            })
            .await?;
        self.render_buyer(ctx, &buyer)
    }

    /// `deal.get_node`; staff or a seller in the deal.
    ///
    /// # Errors
    ///
    /// [`SchemaError::Rejected`] if neither requirement passes, before any read.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn deal(&self, ctx: &RequestContext, id: i64) -> Result<Value, SchemaError> {
        let candidate = EntityRef::new(DEAL, id);
        let deal = self
            .guard
            .enforce_entry_point(&self.deal_get_node, ctx, Some(&candidate), move || async move {
                self.store.deal(id)
            })
            .await?;
        self.render_deal(ctx, &deal)
    }

    /// The `deals` connection. Not an entry point: every caller may list
    /// deals, field rules decide what each row shows.
    ///
    /// # Errors
    ///
    /// [`SchemaError::Store`] if the listing cannot be read.
    #[tracing::instrument(skip_all)]
    pub fn deals(&self, ctx: &RequestContext) -> Result<Value, SchemaError> {
        let rows = self
            .store
            .list_deals()?
            .iter()
            .map(|deal| self.render_deal(ctx, deal))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Array(rows))
    }

    /// `createFund` mutation; staff only.
    ///
    /// # Errors
    ///
    /// [`SchemaError::Rejected`] if the caller is not staff; nothing is written.
    #[tracing::instrument(skip_all)]
    pub async fn create_fund(&self, ctx: &RequestContext, input: CreateFundInput) -> Result<Value, SchemaError> {
        let fund = self
            .guard
            .enforce_entry_point(&self.fund_create, ctx, None, move || async move {
                self.store.create_fund(input.name, input.ein)
            })
            .await?;
        tracing::info!(fund_id = fund.id, "fund created");
        Ok(json!({ "fund": self.render_fund(ctx, &fund)? }))
    }

    fn render_fund(&self, ctx: &RequestContext, fund: &Fund) -> Result<Value, SchemaError> {
        let obj = self.guard.resolve_object(
            fund,
            ctx,
            [
                ("id", json!(fund.id)),
                ("name", json!(fund.name)),
                ("ein", json!(fund.ein)),
            ],
        )?;
        Ok(Value::Object(obj))
    }

    fn render_buyer(&self, ctx: &RequestContext, buyer: &Buyer) -> Result<Value, SchemaError> {
        let obj = self.guard.resolve_object(
            buyer,
            ctx,
            [
                ("id", json!(buyer.id)),
                ("investment_entity", json!(buyer.investment_entity)),
            ],
        )?;
        Ok(Value::Object(obj))
    }

    fn render_deal(&self, ctx: &RequestContext, deal: &Deal) -> Result<Value, SchemaError> {
        let mut obj = self.guard.resolve_object(
            deal,
            ctx,
            [
                ("id", json!(deal.id)),
                ("share_price", json!(deal.share_price)),
                ("name", json!(deal.name)),
                ("deal_value", json!(deal.deal_value)),
            ],
        )?;

        let waitlist = self
            .guard
            .resolve_field(DEAL, "waitlist_buyers", deal, ctx, || {
                self.related_ids(deal, WAITLIST_BUYERS)
            })?
            .transpose()?;
        let without_transaction = self
            .guard
            .resolve_field(DEAL, "buyers_without_transaction", deal, ctx, || {
                self.buyers_without_transaction(deal)
            })?
            .transpose()?;
        obj.insert("waitlist_buyers".to_owned(), json!(waitlist));
        obj.insert("buyers_without_transaction".to_owned(), json!(without_transaction));
        Ok(Value::Object(obj))
    }

    /// Waitlisted buyers that hold no transaction on the deal.
    fn buyers_without_transaction(&self, deal: &Deal) -> Result<Vec<i64>, SchemaError> {
        let with_transaction = self.related_ids(deal, BUYERS_WITH_TRANSACTION)?;
        let mut ids = self.related_ids(deal, WAITLIST_BUYERS)?;
        ids.retain(|id| !with_transaction.contains(id));
        Ok(ids)
    }

    fn related_ids(&self, deal: &Deal, relation: &str) -> Result<Vec<i64>, SchemaError> {
        Ok(self
            .store
            .query_related(&deal.entity_ref(), relation)?
            .iter()
            .filter_map(|r| r.id().as_int())
            .collect())
    }
}
