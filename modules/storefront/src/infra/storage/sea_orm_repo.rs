use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::contract::model::{Order, OrderStatus, Product, User};
use crate::domain::money;
use crate::domain::repo::{
    Entitlement, LedgerRepository, LedgerWriteError, NewOrder, ProductsRepository, UsersRepository,
};
use crate::domain::service::Repositories;
use crate::infra::storage::entity::{order, order_item, product, user};
use crate::infra::storage::mapper;

/// One sea-orm backed implementation of every storefront repository port.
#[derive(Clone)]
pub struct SeaOrmRepository<C> {
    conn: C,
}

impl<C> SeaOrmRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    /// Share this repository behind every port.
    pub fn into_repositories(self) -> Repositories {
        let repo = Arc::new(self);
        Repositories {
            users: repo.clone(),
            products: repo.clone(),
            ledger: repo,
        }
    }
}

#[async_trait]
impl<C> UsersRepository for SeaOrmRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<User>> {
        user::Entity::find_by_id(id.to_string())
            .one(&self.conn)
            .await
            .with_context(|| format!("failed to load user {id}"))?
            .map(mapper::user_to_contract)
            .transpose()
    }

    async fn upsert(&self, u: User) -> anyhow::Result<User> {
        let id = u.id.clone();
        let active_model = user::ActiveModel {
            id: Set(u.id),
            email: Set(u.email),
            name: Set(u.name),
            role: Set(u.role.as_str().to_string()),
            created_at: Set(u.created_at),
            updated_at: Set(u.updated_at),
        };

        user::Entity::insert(active_model)
            .on_conflict(
                OnConflict::column(user::Column::Id)
                    .update_columns([
                        user::Column::Email,
                        user::Column::Name,
                        user::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.conn)
            .await
            .with_context(|| format!("failed to upsert user {id}"))?;

        UsersRepository::find_by_id(self, &id)
            .await?
            .ok_or_else(|| anyhow!("user {id} missing right after upsert"))
    }
}

#[async_trait]
impl<C> ProductsRepository for SeaOrmRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn insert(&self, p: &Product) -> anyhow::Result<()> {
        let price_cents = money::to_cents(p.price)
            .ok_or_else(|| anyhow!("price {} is not representable in cents", p.price))?;
        let active_model = product::ActiveModel {
            id: Set(p.id),
            title: Set(p.title.clone()),
            description: Set(p.description.clone()),
            price_cents: Set(price_cents),
            category: Set(p.category.clone()),
            preview_url: Set(p.preview_url.clone()),
            file_key: Set(p.file_key.clone()),
            seller_id: Set(p.seller_id.clone()),
            active: Set(p.active),
            created_at: Set(p.created_at),
        };
        active_model
            .insert(&self.conn)
            .await
            .with_context(|| format!("failed to insert product {}", p.id))?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>> {
        let row = product::Entity::find_by_id(id)
            .find_also_related(user::Entity)
            .one(&self.conn)
            .await
            .with_context(|| format!("failed to load product {id}"))?;
        Ok(row.map(|(p, seller)| mapper::product_to_contract(p, seller)))
    }

    async fn list_active(&self) -> anyhow::Result<Vec<Product>> {
        let rows = product::Entity::find()
            .filter(product::Column::Active.eq(true))
            .order_by_desc(product::Column::CreatedAt)
            .find_also_related(user::Entity)
            .all(&self.conn)
            .await
            .context("failed to list products")?;
        Ok(rows
            .into_iter()
            .map(|(p, seller)| mapper::product_to_contract(p, seller))
            .collect())
    }

    async fn set_active(&self, id: Uuid, active: bool) -> anyhow::Result<()> {
        product::Entity::update_many()
            .col_expr(product::Column::Active, Expr::value(active))
            .filter(product::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .with_context(|| format!("failed to update product {id}"))?;
        Ok(())
    }
}

#[async_trait]
impl<C> LedgerRepository for SeaOrmRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    async fn find_entitlement(
        &self,
        buyer_id: &str,
        product_id: Uuid,
    ) -> anyhow::Result<Option<Entitlement>> {
        let row = order_item::Entity::find()
            .join(JoinType::InnerJoin, order_item::Relation::Order.def())
            .filter(order::Column::BuyerId.eq(buyer_id))
            .filter(order::Column::Status.is_in(status_strings(&OrderStatus::entitling())))
            .filter(order_item::Column::ProductId.eq(product_id))
            .find_also_related(product::Entity)
            .one(&self.conn)
            .await
            .context("failed to look up entitlement")?;

        let Some((item, product)) = row else {
            return Ok(None);
        };
        let product =
            product.ok_or_else(|| anyhow!("order item {} has no product row", item.id))?;
        Ok(Some(Entitlement {
            order_id: item.order_id,
            order_item_id: item.id,
            product_id: item.product_id,
            file_key: product.file_key,
        }))
    }

    async fn record_order(&self, new_order: NewOrder) -> Result<Order, LedgerWriteError> {
        let cents = money::to_cents(new_order.amount)
            .ok_or_else(|| anyhow!("amount {} is not representable in cents", new_order.amount))?;

        // Writes come first so the transaction takes the write lock before reading;
        // the unique (buyer_id, product_id) index settles concurrent duplicates.
        let txn = self
            .conn
            .begin()
            .await
            .context("failed to begin purchase transaction")?;

        let order_model = order::ActiveModel {
            id: Set(new_order.id),
            buyer_id: Set(new_order.buyer_id.clone()),
            total_cents: Set(cents),
            status: Set(new_order.status.as_str().to_string()),
            created_at: Set(new_order.created_at),
        }
        .insert(&txn)
        .await
        .map_err(write_error)?;

        let item_model = order_item::ActiveModel {
            id: Set(new_order.item_id),
            order_id: Set(new_order.id),
            product_id: Set(new_order.product.id),
            buyer_id: Set(new_order.buyer_id),
            price_at_purchase_cents: Set(cents),
            entitled: Set(new_order.status.grants_entitlement()),
        }
        .insert(&txn)
        .await
        .map_err(write_error)?;

        txn.commit().await.map_err(write_error)?;

        let item = mapper::item_to_contract(item_model, new_order.product);
        Ok(mapper::order_to_contract(order_model, vec![item])?)
    }

    async fn list_orders(
        &self,
        buyer_id: &str,
        statuses: &[OrderStatus],
    ) -> anyhow::Result<Vec<Order>> {
        let orders = order::Entity::find()
            .filter(order::Column::BuyerId.eq(buyer_id))
            .filter(order::Column::Status.is_in(status_strings(statuses)))
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .all(&self.conn)
            .await
            .context("failed to list orders")?;
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let rows = order_item::Entity::find()
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .find_also_related(product::Entity)
            .all(&self.conn)
            .await
            .context("failed to load order items")?;

        let mut items_by_order: HashMap<Uuid, Vec<_>> = HashMap::new();
        for (item, product) in rows {
            let product =
                product.ok_or_else(|| anyhow!("order item {} has no product row", item.id))?;
            let summary = mapper::product_summary(&product);
            items_by_order
                .entry(item.order_id)
                .or_default()
                .push(mapper::item_to_contract(item, summary));
        }

        orders
            .into_iter()
            .map(|o| {
                let items = items_by_order.remove(&o.id).unwrap_or_default();
                mapper::order_to_contract(o, items)
            })
            .collect()
    }
}

fn status_strings(statuses: &[OrderStatus]) -> Vec<&'static str> {
    statuses.iter().map(|s| s.as_str()).collect()
}

fn write_error(err: DbErr) -> LedgerWriteError {
    if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
        return LedgerWriteError::Conflict;
    }
    LedgerWriteError::Store(anyhow::Error::new(err).context("failed to record order"))
}
