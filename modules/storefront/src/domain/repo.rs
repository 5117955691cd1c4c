//! Persistence ports. Implementations report store faults as `anyhow::Error`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::contract::model::{Order, OrderStatus, Product, ProductSummary, User};

#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<User>>;

    /// Insert `user`, or refresh email, name and `updated_at` of an existing row.
    /// Role and `created_at` of an existing row are kept.
    async fn upsert(&self, user: User) -> anyhow::Result<User>;
}

#[async_trait]
pub trait ProductsRepository: Send + Sync {
    async fn insert(&self, product: &Product) -> anyhow::Result<()>;

    /// Any product regardless of the active flag, with the seller's name.
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Product>>;

    /// Active products, newest first.
    async fn list_active(&self) -> anyhow::Result<Vec<Product>>;

    async fn set_active(&self, id: Uuid, active: bool) -> anyhow::Result<()>;
}

/// Proof that a buyer holds a completed order item for a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entitlement {
    pub order_id: Uuid,
    pub order_item_id: Uuid,
    pub product_id: Uuid,
    pub file_key: String,
}

/// A single-item order ready to be written.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub item_id: Uuid,
    pub buyer_id: String,
    pub product: ProductSummary,
    pub amount: Decimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum LedgerWriteError {
    /// The buyer already has an order item for this product.
    #[error("order item for this buyer and product already exists")]
    Conflict,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Order item of `buyer_id` for `product_id` whose order status grants entitlement.
    async fn find_entitlement(
        &self,
        buyer_id: &str,
        product_id: Uuid,
    ) -> anyhow::Result<Option<Entitlement>>;

    /// Write the order and its item atomically. A second entitling item for the same
    /// (buyer, product) pair is rejected by the unique index as `Conflict`; items of
    /// non-entitling orders never conflict.
    async fn record_order(&self, order: NewOrder) -> Result<Order, LedgerWriteError>;

    /// Orders of `buyer_id` in any of `statuses`, newest first, with items and product projections.
    async fn list_orders(
        &self,
        buyer_id: &str,
        statuses: &[OrderStatus],
    ) -> anyhow::Result<Vec<Order>>;
}
