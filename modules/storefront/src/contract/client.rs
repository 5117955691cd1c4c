use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::model::{Caller, Download, NewProduct, Order, Product, User, UserProfile};

/// Public API of the storefront module for in-process consumers.
///
/// Errors are `anyhow::Error` wrapping [`crate::contract::error::StorefrontError`].
#[async_trait]
pub trait StorefrontApi: Send + Sync {
    /// Find-or-create the caller's user record and refresh its profile.
    async fn sync_user(&self, caller: &Caller, profile: UserProfile) -> anyhow::Result<User>;

    async fn get_me(&self, caller: &Caller) -> anyhow::Result<User>;

    async fn create_product(&self, caller: &Caller, new_product: NewProduct)
        -> anyhow::Result<Product>;

    async fn list_products(&self) -> anyhow::Result<Vec<Product>>;

    async fn get_product(&self, id: Uuid) -> anyhow::Result<Product>;

    async fn deactivate_product(&self, caller: &Caller, id: Uuid) -> anyhow::Result<Product>;

    /// Buy a product; exactly one completed order per (buyer, product).
    async fn purchase(&self, caller: &Caller, product_id: Uuid) -> anyhow::Result<Order>;

    /// Completed orders of the caller, newest first.
    async fn list_purchases(&self, caller: &Caller) -> anyhow::Result<Vec<Order>>;

    /// Open the purchased file as a stream.
    async fn open_download(&self, caller: &Caller, product_id: Uuid) -> anyhow::Result<Download>;
}
