use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::contract::model::{Caller, Order, OrderStatus, ProductSummary};
use crate::domain::accounts::require_user;
use crate::domain::error::DomainError;
use crate::domain::repo::{
    LedgerRepository, LedgerWriteError, NewOrder, ProductsRepository, UsersRepository,
};

/// Records who owns what. Ownership is a completed order item, nothing else.
#[derive(Clone)]
pub struct LedgerService {
    users: Arc<dyn UsersRepository>,
    products: Arc<dyn ProductsRepository>,
    ledger: Arc<dyn LedgerRepository>,
}

impl LedgerService {
    pub fn new(
        users: Arc<dyn UsersRepository>,
        products: Arc<dyn ProductsRepository>,
        ledger: Arc<dyn LedgerRepository>,
    ) -> Self {
        Self {
            users,
            products,
            ledger,
        }
    }

    /// Buy `product_id` for the caller.
    ///
    /// Checks run in a fixed order: the product must exist and be active, the caller
    /// must not be its seller, and the caller must not already own it. The order and
    /// its single item are then written in one transaction. A concurrent duplicate
    /// that slips past the check is stopped by the unique (buyer, product) index and
    /// reported as `AlreadyOwned` as well.
    #[instrument(
        name = "storefront.ledger.purchase",
        skip(self, caller),
        fields(buyer_id = %caller.user_id, product_id = %product_id)
    )]
    pub async fn purchase(&self, caller: &Caller, product_id: Uuid) -> Result<Order, DomainError> {
        let product = self
            .products
            .find_by_id(product_id)
            .await?
            .filter(|p| p.active)
            .ok_or_else(|| DomainError::product_not_found(product_id))?;

        if product.seller_id == caller.user_id {
            warn!("Seller tried to buy own product");
            return Err(DomainError::cannot_buy_own_product(product_id));
        }

        if self
            .ledger
            .find_entitlement(&caller.user_id, product_id)
            .await?
            .is_some()
        {
            debug!("Product already owned");
            return Err(DomainError::already_owned(product_id));
        }

        require_user(self.users.as_ref(), &caller.user_id).await?;

        let new_order = NewOrder {
            id: Uuid::new_v4(),
            item_id: Uuid::new_v4(),
            buyer_id: caller.user_id.clone(),
            product: ProductSummary::from(&product),
            amount: product.price,
            status: OrderStatus::Completed,
            created_at: Utc::now(),
        };

        match self.ledger.record_order(new_order).await {
            Ok(order) => {
                info!(order_id = %order.id, amount = %order.total_amount, "Purchase completed");
                Ok(order)
            }
            Err(LedgerWriteError::Conflict) => {
                debug!("Concurrent purchase already recorded");
                Err(DomainError::already_owned(product_id))
            }
            Err(LedgerWriteError::Store(e)) => Err(e.into()),
        }
    }

    /// Completed orders of the caller, newest first.
    #[instrument(
        name = "storefront.ledger.list_purchases",
        skip(self, caller),
        fields(buyer_id = %caller.user_id)
    )]
    pub async fn list_purchases(&self, caller: &Caller) -> Result<Vec<Order>, DomainError> {
        let orders = self
            .ledger
            .list_orders(&caller.user_id, &OrderStatus::entitling())
            .await?;
        debug!("Found {} completed orders", orders.len());
        Ok(orders)
    }
}
