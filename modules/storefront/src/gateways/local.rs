use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::{
    client::StorefrontApi,
    error::StorefrontError,
    model::{Caller, Download, NewProduct, Order, Product, User, UserProfile},
};
use crate::domain::{error::DomainError, service::Service};

/// Local implementation of the StorefrontApi trait that delegates to the domain services
pub struct StorefrontLocalClient {
    service: Arc<Service>,
}

impl StorefrontLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl StorefrontApi for StorefrontLocalClient {
    async fn sync_user(&self, caller: &Caller, profile: UserProfile) -> anyhow::Result<User> {
        self.service
            .accounts
            .sync_user(caller, profile)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn get_me(&self, caller: &Caller) -> anyhow::Result<User> {
        self.service
            .accounts
            .get_me(caller)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn create_product(
        &self,
        caller: &Caller,
        new_product: NewProduct,
    ) -> anyhow::Result<Product> {
        self.service
            .catalog
            .create_product(caller, new_product)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn list_products(&self) -> anyhow::Result<Vec<Product>> {
        self.service
            .catalog
            .list_products()
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn get_product(&self, id: Uuid) -> anyhow::Result<Product> {
        self.service
            .catalog
            .get_product(id)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn deactivate_product(&self, caller: &Caller, id: Uuid) -> anyhow::Result<Product> {
        self.service
            .catalog
            .deactivate_product(caller, id)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn purchase(&self, caller: &Caller, product_id: Uuid) -> anyhow::Result<Order> {
        self.service
            .ledger
            .purchase(caller, product_id)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn list_purchases(&self, caller: &Caller) -> anyhow::Result<Vec<Order>> {
        self.service
            .ledger
            .list_purchases(caller)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn open_download(&self, caller: &Caller, product_id: Uuid) -> anyhow::Result<Download> {
        self.service
            .delivery
            .open_download(caller, product_id)
            .await
            .map_err(map_domain_error_to_anyhow)
    }
}

/// Map domain errors to contract errors wrapped in anyhow
fn map_domain_error_to_anyhow(domain_error: DomainError) -> anyhow::Error {
    let message = domain_error.to_string();
    let contract_error = match domain_error {
        DomainError::UserNotFound { id } => StorefrontError::not_found("user", id),
        DomainError::ProductNotFound { id } => StorefrontError::not_found("product", id.to_string()),
        DomainError::AssetMissing { product_id } => {
            StorefrontError::not_found("asset", product_id.to_string())
        }
        DomainError::CannotBuyOwnProduct { .. }
        | DomainError::AlreadyOwned { .. }
        | DomainError::InvalidEmail { .. }
        | DomainError::Validation { .. } => StorefrontError::invalid_request(message),
        DomainError::NotEntitled { .. } | DomainError::NotProductOwner { .. } => {
            StorefrontError::forbidden(message)
        }
        DomainError::Database { .. } | DomainError::Storage { .. } => StorefrontError::internal(),
    };

    anyhow::Error::new(contract_error)
}
