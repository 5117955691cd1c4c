use std::sync::Arc;

use crate::domain::accounts::AccountsService;
use crate::domain::asset_store::AssetStore;
use crate::domain::catalog::{CatalogConfig, CatalogService};
use crate::domain::delivery::DeliveryService;
use crate::domain::ledger::LedgerService;
use crate::domain::repo::{LedgerRepository, ProductsRepository, UsersRepository};

/// Persistence ports the services are built from.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UsersRepository>,
    pub products: Arc<dyn ProductsRepository>,
    pub ledger: Arc<dyn LedgerRepository>,
}

/// Blob stores: private purchasable files and public previews.
#[derive(Clone)]
pub struct AssetStores {
    pub assets: Arc<dyn AssetStore>,
    pub previews: Arc<dyn AssetStore>,
}

pub type ServiceConfig = CatalogConfig;

/// All storefront services, shared by the REST layer and the local gateway.
#[derive(Clone)]
pub struct Service {
    pub accounts: AccountsService,
    pub catalog: CatalogService,
    pub ledger: LedgerService,
    pub delivery: DeliveryService,
}

impl Service {
    pub fn new(repos: Repositories, stores: AssetStores, config: ServiceConfig) -> Self {
        Self {
            accounts: AccountsService::new(repos.users.clone()),
            catalog: CatalogService::new(
                repos.products.clone(),
                repos.users.clone(),
                stores.assets.clone(),
                stores.previews,
                config,
            ),
            ledger: LedgerService::new(repos.users, repos.products, repos.ledger.clone()),
            delivery: DeliveryService::new(repos.ledger, stores.assets),
        }
    }
}
