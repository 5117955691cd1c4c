use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::contract::model::{Caller, NewProduct, Product, UploadedAsset};
use crate::domain::accounts::require_user;
use crate::domain::asset_key::AssetKey;
use crate::domain::asset_store::AssetStore;
use crate::domain::error::DomainError;
use crate::domain::money;
use crate::domain::repo::{ProductsRepository, UsersRepository};

pub const PREVIEW_FIELD: &str = "previewImage";
pub const DIGITAL_FIELD: &str = "digitalFile";

/// Fresh keys are regenerated this many times if one is already taken.
const KEY_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub public_base_url: String,
    pub max_title_length: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://127.0.0.1:3001".to_string(),
            max_title_length: 200,
        }
    }
}

#[derive(Clone)]
pub struct CatalogService {
    products: Arc<dyn ProductsRepository>,
    users: Arc<dyn UsersRepository>,
    assets: Arc<dyn AssetStore>,
    previews: Arc<dyn AssetStore>,
    config: CatalogConfig,
}

impl CatalogService {
    pub fn new(
        products: Arc<dyn ProductsRepository>,
        users: Arc<dyn UsersRepository>,
        assets: Arc<dyn AssetStore>,
        previews: Arc<dyn AssetStore>,
        config: CatalogConfig,
    ) -> Self {
        Self {
            products,
            users,
            assets,
            previews,
            config,
        }
    }

    #[instrument(
        name = "storefront.catalog.create_product",
        skip(self, caller, new_product),
        fields(seller_id = %caller.user_id)
    )]
    pub async fn create_product(
        &self,
        caller: &Caller,
        new_product: NewProduct,
    ) -> Result<Product, DomainError> {
        let seller = require_user(self.users.as_ref(), &caller.user_id).await?;

        let title = new_product.title.trim().to_string();
        self.validate_title(&title)?;
        let category = new_product.category.trim().to_string();
        if category.is_empty() {
            return Err(DomainError::validation("category", "must not be empty"));
        }
        let price = money::validate_price(new_product.price)?;
        let description = new_product
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let preview_key = match new_product.preview {
            Some(asset) => Some(store_upload(self.previews.as_ref(), PREVIEW_FIELD, asset).await?),
            None => None,
        };
        let file_key = match new_product.digital {
            Some(asset) => match store_upload(self.assets.as_ref(), DIGITAL_FIELD, asset).await {
                Ok(key) => Some(key),
                Err(e) => {
                    discard(self.previews.as_ref(), preview_key.as_ref()).await;
                    return Err(e);
                }
            },
            None => None,
        };

        let product = Product {
            id: Uuid::new_v4(),
            title,
            description,
            price,
            category,
            preview_url: preview_key
                .as_ref()
                .map(|k| self.preview_url(k))
                .unwrap_or_default(),
            file_key: file_key
                .as_ref()
                .map(|k| k.as_str().to_string())
                .unwrap_or_default(),
            seller_id: seller.id,
            seller_name: seller.name,
            active: true,
            created_at: Utc::now(),
        };

        if let Err(e) = self.products.insert(&product).await {
            discard(self.previews.as_ref(), preview_key.as_ref()).await;
            discard(self.assets.as_ref(), file_key.as_ref()).await;
            return Err(e.into());
        }

        info!(
            product_id = %product.id,
            has_preview = !product.preview_url.is_empty(),
            has_file = !product.file_key.is_empty(),
            "Created product"
        );
        Ok(product)
    }

    #[instrument(name = "storefront.catalog.list_products", skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, DomainError> {
        let products = self.products.list_active().await?;
        debug!("Listed {} active products", products.len());
        Ok(products)
    }

    #[instrument(name = "storefront.catalog.get_product", skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: Uuid) -> Result<Product, DomainError> {
        self.products
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::product_not_found(id))
    }

    /// Soft-deactivate a product. Only its seller may do so; repeating is a no-op.
    #[instrument(
        name = "storefront.catalog.deactivate_product",
        skip(self, caller),
        fields(product_id = %id, user_id = %caller.user_id)
    )]
    pub async fn deactivate_product(&self, caller: &Caller, id: Uuid) -> Result<Product, DomainError> {
        let mut product = self.get_product(id).await?;
        if product.seller_id != caller.user_id {
            warn!("Deactivation refused for non-owner");
            return Err(DomainError::not_product_owner(id));
        }
        if product.active {
            self.products.set_active(id, false).await?;
            product.active = false;
            info!("Deactivated product");
        }
        Ok(product)
    }

    fn validate_title(&self, title: &str) -> Result<(), DomainError> {
        if title.is_empty() {
            return Err(DomainError::validation("title", "must not be empty"));
        }
        let len = title.chars().count();
        if len > self.config.max_title_length {
            return Err(DomainError::validation(
                "title",
                format!(
                    "too long: {} characters (max: {})",
                    len, self.config.max_title_length
                ),
            ));
        }
        Ok(())
    }

    fn preview_url(&self, key: &AssetKey) -> String {
        format!(
            "{}/uploads/{}",
            self.config.public_base_url.trim_end_matches('/'),
            key
        )
    }
}

async fn store_upload(
    store: &dyn AssetStore,
    field: &'static str,
    asset: UploadedAsset,
) -> Result<AssetKey, DomainError> {
    for _ in 0..KEY_ATTEMPTS {
        let key = AssetKey::generate(field, &asset.file_name);
        if store.exists(&key).await.map_err(DomainError::storage)? {
            warn!(key = %key, "Generated asset key already taken");
            continue;
        }
        store
            .put(&key, asset.data.clone())
            .await
            .map_err(DomainError::storage)?;
        debug!(key = %key, bytes = asset.data.len(), "Stored upload");
        return Ok(key);
    }
    Err(DomainError::storage("could not allocate a unique asset key"))
}

/// Best-effort cleanup of an upload whose product row was never written.
async fn discard(store: &dyn AssetStore, key: Option<&AssetKey>) {
    if let Some(key) = key {
        if let Err(e) = store.remove(key).await {
            warn!(key = %key, error = %e, "Failed to remove orphaned upload");
        }
    }
}
