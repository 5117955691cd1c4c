use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::contract::model::{Caller, Download};
use crate::domain::asset_key::AssetKey;
use crate::domain::asset_store::{AssetStore, AssetStoreError};
use crate::domain::error::DomainError;
use crate::domain::repo::LedgerRepository;

/// Streams purchased files. Entitlement is looked up on every call.
#[derive(Clone)]
pub struct DeliveryService {
    ledger: Arc<dyn LedgerRepository>,
    assets: Arc<dyn AssetStore>,
}

impl DeliveryService {
    pub fn new(ledger: Arc<dyn LedgerRepository>, assets: Arc<dyn AssetStore>) -> Self {
        Self { ledger, assets }
    }

    #[instrument(
        name = "storefront.delivery.open_download",
        skip(self, caller),
        fields(user_id = %caller.user_id, product_id = %product_id)
    )]
    pub async fn open_download(
        &self,
        caller: &Caller,
        product_id: Uuid,
    ) -> Result<Download, DomainError> {
        let Some(entitlement) = self
            .ledger
            .find_entitlement(&caller.user_id, product_id)
            .await?
        else {
            warn!("Download refused without a completed purchase");
            return Err(DomainError::not_entitled(product_id));
        };

        if entitlement.file_key.is_empty() {
            return Err(DomainError::asset_missing(product_id));
        }
        let key = AssetKey::parse(&entitlement.file_key).map_err(|e| {
            warn!(key = %entitlement.file_key, error = %e, "Stored asset key is not valid");
            DomainError::asset_missing(product_id)
        })?;

        let stored = match self.assets.open(&key).await {
            Ok(stored) => stored,
            Err(AssetStoreError::NotFound(_)) => {
                warn!(key = %key, "Asset missing from storage");
                return Err(DomainError::asset_missing(product_id));
            }
            Err(e) => return Err(DomainError::storage(e)),
        };

        info!(order_id = %entitlement.order_id, size = stored.size, "Opened download");
        Ok(Download {
            file_name: download_file_name(product_id, &key),
            size: Some(stored.size),
            reader: stored.reader,
        })
    }
}

/// `product-{id}-download{.ext}` with the extension of the stored key, if any.
pub fn download_file_name(product_id: Uuid, key: &AssetKey) -> String {
    match key.extension() {
        Some(ext) => format!("product-{product_id}-download.{ext}"),
        None => format!("product-{product_id}-download"),
    }
}
