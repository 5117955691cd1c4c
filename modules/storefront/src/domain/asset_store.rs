use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::contract::model::AssetReader;
use crate::domain::asset_key::AssetKey;

#[derive(Debug, Error)]
pub enum AssetStoreError {
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An opened object: its length and a reader positioned at byte zero.
pub struct StoredAsset {
    pub size: u64,
    pub reader: AssetReader,
}

/// Opaque key to bytes. Callers own key uniqueness.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn put(&self, key: &AssetKey, data: Bytes) -> Result<(), AssetStoreError>;

    async fn open(&self, key: &AssetKey) -> Result<StoredAsset, AssetStoreError>;

    async fn exists(&self, key: &AssetKey) -> Result<bool, AssetStoreError>;

    /// Remove an object; a missing key is not an error.
    async fn remove(&self, key: &AssetKey) -> Result<(), AssetStoreError>;
}
