//! Local filesystem asset store.
//!
//! Objects live directly under the root directory as `{root}/{key}`. Keys are
//! validated single segments, so the join cannot leave the root. Writes go to a
//! dot-prefixed temp file first and are renamed into place; a dot-prefixed name
//! can never be addressed by a valid key.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::domain::asset_key::AssetKey;
use crate::domain::asset_store::{AssetStore, AssetStoreError, StoredAsset};

pub struct LocalAssetStore {
    root: PathBuf,
}

impl LocalAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if needed.
    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &AssetKey) -> PathBuf {
        self.root.join(key.as_str())
    }
}

fn not_found_or_io(key: &AssetKey, e: io::Error) -> AssetStoreError {
    if e.kind() == io::ErrorKind::NotFound {
        AssetStoreError::NotFound(key.to_string())
    } else {
        AssetStoreError::Io(e)
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn put(&self, key: &AssetKey, data: Bytes) -> Result<(), AssetStoreError> {
        self.ensure_root().await?;
        let path = self.key_path(key);
        let tmp = self.root.join(format!(".{}.{}.part", key, Uuid::new_v4()));

        let write = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
            fs::rename(&tmp, &path).await
        };
        if let Err(e) = write.await {
            let _ = fs::remove_file(&tmp).await;
            return Err(AssetStoreError::Io(e));
        }
        Ok(())
    }

    async fn open(&self, key: &AssetKey) -> Result<StoredAsset, AssetStoreError> {
        let path = self.key_path(key);
        let file = fs::File::open(&path)
            .await
            .map_err(|e| not_found_or_io(key, e))?;
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(AssetStoreError::NotFound(key.to_string()));
        }
        Ok(StoredAsset {
            size: metadata.len(),
            reader: Box::new(file),
        })
    }

    async fn exists(&self, key: &AssetKey) -> Result<bool, AssetStoreError> {
        Ok(fs::try_exists(self.key_path(key)).await?)
    }

    async fn remove(&self, key: &AssetKey) -> Result<(), AssetStoreError> {
        match fs::remove_file(self.key_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()), // Already gone
            Err(e) => Err(AssetStoreError::Io(e)),
        }
    }
}
