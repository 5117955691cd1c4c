use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Module configuration, read from `modules.storefront`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorefrontConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default = "default_max_title_length")]
    pub max_title_length: usize,
    /// Per-file cap applied while reading multipart uploads.
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            identity: IdentityConfig::default(),
            max_title_length: default_max_title_length(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Private directory holding purchasable files. Never served statically.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: String,
    /// Public directory served under `/uploads`.
    #[serde(default = "default_previews_dir")]
    pub previews_dir: String,
    /// Prefix for preview URLs handed to clients.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            assets_dir: default_assets_dir(),
            previews_dir: default_previews_dir(),
            public_base_url: default_public_base_url(),
        }
    }
}

impl StorageConfig {
    /// Absolute asset and preview directories; relative paths hang off `base_dir`.
    pub fn resolve_dirs(&self, base_dir: &Path) -> (PathBuf, PathBuf) {
        let resolve = |raw: &str| {
            let p = PathBuf::from(raw);
            if p.is_absolute() {
                p
            } else {
                base_dir.join(p)
            }
        };
        (resolve(&self.assets_dir), resolve(&self.previews_dir))
    }
}

/// Bearer token verification settings. Exactly one key source must be set.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub hs256_secret: Option<String>,
    #[serde(default)]
    pub rs256_public_key_pem: Option<String>,
}

fn default_max_title_length() -> usize {
    200
}

fn default_max_upload_mb() -> usize {
    50
}

fn default_assets_dir() -> String {
    "storage/assets".to_string()
}

fn default_previews_dir() -> String {
    "storage/previews".to_string()
}

fn default_public_base_url() -> String {
    "http://127.0.0.1:3001".to_string()
}
