use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::info;
use utoipa::OpenApi;

use crate::api::rest::auth::JwtVerifier;
use crate::api::rest::openapi::StorefrontApiDoc;
use crate::api::rest::routes;
use crate::api::rest::upload::UploadLimits;
use crate::config::StorefrontConfig;
use crate::contract::client::StorefrontApi;
use crate::domain::service::{AssetStores, Service, ServiceConfig};
use crate::gateways::local::StorefrontLocalClient;
use crate::infra::assets::LocalAssetStore;
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::SeaOrmRepository;

/// Wired storefront: migrated schema, asset directories and services.
pub struct StorefrontModule {
    service: Arc<Service>,
    verifier: Arc<JwtVerifier>,
    limits: UploadLimits,
    previews_dir: PathBuf,
}

impl StorefrontModule {
    /// Run migrations, prepare the asset directories under `base_dir` and build the services.
    pub async fn init(
        db: DatabaseConnection,
        config: &StorefrontConfig,
        base_dir: &Path,
    ) -> anyhow::Result<Self> {
        Migrator::up(&db, None)
            .await
            .context("failed to run storefront migrations")?;

        let verifier = JwtVerifier::from_config(&config.identity)?;

        let (assets_dir, previews_dir) = config.storage.resolve_dirs(base_dir);
        let assets = LocalAssetStore::new(&assets_dir);
        assets
            .ensure_root()
            .await
            .with_context(|| format!("failed to create assets dir {}", assets_dir.display()))?;
        let previews = LocalAssetStore::new(&previews_dir);
        previews
            .ensure_root()
            .await
            .with_context(|| format!("failed to create previews dir {}", previews_dir.display()))?;

        let service = Service::new(
            SeaOrmRepository::new(db).into_repositories(),
            AssetStores {
                assets: Arc::new(assets),
                previews: Arc::new(previews),
            },
            ServiceConfig {
                public_base_url: config.storage.public_base_url.clone(),
                max_title_length: config.max_title_length,
            },
        );

        info!(
            assets_dir = %assets_dir.display(),
            previews_dir = %previews_dir.display(),
            "Storefront module initialized"
        );

        Ok(Self {
            service: Arc::new(service),
            verifier: Arc::new(verifier),
            limits: UploadLimits {
                max_file_bytes: config.max_upload_mb.max(1) * 1024 * 1024,
            },
            previews_dir,
        })
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }

    /// In-process client over the same services the REST layer uses.
    pub fn client(&self) -> Arc<dyn StorefrontApi> {
        Arc::new(StorefrontLocalClient::new(self.service.clone()))
    }

    /// REST routes plus `/uploads` preview serving.
    pub fn router(&self) -> Router {
        routes::register_routes(
            Router::new(),
            self.service.clone(),
            self.verifier.clone(),
            self.limits,
            &self.previews_dir,
        )
    }

    pub fn openapi() -> utoipa::openapi::OpenApi {
        StorefrontApiDoc::openapi()
    }
}
