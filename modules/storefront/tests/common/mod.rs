#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use rust_decimal::Decimal;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;

use storefront::contract::model::{Caller, Download, NewProduct, Product, UploadedAsset, UserProfile};
use storefront::domain::service::{AssetStores, Service, ServiceConfig};
use storefront::infra::assets::LocalAssetStore;
use storefront::infra::storage::migrations::Migrator;
use storefront::infra::storage::SeaOrmRepository;

/// Services over a fresh database and throwaway asset directories.
pub struct TestEnv {
    pub db: DatabaseConnection,
    pub service: Arc<Service>,
    pub root: TempDir,
}

impl TestEnv {
    pub fn assets_dir(&self) -> std::path::PathBuf {
        self.root.path().join("assets")
    }

    pub fn previews_dir(&self) -> std::path::PathBuf {
        self.root.path().join("previews")
    }
}

/// Create a fresh test database for each test
pub async fn create_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to test database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub async fn setup() -> TestEnv {
    setup_with_db(create_test_db().await).await
}

pub async fn setup_with_db(db: DatabaseConnection) -> TestEnv {
    let root = TempDir::new().expect("tempdir");
    let service = Service::new(
        SeaOrmRepository::new(db.clone()).into_repositories(),
        AssetStores {
            assets: Arc::new(LocalAssetStore::new(root.path().join("assets"))),
            previews: Arc::new(LocalAssetStore::new(root.path().join("previews"))),
        },
        ServiceConfig {
            public_base_url: "http://shop.test".to_string(),
            max_title_length: 40,
        },
    );
    TestEnv {
        db,
        service: Arc::new(service),
        root,
    }
}

pub fn dec(raw: &str) -> Decimal {
    Decimal::from_str(raw).expect("decimal")
}

/// Sync a user and return the matching caller.
pub async fn user(service: &Service, id: &str, name: &str) -> Caller {
    let caller = Caller::new(id);
    service
        .accounts
        .sync_user(
            &caller,
            UserProfile {
                email: format!("{id}@example.com"),
                name: Some(name.to_string()),
            },
        )
        .await
        .expect("sync user");
    caller
}

pub fn new_product(title: &str, price: &str, file: Option<&[u8]>) -> NewProduct {
    NewProduct {
        title: title.to_string(),
        description: Some("A thing worth having".to_string()),
        price: dec(price),
        category: "ebooks".to_string(),
        preview: None,
        digital: file.map(|bytes| UploadedAsset {
            file_name: "bundle.zip".to_string(),
            data: Bytes::copy_from_slice(bytes),
        }),
    }
}

pub async fn product(service: &Service, seller: &Caller, title: &str, file: &[u8]) -> Product {
    service
        .catalog
        .create_product(seller, new_product(title, "9.99", Some(file)))
        .await
        .expect("create product")
}

pub async fn read_download(mut download: Download) -> Vec<u8> {
    let mut out = Vec::new();
    download
        .reader
        .read_to_end(&mut out)
        .await
        .expect("read download");
    out
}
