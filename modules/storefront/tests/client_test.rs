use std::str::FromStr;

use anyhow::Result;
use bytes::Bytes;
use rust_decimal::Decimal;
use sea_orm::Database;
use tempfile::TempDir;
use tokio::io::AsyncReadExt;

use storefront::config::IdentityConfig;
use storefront::contract::client::StorefrontApi;
use storefront::contract::error::StorefrontError;
use storefront::contract::model::{Caller, NewProduct, UploadedAsset, UserProfile};
use storefront::{StorefrontConfig, StorefrontModule};

async fn client() -> (std::sync::Arc<dyn StorefrontApi>, TempDir) {
    let root = TempDir::new().expect("tempdir");
    let db = Database::connect("sqlite::memory:").await.expect("db");
    let config = StorefrontConfig {
        identity: IdentityConfig {
            hs256_secret: Some("k".into()),
            ..Default::default()
        },
        ..Default::default()
    };
    let module = StorefrontModule::init(db, &config, root.path())
        .await
        .expect("init storefront");
    (module.client(), root)
}

fn contract_error(err: &anyhow::Error) -> &StorefrontError {
    err.downcast_ref::<StorefrontError>()
        .expect("error should wrap StorefrontError")
}

async fn sync(api: &dyn StorefrontApi, id: &str) -> Caller {
    let caller = Caller::new(id);
    api.sync_user(
        &caller,
        UserProfile {
            email: format!("{id}@example.com"),
            name: Some(id.to_uppercase()),
        },
    )
    .await
    .expect("sync");
    caller
}

#[tokio::test]
async fn client_covers_the_purchase_flow() -> Result<()> {
    let (api, _root) = client().await;
    let seller = sync(api.as_ref(), "seller").await;
    let buyer = sync(api.as_ref(), "buyer").await;

    let product = api
        .create_product(
            &seller,
            NewProduct {
                title: "Icon set".into(),
                description: None,
                price: Decimal::from_str("3.00")?,
                category: "design".into(),
                preview: None,
                digital: Some(UploadedAsset {
                    file_name: "icons.svg".into(),
                    data: Bytes::from_static(b"<svg/>"),
                }),
            },
        )
        .await?;
    assert_eq!(api.list_products().await?.len(), 1);
    assert_eq!(api.get_me(&buyer).await?.email, "buyer@example.com");

    let err = api.open_download(&buyer, product.id).await.unwrap_err();
    assert!(matches!(
        contract_error(&err),
        StorefrontError::Forbidden { .. }
    ));

    let order = api.purchase(&buyer, product.id).await?;
    assert_eq!(order.items[0].product_id, product.id);

    let err = api.purchase(&buyer, product.id).await.unwrap_err();
    assert_eq!(
        contract_error(&err),
        &StorefrontError::invalid_request("already owned")
    );

    let mut download = api.open_download(&buyer, product.id).await?;
    assert!(download.file_name.ends_with("-download.svg"));
    let mut bytes = Vec::new();
    download.reader.read_to_end(&mut bytes).await?;
    assert_eq!(bytes, b"<svg/>");

    assert_eq!(api.list_purchases(&buyer).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn client_maps_missing_and_forbidden() -> Result<()> {
    let (api, _root) = client().await;
    let seller = sync(api.as_ref(), "seller").await;
    let other = sync(api.as_ref(), "other").await;

    let missing = uuid::Uuid::new_v4();
    let err = api.get_product(missing).await.unwrap_err();
    assert_eq!(
        contract_error(&err),
        &StorefrontError::not_found("product", missing.to_string())
    );

    let err = api.get_me(&Caller::new("ghost")).await.unwrap_err();
    assert_eq!(
        contract_error(&err),
        &StorefrontError::not_found("user", "ghost")
    );

    let product = api
        .create_product(
            &seller,
            NewProduct {
                title: "Loop".into(),
                description: Some("drums".into()),
                price: Decimal::ZERO,
                category: "audio".into(),
                preview: None,
                digital: None,
            },
        )
        .await?;
    let err = api.deactivate_product(&other, product.id).await.unwrap_err();
    assert!(matches!(
        contract_error(&err),
        StorefrontError::Forbidden { .. }
    ));
    assert!(!api.deactivate_product(&seller, product.id).await?.active);
    Ok(())
}
