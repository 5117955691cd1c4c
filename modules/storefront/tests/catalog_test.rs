mod common;

use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;

use common::{dec, new_product, product, setup, user};
use storefront::contract::model::{Caller, Role, UploadedAsset, UserProfile};
use storefront::domain::error::DomainError;

#[tokio::test]
async fn sync_user_creates_then_refreshes_profile() -> Result<()> {
    let env = setup().await;
    let caller = Caller::new("auth0|abc");

    let created = env
        .service
        .accounts
        .sync_user(
            &caller,
            UserProfile {
                email: "first@example.com".into(),
                name: Some("First".into()),
            },
        )
        .await?;
    assert_eq!(created.role, Role::Buyer);
    assert_eq!(created.id, "auth0|abc");

    tokio::time::sleep(Duration::from_millis(5)).await;
    let refreshed = env
        .service
        .accounts
        .sync_user(
            &caller,
            UserProfile {
                email: "second@example.com".into(),
                name: None,
            },
        )
        .await?;
    assert_eq!(refreshed.email, "second@example.com");
    assert_eq!(refreshed.name, None);
    assert_eq!(refreshed.created_at, created.created_at);
    assert!(refreshed.updated_at > created.updated_at);

    let me = env.service.accounts.get_me(&caller).await?;
    assert_eq!(me, refreshed);
    Ok(())
}

#[tokio::test]
async fn sync_user_rejects_bad_email() {
    let env = setup().await;
    let err = env
        .service
        .accounts
        .sync_user(
            &Caller::new("u"),
            UserProfile {
                email: "not-an-email".into(),
                name: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidEmail { .. }));
}

#[tokio::test]
async fn get_me_for_unknown_caller_is_not_found() {
    let env = setup().await;
    let err = env
        .service
        .accounts
        .get_me(&Caller::new("ghost"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::UserNotFound { .. }));
}

#[tokio::test]
async fn create_product_stores_preview_publicly_and_file_privately() -> Result<()> {
    let env = setup().await;
    let seller = user(&env.service, "seller_1", "Sam Seller").await;

    let mut cmd = new_product("  Pixel pack  ", "4.5", Some(b"sprites"));
    cmd.preview = Some(UploadedAsset {
        file_name: "cover.PNG".into(),
        data: Bytes::from_static(b"\x89PNG"),
    });
    let p = env.service.catalog.create_product(&seller, cmd).await?;

    assert_eq!(p.title, "Pixel pack");
    assert_eq!(p.price, dec("4.50"));
    assert_eq!(p.price.to_string(), "4.50");
    assert_eq!(p.seller_id, "seller_1");
    assert_eq!(p.seller_name.as_deref(), Some("Sam Seller"));
    assert!(p.active);

    let preview_key = p
        .preview_url
        .strip_prefix("http://shop.test/uploads/")
        .expect("preview url prefix");
    assert!(preview_key.starts_with("previewImage-"));
    assert!(preview_key.ends_with(".png"));
    assert_eq!(std::fs::read(env.previews_dir().join(preview_key))?, b"\x89PNG");

    assert!(p.file_key.starts_with("digitalFile-"));
    assert!(p.file_key.ends_with(".zip"));
    assert_eq!(std::fs::read(env.assets_dir().join(&p.file_key))?, b"sprites");
    assert!(!env.previews_dir().join(&p.file_key).exists());
    Ok(())
}

#[tokio::test]
async fn create_product_validates_input() -> Result<()> {
    let env = setup().await;
    let seller = user(&env.service, "seller_1", "Sam").await;

    let cases = [
        new_product("   ", "1.00", None),
        new_product(&"x".repeat(41), "1.00", None),
        new_product("Ok", "-1", None),
        new_product("Ok", "1.001", None),
        {
            let mut p = new_product("Ok", "1.00", None);
            p.category = " ".into();
            p
        },
    ];
    for cmd in cases {
        let err = env
            .service
            .catalog
            .create_product(&seller, cmd.clone())
            .await
            .unwrap_err();
        assert!(
            matches!(err, DomainError::Validation { .. }),
            "{cmd:?} gave {err}"
        );
    }
    assert!(env.service.catalog.list_products().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn create_product_requires_synced_seller() -> Result<()> {
    let env = setup().await;
    let err = env
        .service
        .catalog
        .create_product(&Caller::new("ghost"), new_product("Ok", "1.00", Some(b"x")))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::UserNotFound { .. }));
    // nothing was written to disk
    assert!(!env.assets_dir().exists() || std::fs::read_dir(env.assets_dir())?.next().is_none());
    Ok(())
}

#[tokio::test]
async fn list_products_shows_active_newest_first() -> Result<()> {
    let env = setup().await;
    let seller = user(&env.service, "seller_1", "Sam").await;

    let a = product(&env.service, &seller, "A", b"a").await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let b = product(&env.service, &seller, "B", b"b").await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let c = product(&env.service, &seller, "C", b"c").await;
    env.service.catalog.deactivate_product(&seller, b.id).await?;

    let listed = env.service.catalog.list_products().await?;
    let ids: Vec<_> = listed.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![c.id, a.id]);
    assert!(listed.iter().all(|p| p.seller_name.as_deref() == Some("Sam")));

    // inactive products stay readable by id
    let fetched = env.service.catalog.get_product(b.id).await?;
    assert!(!fetched.active);
    Ok(())
}

#[tokio::test]
async fn get_missing_product_is_not_found() {
    let env = setup().await;
    let err = env
        .service
        .catalog
        .get_product(uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::ProductNotFound { .. }));
}

#[tokio::test]
async fn only_the_seller_deactivates_and_it_is_idempotent() -> Result<()> {
    let env = setup().await;
    let seller = user(&env.service, "seller_1", "Sam").await;
    let other = user(&env.service, "buyer_1", "Bea").await;
    let p = product(&env.service, &seller, "Course", b"x").await;

    let err = env
        .service
        .catalog
        .deactivate_product(&other, p.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotProductOwner { .. }));
    assert!(env.service.catalog.get_product(p.id).await?.active);

    let first = env.service.catalog.deactivate_product(&seller, p.id).await?;
    let second = env.service.catalog.deactivate_product(&seller, p.id).await?;
    assert!(!first.active);
    assert!(!second.active);
    Ok(())
}
