use std::path::Path;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::services::ServeDir;

use crate::api::rest::auth::JwtVerifier;
use crate::api::rest::handlers;
use crate::api::rest::upload::UploadLimits;
use crate::domain::service::Service;

/// Mount the storefront REST routes and the public preview directory on `router`.
pub fn register_routes(
    router: Router,
    service: Arc<Service>,
    verifier: Arc<JwtVerifier>,
    limits: UploadLimits,
    previews_dir: &Path,
) -> Router {
    router
        // Users
        .route("/users/sync", post(handlers::sync_user))
        .route("/users/me", get(handlers::get_me))
        // Catalog
        .route(
            "/products",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/products/{id}",
            get(handlers::get_product).delete(handlers::deactivate_product),
        )
        // Ledger and delivery
        .route("/orders/buy/{productId}", post(handlers::purchase))
        .route("/orders/purchases", get(handlers::list_purchases))
        .route("/orders/download/{productId}", get(handlers::download))
        .layer(Extension(service))
        .layer(Extension(verifier))
        .layer(Extension(limits))
        // Previews only; purchasable files live in a separate, unserved directory
        .nest_service("/uploads", ServeDir::new(previews_dir))
}

