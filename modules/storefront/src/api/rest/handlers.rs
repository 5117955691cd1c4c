use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Multipart, Path},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    Extension,
};
use problem::{Problem, ProblemResponse};
use tokio_util::io::ReaderStream;
use tracing::{error, info};
use uuid::Uuid;

use crate::api::rest::ctx::RequestCtx;
use crate::api::rest::dto::{
    CreateProductForm, OrderDto, ProductDto, SyncUserReq, UserDto,
};
use crate::api::rest::error::{map_domain_error, INTERNAL};
use crate::api::rest::upload::{read_new_product, UploadLimits};
use crate::contract::model::Caller;
use crate::domain::service::Service;

/// Create or refresh the caller's user record
#[utoipa::path(
    post,
    path = "/users/sync",
    tag = "users",
    request_body = SyncUserReq,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User synced", body = UserDto),
        (status = 400, description = "Bad Request", body = Problem, content_type = "application/problem+json"),
        (status = 401, description = "Unauthorized", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn sync_user(
    Extension(svc): Extension<Arc<Service>>,
    caller: Caller,
    ctx: RequestCtx,
    Json(req): Json<SyncUserReq>,
) -> Result<Json<UserDto>, ProblemResponse> {
    match svc.accounts.sync_user(&caller, req.into()).await {
        Ok(user) => Ok(Json(UserDto::from(user))),
        Err(e) => {
            error!("Failed to sync user {}: {}", caller.user_id, e);
            Err(map_domain_error(&e, &ctx))
        }
    }
}

/// The caller's user record
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserDto),
        (status = 401, description = "Unauthorized", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "Not Found", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn get_me(
    Extension(svc): Extension<Arc<Service>>,
    caller: Caller,
    ctx: RequestCtx,
) -> Result<Json<UserDto>, ProblemResponse> {
    svc.accounts
        .get_me(&caller)
        .await
        .map(|u| Json(UserDto::from(u)))
        .map_err(|e| map_domain_error(&e, &ctx))
}

/// Active products, newest first
#[utoipa::path(
    get,
    path = "/products",
    tag = "products",
    responses(
        (status = 200, description = "Active products", body = [ProductDto]),
        (status = 500, description = "Internal Server Error", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn list_products(
    Extension(svc): Extension<Arc<Service>>,
    ctx: RequestCtx,
) -> Result<Json<Vec<ProductDto>>, ProblemResponse> {
    match svc.catalog.list_products().await {
        Ok(products) => Ok(Json(products.into_iter().map(ProductDto::from).collect())),
        Err(e) => {
            error!("Failed to list products: {}", e);
            Err(map_domain_error(&e, &ctx))
        }
    }
}

/// A single product by id
#[utoipa::path(
    get,
    path = "/products/{id}",
    tag = "products",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product found", body = ProductDto),
        (status = 404, description = "Not Found", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn get_product(
    Extension(svc): Extension<Arc<Service>>,
    ctx: RequestCtx,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductDto>, ProblemResponse> {
    svc.catalog
        .get_product(id)
        .await
        .map(|p| Json(ProductDto::from(p)))
        .map_err(|e| map_domain_error(&e, &ctx))
}

/// Create a product from a multipart form; the caller becomes the seller
#[utoipa::path(
    post,
    path = "/products",
    tag = "products",
    request_body(content = CreateProductForm, content_type = "multipart/form-data"),
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Created product", body = ProductDto),
        (status = 400, description = "Bad Request", body = Problem, content_type = "application/problem+json"),
        (status = 401, description = "Unauthorized", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "Caller has no user record", body = Problem, content_type = "application/problem+json"),
        (status = 413, description = "Upload too large", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn create_product(
    Extension(svc): Extension<Arc<Service>>,
    Extension(limits): Extension<UploadLimits>,
    caller: Caller,
    ctx: RequestCtx,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ProductDto>), ProblemResponse> {
    let new_product = read_new_product(multipart, limits)
        .await
        .map_err(|e| e.to_problem(&ctx))?;

    info!("Creating product '{}' for seller {}", new_product.title, caller.user_id);

    match svc.catalog.create_product(&caller, new_product).await {
        Ok(product) => Ok((StatusCode::CREATED, Json(ProductDto::from(product)))),
        Err(e) => {
            error!("Failed to create product: {}", e);
            Err(map_domain_error(&e, &ctx))
        }
    }
}

/// Soft-deactivate a product owned by the caller
#[utoipa::path(
    delete,
    path = "/products/{id}",
    tag = "products",
    params(("id" = Uuid, Path, description = "Product id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Deactivated product", body = ProductDto),
        (status = 403, description = "Forbidden", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "Not Found", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn deactivate_product(
    Extension(svc): Extension<Arc<Service>>,
    caller: Caller,
    ctx: RequestCtx,
    Path(id): Path<Uuid>,
) -> Result<Json<ProductDto>, ProblemResponse> {
    svc.catalog
        .deactivate_product(&caller, id)
        .await
        .map(|p| Json(ProductDto::from(p)))
        .map_err(|e| map_domain_error(&e, &ctx))
}

/// Buy a product
#[utoipa::path(
    post,
    path = "/orders/buy/{productId}",
    tag = "orders",
    params(("productId" = Uuid, Path, description = "Product id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Completed order", body = OrderDto),
        (status = 400, description = "Own product or already owned", body = Problem, content_type = "application/problem+json"),
        (status = 401, description = "Unauthorized", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "Product missing or inactive", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn purchase(
    Extension(svc): Extension<Arc<Service>>,
    caller: Caller,
    ctx: RequestCtx,
    Path(product_id): Path<Uuid>,
) -> Result<(StatusCode, Json<OrderDto>), ProblemResponse> {
    match svc.ledger.purchase(&caller, product_id).await {
        Ok(order) => Ok((StatusCode::CREATED, Json(OrderDto::from(order)))),
        Err(e) => {
            info!("Purchase of {} by {} rejected: {}", product_id, caller.user_id, e);
            Err(map_domain_error(&e, &ctx))
        }
    }
}

/// The caller's completed orders, newest first
#[utoipa::path(
    get,
    path = "/orders/purchases",
    tag = "orders",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Completed orders", body = [OrderDto]),
        (status = 401, description = "Unauthorized", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn list_purchases(
    Extension(svc): Extension<Arc<Service>>,
    caller: Caller,
    ctx: RequestCtx,
) -> Result<Json<Vec<OrderDto>>, ProblemResponse> {
    svc.ledger
        .list_purchases(&caller)
        .await
        .map(|orders| Json(orders.into_iter().map(OrderDto::from).collect()))
        .map_err(|e| map_domain_error(&e, &ctx))
}

/// Stream a purchased file
#[utoipa::path(
    get,
    path = "/orders/download/{productId}",
    tag = "orders",
    params(("productId" = Uuid, Path, description = "Product id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream", body = Vec<u8>),
        (status = 401, description = "Unauthorized", body = Problem, content_type = "application/problem+json"),
        (status = 403, description = "Not purchased", body = Problem, content_type = "application/problem+json"),
        (status = 404, description = "File missing", body = Problem, content_type = "application/problem+json"),
    )
)]
pub async fn download(
    Extension(svc): Extension<Arc<Service>>,
    caller: Caller,
    ctx: RequestCtx,
    Path(product_id): Path<Uuid>,
) -> Result<Response, ProblemResponse> {
    let download = svc
        .delivery
        .open_download(&caller, product_id)
        .await
        .map_err(|e| map_domain_error(&e, &ctx))?;

    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        download.file_name
    ))
    .map_err(|e| {
        error!("Unusable download file name '{}': {}", download.file_name, e);
        ctx.problem(&INTERNAL, "An internal error occurred")
    })?;

    let mut resp = Body::from_stream(ReaderStream::new(download.reader)).into_response();
    let headers = resp.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    if let Some(size) = download.size {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    }
    Ok(resp)
}
