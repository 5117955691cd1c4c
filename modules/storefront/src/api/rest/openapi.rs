use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::rest::{dto, handlers};

#[derive(OpenApi)]
#[openapi(
    info(title = "Storefront API", description = "Digital goods catalog, purchases and downloads"),
    paths(
        handlers::sync_user,
        handlers::get_me,
        handlers::list_products,
        handlers::get_product,
        handlers::create_product,
        handlers::deactivate_product,
        handlers::purchase,
        handlers::list_purchases,
        handlers::download,
    ),
    components(schemas(
        dto::UserDto,
        dto::SyncUserReq,
        dto::ProductDto,
        dto::CreateProductForm,
        dto::OrderDto,
        dto::OrderItemDto,
        dto::OrderProductDto,
        dto::OrderStatusDto,
        problem::Problem,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "users", description = "Account sync"),
        (name = "products", description = "Catalog"),
        (name = "orders", description = "Purchases and downloads"),
    )
)]
pub struct StorefrontApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
