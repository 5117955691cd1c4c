//! Error catalog of the storefront REST surface and the domain-to-Problem mapping.

use problem::{ErrDef, ProblemResponse};
use tracing::error;

use crate::api::rest::ctx::RequestCtx;
use crate::domain::error::DomainError;

macro_rules! err_def {
    ($name:ident, $status:expr, $title:expr, $code:literal) => {
        pub const $name: ErrDef = ErrDef {
            status: $status,
            title: $title,
            code: $code,
            type_url: concat!("https://errors.storefront.dev/", $code),
        };
    };
}

err_def!(USER_NOT_FOUND, 404, "User not found", "STOREFRONT_USER_NOT_FOUND");
err_def!(PRODUCT_NOT_FOUND, 404, "Product not found", "STOREFRONT_PRODUCT_NOT_FOUND");
err_def!(ASSET_NOT_FOUND, 404, "Asset not found", "STOREFRONT_ASSET_NOT_FOUND");
err_def!(CANNOT_BUY_OWN_PRODUCT, 400, "Invalid request", "STOREFRONT_CANNOT_BUY_OWN_PRODUCT");
err_def!(ALREADY_OWNED, 400, "Invalid request", "STOREFRONT_ALREADY_OWNED");
err_def!(VALIDATION, 400, "Invalid request", "STOREFRONT_VALIDATION");
err_def!(NOT_ENTITLED, 403, "Forbidden", "STOREFRONT_NOT_ENTITLED");
err_def!(NOT_PRODUCT_OWNER, 403, "Forbidden", "STOREFRONT_NOT_PRODUCT_OWNER");
err_def!(UNAUTHORIZED, 401, "Unauthorized", "STOREFRONT_UNAUTHORIZED");
err_def!(UPLOAD_TOO_LARGE, 413, "Payload too large", "STOREFRONT_UPLOAD_TOO_LARGE");
err_def!(INTERNAL, 500, "Internal Server Error", "STOREFRONT_INTERNAL");

/// Map domain errors to RFC 9457 problems. Store faults are logged and hidden.
pub fn map_domain_error(e: &DomainError, ctx: &RequestCtx) -> ProblemResponse {
    let (def, detail) = match e {
        DomainError::UserNotFound { .. } => {
            (&USER_NOT_FOUND, "User not found; sync the account first".to_string())
        }
        DomainError::ProductNotFound { .. } => (&PRODUCT_NOT_FOUND, e.to_string()),
        DomainError::AssetMissing { .. } => (&ASSET_NOT_FOUND, e.to_string()),
        DomainError::CannotBuyOwnProduct { .. } => (&CANNOT_BUY_OWN_PRODUCT, e.to_string()),
        DomainError::AlreadyOwned { .. } => (&ALREADY_OWNED, e.to_string()),
        DomainError::InvalidEmail { .. } | DomainError::Validation { .. } => {
            (&VALIDATION, e.to_string())
        }
        DomainError::NotEntitled { .. } => (&NOT_ENTITLED, e.to_string()),
        DomainError::NotProductOwner { .. } => (&NOT_PRODUCT_OWNER, e.to_string()),
        DomainError::Database { .. } | DomainError::Storage { .. } => {
            error!(error = %e, instance = %ctx.instance, "Request failed");
            (&INTERNAL, "An internal error occurred".to_string())
        }
    };
    ctx.problem(def, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ctx() -> RequestCtx {
        RequestCtx {
            instance: "/orders/buy/1".into(),
            request_id: Some("rid-1".into()),
        }
    }

    #[test]
    fn purchase_rules_map_to_bad_request_with_exact_detail() {
        let id = Uuid::new_v4();
        let p = map_domain_error(&DomainError::already_owned(id), &ctx()).0;
        assert_eq!(p.status, 400);
        assert_eq!(p.detail, "already owned");
        assert_eq!(p.code, "STOREFRONT_ALREADY_OWNED");
        assert_eq!(p.instance, "/orders/buy/1");
        assert_eq!(p.request_id.as_deref(), Some("rid-1"));

        let p = map_domain_error(&DomainError::cannot_buy_own_product(id), &ctx()).0;
        assert_eq!(p.status, 400);
        assert_eq!(p.detail, "cannot buy own product");
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let p = map_domain_error(&DomainError::database("disk I/O error at /var/db"), &ctx()).0;
        assert_eq!(p.status, 500);
        assert!(!p.detail.contains("/var/db"));
        assert_eq!(
            p.type_url,
            "https://errors.storefront.dev/STOREFRONT_INTERNAL"
        );
    }

    #[test]
    fn entitlement_and_ownership_are_forbidden() {
        let id = Uuid::new_v4();
        assert_eq!(
            map_domain_error(&DomainError::not_entitled(id), &ctx()).0.status,
            403
        );
        assert_eq!(
            map_domain_error(&DomainError::not_product_owner(id), &ctx()).0.status,
            403
        );
        assert_eq!(
            map_domain_error(&DomainError::asset_missing(id), &ctx()).0.status,
            404
        );
    }
}
