use std::fmt::Display;

use thiserror::Error;
use uuid::Uuid;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("User not found: {id}")]
    UserNotFound { id: String },

    #[error("Product not found: {id}")]
    ProductNotFound { id: Uuid },

    #[error("cannot buy own product")]
    CannotBuyOwnProduct { product_id: Uuid },

    #[error("already owned")]
    AlreadyOwned { product_id: Uuid },

    #[error("Product {product_id} has not been purchased")]
    NotEntitled { product_id: Uuid },

    #[error("No downloadable file for product {product_id}")]
    AssetMissing { product_id: Uuid },

    #[error("Product {product_id} belongs to another seller")]
    NotProductOwner { product_id: Uuid },

    #[error("Invalid email format: '{email}'")]
    InvalidEmail { email: String },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl DomainError {
    pub fn user_not_found(id: impl Into<String>) -> Self {
        Self::UserNotFound { id: id.into() }
    }

    pub fn product_not_found(id: Uuid) -> Self {
        Self::ProductNotFound { id }
    }

    pub fn cannot_buy_own_product(product_id: Uuid) -> Self {
        Self::CannotBuyOwnProduct { product_id }
    }

    pub fn already_owned(product_id: Uuid) -> Self {
        Self::AlreadyOwned { product_id }
    }

    pub fn not_entitled(product_id: Uuid) -> Self {
        Self::NotEntitled { product_id }
    }

    pub fn asset_missing(product_id: Uuid) -> Self {
        Self::AssetMissing { product_id }
    }

    pub fn not_product_owner(product_id: Uuid) -> Self {
        Self::NotProductOwner { product_id }
    }

    pub fn invalid_email(email: impl Into<String>) -> Self {
        Self::InvalidEmail {
            email: email.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn storage(err: impl Display) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }
}

/// Repositories report failures as `anyhow`; anything that reaches here is a store fault.
impl From<anyhow::Error> for DomainError {
    fn from(err: anyhow::Error) -> Self {
        Self::database(format!("{err:#}"))
    }
}
