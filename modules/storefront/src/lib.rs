//! Digital-goods storefront: catalog, entitlement ledger and secure asset delivery.
//!
//! Layering follows `contract` (pure models and the in-process API), `domain`
//! (services and ports), `infra` (sea-orm storage and the local asset store),
//! `api::rest` (axum handlers) and `gateways` (contract implementations).

pub mod api;
pub mod config;
pub mod contract;
pub mod domain;
pub mod gateways;
pub mod infra;
mod module;

pub use config::StorefrontConfig;
pub use module::StorefrontModule;
