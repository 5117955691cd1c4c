pub mod accounts;
pub mod asset_key;
pub mod asset_store;
pub mod catalog;
pub mod delivery;
pub mod error;
pub mod ledger;
pub mod money;
pub mod repo;
pub mod service;
