pub mod auth;
pub mod ctx;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod upload;
