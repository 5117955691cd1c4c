//! Multipart boundary for product creation. Produces a typed [`NewProduct`].

use std::str::FromStr;

use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::http::StatusCode;
use bytes::{Bytes, BytesMut};
use problem::ProblemResponse;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::api::rest::ctx::RequestCtx;
use crate::api::rest::error::{UPLOAD_TOO_LARGE, VALIDATION};
use crate::contract::model::{NewProduct, UploadedAsset};
use crate::domain::catalog::{DIGITAL_FIELD, PREVIEW_FIELD};

/// Per-file upload cap, installed on the router as an extension.
#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    pub max_file_bytes: usize,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("{field} is required")]
    Missing { field: &'static str },
    #[error("{field}: {message}")]
    Invalid { field: String, message: String },
    #[error("{field} exceeds the {limit} byte upload limit")]
    TooLarge { field: &'static str, limit: usize },
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),
}

impl UploadError {
    pub fn to_problem(&self, ctx: &RequestCtx) -> ProblemResponse {
        match self {
            UploadError::TooLarge { .. } => ctx.problem(&UPLOAD_TOO_LARGE, self.to_string()),
            UploadError::Multipart(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                ctx.problem(&UPLOAD_TOO_LARGE, e.body_text())
            }
            _ => ctx.problem(&VALIDATION, self.to_string()),
        }
    }
}

/// Read `title`, `description`, `price`, `category` and the optional
/// `previewImage` / `digitalFile` parts. Unknown parts are skipped.
pub async fn read_new_product(
    mut multipart: Multipart,
    limits: UploadLimits,
) -> Result<NewProduct, UploadError> {
    let mut title = None;
    let mut description = None;
    let mut price = None;
    let mut category = None;
    let mut preview = None;
    let mut digital = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => title = Some(field.text().await?),
            "description" => description = Some(field.text().await?),
            "category" => category = Some(field.text().await?),
            "price" => {
                let raw = field.text().await?;
                let parsed = Decimal::from_str(raw.trim()).map_err(|_| UploadError::Invalid {
                    field: "price".into(),
                    message: format!("'{}' is not a decimal number", raw.trim()),
                })?;
                price = Some(parsed);
            }
            PREVIEW_FIELD => preview = read_file(field, PREVIEW_FIELD, limits).await?,
            DIGITAL_FIELD => digital = read_file(field, DIGITAL_FIELD, limits).await?,
            other => {
                debug!(field = other, "Skipping unknown multipart field");
            }
        }
    }

    Ok(NewProduct {
        title: title.ok_or(UploadError::Missing { field: "title" })?,
        description,
        price: price.ok_or(UploadError::Missing { field: "price" })?,
        category: category.ok_or(UploadError::Missing { field: "category" })?,
        preview,
        digital,
    })
}

/// Collect one file part, enforcing the per-file cap while reading.
/// A part without a file name (a browser's empty file input) counts as absent.
async fn read_file(
    mut field: Field<'_>,
    name: &'static str,
    limits: UploadLimits,
) -> Result<Option<UploadedAsset>, UploadError> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let mut buf = BytesMut::new();
    while let Some(chunk) = field.chunk().await? {
        if buf.len() + chunk.len() > limits.max_file_bytes {
            return Err(UploadError::TooLarge {
                field: name,
                limit: limits.max_file_bytes,
            });
        }
        buf.extend_from_slice(&chunk);
    }
    if file_name.is_empty() && buf.is_empty() {
        return Ok(None);
    }
    Ok(Some(UploadedAsset {
        file_name,
        data: Bytes::from(buf),
    }))
}
