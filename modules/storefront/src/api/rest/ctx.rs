use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use problem::{ErrDef, ProblemResponse};

/// Per-request details copied into every Problem: the path and the `x-request-id`.
#[derive(Debug, Clone, Default)]
pub struct RequestCtx {
    pub instance: String,
    pub request_id: Option<String>,
}

impl RequestCtx {
    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            instance: parts.uri.path().to_string(),
            request_id: parts
                .headers
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned),
        }
    }

    pub fn problem(&self, def: &ErrDef, detail: impl Into<String>) -> ProblemResponse {
        let mut p = def.to_problem(detail).with_instance(self.instance.clone());
        if let Some(rid) = &self.request_id {
            p = p.with_request_id(rid.clone());
        }
        ProblemResponse(p)
    }
}

impl<S> FromRequestParts<S> for RequestCtx
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}
