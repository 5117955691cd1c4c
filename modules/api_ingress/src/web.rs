use axum::{http::Uri, response::Json};
use problem::ProblemResponse;
use serde_json::{json, Value};

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn not_found(uri: Uri) -> ProblemResponse {
    let mut resp = problem::not_found(format!("No route for {}", uri.path()));
    resp.0 = resp.0.with_instance(uri.path());
    resp
}
