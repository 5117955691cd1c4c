//! HTTP host for the storefront: wraps feature routers with the shared middleware
//! stack (request ids, tracing, timeout, body limit, CORS), adds `/health` and the
//! OpenAPI document, and serves the result until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::{middleware::from_fn, routing::get, Router};
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
};

mod config;
pub mod request_id;
mod web;

pub use config::ApiIngressConfig;

pub struct ApiIngress {
    config: ApiIngressConfig,
    openapi: Option<Arc<serde_json::Value>>,
}

impl ApiIngress {
    pub fn new(config: ApiIngressConfig) -> Self {
        Self {
            config,
            openapi: None,
        }
    }

    /// Attach the OpenAPI document served at `/openapi.json` when docs are enabled.
    pub fn with_openapi(mut self, doc: &utoipa::openapi::OpenApi) -> Result<Self> {
        let value = serde_json::to_value(doc).context("failed to serialize OpenAPI document")?;
        self.openapi = Some(Arc::new(value));
        Ok(self)
    }

    pub fn config(&self) -> &ApiIngressConfig {
        &self.config
    }

    /// Address to listen on: `bind_addr` if configured, else `host:port`.
    pub fn bind_addr(&self, host: &str, port: u16) -> Result<SocketAddr> {
        let raw = match &self.config.bind_addr {
            Some(addr) if !addr.trim().is_empty() => addr.trim().to_string(),
            _ => format!("{host}:{port}"),
        };
        raw.parse()
            .map_err(|e| anyhow!("invalid bind address '{}': {}", raw, e))
    }

    /// Wrap the feature router with health/docs routes and the middleware stack.
    pub fn build_router(&self, app: Router) -> Result<Router> {
        let mut router = Router::new()
            .route("/health", get(web::health_check))
            .merge(app);

        if self.config.enable_docs {
            if let Some(doc) = self.openapi.clone() {
                router = router.route(
                    "/openapi.json",
                    get(move || {
                        let doc = doc.clone();
                        async move {
                            (
                                [(header::CACHE_CONTROL, "no-store")],
                                axum::Json((*doc).clone()),
                            )
                        }
                    }),
                );
            }
        }

        router = router.fallback(web::not_found);

        let x_request_id = request_id::header();

        // Layered innermost first; each `layer` call maps the response back to axum's body.
        // RequestBodyLimitLayer is the single limit; axum's 2MB default would cap multipart.
        router = router
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(
                self.config.body_limit_mb.max(1) * 1024 * 1024,
            ))
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.request_timeout_secs.max(1),
            )))
            .layer(from_fn(request_id::push_req_id_to_extensions))
            .layer(request_id::create_trace_layer())
            .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
            .layer(SetRequestIdLayer::new(x_request_id, request_id::MakeReqId));

        if let Some(cors) = self.cors_layer()? {
            router = router.layer(cors);
        }

        Ok(router)
    }

    fn cors_layer(&self) -> Result<Option<CorsLayer>> {
        let Some(origin) = self.config.cors_origin.as_deref() else {
            return Ok(None);
        };
        let origin = HeaderValue::from_str(origin.trim())
            .map_err(|e| anyhow!("invalid cors_origin '{}': {}", origin, e))?;

        Ok(Some(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_credentials(true)
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
                .expose_headers([header::CONTENT_DISPOSITION, request_id::header()]),
        ))
    }
}

/// Bind `addr` and serve `router` until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<F>(router: Router, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("HTTP server bound on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("HTTP server shutting down gracefully");
        })
        .await
        .map_err(|e| anyhow!(e))
}
