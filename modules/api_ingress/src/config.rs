use serde::{Deserialize, Serialize};

/// HTTP host configuration, read from `modules.api_ingress`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ApiIngressConfig {
    /// Overrides `server.host:server.port` when set.
    #[serde(default)]
    pub bind_addr: Option<String>,
    #[serde(default)]
    pub enable_docs: bool,
    /// Frontend origin allowed to call the API with credentials, e.g. "http://localhost:3000".
    #[serde(default)]
    pub cors_origin: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,
}

impl Default for ApiIngressConfig {
    fn default() -> Self {
        Self {
            bind_addr: None,
            enable_docs: false,
            cors_origin: None,
            request_timeout_secs: default_request_timeout_secs(),
            body_limit_mb: default_body_limit_mb(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_body_limit_mb() -> usize {
    64
}
