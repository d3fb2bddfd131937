use crate::response::QueryResponse;
use chaos_core::config::{DEFAULT_PROMETHEUS_BASE_URL, PROMETHEUS_BASE_URL, PROMETHEUS_TOKEN};
use chaos_core::{ChaosError, Configuration, Result, Secrets};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use tracing::{debug, warn};

/// Ordered query-string parameters.
pub type Params = Vec<(&'static str, String)>;

pub struct PrometheusClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl PrometheusClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::build(base_url.into(), true, None)
    }

    pub fn from_configuration(
        configuration: &Configuration,
        secrets: Option<&Secrets>,
    ) -> Result<Self> {
        let base_url = configuration.get_or(PROMETHEUS_BASE_URL, DEFAULT_PROMETHEUS_BASE_URL);
        let verify_tls = configuration.verify_tls();
        let token = secrets.and_then(|s| s.get_str(PROMETHEUS_TOKEN));

        Self::build(base_url, verify_tls, token)
    }

    fn build(base_url: String, verify_tls: bool, token: Option<String>) -> Result<Self> {
        if !verify_tls {
            warn!("TLS certificate verification is disabled for {}", base_url);
        }

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(|e| ChaosError::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path)
    }

    /// Issues `GET /api/v1/{path}`. `label` prefixes the failure message.
    pub async fn get(&self, path: &str, params: &Params, label: &str) -> Result<QueryResponse> {
        let url = self.endpoint(path);
        debug!("Querying with: {}", format_params(params));

        let mut request = self
            .http
            .get(&url)
            .header(ACCEPT, "application/json")
            .query(params);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ChaosError::Http(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ChaosError::Http(format!("Failed to read response from {}: {}", url, e)))?;

        if status != StatusCode::OK {
            return Err(ChaosError::activity_failed(format!(
                "{} {} failed: {}",
                label,
                format_params(params),
                body
            )));
        }

        let decoded: QueryResponse = serde_json::from_str(&body).map_err(|e| {
            ChaosError::activity_failed(format!(
                "{} {} returned an unreadable response: {}",
                label,
                format_params(params),
                e
            ))
        })?;

        if !decoded.is_success() {
            return Err(ChaosError::activity_failed(format!(
                "{} {} failed: {}",
                label,
                format_params(params),
                decoded.error.as_deref().unwrap_or("unknown error")
            )));
        }

        for warning in &decoded.warnings {
            warn!("Prometheus warning: {}", warning);
        }

        Ok(decoded)
    }
}

pub fn format_params(params: &Params) -> String {
    let rendered: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("'{}': '{}'", k, v))
        .collect();
    format!("{{{}}}", rendered.join(", "))
}
