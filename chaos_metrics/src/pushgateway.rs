use crate::error::{MetricsError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const PUSH_TIMEOUT: Duration = Duration::from_secs(30);

pub type GroupingKey = BTreeMap<String, String>;

/// Transport for an encoded metrics exposition.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsPusher: Send + Sync {
    /// Replace the metrics stored under `job` and `grouping_key`.
    async fn push(
        &self,
        job: &str,
        grouping_key: &GroupingKey,
        body: String,
        content_type: &str,
    ) -> Result<()>;
}

/// Client for a Prometheus push gateway.
pub struct PushGateway {
    http: reqwest::Client,
    base_url: Url,
}

impl PushGateway {
    pub fn new(url: &str, verify_tls: bool) -> Result<Self> {
        let with_scheme = if url.contains("://") {
            url.to_string()
        } else {
            format!("http://{}", url)
        };
        let base_url = Url::parse(&with_scheme).map_err(|e| MetricsError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(MetricsError::InvalidUrl {
                url: url.to_string(),
                reason: "cannot carry a path".to_string(),
            });
        }

        if !verify_tls {
            warn!("TLS certificate verification is disabled for {}", base_url);
        }

        let http = reqwest::Client::builder()
            .timeout(PUSH_TIMEOUT)
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(|e| MetricsError::Push {
                url: base_url.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self { http, base_url })
    }

    /// `{base}/metrics/job/{job}/{label}/{value}...`
    pub fn push_url(&self, job: &str, grouping_key: &GroupingKey) -> Result<Url> {
        validate_segment("job", job)?;
        for (name, value) in grouping_key {
            validate_label_name(name)?;
            validate_segment(name, value)?;
        }

        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| MetricsError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "cannot carry a path".to_string(),
            })?;
            segments.pop_if_empty().push("metrics").push("job").push(job);
            for (name, value) in grouping_key {
                segments.push(name).push(value);
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl MetricsPusher for PushGateway {
    async fn push(
        &self,
        job: &str,
        grouping_key: &GroupingKey,
        body: String,
        content_type: &str,
    ) -> Result<()> {
        let url = self.push_url(job, grouping_key)?;
        debug!("Pushing {} bytes of metrics to {}", body.len(), url);

        let response = self
            .http
            .put(url.clone())
            .header(CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| MetricsError::Push {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MetricsError::Push {
                url: url.to_string(),
                reason: format!("unexpected status {}: {}", status, text),
            });
        }

        info!("Pushed metrics to {}", url);
        Ok(())
    }
}

fn validate_segment(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(MetricsError::InvalidGrouping(format!(
            "value of '{}' must not be empty",
            name
        )));
    }
    if value.contains('/') {
        return Err(MetricsError::InvalidGrouping(format!(
            "value of '{}' contains '/': {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_label_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(MetricsError::InvalidGrouping(format!(
            "'{}' is not a valid label name",
            name
        )))
    }
}
