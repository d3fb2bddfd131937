use chaos_core::ChaosError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Metric registry error: {0}")]
    Registry(#[from] prometheus::Error),

    #[error("Push to {url} failed: {reason}")]
    Push { url: String, reason: String },

    #[error("Invalid push gateway URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid grouping key: {0}")]
    InvalidGrouping(String),

    #[error("Prometheus control used before configure_control")]
    NotConfigured,

    #[error(transparent)]
    Core(#[from] ChaosError),
}

impl From<MetricsError> for ChaosError {
    fn from(err: MetricsError) -> Self {
        match err {
            MetricsError::Core(inner) => inner,
            MetricsError::Push { .. } => ChaosError::Http(err.to_string()),
            MetricsError::InvalidUrl { .. }
            | MetricsError::InvalidGrouping(_)
            | MetricsError::NotConfigured => {
                ChaosError::InvalidConfig(err.to_string())
            }
            MetricsError::Registry(e) => ChaosError::Other(anyhow::Error::new(e)),
        }
    }
}

pub type Result<T> = std::result::Result<T, MetricsError>;
