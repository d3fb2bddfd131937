use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChaosError {
    /// The activity ran but could not produce a usable result.
    #[error("Activity failed: {0}")]
    ActivityFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ChaosError {
    pub fn activity_failed(message: impl Into<String>) -> Self {
        Self::ActivityFailed(message.into())
    }

    pub fn is_activity_failure(&self) -> bool {
        matches!(self, ChaosError::ActivityFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, ChaosError>;
