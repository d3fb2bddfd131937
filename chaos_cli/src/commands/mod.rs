pub mod baseline;
pub mod control;
pub mod discover;
pub mod query;
pub mod verify;

use anyhow::{Context, Result};
use chaos_core::config::PROMETHEUS_BASE_URL;
use chaos_core::{Configuration, Secrets};
use std::path::Path;
use tracing::debug;

/// Configuration and secrets shared by every subcommand.
pub struct Settings {
    pub configuration: Configuration,
    pub secrets: Option<Secrets>,
}

impl Settings {
    pub async fn load(
        config: Option<&Path>,
        secrets: Option<&Path>,
        prometheus_url: Option<&str>,
    ) -> Result<Self> {
        let mut configuration = match config {
            Some(path) => Configuration::from_file(path)
                .await
                .with_context(|| format!("Failed to load configuration {}", path.display()))?,
            None => Configuration::new(),
        };

        if let Some(url) = prometheus_url {
            debug!("Using Prometheus at {}", url);
            configuration.insert(PROMETHEUS_BASE_URL, url);
        }

        let secrets = match secrets {
            Some(path) => Some(
                Secrets::from_file(path)
                    .await
                    .with_context(|| format!("Failed to load secrets {}", path.display()))?,
            ),
            None => None,
        };

        Ok(Self {
            configuration,
            secrets,
        })
    }

    pub fn secrets(&self) -> Option<&Secrets> {
        self.secrets.as_ref()
    }
}
