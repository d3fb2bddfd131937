use super::Settings;
use crate::ui;
use anyhow::{anyhow, Context, Result};
use chaos_core::{Control, Experiment, Journal};
use chaos_metrics::{ControlArgs, GroupingKey, PrometheusControl};
use std::path::{Path, PathBuf};
use tracing::debug;

pub fn build_args(
    pushgateway_url: Option<String>,
    job: Option<String>,
    grouping: Vec<String>,
    trace_id: Option<String>,
    experiment_ref: Option<String>,
    verify_tls: Option<String>,
) -> Result<ControlArgs> {
    let grouping_key = if grouping.is_empty() {
        None
    } else {
        Some(parse_grouping(&grouping)?)
    };

    Ok(ControlArgs {
        pushgateway_url,
        job,
        grouping_key,
        trace_id,
        experiment_ref,
        verify_tls,
    })
}

fn parse_grouping(entries: &[String]) -> Result<GroupingKey> {
    entries
        .iter()
        .map(|entry| {
            let (label, value) = entry
                .split_once('=')
                .filter(|(label, _)| !label.is_empty())
                .ok_or_else(|| anyhow!("Invalid grouping entry '{}', expected label=value", entry))?;
            Ok((label.to_string(), value.to_string()))
        })
        .collect()
}

pub async fn execute(
    settings: &Settings,
    journal: PathBuf,
    experiment: Option<PathBuf>,
    args: ControlArgs,
) -> Result<()> {
    let raw = tokio::fs::read_to_string(&journal)
        .await
        .with_context(|| format!("Failed to read journal {}", journal.display()))?;
    let journal: Journal = serde_json::from_str(&raw).context("Invalid journal")?;

    let experiment = match experiment {
        Some(path) => load_experiment(&path).await?,
        None => Experiment::default(),
    };

    let mut control = PrometheusControl::new();
    control
        .configure(args, &settings.configuration, &experiment)
        .await?;
    if let Some(settings) = control.settings() {
        debug!(
            "Pushing to {} as job {} with {:?}",
            settings.pushgateway_url, settings.job, settings.grouping_key
        );
    }

    control.before_experiment().await?;
    control.after_experiment(&journal).await?;

    ui::print_success(&format!(
        "Pushed run metrics (status {}, deviated {})",
        journal.status, journal.deviated
    ));
    Ok(())
}

async fn load_experiment(path: &Path) -> Result<Experiment> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read experiment {}", path.display()))?;

    let document: serde_json::Value = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&raw)
            .with_context(|| format!("Invalid experiment {}", path.display()))?,
        _ => serde_json::from_str(&raw)
            .with_context(|| format!("Invalid experiment {}", path.display()))?,
    };
    Ok(Experiment::new(document))
}
