use super::Settings;
use crate::ui;
use anyhow::{bail, Result};
use chaos_verification::{check_degradation, save_baseline, Direction};
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum BaselineAction {
    /// Record the mean of a query as a named baseline
    Save {
        name: String,

        query: String,

        /// Baseline store file
        #[arg(short, long, default_value = "baselines.json")]
        store: PathBuf,

        #[arg(short, long)]
        when: Option<String>,
    },

    /// Compare the mean of a query against a saved baseline
    Check {
        name: String,

        query: String,

        #[arg(short, long, default_value = "baselines.json")]
        store: PathBuf,

        /// Allowed relative deviation (0.1 = 10%)
        #[arg(short, long, default_value_t = 0.1)]
        tolerance: f64,

        /// Treat a drop, not a rise, as degradation
        #[arg(long)]
        lower_is_worse: bool,

        #[arg(short, long)]
        when: Option<String>,
    },
}

pub async fn execute(settings: &Settings, action: BaselineAction) -> Result<()> {
    match action {
        BaselineAction::Save {
            name,
            query,
            store,
            when,
        } => {
            let response = chaos_probes::query(
                &query,
                when.as_deref(),
                None,
                &settings.configuration,
                settings.secrets(),
            )
            .await?;
            let baseline = save_baseline(&store, &name, &response).await?;
            ui::print_success(&format!(
                "Saved baseline '{}' = {} ({} samples) to {}",
                name,
                baseline.value,
                baseline.samples,
                store.display()
            ));
            Ok(())
        }

        BaselineAction::Check {
            name,
            query,
            store,
            tolerance,
            lower_is_worse,
            when,
        } => {
            let direction = if lower_is_worse {
                Direction::LowerIsWorse
            } else {
                Direction::HigherIsWorse
            };
            let response = chaos_probes::query(
                &query,
                when.as_deref(),
                None,
                &settings.configuration,
                settings.secrets(),
            )
            .await?;

            if check_degradation(&store, &name, &response, tolerance, direction).await? {
                ui::print_success(&format!("'{}' is within {} of its baseline", name, tolerance));
                Ok(())
            } else {
                ui::print_error(&format!("'{}' degraded beyond its baseline", name));
                bail!("Baseline check failed")
            }
        }
    }
}
