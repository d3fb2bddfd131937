use super::Settings;
use crate::ui;
use anyhow::{bail, Result};
use chaos_verification::{query_results_greater_than_threshold, query_results_lower_than_threshold};

pub async fn execute(
    settings: &Settings,
    query: String,
    below: Option<f64>,
    above: Option<f64>,
    when: Option<String>,
    window: Option<(String, String)>,
    step: u64,
) -> Result<()> {
    let response = match &window {
        Some((start, end)) => {
            chaos_probes::query_interval(
                &query,
                start,
                end,
                step,
                None,
                &settings.configuration,
                settings.secrets(),
            )
            .await?
        }
        None => {
            chaos_probes::query(
                &query,
                when.as_deref(),
                None,
                &settings.configuration,
                settings.secrets(),
            )
            .await?
        }
    };

    let (passed, description) = match (below, above) {
        (Some(threshold), _) => (
            query_results_lower_than_threshold(Some(threshold), &response)?,
            format!("below {}", threshold),
        ),
        (None, Some(threshold)) => (
            query_results_greater_than_threshold(Some(threshold), &response)?,
            format!("above {}", threshold),
        ),
        (None, None) => bail!("Either --below or --above is required"),
    };

    if passed {
        ui::print_success(&format!("All values of '{}' are {}", query, description));
        Ok(())
    } else {
        ui::print_error(&format!("Some values of '{}' are not {}", query, description));
        bail!("Threshold check failed")
    }
}
