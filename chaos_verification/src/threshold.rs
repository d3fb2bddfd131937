use crate::samples::{samples, Sample};
use chaos_core::{ChaosError, Result};
use chaos_probes::QueryResponse;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    LowerThan,
    GreaterThan,
}

impl Comparison {
    /// NaN satisfies neither comparison.
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::LowerThan => value < threshold,
            Comparison::GreaterThan => value > threshold,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Comparison::LowerThan => "<",
            Comparison::GreaterThan => ">",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdViolation {
    pub sample: Sample,
    pub threshold: f64,
    pub comparison: Comparison,
}

pub fn violations(
    samples: &[Sample],
    threshold: f64,
    comparison: Comparison,
) -> Vec<ThresholdViolation> {
    samples
        .iter()
        .filter(|s| !comparison.holds(s.value, threshold))
        .map(|s| ThresholdViolation {
            sample: s.clone(),
            threshold,
            comparison,
        })
        .collect()
}

/// Checks whether every value in `value` is strictly below `threshold`.
/// A missing threshold is an error, not a pass.
pub fn query_results_lower_than_threshold(
    threshold: Option<f64>,
    value: &QueryResponse,
) -> Result<bool> {
    check(threshold, value, Comparison::LowerThan)
}

/// Checks whether every value in `value` is strictly above `threshold`.
pub fn query_results_greater_than_threshold(
    threshold: Option<f64>,
    value: &QueryResponse,
) -> Result<bool> {
    check(threshold, value, Comparison::GreaterThan)
}

fn check(threshold: Option<f64>, value: &QueryResponse, comparison: Comparison) -> Result<bool> {
    let threshold =
        threshold.ok_or_else(|| ChaosError::activity_failed("No threshold given"))?;
    if threshold.is_nan() {
        return Err(ChaosError::InvalidConfig("threshold must not be NaN".to_string()));
    }
    info!("threshold: {}", threshold);

    let samples = samples(value)?;
    if samples.is_empty() {
        warn!("Query returned no samples; nothing to compare against {}", threshold);
        return Ok(true);
    }

    let failed = violations(&samples, threshold, comparison);
    for violation in &failed {
        warn!(
            "Sample {} {:?} at {} is not {} {}",
            violation.sample.value,
            violation.sample.metric,
            violation.sample.timestamp,
            comparison.symbol(),
            threshold
        );
    }

    Ok(failed.is_empty())
}
