//! Two-phase degradation checks: record the mean of a query while the
//! system is healthy, then compare later results against it.
//!
//! Baselines live in a JSON file owned by the caller, so the two phases can
//! run in different processes.
use crate::samples::{samples, summarize};
use chaos_core::{ChaosError, Result};
use chaos_probes::QueryResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Latency, error counts: larger values are a regression.
    #[default]
    HigherIsWorse,
    /// Throughput, availability: smaller values are a regression.
    LowerIsWorse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub name: String,
    /// Mean of all samples at recording time.
    pub value: f64,
    pub samples: usize,
    pub recorded_at: DateTime<Utc>,
}

impl Baseline {
    pub fn from_response(name: impl Into<String>, response: &QueryResponse) -> Result<Self> {
        let name = name.into();
        let summary = summarize(&samples(response)?).ok_or_else(|| {
            ChaosError::activity_failed(format!(
                "cannot record baseline '{}' from an empty result",
                name
            ))
        })?;
        let value = summary.mean();
        if !value.is_finite() {
            return Err(ChaosError::activity_failed(format!(
                "baseline '{}' would not be a finite number ({})",
                name, value
            )));
        }

        Ok(Self {
            name,
            value,
            samples: summary.count,
            recorded_at: Utc::now(),
        })
    }

    /// Bound the current value may reach before it counts as degraded. The
    /// margin scales with the baseline's magnitude, so negative baselines
    /// keep the bound on the worse side.
    pub fn limit(&self, tolerance: f64, direction: Direction) -> f64 {
        let margin = self.value.abs() * tolerance;
        match direction {
            Direction::HigherIsWorse => self.value + margin,
            Direction::LowerIsWorse => self.value - margin,
        }
    }

    pub fn permits(&self, current: f64, tolerance: f64, direction: Direction) -> bool {
        let limit = self.limit(tolerance, direction);
        match direction {
            Direction::HigherIsWorse => current <= limit,
            Direction::LowerIsWorse => current >= limit,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    baselines: BTreeMap<String, Baseline>,
}

/// Baselines keyed by name, persisted as one JSON document.
#[derive(Debug, Clone)]
pub struct BaselineStore {
    path: PathBuf,
    contents: StoreFile,
}

impl BaselineStore {
    /// A missing file yields an empty store.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No baseline store at {}, starting empty", path.display());
                StoreFile::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, contents })
    }

    /// Writes to a sibling temp file first so readers never see a partial store.
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&self.contents)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Baseline> {
        self.contents.baselines.get(name)
    }

    pub fn record(&mut self, baseline: Baseline) -> Option<Baseline> {
        self.contents.baselines.insert(baseline.name.clone(), baseline)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Record the mean of `response` as baseline `name` in the store at `store_path`.
pub async fn save_baseline(
    store_path: impl AsRef<Path>,
    name: &str,
    response: &QueryResponse,
) -> Result<Baseline> {
    let baseline = Baseline::from_response(name, response)?;
    let mut store = BaselineStore::load(store_path).await?;
    if let Some(previous) = store.record(baseline.clone()) {
        info!(
            "Replacing baseline '{}' ({} -> {})",
            name, previous.value, baseline.value
        );
    }
    store.save().await?;

    info!(
        "Saved baseline '{}' = {} from {} samples to {}",
        name,
        baseline.value,
        baseline.samples,
        store.path().display()
    );
    Ok(baseline)
}

/// Compare the mean of `response` with baseline `name`. Returns true while
/// the current value stays within `tolerance` (a fraction, 0.1 = 10%).
pub async fn check_degradation(
    store_path: impl AsRef<Path>,
    name: &str,
    response: &QueryResponse,
    tolerance: f64,
    direction: Direction,
) -> Result<bool> {
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(ChaosError::InvalidConfig(format!(
            "tolerance must be a non-negative number, got {}",
            tolerance
        )));
    }

    let store = BaselineStore::load(&store_path).await?;
    let baseline = store.get(name).ok_or_else(|| {
        ChaosError::activity_failed(format!(
            "no baseline named '{}' in {}",
            name,
            store.path().display()
        ))
    })?;

    let summary = summarize(&samples(response)?).ok_or_else(|| {
        ChaosError::activity_failed(format!(
            "cannot compare baseline '{}' against an empty result",
            name
        ))
    })?;
    let current = summary.mean();
    let limit = baseline.limit(tolerance, direction);
    let ok = baseline.permits(current, tolerance, direction);

    if ok {
        info!(
            "'{}' is {} against baseline {} (limit {})",
            name, current, baseline.value, limit
        );
    } else {
        warn!(
            "'{}' degraded: {} against baseline {} (limit {})",
            name, current, baseline.value, limit
        );
    }
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn vector(values: &[&str]) -> QueryResponse {
        let result: Vec<Value> = values
            .iter()
            .map(|v| json!({"metric": {}, "value": [1, v]}))
            .collect();
        serde_json::from_value(json!({
            "status": "success",
            "data": {"resultType": "vector", "result": result}
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_save_then_check() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("baselines.json");

        let baseline = save_baseline(&store, "latency", &vector(&["0.1", "0.3"]))
            .await
            .unwrap();
        assert!((baseline.value - 0.2).abs() < 1e-12);
        assert_eq!(baseline.samples, 2);

        // 0.21 is within 10% of 0.2
        assert!(check_degradation(&store, "latency", &vector(&["0.21"]), 0.1, Direction::HigherIsWorse)
            .await
            .unwrap());
        assert!(!check_degradation(&store, "latency", &vector(&["0.3"]), 0.1, Direction::HigherIsWorse)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_lower_is_worse() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("baselines.json");
        save_baseline(&store, "rps", &vector(&["100"])).await.unwrap();

        assert!(check_degradation(&store, "rps", &vector(&["95"]), 0.1, Direction::LowerIsWorse)
            .await
            .unwrap());
        assert!(!check_degradation(&store, "rps", &vector(&["80"]), 0.1, Direction::LowerIsWorse)
            .await
            .unwrap());
        // improvements always pass
        assert!(check_degradation(&store, "rps", &vector(&["500"]), 0.0, Direction::LowerIsWorse)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_negative_baseline_keeps_bound_on_worse_side() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("baselines.json");
        save_baseline(&store, "offset", &vector(&["-10"])).await.unwrap();

        for direction in [Direction::HigherIsWorse, Direction::LowerIsWorse] {
            assert!(check_degradation(&store, "offset", &vector(&["-10"]), 0.1, direction)
                .await
                .unwrap());
        }

        // limit is -9 going up, -11 going down
        assert!(check_degradation(&store, "offset", &vector(&["-9.5"]), 0.1, Direction::HigherIsWorse)
            .await
            .unwrap());
        assert!(!check_degradation(&store, "offset", &vector(&["-8"]), 0.1, Direction::HigherIsWorse)
            .await
            .unwrap());
        assert!(check_degradation(&store, "offset", &vector(&["-10.5"]), 0.1, Direction::LowerIsWorse)
            .await
            .unwrap());
        assert!(!check_degradation(&store, "offset", &vector(&["-12"]), 0.1, Direction::LowerIsWorse)
            .await
            .unwrap());
    }

    #[test]
    fn test_zero_baseline_only_permits_no_change() {
        let baseline = Baseline {
            name: "errors".to_string(),
            value: 0.0,
            samples: 1,
            recorded_at: Utc::now(),
        };

        assert_eq!(baseline.limit(0.5, Direction::HigherIsWorse), 0.0);
        assert!(baseline.permits(0.0, 0.5, Direction::HigherIsWorse));
        assert!(!baseline.permits(0.1, 0.5, Direction::HigherIsWorse));
        assert!(baseline.permits(0.0, 0.5, Direction::LowerIsWorse));
        assert!(baseline.permits(-0.0, 0.5, Direction::LowerIsWorse));
        assert!(!baseline.permits(-0.1, 0.5, Direction::LowerIsWorse));
    }

    #[tokio::test]
    async fn test_store_persists_multiple_baselines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        save_baseline(&path, "a", &vector(&["1"])).await.unwrap();
        save_baseline(&path, "b", &vector(&["2"])).await.unwrap();
        save_baseline(&path, "a", &vector(&["3"])).await.unwrap();

        let store = BaselineStore::load(&path).await.unwrap();
        assert_eq!(store.get("b").unwrap().value, 2.0);
        assert_eq!(store.get("a").unwrap().value, 3.0);
        assert!(!dir.path().join("nested").join("store.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_missing_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let err = check_degradation(
            dir.path().join("none.json"),
            "latency",
            &vector(&["1"]),
            0.1,
            Direction::HigherIsWorse,
        )
        .await
        .unwrap_err();
        assert!(err.is_activity_failure());
        assert!(err.to_string().contains("no baseline named 'latency'"));
    }

    #[tokio::test]
    async fn test_empty_result_cannot_form_baseline() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_baseline(dir.path().join("s.json"), "x", &vector(&[]))
            .await
            .unwrap_err();
        assert!(err.is_activity_failure());
        assert!(!dir.path().join("s.json").exists());
    }

    #[tokio::test]
    async fn test_invalid_tolerance() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("s.json");
        save_baseline(&store, "x", &vector(&["1"])).await.unwrap();

        for tolerance in [-0.1, f64::NAN, f64::INFINITY] {
            let err = check_degradation(&store, "x", &vector(&["1"]), tolerance, Direction::HigherIsWorse)
                .await
                .unwrap_err();
            assert!(matches!(err, ChaosError::InvalidConfig(_)));
        }
    }

    #[tokio::test]
    async fn test_corrupt_store_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, "not json").await.unwrap();
        assert!(BaselineStore::load(&path).await.is_err());
    }
}
