use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The experiment document as handed over by the host. Its structure is
/// owned by the host, so it is kept opaque.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Experiment(pub Value);

impl Experiment {
    pub fn new(document: Value) -> Self {
        Self(document)
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.0.get("title").and_then(Value::as_str)
    }
}

impl From<Value> for Experiment {
    fn from(document: Value) -> Self {
        Self(document)
    }
}

/// Stable fingerprint of an experiment's content: MD5 over the compact JSON
/// form with object keys sorted.
pub fn experiment_hash(experiment: &Experiment) -> Option<String> {
    if experiment.is_empty() {
        return None;
    }
    // serde_json maps are ordered by key unless `preserve_order` is enabled
    let canonical = serde_json::to_string(&experiment.0).ok()?;
    Some(format!("{:x}", md5::compute(canonical.as_bytes())))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Failed,
    Aborted,
    Interrupted,
}

impl RunStatus {
    pub const ALL: [RunStatus; 4] = [
        RunStatus::Completed,
        RunStatus::Failed,
        RunStatus::Aborted,
        RunStatus::Interrupted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Aborted => "aborted",
            RunStatus::Interrupted => "interrupted",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a finished run. Only the fields the extension reads are
/// modelled; everything else in the host's journal is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Journal {
    pub status: RunStatus,
    #[serde(default)]
    pub deviated: bool,
    /// Run duration in seconds.
    #[serde(default)]
    pub duration: f64,
}

impl Journal {
    pub fn new(status: RunStatus, deviated: bool, duration: f64) -> Self {
        Self {
            status,
            deviated,
            duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_experiment_hash_is_key_order_independent() {
        let a = Experiment::new(json!({"title": "t", "steady-state-hypothesis": {"probes": []}}));
        let b = Experiment::new(json!({"steady-state-hypothesis": {"probes": []}, "title": "t"}));

        let hash = experiment_hash(&a).unwrap();
        assert_eq!(hash.len(), 32);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(Some(hash), experiment_hash(&b));
    }

    #[test]
    fn test_experiment_hash_changes_with_content() {
        let a = Experiment::new(json!({"title": "one"}));
        let b = Experiment::new(json!({"title": "two"}));
        assert_ne!(experiment_hash(&a), experiment_hash(&b));
    }

    #[test]
    fn test_empty_experiment_has_no_hash() {
        assert_eq!(experiment_hash(&Experiment::default()), None);
        assert_eq!(experiment_hash(&Experiment::new(json!({}))), None);
    }

    #[test]
    fn test_journal_ignores_unknown_fields() {
        let journal: Journal = serde_json::from_value(json!({
            "status": "failed",
            "deviated": true,
            "duration": 12.5,
            "run": [],
            "chaoslib-version": "1.0"
        }))
        .unwrap();

        assert_eq!(journal.status, RunStatus::Failed);
        assert!(journal.deviated);
        assert_eq!(journal.duration, 12.5);
    }

    #[test]
    fn test_journal_rejects_unknown_status() {
        let result: Result<Journal, _> = serde_json::from_value(json!({"status": "exploded"}));
        assert!(result.is_err());
    }
}
