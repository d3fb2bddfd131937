use crate::error::{ChaosError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

pub const PROMETHEUS_BASE_URL: &str = "prometheus_base_url";
pub const PUSHGATEWAY_URL: &str = "pushgateway_url";
pub const EXPERIMENT_REF: &str = "experiment_ref";
pub const TRACE_ID: &str = "trace_id";
pub const VERIFY_TLS: &str = "verify_tls";
pub const PROMETHEUS_TOKEN: &str = "prometheus_token";

pub const DEFAULT_PROMETHEUS_BASE_URL: &str = "http://localhost:9090";
pub const DEFAULT_PUSHGATEWAY_URL: &str = "http://localhost:9091";

/// Only `true` (any case) turns verification on.
pub fn tls_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// A configuration entry: either a literal or a reference to an
/// environment variable resolved at lookup time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ConfigValue {
    Env(EnvReference),
    Literal(Value),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvReference {
    #[serde(rename = "type")]
    pub kind: EnvKind,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnvKind {
    Env,
}

impl ConfigValue {
    pub fn env(key: impl Into<String>) -> Self {
        Self::Env(EnvReference {
            kind: EnvKind::Env,
            key: key.into(),
            default: None,
        })
    }

    pub fn resolve(&self) -> Option<Value> {
        match self {
            ConfigValue::Literal(Value::Null) => None,
            ConfigValue::Literal(value) => Some(value.clone()),
            ConfigValue::Env(reference) => std::env::var(&reference.key)
                .ok()
                .map(Value::String)
                .or_else(|| reference.default.clone()),
        }
    }
}

impl From<Value> for ConfigValue {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::Literal(Value::String(value.to_string()))
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::Literal(Value::String(value))
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Literal(Value::Bool(value))
    }
}

/// Experiment-level key/value settings handed to every activity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Configuration {
    values: HashMap<String, ConfigValue>,
}

/// Credentials share the configuration layout but are kept apart so they
/// never end up in logged parameters.
pub type Secrets = Configuration;

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).and_then(ConfigValue::resolve)
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get_str(key)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
            Some(other) => Err(ChaosError::InvalidConfig(format!(
                "'{}' must be a boolean, got {}",
                key, other
            ))),
        }
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) => s.trim().parse::<f64>().map(Some).map_err(|e| {
                ChaosError::InvalidConfig(format!("'{}' must be a number: {}", key, e))
            }),
            Some(other) => Err(ChaosError::InvalidConfig(format!(
                "'{}' must be a number, got {}",
                key, other
            ))),
        }
    }

    /// Whether TLS certificates should be verified. Unset or empty means
    /// true; otherwise see [`tls_flag`]. Probes and the control share this.
    pub fn verify_tls(&self) -> bool {
        match self.get(VERIFY_TLS) {
            None => true,
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) if s.trim().is_empty() => true,
            Some(Value::String(s)) => tls_flag(&s),
            Some(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await?;
        tracing::debug!("Loading configuration from {}", path.display());

        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Self::parse(&contents, "yaml"),
            Some("toml") => Self::parse(&contents, "toml"),
            Some("json") => Self::parse(&contents, "json"),
            _ => Err(ChaosError::InvalidConfig(format!(
                "Unsupported configuration file '{}'. Use .yaml, .yml, .toml, or .json",
                path.display()
            ))),
        }
    }

    pub fn parse(content: &str, format: &str) -> Result<Self> {
        match format.to_lowercase().as_str() {
            "yaml" | "yml" => serde_yaml::from_str(content)
                .map_err(|e| ChaosError::InvalidConfig(format!("Invalid YAML: {}", e))),
            "toml" => toml::from_str(content)
                .map_err(|e| ChaosError::InvalidConfig(format!("Invalid TOML: {}", e))),
            "json" => Ok(serde_json::from_str(content)?),
            _ => Err(ChaosError::InvalidConfig(format!(
                "Unsupported format: {}",
                format
            ))),
        }
    }
}
