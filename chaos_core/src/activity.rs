use crate::{
    config::Configuration,
    error::Result,
    journal::{Experiment, Journal},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Probe,
    Action,
    Control,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ArgumentSpec {
    pub fn required(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: Some(type_name.into()),
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, type_name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            type_name: Some(type_name.into()),
            default: Some(default),
        }
    }
}

/// Metadata describing one callable the extension exposes to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySpec {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub name: String,
    #[serde(rename = "mod")]
    pub module: String,
    pub doc: String,
    #[serde(default)]
    pub arguments: Vec<ArgumentSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
}

impl ActivitySpec {
    pub fn new(
        kind: ActivityKind,
        module: impl Into<String>,
        name: impl Into<String>,
        doc: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            module: module.into(),
            doc: doc.into(),
            arguments: Vec::new(),
            return_type: None,
        }
    }

    pub fn probe(module: impl Into<String>, name: impl Into<String>, doc: impl Into<String>) -> Self {
        Self::new(ActivityKind::Probe, module, name, doc)
    }

    pub fn control(module: impl Into<String>, name: impl Into<String>, doc: impl Into<String>) -> Self {
        Self::new(ActivityKind::Control, module, name, doc)
    }

    pub fn arg(mut self, argument: ArgumentSpec) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn returns(mut self, type_name: impl Into<String>) -> Self {
        self.return_type = Some(type_name.into());
        self
    }
}

/// Activity specs in registration order.
#[derive(Debug, Clone, Default)]
pub struct ActivityRegistry {
    activities: Vec<ActivitySpec>,
}

impl ActivityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a spec, replacing any earlier one with the same module and name.
    pub fn register(&mut self, spec: ActivitySpec) {
        match self
            .activities
            .iter_mut()
            .find(|a| a.module == spec.module && a.name == spec.name)
        {
            Some(existing) => *existing = spec,
            None => self.activities.push(spec),
        }
    }

    pub fn extend(&mut self, specs: impl IntoIterator<Item = ActivitySpec>) {
        for spec in specs {
            self.register(spec);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ActivitySpec> {
        self.activities.iter().find(|a| a.name == name)
    }

    pub fn list(&self) -> Vec<String> {
        self.activities.iter().map(|a| a.name.clone()).collect()
    }

    pub fn of_kind(&self, kind: ActivityKind) -> impl Iterator<Item = &ActivitySpec> {
        self.activities.iter().filter(move |a| a.kind == kind)
    }

    pub fn into_specs(self) -> Vec<ActivitySpec> {
        self.activities
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}

/// Lifecycle hooks the host invokes around an experiment run.
#[async_trait]
pub trait Control: Send + Sync {
    type Args: Send + Sync;

    /// Prepare the control for one run
    async fn configure(
        &mut self,
        args: Self::Args,
        configuration: &Configuration,
        experiment: &Experiment,
    ) -> Result<()>;

    async fn before_experiment(&mut self) -> Result<()>;

    async fn after_experiment(&mut self, journal: &Journal) -> Result<()>;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_registry() -> ActivityRegistry {
        let mut registry = ActivityRegistry::new();
        registry.register(
            ActivitySpec::probe("chaos_probes::probes", "query", "Run an instant query")
                .arg(ArgumentSpec::required("query", "str"))
                .arg(ArgumentSpec::optional("when", "str", Value::Null))
                .returns("object"),
        );
        registry.register(ActivitySpec::control(
            "chaos_metrics::control",
            "configure_control",
            "Build the collector",
        ));
        registry
    }

    #[test]
    fn test_registry_keeps_order() {
        let registry = sample_registry();
        assert_eq!(registry.list(), vec!["query", "configure_control"]);
        assert_eq!(registry.of_kind(ActivityKind::Probe).count(), 1);
    }

    #[test]
    fn test_registry_replaces_duplicates() {
        let mut registry = sample_registry();
        registry.register(ActivitySpec::probe("chaos_probes::probes", "query", "updated"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("query").unwrap().doc, "updated");
    }

    #[test]
    fn test_spec_serialization_shape() {
        let registry = sample_registry();
        let value = serde_json::to_value(registry.get("query").unwrap()).unwrap();
        assert_eq!(value["type"], json!("probe"));
        assert_eq!(value["mod"], json!("chaos_probes::probes"));
        assert_eq!(value["arguments"][0], json!({"name": "query", "type": "str"}));
        assert_eq!(value["arguments"][1]["default"], Value::Null);
        assert_eq!(value["return_type"], json!("object"));
    }
}
