//! Prometheus extension for chaos experiments: query probes, a push-gateway
//! control and threshold verification, discoverable through [`discover`].
use chaos_core::{initialize_discovery_result, ActivityRegistry, Discovery};
use serde_json::json;
use tracing::info;

pub use chaos_core::{Configuration, Control, Experiment, Journal, Secrets};
pub use chaos_metrics::{ControlArgs, PrometheusControl};
pub use chaos_probes::{query, query_interval, query_value, QueryResponse};
pub use chaos_verification::{
    check_degradation, query_results_greater_than_threshold, query_results_lower_than_threshold,
    save_baseline, Direction,
};

pub const EXTENSION_NAME: &str = "chaostoolkit-prometheus";
pub const DISCOVERY_TARGET: &str = "prometheus";

/// Discover Prometheus capabilities from this extension.
pub fn discover(discover_system: bool) -> Discovery {
    info!("Discovering capabilities from {}", EXTENSION_NAME);

    let mut discovery =
        initialize_discovery_result(EXTENSION_NAME, chaos_core::VERSION, DISCOVERY_TARGET);
    discovery.activities = load_exported_activities().into_specs();

    if discover_system {
        discovery.system = Some(json!({
            "prometheus_api": ["/api/v1/query", "/api/v1/query_range"],
            "pushgateway_api": ["/metrics/job/{job}"],
        }));
    }

    discovery
}

pub fn load_exported_activities() -> ActivityRegistry {
    let mut registry = ActivityRegistry::new();
    registry.extend(chaos_probes::activities());
    registry.extend(chaos_metrics::activities());
    registry.extend(chaos_verification::activities());
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaos_core::ActivityKind;

    #[test]
    fn test_discover() {
        let discovery = discover(false);
        assert_eq!(discovery.extension.name, EXTENSION_NAME);
        assert_eq!(discovery.extension.version, chaos_core::VERSION);
        assert_eq!(discovery.target, "prometheus");
        assert!(discovery.system.is_none());

        let names: Vec<&str> = discovery.activities.iter().map(|a| a.name.as_str()).collect();
        for expected in [
            "query",
            "query_value",
            "query_interval",
            "configure_control",
            "after_experiment_control",
            "query_results_lower_than_threshold",
            "check_degradation",
        ] {
            assert!(names.contains(&expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_discover_system() {
        assert!(discover(true).system.is_some());
    }

    #[test]
    fn test_activity_kinds() {
        let registry = load_exported_activities();
        assert_eq!(registry.of_kind(ActivityKind::Control).count(), 3);
        assert_eq!(registry.of_kind(ActivityKind::Probe).count(), 7);
        assert!(registry
            .get("query")
            .unwrap()
            .arguments
            .iter()
            .all(|a| a.name != "configuration" && a.name != "secrets"));
    }
}
