use crate::error::Result;
use chaos_core::{Journal, RunStatus};
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use tracing::debug;

pub const SOURCE: &str = "chaostoolkit";

pub const LABEL_NAMES: [&str; 4] = [
    "source",
    "chaostoolkit_lib_version",
    "chaostoolkit_run_trace_id",
    "chaostoolkit_experiment_ref",
];

const STATUS_METRIC: &str = "chaostoolkit_experiment_status";

/// Run-lifecycle metrics for one experiment run, kept in a private registry
/// so that a push only ever carries this run's series.
pub struct PrometheusCollector {
    registry: Registry,
    label_values: [String; 4],
    status: GaugeVec,
    deviated: IntCounterVec,
    in_progress: GaugeVec,
    duration: GaugeVec,
    duration_dist: HistogramVec,
}

impl PrometheusCollector {
    pub fn new(trace_id: &str, experiment_ref: &str) -> Result<Self> {
        let registry = Registry::new();

        let mut status_labels = LABEL_NAMES.to_vec();
        status_labels.push(STATUS_METRIC);
        let status = GaugeVec::new(
            Opts::new(STATUS_METRIC, "Chaos Toolkit experiment runs status"),
            &status_labels,
        )?;
        let deviated = IntCounterVec::new(
            Opts::new(
                "chaostoolkit_deviated_experiment_total",
                "Chaos Toolkit deviated experiments",
            ),
            &LABEL_NAMES,
        )?;
        let in_progress = GaugeVec::new(
            Opts::new(
                "chaostoolkit_inprogress_experiment",
                "Chaos Toolkit experiments in progress",
            ),
            &LABEL_NAMES,
        )?;
        let duration = GaugeVec::new(
            Opts::new(
                "chaostoolkit_experiment_duration",
                "Chaos Toolkit experiment duration",
            ),
            &LABEL_NAMES,
        )?;
        let duration_dist = HistogramVec::new(
            HistogramOpts::new(
                "chaostoolkit_experiment_duration_dist",
                "Chaos Toolkit experiment duration distribution",
            ),
            &LABEL_NAMES,
        )?;

        registry.register(Box::new(status.clone()))?;
        registry.register(Box::new(deviated.clone()))?;
        registry.register(Box::new(in_progress.clone()))?;
        registry.register(Box::new(duration.clone()))?;
        registry.register(Box::new(duration_dist.clone()))?;

        Ok(Self {
            registry,
            label_values: [
                SOURCE.to_string(),
                chaos_core::VERSION.to_string(),
                trace_id.to_string(),
                experiment_ref.to_string(),
            ],
            status,
            deviated,
            in_progress,
            duration,
            duration_dist,
        })
    }

    fn labels(&self) -> [&str; 4] {
        [
            self.label_values[0].as_str(),
            self.label_values[1].as_str(),
            self.label_values[2].as_str(),
            self.label_values[3].as_str(),
        ]
    }

    pub fn trace_id(&self) -> &str {
        &self.label_values[2]
    }

    pub fn experiment_ref(&self) -> &str {
        &self.label_values[3]
    }

    pub fn started(&self) {
        self.in_progress.with_label_values(&self.labels()).inc();
    }

    pub fn finished(&self, journal: &Journal) {
        let labels = self.labels();

        if journal.deviated {
            self.deviated.with_label_values(&labels).inc();
        }

        self.in_progress.with_label_values(&labels).dec();
        self.set_status(journal.status);
        self.duration.with_label_values(&labels).set(journal.duration);
        self.duration_dist
            .with_label_values(&labels)
            .observe(journal.duration);

        debug!(
            "Recorded run {} as {} after {}s",
            self.trace_id(),
            journal.status,
            journal.duration
        );
    }

    /// Exactly one state gauge is 1, the rest are 0.
    fn set_status(&self, current: RunStatus) {
        let labels = self.labels();
        for state in RunStatus::ALL {
            let value = if state == current { 1.0 } else { 0.0 };
            self.status
                .with_label_values(&[labels[0], labels[1], labels[2], labels[3], state.as_str()])
                .set(value);
        }
    }

    /// Text exposition of every metric in the registry and its content type.
    pub fn encode(&self) -> Result<(String, String)> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        let body = String::from_utf8(buffer)
            .map_err(|e| prometheus::Error::Msg(format!("exposition is not UTF-8: {}", e)))?;
        Ok((body, encoder.format_type().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find_value(body: &str, prefix: &str) -> Option<f64> {
        body.lines()
            .find(|line| line.starts_with(prefix))
            .and_then(|line| line.rsplit(' ').next())
            .and_then(|v| v.parse().ok())
    }

    #[test]
    fn test_started_marks_in_progress() {
        let collector = PrometheusCollector::new("trace-1", "ref-1").unwrap();
        collector.started();

        let (body, content_type) = collector.encode().unwrap();
        assert!(content_type.starts_with("text/plain"));
        assert!(body.contains("# TYPE chaostoolkit_inprogress_experiment gauge"));
        assert!(body.contains("chaostoolkit_run_trace_id=\"trace-1\""));
        assert!(body.contains("chaostoolkit_experiment_ref=\"ref-1\""));
        assert!(body.contains("source=\"chaostoolkit\""));
        assert_eq!(find_value(&body, "chaostoolkit_inprogress_experiment{"), Some(1.0));
        // nothing finished yet
        assert!(!body.contains("chaostoolkit_experiment_status{"));
    }

    #[test]
    fn test_finished_records_outcome() {
        let collector = PrometheusCollector::new("trace-2", "ref-2").unwrap();
        collector.started();
        collector.finished(&Journal::new(RunStatus::Failed, true, 42.0));

        let (body, _) = collector.encode().unwrap();
        assert_eq!(find_value(&body, "chaostoolkit_inprogress_experiment{"), Some(0.0));
        assert_eq!(find_value(&body, "chaostoolkit_deviated_experiment_total{"), Some(1.0));
        assert_eq!(find_value(&body, "chaostoolkit_experiment_duration{"), Some(42.0));
        assert_eq!(find_value(&body, "chaostoolkit_experiment_duration_dist_count{"), Some(1.0));
        assert_eq!(find_value(&body, "chaostoolkit_experiment_duration_dist_sum{"), Some(42.0));

        let states: Vec<&str> = body
            .lines()
            .filter(|l| l.starts_with("chaostoolkit_experiment_status{"))
            .collect();
        assert_eq!(states.len(), 4);
        for line in states {
            let expected = if line.contains("chaostoolkit_experiment_status=\"failed\"") {
                "1"
            } else {
                "0"
            };
            assert!(line.ends_with(&format!(" {}", expected)), "{}", line);
        }
    }

    #[test]
    fn test_not_deviated_leaves_counter_untouched() {
        let collector = PrometheusCollector::new("trace-3", "ref-3").unwrap();
        collector.started();
        collector.finished(&Journal::new(RunStatus::Completed, false, 1.5));

        let (body, _) = collector.encode().unwrap();
        assert!(!body.contains("chaostoolkit_deviated_experiment_total{"));
    }
}
