use crate::collector::PrometheusCollector;
use crate::error::{MetricsError, Result};
use crate::pushgateway::{GroupingKey, MetricsPusher, PushGateway};
use chaos_core::config::{
    tls_flag, DEFAULT_PUSHGATEWAY_URL, EXPERIMENT_REF, PUSHGATEWAY_URL, TRACE_ID,
};
use chaos_core::{
    async_trait, experiment_hash, ActivitySpec, ArgumentSpec, ChaosError, Configuration, Control,
    Experiment, Journal,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub const MODULE: &str = "chaos_metrics::control";
pub const DEFAULT_JOB: &str = "chaostoolkit";

/// Arguments accepted by `configure_control`. Each one overrides the
/// matching configuration key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ControlArgs {
    #[serde(default)]
    pub pushgateway_url: Option<String>,
    #[serde(default)]
    pub job: Option<String>,
    #[serde(default)]
    pub grouping_key: Option<GroupingKey>,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub experiment_ref: Option<String>,
    #[serde(default)]
    pub verify_tls: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlSettings {
    pub pushgateway_url: String,
    pub job: String,
    pub grouping_key: GroupingKey,
    pub trace_id: String,
    pub experiment_ref: String,
    pub verify_tls: bool,
}

impl ControlSettings {
    pub fn resolve(
        args: ControlArgs,
        configuration: &Configuration,
        experiment: &Experiment,
    ) -> Result<Self> {
        let pick = |arg: Option<String>, key: &str| {
            arg.filter(|v| !v.is_empty())
                .or_else(|| configuration.get_str(key).filter(|v| !v.is_empty()))
        };

        let pushgateway_url = pick(args.pushgateway_url, PUSHGATEWAY_URL)
            .unwrap_or_else(|| DEFAULT_PUSHGATEWAY_URL.to_string());
        let job = args
            .job
            .filter(|j| !j.is_empty())
            .unwrap_or_else(|| DEFAULT_JOB.to_string());
        let trace_id = pick(args.trace_id, TRACE_ID)
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        let experiment_ref = pick(args.experiment_ref, EXPERIMENT_REF)
            .or_else(|| experiment_hash(experiment))
            .ok_or_else(|| {
                MetricsError::Core(ChaosError::InvalidConfig(
                    "an experiment_ref is required when no experiment is given".to_string(),
                ))
            })?;
        let verify_tls = match args.verify_tls.filter(|v| !v.trim().is_empty()) {
            Some(flag) => tls_flag(&flag),
            None => configuration.verify_tls(),
        };
        let grouping_key = args
            .grouping_key
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| {
                GroupingKey::from([(
                    "chaostoolkit_experiment_ref".to_string(),
                    experiment_ref.clone(),
                )])
            });

        Ok(Self {
            pushgateway_url,
            job,
            grouping_key,
            trace_id,
            experiment_ref,
            verify_tls,
        })
    }
}

struct ConfiguredRun {
    settings: ControlSettings,
    collector: PrometheusCollector,
    pusher: Arc<dyn MetricsPusher>,
}

impl ConfiguredRun {
    async fn push(&self) -> Result<()> {
        let (body, content_type) = self.collector.encode()?;
        self.pusher
            .push(
                &self.settings.job,
                &self.settings.grouping_key,
                body,
                &content_type,
            )
            .await
    }
}

/// Pushes run-lifecycle metrics to a push gateway around an experiment.
///
/// The host owns the value: one `configure` per run, then
/// `before_experiment` and `after_experiment`.
#[derive(Default)]
pub struct PrometheusControl {
    pusher: Option<Arc<dyn MetricsPusher>>,
    run: Option<ConfiguredRun>,
}

impl PrometheusControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `pusher` instead of a push gateway built from the settings.
    pub fn with_pusher(pusher: Arc<dyn MetricsPusher>) -> Self {
        Self {
            pusher: Some(pusher),
            run: None,
        }
    }

    pub fn settings(&self) -> Option<&ControlSettings> {
        self.run.as_ref().map(|r| &r.settings)
    }

    pub fn collector(&self) -> Option<&PrometheusCollector> {
        self.run.as_ref().map(|r| &r.collector)
    }

    fn configured(&self) -> Result<&ConfiguredRun> {
        self.run.as_ref().ok_or(MetricsError::NotConfigured)
    }
}

#[async_trait]
impl Control for PrometheusControl {
    type Args = ControlArgs;

    async fn configure(
        &mut self,
        args: ControlArgs,
        configuration: &Configuration,
        experiment: &Experiment,
    ) -> chaos_core::Result<()> {
        let settings = ControlSettings::resolve(args, configuration, experiment)?;
        let collector = PrometheusCollector::new(&settings.trace_id, &settings.experiment_ref)?;
        let pusher: Arc<dyn MetricsPusher> = match &self.pusher {
            Some(pusher) => pusher.clone(),
            None => Arc::new(PushGateway::new(
                &settings.pushgateway_url,
                settings.verify_tls,
            )?),
        };

        info!(
            "Prometheus control configured: gateway {}, job {}, trace {}",
            settings.pushgateway_url, settings.job, settings.trace_id
        );

        self.run = Some(ConfiguredRun {
            settings,
            collector,
            pusher,
        });
        Ok(())
    }

    async fn before_experiment(&mut self) -> chaos_core::Result<()> {
        let run = self.configured()?;
        run.collector.started();
        run.push().await?;
        Ok(())
    }

    async fn after_experiment(&mut self, journal: &Journal) -> chaos_core::Result<()> {
        let run = self.configured()?;
        run.collector.finished(journal);
        run.push().await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "prometheus"
    }
}

pub fn activities() -> Vec<ActivitySpec> {
    vec![
        ActivitySpec::control(
            MODULE,
            "configure_control",
            "Create the run-lifecycle metrics and prepare the push gateway client.",
        )
        .arg(ArgumentSpec::optional(
            "pushgateway_url",
            "str",
            Value::from(DEFAULT_PUSHGATEWAY_URL),
        ))
        .arg(ArgumentSpec::optional("job", "str", Value::from(DEFAULT_JOB)))
        .arg(ArgumentSpec::optional("grouping_key", "mapping", Value::Null))
        .arg(ArgumentSpec::optional("trace_id", "str", Value::Null))
        .arg(ArgumentSpec::optional("experiment_ref", "str", Value::Null))
        .arg(ArgumentSpec::optional("verify_tls", "str", Value::Null)),
        ActivitySpec::control(
            MODULE,
            "before_experiment_control",
            "Notify the push gateway this experiment is in progress.",
        ),
        ActivitySpec::control(
            MODULE,
            "after_experiment_control",
            "Notify the push gateway this experiment is not in progress any longer.",
        )
        .arg(ArgumentSpec::required("state", "Journal")),
    ]
}
