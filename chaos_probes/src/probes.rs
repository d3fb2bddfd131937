use crate::client::{Params, PrometheusClient};
use crate::response::{QueryData, QueryResponse};
use crate::when;
use chaos_core::{ActivitySpec, ArgumentSpec, ChaosError, Configuration, Result, Secrets};
use serde_json::Value;
use tracing::info;

pub const MODULE: &str = "chaos_probes::probes";

/// Run an instant query against a Prometheus server and return its result
/// as-is.
pub async fn query(
    query: &str,
    when: Option<&str>,
    timeout: Option<f64>,
    configuration: &Configuration,
    secrets: Option<&Secrets>,
) -> Result<QueryResponse> {
    let mut params: Params = vec![("query", query.to_string())];

    if let Some(timeout) = timeout {
        params.push(("timeout", format_timeout(timeout)?));
    }

    if let Some(when) = when.filter(|w| !w.is_empty()) {
        params.push(("time", when::resolve(when)?));
    }

    let client = PrometheusClient::from_configuration(configuration, secrets)?;
    client.get("query", &params, "Prometheus query").await
}

/// Run an instant query that must yield exactly one sample and return that
/// sample's value.
pub async fn query_value(
    query_string: &str,
    when: Option<&str>,
    timeout: Option<f64>,
    configuration: &Configuration,
    secrets: Option<&Secrets>,
) -> Result<f64> {
    let response = query(query_string, when, timeout, configuration, secrets).await?;
    single_value(&response)
}

/// Run a range query against a Prometheus server and return its result
/// as-is.
///
/// `start` and `end` accept RFC 3339 dates or relative expressions such as
/// `"5 minutes ago"`. A `step` of zero leaves the resolution to the server.
pub async fn query_interval(
    query: &str,
    start: &str,
    end: &str,
    step: u64,
    timeout: Option<f64>,
    configuration: &Configuration,
    secrets: Option<&Secrets>,
) -> Result<QueryResponse> {
    let mut params: Params = vec![("query", query.to_string())];

    if let Some(timeout) = timeout {
        params.push(("timeout", format_timeout(timeout)?));
    }

    if step > 0 {
        params.push(("step", step.to_string()));
    }

    params.push(("start", when::resolve(start)?));
    params.push(("end", when::resolve(end)?));

    let client = PrometheusClient::from_configuration(configuration, secrets)?;
    client.get("query_range", &params, "Prometheus query range").await
}

pub fn single_value(response: &QueryResponse) -> Result<f64> {
    let unexpected = |what: &str| {
        ChaosError::activity_failed(format!(
            "Expected a Prometheus {}, but got:\n{}",
            what,
            response.to_json().unwrap_or_default()
        ))
    };

    match &response.data {
        Some(QueryData::Vector(series)) if series.len() == 1 => {
            info!("Query returned a single series: {:?}", series[0].metric);
            series[0]
                .value
                .as_ref()
                .ok_or_else(|| unexpected("result with just one value"))?
                .value()
        }
        Some(QueryData::Scalar(pair)) => pair.value(),
        _ => Err(unexpected("response with just one result")),
    }
}

fn format_timeout(timeout: f64) -> Result<String> {
    if !timeout.is_finite() || timeout <= 0.0 {
        return Err(ChaosError::InvalidConfig(format!(
            "timeout must be a positive number of seconds, got {}",
            timeout
        )));
    }
    Ok(timeout.to_string())
}

pub fn activities() -> Vec<ActivitySpec> {
    vec![
        ActivitySpec::probe(
            MODULE,
            "query",
            "Run an instant query against a Prometheus server and returns its result as-is.",
        )
        .arg(ArgumentSpec::required("query", "str"))
        .arg(ArgumentSpec::optional("when", "str", Value::Null))
        .arg(ArgumentSpec::optional("timeout", "float", Value::Null))
        .returns("mapping"),
        ActivitySpec::probe(
            MODULE,
            "query_value",
            "Run an instant query that yields one sample and return its value.",
        )
        .arg(ArgumentSpec::required("query_string", "str"))
        .arg(ArgumentSpec::optional("when", "str", Value::Null))
        .arg(ArgumentSpec::optional("timeout", "float", Value::Null))
        .returns("float"),
        ActivitySpec::probe(
            MODULE,
            "query_interval",
            "Run a range query against a Prometheus server and returns its result as-is.",
        )
        .arg(ArgumentSpec::required("query", "str"))
        .arg(ArgumentSpec::required("start", "str"))
        .arg(ArgumentSpec::required("end", "str"))
        .arg(ArgumentSpec::optional("step", "int", Value::from(1)))
        .arg(ArgumentSpec::optional("timeout", "float", Value::Null))
        .returns("mapping"),
    ]
}
