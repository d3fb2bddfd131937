use super::Settings;
use crate::ui;
use anyhow::Result;
use chaos_probes::{QueryData, QueryResponse};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct SampleRow {
    metric: String,
    timestamp: String,
    value: String,
}

pub async fn instant(
    settings: &Settings,
    query: String,
    when: Option<String>,
    timeout: Option<f64>,
    json: bool,
) -> Result<()> {
    let response = chaos_probes::query(
        &query,
        when.as_deref(),
        timeout,
        &settings.configuration,
        settings.secrets(),
    )
    .await?;

    print_response(&query, &response, json)
}

pub async fn range(
    settings: &Settings,
    query: String,
    start: String,
    end: String,
    step: u64,
    timeout: Option<f64>,
    json: bool,
) -> Result<()> {
    let response = chaos_probes::query_interval(
        &query,
        &start,
        &end,
        step,
        timeout,
        &settings.configuration,
        settings.secrets(),
    )
    .await?;

    print_response(&query, &response, json)
}

pub async fn value(
    settings: &Settings,
    query: String,
    when: Option<String>,
    timeout: Option<f64>,
) -> Result<()> {
    let value = chaos_probes::query_value(
        &query,
        when.as_deref(),
        timeout,
        &settings.configuration,
        settings.secrets(),
    )
    .await?;

    println!("{}", value);
    Ok(())
}

fn print_response(query: &str, response: &QueryResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    ui::print_header(query);
    for warning in &response.warnings {
        ui::print_warning(warning);
    }

    let rows = rows(response);
    if rows.is_empty() {
        println!("(no results)");
    } else {
        println!("{}", Table::new(rows));
    }
    Ok(())
}

fn rows(response: &QueryResponse) -> Vec<SampleRow> {
    let row = |metric: &chaos_probes::response::Labels, ts: f64, value: &str| SampleRow {
        metric: format_labels(metric),
        timestamp: ts.to_string(),
        value: value.to_string(),
    };

    match &response.data {
        Some(QueryData::Vector(series)) => series
            .iter()
            .filter_map(|s| {
                s.value
                    .as_ref()
                    .map(|p| row(&s.metric, p.timestamp(), p.raw_value()))
            })
            .collect(),
        Some(QueryData::Matrix(series)) => series
            .iter()
            .flat_map(|s| {
                s.values
                    .iter()
                    .map(|p| row(&s.metric, p.timestamp(), p.raw_value()))
            })
            .collect(),
        Some(QueryData::Scalar(p)) | Some(QueryData::String(p)) => {
            vec![row(&Default::default(), p.timestamp(), p.raw_value())]
        }
        None => Vec::new(),
    }
}

/// `name{label="value",...}` in the form Prometheus prints series.
fn format_labels(labels: &chaos_probes::response::Labels) -> String {
    let name = labels.get("__name__").cloned().unwrap_or_default();
    let pairs: Vec<String> = labels
        .iter()
        .filter(|(k, _)| k.as_str() != "__name__")
        .map(|(k, v)| format!("{}=\"{}\"", k, v))
        .collect();
    if pairs.is_empty() {
        if name.is_empty() {
            "{}".to_string()
        } else {
            name
        }
    } else {
        format!("{}{{{}}}", name, pairs.join(","))
    }
}
