use chaos_core::{ChaosError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Body returned by `/api/v1/query` and `/api/v1/query_range`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<QueryData>,
    #[serde(rename = "errorType", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub enum QueryData {
    Vector(Vec<InstantSeries>),
    Matrix(Vec<RangeSeries>),
    Scalar(SamplePair),
    String(SamplePair),
}

pub type Labels = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstantSeries {
    #[serde(default)]
    pub metric: Labels,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<SamplePair>,
    /// Native histogram samples are passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histogram: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSeries {
    #[serde(default)]
    pub metric: Labels,
    #[serde(default)]
    pub values: Vec<SamplePair>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histograms: Option<Value>,
}

/// `[<unix seconds>, "<value>"]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePair(pub f64, pub String);

impl SamplePair {
    pub fn new(timestamp: f64, value: impl Into<String>) -> Self {
        Self(timestamp, value.into())
    }

    pub fn timestamp(&self) -> f64 {
        self.0
    }

    pub fn raw_value(&self) -> &str {
        &self.1
    }

    pub fn value(&self) -> Result<f64> {
        parse_sample_value(&self.1)
    }
}

/// Prometheus renders special floats as `NaN`, `+Inf` and `-Inf`.
pub fn parse_sample_value(raw: &str) -> Result<f64> {
    match raw.trim() {
        "NaN" => Ok(f64::NAN),
        "+Inf" | "Inf" => Ok(f64::INFINITY),
        "-Inf" => Ok(f64::NEG_INFINITY),
        other => other.parse::<f64>().map_err(|_| {
            ChaosError::activity_failed(format!("'{}' is not a numeric sample value", raw))
        }),
    }
}

impl QueryData {
    pub fn result_type(&self) -> &'static str {
        match self {
            QueryData::Vector(_) => "vector",
            QueryData::Matrix(_) => "matrix",
            QueryData::Scalar(_) => "scalar",
            QueryData::String(_) => "string",
        }
    }

    /// Number of entries in `result`, counting a scalar or string as one.
    pub fn len(&self) -> usize {
        match self {
            QueryData::Vector(series) => series.len(),
            QueryData::Matrix(series) => series.len(),
            QueryData::Scalar(_) | QueryData::String(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl QueryResponse {
    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    pub fn result_type(&self) -> Option<&'static str> {
        self.data.as_ref().map(QueryData::result_type)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_vector() {
        let response: QueryResponse = serde_json::from_value(json!({
            "status": "success",
            "data": {
                "resultType": "vector",
                "result": [
                    {"metric": {"__name__": "up", "job": "api"}, "value": [1700000000.5, "1"]}
                ]
            }
        }))
        .unwrap();

        assert!(response.is_success());
        assert_eq!(response.result_type(), Some("vector"));
        match response.data.unwrap() {
            QueryData::Vector(series) => {
                assert_eq!(series[0].metric["job"], "api");
                let pair = series[0].value.as_ref().unwrap();
                assert_eq!(pair.timestamp(), 1700000000.5);
                assert_eq!(pair.value().unwrap(), 1.0);
            }
            other => panic!("unexpected data: {:?}", other),
        }
    }

    #[test]
    fn test_decode_matrix_with_result_first() {
        let response: QueryResponse = serde_json::from_value(json!({
            "status": "success",
            "warnings": ["partial response"],
            "data": {
                "result": [{"metric": {}, "values": [[1, "0.5"], [2, "NaN"]]}],
                "resultType": "matrix"
            }
        }))
        .unwrap();

        assert_eq!(response.warnings, vec!["partial response"]);
        match response.data.unwrap() {
            QueryData::Matrix(series) => {
                assert_eq!(series[0].values.len(), 2);
                assert!(series[0].values[1].value().unwrap().is_nan());
            }
            other => panic!("unexpected data: {:?}", other),
        }
    }

    #[test]
    fn test_decode_scalar_and_error() {
        let scalar: QueryResponse = serde_json::from_value(json!({
            "status": "success",
            "data": {"resultType": "scalar", "result": [1, "+Inf"]}
        }))
        .unwrap();
        assert_eq!(scalar.data.as_ref().map(QueryData::len), Some(1));

        let error: QueryResponse = serde_json::from_value(json!({
            "status": "error",
            "errorType": "bad_data",
            "error": "parse error"
        }))
        .unwrap();
        assert!(!error.is_success());
        assert_eq!(error.error_type.as_deref(), Some("bad_data"));
        assert!(error.data.is_none());
    }

    #[test]
    fn test_sample_value_parsing() {
        assert_eq!(parse_sample_value("-Inf").unwrap(), f64::NEG_INFINITY);
        assert_eq!(parse_sample_value("1e3").unwrap(), 1000.0);
        assert!(parse_sample_value("abc").unwrap_err().is_activity_failure());
    }

    #[test]
    fn test_serialization_keeps_wire_names() {
        let response = QueryResponse {
            status: ResponseStatus::Success,
            data: Some(QueryData::Scalar(SamplePair::new(1.0, "2"))),
            error_type: None,
            error: None,
            warnings: vec![],
        };
        let value: Value = serde_json::from_str(&response.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"status": "success", "data": {"resultType": "scalar", "result": [1.0, "2"]}})
        );
    }
}
