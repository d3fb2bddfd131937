use chaos_core::{ChaosError, Result};
use chaos_probes::response::{Labels, QueryData, QueryResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub metric: Labels,
    pub timestamp: f64,
    pub value: f64,
}

/// Flattens a query result into individual samples: one per vector series,
/// one per matrix point, one for a scalar.
pub fn samples(response: &QueryResponse) -> Result<Vec<Sample>> {
    let data = response
        .data
        .as_ref()
        .ok_or_else(|| ChaosError::activity_failed("Prometheus response carries no data"))?;

    match data {
        QueryData::Vector(series) => series
            .iter()
            .map(|s| {
                let pair = s.value.as_ref().ok_or_else(|| {
                    ChaosError::activity_failed(format!(
                        "series {:?} has no float sample",
                        s.metric
                    ))
                })?;
                Ok(Sample {
                    metric: s.metric.clone(),
                    timestamp: pair.timestamp(),
                    value: pair.value()?,
                })
            })
            .collect(),
        QueryData::Matrix(series) => {
            let mut out = Vec::new();
            for s in series {
                for pair in &s.values {
                    out.push(Sample {
                        metric: s.metric.clone(),
                        timestamp: pair.timestamp(),
                        value: pair.value()?,
                    });
                }
            }
            Ok(out)
        }
        QueryData::Scalar(pair) => Ok(vec![Sample {
            metric: Labels::new(),
            timestamp: pair.timestamp(),
            value: pair.value()?,
        }]),
        QueryData::String(_) => Err(ChaosError::activity_failed(
            "cannot compare a string result against a numeric threshold",
        )),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    pub fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

/// `None` for an empty slice.
pub fn summarize(samples: &[Sample]) -> Option<Summary> {
    if samples.is_empty() {
        return None;
    }

    let mut summary = Summary {
        count: 0,
        sum: 0.0,
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };
    for sample in samples {
        summary.count += 1;
        summary.sum += sample.value;
        summary.min = summary.min.min(sample.value);
        summary.max = summary.max.max(sample.value);
    }
    Some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> QueryResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_vector_samples() {
        let response = decode(json!({
            "status": "success",
            "data": {"resultType": "vector", "result": [
                {"metric": {"job": "a"}, "value": [1, "0.5"]},
                {"metric": {"job": "b"}, "value": [1, "1.5"]}
            ]}
        }));

        let samples = samples(&response).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[1].metric["job"], "b");
        assert_eq!(samples[1].value, 1.5);
    }

    #[test]
    fn test_matrix_samples_are_flattened() {
        let response = decode(json!({
            "status": "success",
            "data": {"resultType": "matrix", "result": [
                {"metric": {}, "values": [[1, "1"], [2, "2"]]},
                {"metric": {}, "values": [[1, "3"]]}
            ]}
        }));

        let values: Vec<f64> = samples(&response).unwrap().iter().map(|s| s.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_string_result_is_rejected() {
        let response = decode(json!({
            "status": "success",
            "data": {"resultType": "string", "result": [1, "hello"]}
        }));
        assert!(samples(&response).unwrap_err().is_activity_failure());
    }

    #[test]
    fn test_summary() {
        let response = decode(json!({
            "status": "success",
            "data": {"resultType": "matrix", "result": [
                {"metric": {}, "values": [[1, "2"], [2, "4"], [3, "6"]]}
            ]}
        }));

        let summary = summarize(&samples(&response).unwrap()).unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.mean(), 4.0);
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.max, 6.0);
        assert!(summarize(&[]).is_none());
    }
}
