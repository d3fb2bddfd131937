//! Builders for Prometheus API response bodies.
use serde_json::{json, Value};

pub fn vector(series: &[(&[(&str, &str)], f64, &str)]) -> Value {
    let result: Vec<Value> = series
        .iter()
        .map(|(labels, ts, value)| {
            json!({
                "metric": labels_object(labels),
                "value": [ts, value],
            })
        })
        .collect();

    success("vector", Value::Array(result))
}

pub fn matrix(series: &[(&[(&str, &str)], &[(f64, &str)])]) -> Value {
    let result: Vec<Value> = series
        .iter()
        .map(|(labels, values)| {
            let values: Vec<Value> = values.iter().map(|(ts, v)| json!([ts, v])).collect();
            json!({
                "metric": labels_object(labels),
                "values": values,
            })
        })
        .collect();

    success("matrix", Value::Array(result))
}

pub fn scalar(ts: f64, value: &str) -> Value {
    success("scalar", json!([ts, value]))
}

pub fn error(error_type: &str, message: &str) -> Value {
    json!({
        "status": "error",
        "errorType": error_type,
        "error": message,
    })
}

/// A single `up{job="prometheus"}` sample, served when no response is configured.
pub fn default_vector() -> Value {
    vector(&[(&[("__name__", "up"), ("job", "prometheus")], 1_700_000_000.0, "1")])
}

fn success(result_type: &str, result: Value) -> Value {
    json!({
        "status": "success",
        "data": {
            "resultType": result_type,
            "result": result,
        }
    })
}

fn labels_object(labels: &[(&str, &str)]) -> Value {
    Value::Object(
        labels
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_shape() {
        let body = vector(&[(&[("job", "api")], 10.0, "0.5")]);
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["resultType"], "vector");
        assert_eq!(body["data"]["result"][0]["metric"]["job"], "api");
        assert_eq!(body["data"]["result"][0]["value"][1], "0.5");
    }

    #[test]
    fn test_matrix_shape() {
        let body = matrix(&[(&[], &[(1.0, "1"), (2.0, "2")])]);
        assert_eq!(body["data"]["resultType"], "matrix");
        assert_eq!(body["data"]["result"][0]["values"][1][1], "2");
    }
}
