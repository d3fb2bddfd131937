pub mod baseline;
pub mod samples;
pub mod threshold;

pub use baseline::{check_degradation, save_baseline, Baseline, BaselineStore, Direction};
pub use samples::{samples, summarize, Sample, Summary};
pub use threshold::{
    query_results_greater_than_threshold, query_results_lower_than_threshold, Comparison,
};

use chaos_core::{ActivitySpec, ArgumentSpec};
use serde_json::Value;

pub const MODULE: &str = "chaos_verification";

pub fn activities() -> Vec<ActivitySpec> {
    vec![
        ActivitySpec::probe(
            MODULE,
            "query_results_lower_than_threshold",
            "Checks if all passed Prometheus values are below the given threshold.",
        )
        .arg(ArgumentSpec::required("threshold", "float"))
        .arg(ArgumentSpec::required("value", "mapping"))
        .returns("bool"),
        ActivitySpec::probe(
            MODULE,
            "query_results_greater_than_threshold",
            "Checks if all passed Prometheus values are above the given threshold.",
        )
        .arg(ArgumentSpec::required("threshold", "float"))
        .arg(ArgumentSpec::required("value", "mapping"))
        .returns("bool"),
        ActivitySpec::probe(
            MODULE,
            "save_baseline",
            "Record the mean of a query result as a named baseline.",
        )
        .arg(ArgumentSpec::required("store_path", "str"))
        .arg(ArgumentSpec::required("name", "str"))
        .arg(ArgumentSpec::required("value", "mapping"))
        .returns("mapping"),
        ActivitySpec::probe(
            MODULE,
            "check_degradation",
            "Compare the mean of a query result against a saved baseline.",
        )
        .arg(ArgumentSpec::required("store_path", "str"))
        .arg(ArgumentSpec::required("name", "str"))
        .arg(ArgumentSpec::required("value", "mapping"))
        .arg(ArgumentSpec::optional("tolerance", "float", Value::from(0.1)))
        .arg(ArgumentSpec::optional(
            "direction",
            "str",
            Value::from("higher_is_worse"),
        ))
        .returns("bool"),
    ]
}
