pub mod client;
pub mod probes;
pub mod response;
pub mod when;

pub use client::PrometheusClient;
pub use probes::{activities, query, query_interval, query_value};
pub use response::{InstantSeries, QueryData, QueryResponse, RangeSeries, SamplePair};
