pub mod collector;
pub mod control;
pub mod error;
pub mod pushgateway;

pub use collector::PrometheusCollector;
pub use control::{activities, ControlArgs, ControlSettings, PrometheusControl};
pub use error::MetricsError;
pub use pushgateway::{GroupingKey, MetricsPusher, PushGateway};
