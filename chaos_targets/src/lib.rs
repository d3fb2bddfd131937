//! Stand-ins for the services the extension talks to: a Prometheus query
//! API and a push gateway, both served from one axum router.
pub mod mock;
pub mod responses;

pub use mock::{MockPrometheus, MockState, RecordedPush, RecordedQuery};
