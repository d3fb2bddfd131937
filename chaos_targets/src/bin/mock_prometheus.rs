use chaos_targets::{mock, responses, MockState};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let addr = std::env::var("MOCK_PROMETHEUS_ADDR").unwrap_or_else(|_| "0.0.0.0:9090".to_string());
    let app = mock::router(MockState::default());

    info!("Starting mock Prometheus on {}", addr);
    info!("Endpoints:");
    info!("  GET  /api/v1/query        - Instant query ({})", responses::default_vector()["data"]["resultType"]);
    info!("  GET  /api/v1/query_range  - Range query");
    info!("  PUT  /metrics/job/...     - Push gateway");
    info!("  GET  /-/healthy           - Health check");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
