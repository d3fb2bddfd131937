use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::{any, get},
    Router,
};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{oneshot, RwLock};
use tracing::info;

/// A request received on one of the query endpoints.
#[derive(Debug, Clone)]
pub struct RecordedQuery {
    pub path: String,
    pub params: HashMap<String, String>,
    pub accept: Option<String>,
    pub authorization: Option<String>,
}

/// A request received on the push gateway endpoint.
#[derive(Debug, Clone)]
pub struct RecordedPush {
    pub method: String,
    pub path: String,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone)]
struct CannedResponse {
    status: StatusCode,
    body: String,
}

impl CannedResponse {
    fn json(status: u16, body: &Value) -> Self {
        Self {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: body.to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    query: Option<CannedResponse>,
    query_range: Option<CannedResponse>,
    push_status: Option<StatusCode>,
    queries: Vec<RecordedQuery>,
    pushes: Vec<RecordedPush>,
}

#[derive(Clone, Default)]
pub struct MockState {
    inner: Arc<RwLock<Inner>>,
}

pub fn router(state: MockState) -> Router {
    Router::new()
        .route("/api/v1/query", get(instant_query))
        .route("/api/v1/query_range", get(range_query))
        .route("/metrics/*grouping", any(push))
        .route("/-/healthy", get(|| async { "Prometheus Server is Healthy.\n" }))
        .with_state(state)
}

/// A fake Prometheus server and push gateway bound to a local ephemeral port.
pub struct MockPrometheus {
    addr: SocketAddr,
    state: MockState,
    shutdown: Option<oneshot::Sender<()>>,
}

impl MockPrometheus {
    pub async fn start() -> anyhow::Result<Self> {
        Self::bind("127.0.0.1:0").await
    }

    pub async fn bind(addr: &str) -> anyhow::Result<Self> {
        let state = MockState::default();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        let (tx, rx) = oneshot::channel::<()>();

        let app = router(state.clone());
        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("Mock Prometheus stopped: {}", e);
            }
        });

        info!("Mock Prometheus listening on {}", addr);

        Ok(Self {
            addr,
            state,
            shutdown: Some(tx),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn respond_to_query(&self, status: u16, body: &Value) {
        self.state.inner.write().await.query = Some(CannedResponse::json(status, body));
    }

    pub async fn respond_to_query_range(&self, status: u16, body: &Value) {
        self.state.inner.write().await.query_range = Some(CannedResponse::json(status, body));
    }

    /// Serve a raw, non-JSON body on both query endpoints.
    pub async fn respond_with_text(&self, status: u16, body: &str) {
        let canned = CannedResponse {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body: body.to_string(),
        };
        let mut inner = self.state.inner.write().await;
        inner.query = Some(canned.clone());
        inner.query_range = Some(canned);
    }

    pub async fn set_push_status(&self, status: u16) {
        self.state.inner.write().await.push_status = StatusCode::from_u16(status).ok();
    }

    pub async fn queries(&self) -> Vec<RecordedQuery> {
        self.state.inner.read().await.queries.clone()
    }

    pub async fn pushes(&self) -> Vec<RecordedPush> {
        self.state.inner.read().await.pushes.clone()
    }
}

impl Drop for MockPrometheus {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn instant_query(
    State(state): State<MockState>,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let canned = record_query(&state, &uri, &headers, params, |inner| inner.query.clone()).await;
    respond(canned)
}

async fn range_query(
    State(state): State<MockState>,
    uri: Uri,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let canned =
        record_query(&state, &uri, &headers, params, |inner| inner.query_range.clone()).await;
    respond(canned)
}

async fn record_query(
    state: &MockState,
    uri: &Uri,
    headers: &HeaderMap,
    params: HashMap<String, String>,
    pick: impl Fn(&Inner) -> Option<CannedResponse>,
) -> Option<CannedResponse> {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let mut inner = state.inner.write().await;
    inner.queries.push(RecordedQuery {
        path: uri.path().to_string(),
        params,
        accept: header_value(header::ACCEPT),
        authorization: header_value(header::AUTHORIZATION),
    });
    pick(&inner)
}

fn respond(canned: Option<CannedResponse>) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let canned = canned.unwrap_or_else(|| CannedResponse::json(200, &crate::responses::default_vector()));
    (
        canned.status,
        [(header::CONTENT_TYPE, "application/json")],
        canned.body,
    )
}

async fn push(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let mut inner = state.inner.write().await;
    let recorded = RecordedPush {
        method: method.to_string(),
        path: uri.path().to_string(),
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    info!("Received {} {} ({} bytes)", recorded.method, recorded.path, body.len());
    inner.pushes.push(recorded);
    inner.push_status.unwrap_or(StatusCode::OK)
}
