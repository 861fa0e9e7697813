use axum::{
    debug_handler,
    extract::{MatchedPath, Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusRecorder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
#[allow(unused)]
use tracing::{debug, info};
use uuid::Uuid;

/// Misbehavior to inject into the service.
#[derive(Clone, Copy, Debug, Default)]
pub struct Faults {
    /// `/health` answers 503 with `status: "unhealthy"`.
    pub unhealthy: bool,
    pub calculate: CalculateFault,
    /// Added to every response.
    pub latency: Duration,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CalculateFault {
    #[default]
    None,
    /// 200 with `{}`.
    EmptyObject,
    /// 200 with a body that is not JSON.
    Malformed,
}

#[derive(Clone)]
struct AppState {
    faults: Faults,
    items: Arc<RwLock<Vec<Item>>>,
    recorder: Arc<PrometheusRecorder>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemCreate {
    pub name: String,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Deserialize)]
pub struct CalculateRequest {
    pub a: f64,
    pub b: f64,
    pub operation: Operation,
}

pub fn router(faults: Faults) -> Router {
    let state = AppState {
        faults,
        items: Arc::default(),
        recorder: Arc::new(PrometheusBuilder::new().build_recorder()),
    };

    Router::new()
        .route("/health", get(health))
        .route("/api/v1/calculate", post(calculate))
        .route("/api/v1/items", get(list_items).post(create_item))
        .route("/api/v1/items/:item_id", get(get_item))
        .route("/metrics", get(render_metrics))
        .route_layer(middleware::from_fn_with_state(state.clone(), track))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(addr: SocketAddr, faults: Faults) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(faults)).await?;
    Ok(())
}

/// Serve on an ephemeral localhost port in the background.
pub async fn spawn(faults: Faults) -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router(faults)).await {
            tracing::error!("Mock service stopped: {err}");
        }
    });
    Ok(addr)
}

async fn track(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let method = req.method().to_string();

    // NOTE: Counted before the handler runs so `/metrics` includes its own request
    metrics::with_local_recorder(state.recorder.as_ref(), || {
        counter!("http_requests_total", "method" => method, "handler" => path).increment(1);
    });

    if !state.faults.latency.is_zero() {
        tokio::time::sleep(state.faults.latency).await;
    }
    next.run(req).await
}

#[debug_handler]
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (status, label) = if state.faults.unhealthy {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    } else {
        (StatusCode::OK, "healthy")
    };

    (
        status,
        Json(json!({
            "status": label,
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": humantime::format_rfc3339_micros(SystemTime::now()).to_string(),
            "environment": std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        })),
    )
}

#[debug_handler]
async fn calculate(
    State(state): State<AppState>,
    Json(req): Json<CalculateRequest>,
) -> Response {
    match state.faults.calculate {
        CalculateFault::EmptyObject => return Json(json!({})).into_response(),
        CalculateFault::Malformed => return "<html>oops".into_response(),
        CalculateFault::None => {}
    }

    let result = match req.operation {
        Operation::Add => req.a + req.b,
        Operation::Subtract => req.a - req.b,
        Operation::Multiply => req.a * req.b,
        Operation::Divide if req.b == 0. => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"detail": "Cannot divide by zero"})),
            )
                .into_response();
        }
        Operation::Divide => req.a / req.b,
    };

    Json(json!({
        "a": req.a,
        "b": req.b,
        "operation": req.operation,
        "result": result,
    }))
    .into_response()
}

#[debug_handler]
async fn list_items(State(state): State<AppState>) -> Json<Vec<Item>> {
    Json(state.items.read().await.clone())
}

#[debug_handler]
async fn create_item(
    State(state): State<AppState>,
    Json(new): Json<ItemCreate>,
) -> (StatusCode, Json<Item>) {
    let item = Item {
        id: Uuid::new_v4().to_string(),
        name: new.name,
        description: new.description,
    };
    debug!("Created item {}", item.id);
    state.items.write().await.push(item.clone());
    (StatusCode::CREATED, Json(item))
}

#[debug_handler]
async fn get_item(State(state): State<AppState>, Path(item_id): Path<String>) -> Response {
    let items = state.items.read().await;
    match items.iter().find(|item| item.id == item_id) {
        Some(item) => Json(item.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"detail": format!("Item with id '{item_id}' not found")})),
        )
            .into_response(),
    }
}

#[debug_handler]
async fn render_metrics(State(state): State<AppState>) -> String {
    state.recorder.handle().render()
}
