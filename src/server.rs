//! HTTP server surface.
//!
//! Exposes the operation catalog over two protocols on one listener:
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/tools/list` | List all operations with argument schemas |
//! | `POST` | `/tools/{name}` | Dispatch an operation by name |
//! | `GET`  | `/clusters` | Registered cluster names and resolved default |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `*`    | `/mcp` | MCP streamable-HTTP endpoint (JSON-RPC) |
//!
//! Every dispatch response is the uniform envelope —
//! `{ "status": "ok", "result": … }` or
//! `{ "status": "error", "code": …, "message": … }` — with the HTTP
//! status derived from the error code.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support
//! browser-based clients and cross-origin MCP tool calls.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::catalog;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::{Envelope, ErrorCode};
use crate::mcp::McpBridge;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
}

/// Map an error code to the HTTP status for the envelope response.
fn http_status(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::UnknownOperation | ErrorCode::ClusterNotFound => StatusCode::NOT_FOUND,
        ErrorCode::InvalidArguments => StatusCode::BAD_REQUEST,
        ErrorCode::BackendFailure => StatusCode::BAD_GATEWAY,
        ErrorCode::ConfigInvalid | ErrorCode::NoClustersAvailable => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

fn envelope_response(envelope: Envelope) -> impl IntoResponse {
    let status = match &envelope {
        Envelope::Ok { .. } => StatusCode::OK,
        Envelope::Error { code, .. } => http_status(*code),
    };
    (status, Json(envelope))
}

/// Start the server: REST tool surface plus the MCP JSON-RPC bridge,
/// with permissive CORS. Runs until `shutdown` completes, then closes
/// every backend connection.
pub async fn run_server(
    config: &Config,
    dispatcher: Arc<Dispatcher>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState {
        dispatcher: dispatcher.clone(),
    };

    let bridge = McpBridge::new(dispatcher.clone());
    let mcp_service = StreamableHttpService::new(
        move || Ok(bridge.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .route("/clusters", get(handle_clusters))
        .route("/health", get(handle_health))
        .nest_service("/mcp", mcp_service)
        .layer(cors)
        .with_state(state);

    println!("Serving {} operations:", catalog::all().len());
    for op in catalog::all() {
        println!("  POST /tools/{} — {}", op.name, op.description);
    }
    println!("MCP server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    dispatcher.shutdown().await;

    Ok(())
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /tools/list ============

#[derive(Serialize)]
struct ToolInfo {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

async fn handle_list_tools() -> Json<ToolListResponse> {
    let tools = catalog::all()
        .iter()
        .map(|op| ToolInfo {
            name: op.name.to_string(),
            description: op.description.to_string(),
            parameters: catalog::schema_for(op),
        })
        .collect();
    Json(ToolListResponse { tools })
}

// ============ GET /clusters ============

async fn handle_clusters(State(state): State<AppState>) -> impl IntoResponse {
    let envelope = state
        .dispatcher
        .dispatch("list_clusters", Value::Object(Default::default()))
        .await;
    envelope_response(envelope)
}

// ============ POST /tools/{name} ============

async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(arguments): Json<Value>,
) -> impl IntoResponse {
    let envelope = state.dispatcher.dispatch(&name, arguments).await;
    envelope_response(envelope)
}
