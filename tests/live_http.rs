//! Live-HTTP tests against an in-process stub cluster.
//!
//! Exercises the real reqwest transport end to end: liveness probing,
//! search round-trips, and verbatim forwarding of backend error bodies.
//! The stub speaks just enough of the OpenSearch REST surface for the
//! operations under test.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use opensearch_mcp::cluster::ClusterConfig;
use opensearch_mcp::dispatch::Dispatcher;
use opensearch_mcp::resolver::CanonicalConfig;

async fn root() -> Json<Value> {
    Json(json!({
        "cluster_name": "stub",
        "version": { "number": "2.11.0" },
        "tagline": "You Know, for Search"
    }))
}

async fn search_logs(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({
        "took": 1,
        "hits": {
            "total": { "value": 1 },
            "hits": [ { "_source": { "msg": "hello" } } ]
        },
        "echo_size": body.get("size").cloned().unwrap_or(Value::Null)
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "cluster_name": "stub", "status": "green" }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "type": "index_not_found_exception",
                "reason": "no such index [gone]"
            },
            "status": 404
        })),
    )
}

/// Start the stub cluster on an ephemeral port.
async fn start_stub() -> SocketAddr {
    let app = Router::new()
        .route("/", get(root))
        .route("/logs/_search", post(search_logs))
        .route("/_cluster/health", get(health))
        .fallback(not_found);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// A local port with nothing listening on it.
async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn cluster(name: &str, url: String) -> ClusterConfig {
    let mut config: ClusterConfig = serde_json::from_value(json!({
        "url": url,
        "probe_timeout_secs": 1,
        "timeout_secs": 5
    }))
    .unwrap();
    config.name = name.to_string();
    config
}

#[tokio::test]
async fn test_search_round_trip_over_http() {
    let addr = start_stub().await;
    let config = CanonicalConfig {
        clusters: vec![cluster("stub", format!("http://{}", addr))],
        default_cluster: None,
    };
    let dispatcher = Dispatcher::new(config);

    let envelope = serde_json::to_value(
        dispatcher
            .dispatch(
                "search",
                json!({ "index": "logs", "query": { "match_all": {} }, "size": 3 }),
            )
            .await,
    )
    .unwrap();

    assert_eq!(envelope["status"], "ok", "envelope: {}", envelope);
    assert_eq!(envelope["result"]["hits"]["total"]["value"], 1);
    assert_eq!(envelope["result"]["echo_size"], 3);

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_cluster_is_skipped_at_build() {
    let addr = start_stub().await;
    let dead = closed_port().await;
    let config = CanonicalConfig {
        clusters: vec![
            cluster("live", format!("http://{}", addr)),
            cluster("dead", format!("http://127.0.0.1:{}", dead)),
        ],
        default_cluster: None,
    };
    let dispatcher = Dispatcher::new(config);

    let envelope =
        serde_json::to_value(dispatcher.dispatch("list_clusters", json!({})).await).unwrap();
    assert_eq!(envelope["status"], "ok");
    assert_eq!(envelope["result"]["clusters"], json!(["live"]));

    let envelope = serde_json::to_value(
        dispatcher
            .dispatch("cluster_health", json!({ "cluster": "dead" }))
            .await,
    )
    .unwrap();
    assert_eq!(envelope["code"], "cluster_not_found");

    let envelope =
        serde_json::to_value(dispatcher.dispatch("cluster_health", json!({})).await).unwrap();
    assert_eq!(envelope["status"], "ok");
    assert_eq!(envelope["result"]["status"], "green");

    dispatcher.shutdown().await;
}

#[tokio::test]
async fn test_backend_error_body_forwarded_verbatim() {
    let addr = start_stub().await;
    let config = CanonicalConfig {
        clusters: vec![cluster("stub", format!("http://{}", addr))],
        default_cluster: None,
    };
    let dispatcher = Dispatcher::new(config);

    let envelope = serde_json::to_value(
        dispatcher
            .dispatch("search", json!({ "index": "gone" }))
            .await,
    )
    .unwrap();

    assert_eq!(envelope["status"], "error");
    assert_eq!(envelope["code"], "backend_failure");
    let message = envelope["message"].as_str().unwrap();
    assert!(message.contains("index_not_found_exception"));
    assert!(message.contains("no such index [gone]"));

    dispatcher.shutdown().await;
}
