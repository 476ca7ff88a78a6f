//! End-to-end dispatch tests over fake transports.
//!
//! These exercise the full path — catalog lookup, argument validation,
//! lazy registry build, cluster resolution, backend invocation, envelope
//! wrapping — without any network. The transport fakes stand in for the
//! HTTP layer at the same seam production uses.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use opensearch_mcp::backend::{BackendConnection, BackendError, BackendRequest, Transport};
use opensearch_mcp::cluster::ClusterConfig;
use opensearch_mcp::dispatch::Dispatcher;
use opensearch_mcp::resolver::CanonicalConfig;

/// What a scripted backend answers for non-probe requests.
#[derive(Clone)]
enum Reply {
    Ok(Value),
    Status(u16, String),
}

struct ScriptedTransport {
    probe_ok: bool,
    reply: Reply,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: BackendRequest) -> Result<Value, BackendError> {
        // The empty path is the root info endpoint used by the probe.
        if request.path.is_empty() {
            return if self.probe_ok {
                Ok(json!({ "cluster_name": "scripted" }))
            } else {
                Err(BackendError::Transport("connection refused".to_string()))
            };
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Reply::Ok(value) => Ok(value.clone()),
            Reply::Status(status, body) => Err(BackendError::Status {
                status: *status,
                body: body.clone(),
            }),
        }
    }
}

fn cluster(name: &str) -> ClusterConfig {
    let mut config: ClusterConfig =
        serde_json::from_value(json!({ "url": format!("http://{}:9200", name) })).unwrap();
    config.name = name.to_string();
    config
}

fn canonical(names: &[&str], default: Option<&str>) -> CanonicalConfig {
    CanonicalConfig {
        clusters: names.iter().map(|n| cluster(n)).collect(),
        default_cluster: default.map(|s| s.to_string()),
    }
}

/// Dispatcher where the named clusters are dead and the rest answer
/// `reply`. Returns the backend call counter alongside.
fn dispatcher_with(
    config: CanonicalConfig,
    dead: &'static [&'static str],
    reply: Reply,
) -> (Dispatcher, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_for_connector = calls.clone();
    let dispatcher = Dispatcher::with_connector(config, move |cluster_config: ClusterConfig| {
        let probe_ok = !dead.contains(&cluster_config.name.as_str());
        Ok(BackendConnection::with_transport(
            cluster_config,
            Arc::new(ScriptedTransport {
                probe_ok,
                reply: reply.clone(),
                calls: calls_for_connector.clone(),
            }),
        ))
    });
    (dispatcher, calls)
}

#[tokio::test]
async fn test_unknown_operation_never_contacts_backend() {
    let (dispatcher, calls) = dispatcher_with(
        canonical(&["prod"], None),
        &[],
        Reply::Ok(json!({})),
    );

    let envelope = serde_json::to_value(dispatcher.dispatch("frobnicate", json!({})).await).unwrap();
    assert_eq!(envelope["status"], "error");
    assert_eq!(envelope["code"], "unknown_operation");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_invalid_arguments_never_contact_backend() {
    let (dispatcher, calls) = dispatcher_with(
        canonical(&["prod"], None),
        &[],
        Reply::Ok(json!({})),
    );

    // get_document requires both index and id.
    let envelope = serde_json::to_value(
        dispatcher
            .dispatch("get_document", json!({ "index": "logs" }))
            .await,
    )
    .unwrap();
    assert_eq!(envelope["status"], "error");
    assert_eq!(envelope["code"], "invalid_arguments");
    assert!(envelope["message"].as_str().unwrap().contains("id"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // Wrong type for a declared field.
    let envelope = serde_json::to_value(
        dispatcher
            .dispatch("search", json!({ "size": "ten" }))
            .await,
    )
    .unwrap();
    assert_eq!(envelope["code"], "invalid_arguments");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_east_west_scenario() {
    // "east" reachable, "west" unreachable: the registry keeps east only.
    let (dispatcher, _calls) = dispatcher_with(
        canonical(&["east", "west"], None),
        &["west"],
        Reply::Ok(json!({ "hits": { "total": { "value": 0 } } })),
    );

    let envelope = serde_json::to_value(dispatcher.dispatch("list_clusters", json!({})).await).unwrap();
    assert_eq!(envelope["status"], "ok");
    assert_eq!(envelope["result"]["clusters"], json!(["east"]));

    let envelope = serde_json::to_value(
        dispatcher
            .dispatch("search", json!({ "cluster": "west" }))
            .await,
    )
    .unwrap();
    assert_eq!(envelope["status"], "error");
    assert_eq!(envelope["code"], "cluster_not_found");
    let message = envelope["message"].as_str().unwrap();
    assert!(message.contains("west"));
    assert!(message.contains("east"));

    // No selector falls back to the first surviving cluster.
    let envelope = serde_json::to_value(dispatcher.dispatch("search", json!({})).await).unwrap();
    assert_eq!(envelope["status"], "ok");
    assert!(envelope["result"]["hits"].is_object());
}

#[tokio::test]
async fn test_single_cluster_with_and_without_selector() {
    let (dispatcher, _calls) = dispatcher_with(
        canonical(&["prod"], None),
        &[],
        Reply::Ok(json!({ "count": 7 })),
    );

    let by_default = serde_json::to_value(dispatcher.dispatch("count", json!({})).await).unwrap();
    let by_name = serde_json::to_value(
        dispatcher
            .dispatch("count", json!({ "cluster": "prod" }))
            .await,
    )
    .unwrap();
    assert_eq!(by_default["status"], "ok");
    assert_eq!(by_default["result"]["count"], 7);
    assert_eq!(by_default, by_name);
}

#[tokio::test]
async fn test_default_cluster_routing() {
    let (dispatcher, _calls) = dispatcher_with(
        canonical(&["east", "west"], Some("west")),
        &[],
        Reply::Ok(json!({})),
    );

    let envelope = serde_json::to_value(dispatcher.dispatch("list_clusters", json!({})).await).unwrap();
    assert_eq!(envelope["result"]["clusters"], json!(["east", "west"]));
    assert_eq!(envelope["result"]["default"], "west");
}

#[tokio::test]
async fn test_backend_failure_forwarded_verbatim() {
    let (dispatcher, _calls) = dispatcher_with(
        canonical(&["prod"], None),
        &[],
        Reply::Status(
            404,
            r#"{"error":{"type":"index_not_found_exception","reason":"no such index [gone]"}}"#
                .to_string(),
        ),
    );

    let envelope = serde_json::to_value(
        dispatcher
            .dispatch("search", json!({ "index": "gone" }))
            .await,
    )
    .unwrap();
    assert_eq!(envelope["status"], "error");
    assert_eq!(envelope["code"], "backend_failure");
    assert!(envelope["message"]
        .as_str()
        .unwrap()
        .contains("index_not_found_exception"));
}

#[tokio::test]
async fn test_empty_config_fails_dispatch_with_config_invalid() {
    let (dispatcher, calls) =
        dispatcher_with(CanonicalConfig::default(), &[], Reply::Ok(json!({})));

    let envelope =
        serde_json::to_value(dispatcher.dispatch("cluster_health", json!({})).await).unwrap();
    assert_eq!(envelope["status"], "error");
    assert_eq!(envelope["code"], "config_invalid");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_all_clusters_dead_fails_with_no_clusters_available() {
    let (dispatcher, _calls) = dispatcher_with(
        canonical(&["east", "west"], None),
        &["east", "west"],
        Reply::Ok(json!({})),
    );

    let envelope =
        serde_json::to_value(dispatcher.dispatch("cluster_health", json!({})).await).unwrap();
    assert_eq!(envelope["status"], "error");
    assert_eq!(envelope["code"], "no_clusters_available");
}

#[tokio::test]
async fn test_concurrent_first_dispatches_share_one_registry() {
    let calls = Arc::new(AtomicUsize::new(0));
    let builds = Arc::new(AtomicUsize::new(0));
    let builds_for_connector = builds.clone();
    let calls_for_connector = calls.clone();

    let dispatcher = Arc::new(Dispatcher::with_connector(
        canonical(&["prod"], None),
        move |cluster_config: ClusterConfig| {
            builds_for_connector.fetch_add(1, Ordering::SeqCst);
            Ok(BackendConnection::with_transport(
                cluster_config,
                Arc::new(ScriptedTransport {
                    probe_ok: true,
                    reply: Reply::Ok(json!({})),
                    calls: calls_for_connector.clone(),
                }),
            ))
        },
    ));

    let a = {
        let d = dispatcher.clone();
        tokio::spawn(async move { d.dispatch("cluster_health", json!({})).await })
    };
    let b = {
        let d = dispatcher.clone();
        tokio::spawn(async move { d.dispatch("cluster_stats", json!({})).await })
    };
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    assert!(a.is_ok() && b.is_ok());
    // Exactly one connection was constructed for the single cluster.
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}
