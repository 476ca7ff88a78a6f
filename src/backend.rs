//! Live backend connections.
//!
//! A [`BackendConnection`] wraps one validated [`ClusterConfig`] into a
//! client handle with a liveness probe, a close hook, and one method per
//! catalog operation. The HTTP specifics live behind the [`Transport`]
//! trait so registry and dispatch logic can be exercised against
//! in-memory fakes; production uses [`HttpTransport`] (reqwest, rustls).
//!
//! Backend error bodies are forwarded verbatim — a failed query's reason
//! is diagnosable from the error envelope without reading server logs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use thiserror::Error;

use crate::catalog::{
    AggregateArgs, BulkArgs, CountArgs, CreateIndexArgs, DeleteByQueryArgs, DocumentPathArgs,
    IndexArgs, IndexDocumentArgs, ListIndicesArgs, NameArgs, NamedDefinitionArgs, OpCall,
    PutIndexSettingsArgs, PutMappingArgs, SearchArgs, UpdateDocumentArgs,
};
use crate::cluster::{ClusterConfig, Credentials};
use crate::sign::{self, AwsCredentials};

const SECURITY_API: &str = "_plugins/_security/api";

/// Failures raised by a backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Connection handle could not be constructed (bad TLS material,
    /// missing AWS credentials in the environment).
    #[error("{0}")]
    Setup(String),

    /// Network-level failure: refused, reset, timed out.
    #[error("{0}")]
    Transport(String),

    /// The backend answered with a non-success status. `body` is the
    /// backend's response body, verbatim.
    #[error("{body}")]
    Status { status: u16, body: String },
}

/// One outbound request, transport-agnostic.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    pub method: Method,
    /// Path relative to the cluster's base URL, no leading slash.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Newline-delimited JSON body (bulk); mutually exclusive with `body`.
    pub ndjson: Option<String>,
    /// Per-request timeout override (used by the liveness probe).
    pub timeout: Option<Duration>,
}

impl BackendRequest {
    fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            ndjson: None,
            timeout: None,
        }
    }

    fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// The seam between operation methods and the wire.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: BackendRequest) -> Result<Value, BackendError>;
}

// ── HTTP transport ───────────────────────────────────────────────────────

enum Auth {
    None,
    Basic { username: String, password: String },
    ApiKey(String),
    SigV4 {
        region: String,
        service: String,
        creds: AwsCredentials,
    },
}

/// Production transport: reqwest with rustls, honoring the cluster's TLS
/// policy, credentials, and request timeout.
pub struct HttpTransport {
    base: reqwest::Url,
    client: reqwest::Client,
    auth: Auth,
}

impl HttpTransport {
    pub fn new(config: &ClusterConfig) -> Result<Self, BackendError> {
        let mut base = reqwest::Url::parse(config.primary_url())
            .map_err(|e| BackendError::Setup(format!("invalid endpoint URL: {}", e)))?;
        // Url::join replaces the last segment unless the base ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs));

        if !config.tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if let Some(path) = &config.ca_cert {
            let pem = std::fs::read(path).map_err(|e| {
                BackendError::Setup(format!("cannot read ca_cert {}: {}", path.display(), e))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| BackendError::Setup(format!("invalid ca_cert: {}", e)))?;
            builder = builder.add_root_certificate(cert);
        }
        if let (Some(cert_path), Some(key_path)) = (&config.client_cert, &config.client_key) {
            let mut pem = std::fs::read(cert_path).map_err(|e| {
                BackendError::Setup(format!(
                    "cannot read client_cert {}: {}",
                    cert_path.display(),
                    e
                ))
            })?;
            let key = std::fs::read(key_path).map_err(|e| {
                BackendError::Setup(format!(
                    "cannot read client_key {}: {}",
                    key_path.display(),
                    e
                ))
            })?;
            pem.extend_from_slice(&key);
            let identity = reqwest::Identity::from_pem(&pem)
                .map_err(|e| BackendError::Setup(format!("invalid client identity: {}", e)))?;
            builder = builder.identity(identity);
        }

        let client = builder
            .build()
            .map_err(|e| BackendError::Setup(e.to_string()))?;

        let auth = match config.credentials() {
            Credentials::Anonymous => Auth::None,
            Credentials::Basic { username, password } => Auth::Basic {
                username: username.to_string(),
                password: password.to_string(),
            },
            Credentials::ApiKey(key) => Auth::ApiKey(key.to_string()),
            Credentials::AwsIam { region, service } => Auth::SigV4 {
                region: region.to_string(),
                service: service.to_string(),
                creds: AwsCredentials::from_env()
                    .map_err(|e| BackendError::Setup(e.to_string()))?,
            },
        };

        Ok(Self { base, client, auth })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: BackendRequest) -> Result<Value, BackendError> {
        let mut url = self
            .base
            .join(request.path.trim_start_matches('/'))
            .map_err(|e| BackendError::Transport(format!("invalid request path: {}", e)))?;
        for (key, value) in &request.query {
            url.query_pairs_mut().append_pair(key, value);
        }

        let (body_bytes, content_type) = match (&request.body, &request.ndjson) {
            (Some(body), _) => (
                serde_json::to_vec(body).map_err(|e| BackendError::Transport(e.to_string()))?,
                Some("application/json"),
            ),
            (None, Some(ndjson)) => (ndjson.clone().into_bytes(), Some("application/x-ndjson")),
            (None, None) => (Vec::new(), None),
        };

        let mut builder = self.client.request(request.method.clone(), url.clone());
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(content_type) = content_type {
            builder = builder.header("Content-Type", content_type);
        }

        builder = match &self.auth {
            Auth::None => builder,
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
            Auth::ApiKey(key) => builder.header("Authorization", format!("ApiKey {}", key)),
            Auth::SigV4 {
                region,
                service,
                creds,
            } => {
                let headers = sign::sign_request(
                    creds,
                    request.method.as_str(),
                    &url,
                    &request.query,
                    &body_bytes,
                    region,
                    service,
                    chrono::Utc::now(),
                );
                let mut signed = builder;
                for (name, value) in headers {
                    // reqwest derives the Host header from the URL.
                    if name != "host" {
                        signed = signed.header(&name, value);
                    }
                }
                signed
            }
        };

        if !body_bytes.is_empty() {
            builder = builder.body(body_bytes);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        if !status.is_success() {
            let body = if text.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                text
            };
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

// ── Connection ───────────────────────────────────────────────────────────

/// Live handle to one backend cluster.
pub struct BackendConnection {
    config: ClusterConfig,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for BackendConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConnection")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BackendConnection {
    /// Build the production (HTTP) connection for a cluster.
    pub fn connect(config: ClusterConfig) -> Result<Self, BackendError> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self { config, transport })
    }

    /// Build a connection over an arbitrary transport (tests).
    pub fn with_transport(config: ClusterConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Bounded liveness probe: fetch the root info endpoint with the
    /// cluster's probe timeout. Best-effort — failures are reported as
    /// `false`, never as an error.
    pub async fn probe(&self) -> bool {
        let mut request = BackendRequest::new(Method::GET, "");
        request.timeout = Some(Duration::from_secs(self.config.probe_timeout_secs));
        match self.transport.send(request).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(cluster = %self.config.name, "liveness probe failed: {}", e);
                false
            }
        }
    }

    /// Close the underlying transport. HTTP connection pools have nothing
    /// to flush; dropping the handle releases pooled sockets.
    pub async fn close(&self) {
        tracing::debug!(cluster = %self.config.name, "closing backend connection");
    }

    /// Invoke the backend method for a parsed call.
    pub async fn call(&self, call: &OpCall) -> Result<Value, BackendError> {
        match call {
            OpCall::Search(args) => self.search(args).await,
            OpCall::Count(args) => self.count(args).await,
            OpCall::Aggregate(args) => self.aggregate(args).await,
            OpCall::DeleteByQuery(args) => self.delete_by_query(args).await,
            OpCall::GetDocument(args) => self.get_document(args).await,
            OpCall::IndexDocument(args) => self.index_document(args).await,
            OpCall::UpdateDocument(args) => self.update_document(args).await,
            OpCall::DeleteDocument(args) => self.delete_document(args).await,
            OpCall::Bulk(args) => self.bulk(args).await,
            OpCall::ListIndices(args) => self.list_indices(args).await,
            OpCall::GetIndex(args) => self.get_index(args).await,
            OpCall::CreateIndex(args) => self.create_index(args).await,
            OpCall::DeleteIndex(args) => self.delete_index(args).await,
            OpCall::GetMapping(args) => self.get_mapping(args).await,
            OpCall::PutMapping(args) => self.put_mapping(args).await,
            OpCall::GetIndexSettings(args) => self.get_index_settings(args).await,
            OpCall::PutIndexSettings(args) => self.put_index_settings(args).await,
            OpCall::ClusterInfo => self.cluster_info().await,
            OpCall::ClusterHealth => self.cluster_health().await,
            OpCall::ClusterStats => self.cluster_stats().await,
            OpCall::GetUsers => self.get_users().await,
            OpCall::PutUser(args) => self.put_user(args).await,
            OpCall::DeleteUser(args) => self.delete_user(args).await,
            OpCall::GetRoles => self.get_roles().await,
            OpCall::PutRole(args) => self.put_role(args).await,
            OpCall::DeleteRole(args) => self.delete_role(args).await,
            OpCall::GetRoleMappings => self.get_role_mappings().await,
            OpCall::PutRoleMapping(args) => self.put_role_mapping(args).await,
            OpCall::DeleteRoleMapping(args) => self.delete_role_mapping(args).await,
            OpCall::ListClusters => Err(BackendError::Transport(
                "list_clusters does not target a backend".to_string(),
            )),
        }
    }

    // ── Search ───────────────────────────────────────────────────────

    pub async fn search(&self, args: &SearchArgs) -> Result<Value, BackendError> {
        let index = self.config.effective_index(args.index.as_deref());
        let mut body = json!({});
        if let Some(query) = &args.query {
            body["query"] = query.clone();
        }
        if let Some(from) = args.from {
            body["from"] = json!(from);
        }
        if let Some(size) = args.size {
            body["size"] = json!(size);
        }
        if let Some(sort) = &args.sort {
            body["sort"] = sort.clone();
        }
        self.transport
            .send(BackendRequest::new(Method::POST, format!("{}/_search", index)).with_body(body))
            .await
    }

    pub async fn count(&self, args: &CountArgs) -> Result<Value, BackendError> {
        let index = self.config.effective_index(args.index.as_deref());
        let mut request = BackendRequest::new(Method::POST, format!("{}/_count", index));
        if let Some(query) = &args.query {
            request = request.with_body(json!({ "query": query }));
        }
        self.transport.send(request).await
    }

    pub async fn aggregate(&self, args: &AggregateArgs) -> Result<Value, BackendError> {
        let index = self.config.effective_index(args.index.as_deref());
        let mut body = json!({ "size": 0, "aggs": args.aggs });
        if let Some(query) = &args.query {
            body["query"] = query.clone();
        }
        self.transport
            .send(BackendRequest::new(Method::POST, format!("{}/_search", index)).with_body(body))
            .await
    }

    pub async fn delete_by_query(&self, args: &DeleteByQueryArgs) -> Result<Value, BackendError> {
        let index = self.config.qualify_index(&args.index);
        self.transport
            .send(
                BackendRequest::new(Method::POST, format!("{}/_delete_by_query", index))
                    .with_body(json!({ "query": args.query })),
            )
            .await
    }

    // ── Documents ────────────────────────────────────────────────────

    pub async fn get_document(&self, args: &DocumentPathArgs) -> Result<Value, BackendError> {
        let index = self.config.qualify_index(&args.index);
        self.transport
            .send(BackendRequest::new(
                Method::GET,
                format!("{}/_doc/{}", index, args.id),
            ))
            .await
    }

    pub async fn index_document(&self, args: &IndexDocumentArgs) -> Result<Value, BackendError> {
        let index = self.config.qualify_index(&args.index);
        let mut request = match &args.id {
            Some(id) => BackendRequest::new(Method::PUT, format!("{}/_doc/{}", index, id)),
            None => BackendRequest::new(Method::POST, format!("{}/_doc", index)),
        }
        .with_body(args.document.clone());
        if args.refresh == Some(true) {
            request.query.push(("refresh".to_string(), "true".to_string()));
        }
        self.transport.send(request).await
    }

    pub async fn update_document(&self, args: &UpdateDocumentArgs) -> Result<Value, BackendError> {
        let index = self.config.qualify_index(&args.index);
        self.transport
            .send(
                BackendRequest::new(Method::POST, format!("{}/_update/{}", index, args.id))
                    .with_body(json!({ "doc": args.doc })),
            )
            .await
    }

    pub async fn delete_document(&self, args: &DocumentPathArgs) -> Result<Value, BackendError> {
        let index = self.config.qualify_index(&args.index);
        self.transport
            .send(BackendRequest::new(
                Method::DELETE,
                format!("{}/_doc/{}", index, args.id),
            ))
            .await
    }

    pub async fn bulk(&self, args: &BulkArgs) -> Result<Value, BackendError> {
        let path = match &args.index {
            Some(index) => format!("{}/_bulk", self.config.qualify_index(index)),
            None => "_bulk".to_string(),
        };
        let mut ndjson = String::new();
        for line in &args.operations {
            let serialized =
                serde_json::to_string(line).map_err(|e| BackendError::Transport(e.to_string()))?;
            ndjson.push_str(&serialized);
            ndjson.push('\n');
        }
        let mut request = BackendRequest::new(Method::POST, path);
        request.ndjson = Some(ndjson);
        self.transport.send(request).await
    }

    // ── Index administration ─────────────────────────────────────────

    pub async fn list_indices(&self, args: &ListIndicesArgs) -> Result<Value, BackendError> {
        let path = match &args.pattern {
            Some(pattern) => format!("_cat/indices/{}", self.config.qualify_index(pattern)),
            None => "_cat/indices".to_string(),
        };
        let mut request = BackendRequest::new(Method::GET, path);
        request
            .query
            .push(("format".to_string(), "json".to_string()));
        self.transport.send(request).await
    }

    pub async fn get_index(&self, args: &IndexArgs) -> Result<Value, BackendError> {
        let index = self.config.qualify_index(&args.index);
        self.transport
            .send(BackendRequest::new(Method::GET, index))
            .await
    }

    pub async fn create_index(&self, args: &CreateIndexArgs) -> Result<Value, BackendError> {
        let index = self.config.qualify_index(&args.index);
        let mut body = json!({});
        if let Some(settings) = &args.settings {
            body["settings"] = settings.clone();
        }
        if let Some(mappings) = &args.mappings {
            body["mappings"] = mappings.clone();
        }
        self.transport
            .send(BackendRequest::new(Method::PUT, index).with_body(body))
            .await
    }

    pub async fn delete_index(&self, args: &IndexArgs) -> Result<Value, BackendError> {
        let index = self.config.qualify_index(&args.index);
        self.transport
            .send(BackendRequest::new(Method::DELETE, index))
            .await
    }

    pub async fn get_mapping(&self, args: &IndexArgs) -> Result<Value, BackendError> {
        let index = self.config.qualify_index(&args.index);
        self.transport
            .send(BackendRequest::new(
                Method::GET,
                format!("{}/_mapping", index),
            ))
            .await
    }

    pub async fn put_mapping(&self, args: &PutMappingArgs) -> Result<Value, BackendError> {
        let index = self.config.qualify_index(&args.index);
        self.transport
            .send(
                BackendRequest::new(Method::PUT, format!("{}/_mapping", index))
                    .with_body(args.mappings.clone()),
            )
            .await
    }

    pub async fn get_index_settings(&self, args: &IndexArgs) -> Result<Value, BackendError> {
        let index = self.config.qualify_index(&args.index);
        self.transport
            .send(BackendRequest::new(
                Method::GET,
                format!("{}/_settings", index),
            ))
            .await
    }

    pub async fn put_index_settings(
        &self,
        args: &PutIndexSettingsArgs,
    ) -> Result<Value, BackendError> {
        let index = self.config.qualify_index(&args.index);
        self.transport
            .send(
                BackendRequest::new(Method::PUT, format!("{}/_settings", index))
                    .with_body(args.settings.clone()),
            )
            .await
    }

    // ── Cluster administration ───────────────────────────────────────

    pub async fn cluster_info(&self) -> Result<Value, BackendError> {
        self.transport
            .send(BackendRequest::new(Method::GET, ""))
            .await
    }

    pub async fn cluster_health(&self) -> Result<Value, BackendError> {
        self.transport
            .send(BackendRequest::new(Method::GET, "_cluster/health"))
            .await
    }

    pub async fn cluster_stats(&self) -> Result<Value, BackendError> {
        self.transport
            .send(BackendRequest::new(Method::GET, "_cluster/stats"))
            .await
    }

    // ── Security administration ──────────────────────────────────────

    pub async fn get_users(&self) -> Result<Value, BackendError> {
        self.security_get("internalusers").await
    }

    pub async fn put_user(&self, args: &NamedDefinitionArgs) -> Result<Value, BackendError> {
        self.security_put("internalusers", args).await
    }

    pub async fn delete_user(&self, args: &NameArgs) -> Result<Value, BackendError> {
        self.security_delete("internalusers", args).await
    }

    pub async fn get_roles(&self) -> Result<Value, BackendError> {
        self.security_get("roles").await
    }

    pub async fn put_role(&self, args: &NamedDefinitionArgs) -> Result<Value, BackendError> {
        self.security_put("roles", args).await
    }

    pub async fn delete_role(&self, args: &NameArgs) -> Result<Value, BackendError> {
        self.security_delete("roles", args).await
    }

    pub async fn get_role_mappings(&self) -> Result<Value, BackendError> {
        self.security_get("rolesmapping").await
    }

    pub async fn put_role_mapping(
        &self,
        args: &NamedDefinitionArgs,
    ) -> Result<Value, BackendError> {
        self.security_put("rolesmapping", args).await
    }

    pub async fn delete_role_mapping(&self, args: &NameArgs) -> Result<Value, BackendError> {
        self.security_delete("rolesmapping", args).await
    }

    async fn security_get(&self, resource: &str) -> Result<Value, BackendError> {
        self.transport
            .send(BackendRequest::new(
                Method::GET,
                format!("{}/{}", SECURITY_API, resource),
            ))
            .await
    }

    async fn security_put(
        &self,
        resource: &str,
        args: &NamedDefinitionArgs,
    ) -> Result<Value, BackendError> {
        self.transport
            .send(
                BackendRequest::new(
                    Method::PUT,
                    format!("{}/{}/{}", SECURITY_API, resource, args.name),
                )
                .with_body(args.definition.clone()),
            )
            .await
    }

    async fn security_delete(
        &self,
        resource: &str,
        args: &NameArgs,
    ) -> Result<Value, BackendError> {
        self.transport
            .send(BackendRequest::new(
                Method::DELETE,
                format!("{}/{}/{}", SECURITY_API, resource, args.name),
            ))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingTransport {
        seen: Mutex<Vec<BackendRequest>>,
        reply: Value,
    }

    impl RecordingTransport {
        fn new(reply: Value) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                reply,
            })
        }

        fn last(&self) -> BackendRequest {
            self.seen.lock().unwrap().last().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, request: BackendRequest) -> Result<Value, BackendError> {
            self.seen.lock().unwrap().push(request);
            Ok(self.reply.clone())
        }
    }

    fn test_config(prefix: Option<&str>, default_index: Option<&str>) -> ClusterConfig {
        let mut config: ClusterConfig =
            serde_json::from_value(json!({ "url": "http://localhost:9200" })).unwrap();
        config.name = "test".to_string();
        config.index_prefix = prefix.map(|s| s.to_string());
        config.default_index = default_index.map(|s| s.to_string());
        config
    }

    #[tokio::test]
    async fn test_search_uses_default_index_and_prefix() {
        let transport = RecordingTransport::new(json!({ "hits": {} }));
        let conn = BackendConnection::with_transport(
            test_config(Some("team-"), Some("events")),
            transport.clone(),
        );

        let args: SearchArgs = serde_json::from_value(json!({ "size": 5 })).unwrap();
        conn.search(&args).await.unwrap();
        let request = transport.last();
        assert_eq!(request.path, "team-events/_search");
        assert_eq!(request.body.as_ref().unwrap()["size"], 5);
    }

    #[tokio::test]
    async fn test_aggregate_sends_size_zero() {
        let transport = RecordingTransport::new(json!({}));
        let conn = BackendConnection::with_transport(test_config(None, None), transport.clone());

        let args: AggregateArgs = serde_json::from_value(json!({
            "index": "logs",
            "aggs": { "hosts": { "terms": { "field": "host" } } }
        }))
        .unwrap();
        conn.aggregate(&args).await.unwrap();
        let request = transport.last();
        assert_eq!(request.path, "logs/_search");
        assert_eq!(request.body.as_ref().unwrap()["size"], 0);
        assert!(request.body.as_ref().unwrap()["aggs"]["hosts"].is_object());
    }

    #[tokio::test]
    async fn test_bulk_builds_ndjson() {
        let transport = RecordingTransport::new(json!({ "errors": false }));
        let conn = BackendConnection::with_transport(test_config(None, None), transport.clone());

        let args: BulkArgs = serde_json::from_value(json!({
            "index": "logs",
            "operations": [ { "index": { "_id": "1" } }, { "msg": "hi" } ]
        }))
        .unwrap();
        conn.bulk(&args).await.unwrap();
        let request = transport.last();
        assert_eq!(request.path, "logs/_bulk");
        assert_eq!(
            request.ndjson.as_deref(),
            Some("{\"index\":{\"_id\":\"1\"}}\n{\"msg\":\"hi\"}\n")
        );
    }

    #[tokio::test]
    async fn test_index_document_refresh_and_autogen_id() {
        let transport = RecordingTransport::new(json!({}));
        let conn = BackendConnection::with_transport(test_config(None, None), transport.clone());

        let args: IndexDocumentArgs = serde_json::from_value(json!({
            "index": "logs",
            "document": { "msg": "hi" },
            "refresh": true
        }))
        .unwrap();
        conn.index_document(&args).await.unwrap();
        let request = transport.last();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "logs/_doc");
        assert!(request
            .query
            .contains(&("refresh".to_string(), "true".to_string())));

        let args: IndexDocumentArgs = serde_json::from_value(json!({
            "index": "logs",
            "id": "42",
            "document": { "msg": "hi" }
        }))
        .unwrap();
        conn.index_document(&args).await.unwrap();
        let request = transport.last();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.path, "logs/_doc/42");
    }

    #[tokio::test]
    async fn test_security_paths() {
        let transport = RecordingTransport::new(json!({}));
        let conn = BackendConnection::with_transport(test_config(None, None), transport.clone());

        conn.get_users().await.unwrap();
        assert_eq!(
            transport.last().path,
            "_plugins/_security/api/internalusers"
        );

        let args: NamedDefinitionArgs =
            serde_json::from_value(json!({ "name": "reader", "definition": {} })).unwrap();
        conn.put_role(&args).await.unwrap();
        let request = transport.last();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.path, "_plugins/_security/api/roles/reader");
    }

    #[tokio::test]
    async fn test_probe_uses_probe_timeout() {
        let transport = RecordingTransport::new(json!({ "version": {} }));
        let mut config = test_config(None, None);
        config.probe_timeout_secs = 7;
        let conn = BackendConnection::with_transport(config, transport.clone());

        assert!(conn.probe().await);
        let request = transport.last();
        assert_eq!(request.path, "");
        assert_eq!(request.timeout, Some(Duration::from_secs(7)));
    }
}
