//! Operation dispatch.
//!
//! The single chokepoint every call goes through: catalog lookup,
//! shallow argument validation, cluster resolution, backend invocation,
//! and envelope wrapping. Centralizing these here means all ~30
//! operations share identical selection and failure semantics — no
//! operation carries its own cluster-lookup or error-wrapping logic.
//!
//! Dispatch order matters: an unknown operation or a bad argument shape
//! is rejected before the registry is touched (and therefore before the
//! lazy registry build is ever triggered), and no backend is contacted.
//! Backend failures are forwarded verbatim, with no retries at this
//! layer.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::backend::{BackendConnection, BackendError};
use crate::catalog::{self, OpCall};
use crate::cluster::ClusterConfig;
use crate::error::{DispatchError, Envelope};
use crate::registry::{ClusterRegistry, RegistryCell};
use crate::resolver::CanonicalConfig;

pub struct Dispatcher {
    registry: RegistryCell,
}

impl Dispatcher {
    /// Dispatcher over the production HTTP connector.
    pub fn new(config: CanonicalConfig) -> Self {
        Self {
            registry: RegistryCell::new(config),
        }
    }

    /// Dispatcher with an injected connector (tests).
    pub fn with_connector(
        config: CanonicalConfig,
        connect: impl Fn(ClusterConfig) -> Result<BackendConnection, BackendError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            registry: RegistryCell::with_connector(config, connect),
        }
    }

    /// Dispatch one operation call, producing the response envelope.
    pub async fn dispatch(&self, operation: &str, arguments: Value) -> Envelope {
        match self.try_dispatch(operation, arguments).await {
            Ok(result) => Envelope::ok(result),
            Err(e) => {
                debug!(operation, code = ?e.code(), "dispatch failed: {}", e);
                Envelope::error(&e)
            }
        }
    }

    async fn try_dispatch(
        &self,
        operation: &str,
        arguments: Value,
    ) -> Result<Value, DispatchError> {
        let spec = catalog::find(operation)
            .ok_or_else(|| DispatchError::UnknownOperation(operation.to_string()))?;

        let validated = catalog::validate_args(&catalog::schema_for(spec), &arguments)
            .map_err(DispatchError::InvalidArguments)?;

        // Peel off the cluster selector before typed parsing; it routes
        // the call but is not part of any operation's argument shape.
        let mut args_obj: Map<String, Value> = match validated {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let selector = if spec.cluster_scoped {
            args_obj
                .remove("cluster")
                .and_then(|v| v.as_str().map(|s| s.to_string()))
        } else {
            None
        };

        let call = OpCall::parse(operation, Value::Object(args_obj))
            .map_err(DispatchError::InvalidArguments)?;

        match call {
            OpCall::ListClusters => {
                let registry = self.registry().await?;
                Ok(json!({
                    "clusters": registry.list_names(),
                    "default": registry.default_name(),
                }))
            }
            call => {
                let registry = self.registry().await?;
                let connection = registry.resolve(selector.as_deref())?;
                debug!(operation, cluster = connection.name(), "dispatching to backend");
                connection
                    .call(&call)
                    .await
                    .map_err(|e| DispatchError::BackendFailure(e.to_string()))
            }
        }
    }

    /// The registry, building it on first use. Exposed for the server's
    /// introspection endpoint and for eager startup builds.
    pub async fn registry(&self) -> Result<&ClusterRegistry, DispatchError> {
        self.registry.get().await
    }

    /// Close every backend connection if the registry was ever built.
    pub async fn shutdown(&self) {
        if let Some(registry) = self.registry.get_if_built() {
            registry.shutdown().await;
        }
    }
}
