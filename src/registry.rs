//! The cluster registry.
//!
//! Owns the mapping from cluster name to live [`BackendConnection`],
//! built exactly once per process from the resolved canonical config.
//! Construction iterates entries in declaration order and probes each
//! backend once with a bounded timeout; an unreachable cluster is skipped
//! with a warning rather than aborting the build — one unreachable region
//! must not prevent using the others. The build fails only when nothing
//! survives.
//!
//! After construction the registry is immutable: `resolve` and
//! `list_names` are plain reads, safe for any number of concurrent
//! in-flight operation handlers.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::backend::{BackendConnection, BackendError};
use crate::cluster::ClusterConfig;
use crate::error::DispatchError;
use crate::resolver::CanonicalConfig;

/// Builds one [`BackendConnection`] from a cluster config. Production
/// uses [`BackendConnection::connect`]; tests inject fakes.
pub type Connector =
    dyn Fn(ClusterConfig) -> Result<BackendConnection, BackendError> + Send + Sync;

#[derive(Debug)]
pub struct ClusterRegistry {
    /// Surviving connections, in declaration order.
    entries: Vec<Arc<BackendConnection>>,
    /// Configured default, kept only when it survived the probe pass.
    default_name: Option<String>,
}

impl ClusterRegistry {
    /// Build the registry over the production HTTP connector.
    pub async fn build(config: CanonicalConfig) -> Result<Self, DispatchError> {
        Self::build_with(config, &BackendConnection::connect).await
    }

    /// Build the registry with an explicit connector.
    pub async fn build_with(
        config: CanonicalConfig,
        connect: &Connector,
    ) -> Result<Self, DispatchError> {
        if config.is_empty() {
            return Err(DispatchError::ConfigInvalid(
                "no valid cluster definitions were resolved from the environment".to_string(),
            ));
        }

        let configured = config.clusters.len();
        let mut entries: Vec<Arc<BackendConnection>> = Vec::new();

        for cluster in config.clusters {
            let name = cluster.name.clone();
            let connection = match connect(cluster) {
                Ok(connection) => connection,
                Err(e) => {
                    warn!(cluster = %name, "skipping cluster, connection setup failed: {}", e);
                    continue;
                }
            };
            if !connection.probe().await {
                warn!(cluster = %name, "skipping cluster, liveness probe failed");
                continue;
            }
            entries.push(Arc::new(connection));
        }

        if entries.is_empty() {
            return Err(DispatchError::NoClustersAvailable);
        }

        let default_name = match config.default_cluster {
            Some(default) if entries.iter().any(|c| c.name() == default) => Some(default),
            Some(default) => {
                warn!(
                    "default cluster '{}' is not among the live clusters; \
                     falling back to first available",
                    default
                );
                None
            }
            None => None,
        };

        info!(
            "cluster registry ready: {}/{} clusters live: [{}]",
            entries.len(),
            configured,
            entries
                .iter()
                .map(|c| c.name())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self {
            entries,
            default_name,
        })
    }

    /// Resolve a cluster selector to a connection.
    ///
    /// No selector returns the configured default when it is live, else
    /// the first surviving cluster in declaration order. A selector that
    /// names an unregistered cluster fails with the list of live names.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<BackendConnection>, DispatchError> {
        match name {
            Some(name) => self
                .entries
                .iter()
                .find(|c| c.name() == name)
                .cloned()
                .ok_or_else(|| DispatchError::ClusterNotFound {
                    name: name.to_string(),
                    available: self.list_names(),
                }),
            None => {
                if let Some(default) = &self.default_name {
                    if let Some(connection) = self.entries.iter().find(|c| c.name() == *default) {
                        return Ok(connection.clone());
                    }
                }
                self.entries
                    .first()
                    .cloned()
                    .ok_or(DispatchError::NoClustersAvailable)
            }
        }
    }

    /// Live cluster names, in declaration order.
    pub fn list_names(&self) -> Vec<String> {
        self.entries.iter().map(|c| c.name().to_string()).collect()
    }

    /// The resolved default cluster name, if one survived.
    pub fn default_name(&self) -> Option<&str> {
        self.default_name.as_deref()
    }

    /// Close every connection. Individual close failures are logged by
    /// the connection itself; shutdown always completes.
    pub async fn shutdown(&self) {
        for connection in &self.entries {
            connection.close().await;
        }
        info!("closed {} backend connections", self.entries.len());
    }
}

/// Lazy, single-flight accessor for the process-wide registry.
///
/// The registry is built on first use; concurrent first callers are
/// serialized so exactly one build runs and every caller observes the
/// same instance. A failed build is not cached — the next call retries,
/// so a transient outage at first dispatch does not wedge the process.
pub struct RegistryCell {
    config: CanonicalConfig,
    connect: Box<Connector>,
    cell: OnceCell<ClusterRegistry>,
}

impl RegistryCell {
    pub fn new(config: CanonicalConfig) -> Self {
        Self {
            config,
            connect: Box::new(BackendConnection::connect),
            cell: OnceCell::new(),
        }
    }

    pub fn with_connector(
        config: CanonicalConfig,
        connect: impl Fn(ClusterConfig) -> Result<BackendConnection, BackendError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            config,
            connect: Box::new(connect),
            cell: OnceCell::new(),
        }
    }

    /// The registry, building it on first call.
    pub async fn get(&self) -> Result<&ClusterRegistry, DispatchError> {
        self.cell
            .get_or_try_init(|| ClusterRegistry::build_with(self.config.clone(), &*self.connect))
            .await
    }

    /// The registry, only if a build already completed.
    pub fn get_if_built(&self) -> Option<&ClusterRegistry> {
        self.cell.get()
    }
}
