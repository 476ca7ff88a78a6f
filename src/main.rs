//! # OpenSearch MCP CLI (`osmcp`)
//!
//! The `osmcp` binary starts the MCP server and provides introspection
//! commands for the resolved cluster configuration and the operation
//! catalog.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `osmcp serve` | Resolve clusters, build the registry, start the HTTP/MCP server |
//! | `osmcp clusters` | Resolve clusters, probe each, and print the registry |
//! | `osmcp tools` | List the operation catalog |
//!
//! Cluster connections are configured through `OSMCP_*` environment
//! variables (see [`opensearch_mcp::resolver`]); server settings come
//! from an optional TOML file passed with `--config`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use opensearch_mcp::dispatch::Dispatcher;
use opensearch_mcp::resolver::{self, EnvSnapshot};
use opensearch_mcp::{catalog, config, server};

/// OpenSearch MCP — expose OpenSearch/Elasticsearch clusters to AI
/// agents as schema-validated operations.
#[derive(Parser)]
#[command(
    name = "osmcp",
    about = "MCP server exposing OpenSearch/Elasticsearch clusters as agent tools",
    version
)]
struct Cli {
    /// Path to the server settings file (TOML). Cluster connections are
    /// configured through OSMCP_* environment variables.
    #[arg(long, global = true, default_value = "./config/osmcp.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP/MCP server.
    ///
    /// The cluster registry is built eagerly so that configuration and
    /// connectivity problems abort startup instead of surfacing on the
    /// first agent call.
    Serve,

    /// Resolve the cluster configuration, probe each cluster, and print
    /// the resulting registry.
    Clusters,

    /// List the operation catalog.
    Tools,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => serve(&cli.config).await,
        Commands::Clusters => clusters().await,
        Commands::Tools => {
            tools();
            Ok(())
        }
    }
}

async fn serve(config_path: &std::path::Path) -> Result<()> {
    let config = config::load_config(config_path)?;
    let canonical = resolver::resolve(&EnvSnapshot::from_env());
    let dispatcher = Arc::new(Dispatcher::new(canonical));

    // Fail fast: ConfigInvalid and NoClustersAvailable abort startup.
    dispatcher
        .registry()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    server::run_server(&config, dispatcher, async {
        tokio::signal::ctrl_c().await.ok();
        println!("shutting down");
    })
    .await
}

async fn clusters() -> Result<()> {
    let canonical = resolver::resolve(&EnvSnapshot::from_env());
    if canonical.is_empty() {
        println!("No clusters configured.");
        println!("Set OSMCP_URL, or OSMCP_CLUSTERS for a multi-cluster declaration.");
        return Ok(());
    }

    let dispatcher = Dispatcher::new(canonical);
    let registry = dispatcher
        .registry()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    println!("{:<20} {:<10}", "CLUSTER", "DEFAULT");
    for name in registry.list_names() {
        let is_default = match registry.default_name() {
            Some(default) => default == name,
            None => false,
        };
        println!("{:<20} {:<10}", name, if is_default { "*" } else { "" });
    }

    dispatcher.shutdown().await;
    Ok(())
}

fn tools() {
    println!("{:<22} {}", "OPERATION", "DESCRIPTION");
    for op in catalog::all() {
        println!("{:<22} {}", op.name, op.description);
    }
}
