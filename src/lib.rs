//! # OpenSearch MCP
//!
//! An MCP server that exposes one or more OpenSearch/Elasticsearch
//! clusters to AI agents as a catalog of named, schema-validated
//! operations: search, document CRUD, index administration, cluster
//! health, and security administration.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌──────────────────┐
//! │ Environment  │──▶│ ConfigResolver │──▶│ ClusterRegistry   │
//! │ OSMCP_*      │   │ (precedence)   │   │ (probe + select)  │
//! └──────────────┘   └───────────────┘   └────────┬─────────┘
//!                                                 │
//!            ┌────────────┐   ┌────────────┐      ▼
//!   agent ──▶│ HTTP / MCP │──▶│ Dispatcher  │──▶ BackendConnection ──▶ cluster
//!            └────────────┘   └────────────┘      (reqwest)
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export OSMCP_URL=https://localhost:9200
//! export OSMCP_USERNAME=admin OSMCP_PASSWORD=admin
//! osmcp clusters                # resolve config and probe each cluster
//! osmcp serve                   # start the HTTP/MCP server
//! ```
//!
//! Multiple clusters are declared in one JSON value:
//!
//! ```bash
//! export OSMCP_CLUSTERS='{"east":{"url":"https://east:9200"},"west":{"url":"https://west:9200"}}'
//! export OSMCP_DEFAULT_CLUSTER=east
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`resolver`] | Layered environment configuration → canonical cluster map |
//! | [`cluster`] | Per-cluster connection configuration |
//! | [`registry`] | One-time registry build, liveness probes, name resolution |
//! | [`catalog`] | Static operation catalog and typed argument parsing |
//! | [`dispatch`] | Validation, cluster selection, envelope wrapping |
//! | [`backend`] | Backend connections over HTTP (reqwest) |
//! | [`sign`] | AWS SigV4 signing for IAM-authenticated clusters |
//! | [`server`] | Axum HTTP surface and MCP mount point |
//! | [`mcp`] | MCP JSON-RPC bridge |
//! | [`config`] | Server settings file (TOML) |

pub mod backend;
pub mod catalog;
pub mod cluster;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod mcp;
pub mod registry;
pub mod resolver;
pub mod server;
pub mod sign;
