//! Per-cluster connection configuration.
//!
//! A [`ClusterConfig`] is the validated description of one backend cluster:
//! endpoints, credentials, TLS policy, timeouts, and the index naming
//! policy applied to every index argument. Instances are constructed once
//! by the config resolver and are immutable afterwards.

use anyhow::{bail, Result};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// Fixed cluster name used by the legacy single-cluster shorthand
/// (connection fields present without an explicit name).
pub const LEGACY_CLUSTER_NAME: &str = "default";

/// Connection description for one backend cluster.
///
/// The serde shape matches both the per-entry values of the bulk
/// `OSMCP_CLUSTERS` JSON declaration and the flat `OSMCP_*` environment
/// shorthands. `name` is never part of the serialized form — it is the
/// map key (bulk) or a separate variable (shorthands) and is filled in
/// by the resolver.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    #[serde(skip)]
    pub name: String,

    /// One or more endpoint URLs; the first is the primary endpoint.
    #[serde(deserialize_with = "one_or_many")]
    pub url: Vec<String>,

    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub aws_region: Option<String>,
    #[serde(default)]
    pub aws_service: Option<String>,

    /// Verify the backend's TLS certificate (default true).
    #[serde(default = "default_true")]
    pub tls_verify: bool,
    #[serde(default)]
    pub ca_cert: Option<PathBuf>,
    #[serde(default)]
    pub client_cert: Option<PathBuf>,
    #[serde(default)]
    pub client_key: Option<PathBuf>,

    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
    /// Carried for the backend client's own retry policy; the dispatch
    /// layer itself never retries.
    #[serde(default)]
    pub retries: u32,

    /// Prefix prepended to every index argument.
    #[serde(default)]
    pub index_prefix: Option<String>,
    /// Index used when an operation omits its `index` argument.
    #[serde(default)]
    pub default_index: Option<String>,
}

fn default_true() -> bool {
    true
}
fn default_request_timeout() -> u64 {
    30
}
fn default_probe_timeout() -> u64 {
    3
}

/// Credential form derived from the configured fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials<'a> {
    Anonymous,
    Basic {
        username: &'a str,
        password: &'a str,
    },
    ApiKey(&'a str),
    AwsIam {
        region: &'a str,
        service: &'a str,
    },
}

impl ClusterConfig {
    /// Primary endpoint URL.
    pub fn primary_url(&self) -> &str {
        &self.url[0]
    }

    /// The credential form for this cluster.
    ///
    /// When several forms are configured, cloud-IAM wins over an API key,
    /// which wins over basic credentials.
    pub fn credentials(&self) -> Credentials<'_> {
        if let Some(region) = self.aws_region.as_deref() {
            return Credentials::AwsIam {
                region,
                service: self.aws_service.as_deref().unwrap_or("es"),
            };
        }
        if let Some(key) = self.api_key.as_deref() {
            return Credentials::ApiKey(key);
        }
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) => Credentials::Basic { username, password },
            _ => Credentials::Anonymous,
        }
    }

    /// Apply the index prefix to an index name.
    pub fn qualify_index(&self, index: &str) -> String {
        match &self.index_prefix {
            Some(prefix) => format!("{}{}", prefix, index),
            None => index.to_string(),
        }
    }

    /// Resolve the index argument for operations where it is optional:
    /// the given index, the configured default, or `_all`.
    pub fn effective_index(&self, index: Option<&str>) -> String {
        match index {
            Some(index) => self.qualify_index(index),
            None => match &self.default_index {
                Some(default) => self.qualify_index(default),
                None => "_all".to_string(),
            },
        }
    }

    /// Check the invariants from the data model: non-empty name, at least
    /// one syntactically valid http(s) endpoint, credential fields that
    /// form a complete pair, and TLS material that forms a complete pair.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("cluster name must not be empty");
        }
        if self.url.is_empty() {
            bail!("at least one endpoint URL is required");
        }
        for raw in &self.url {
            let parsed = reqwest::Url::parse(raw)
                .map_err(|e| anyhow::anyhow!("invalid endpoint URL '{}': {}", raw, e))?;
            match parsed.scheme() {
                "http" | "https" => {}
                other => bail!("endpoint URL '{}' has unsupported scheme '{}'", raw, other),
            }
            if parsed.host_str().is_none() {
                bail!("endpoint URL '{}' has no host", raw);
            }
        }
        if self.username.is_some() != self.password.is_some() {
            bail!("username and password must be set together");
        }
        if self.client_cert.is_some() != self.client_key.is_some() {
            bail!("client_cert and client_key must be set together");
        }
        Ok(())
    }
}

/// Accept either a single URL string or a list of URLs.
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(url) => vec![url],
        OneOrMany::Many(urls) => urls,
    })
}
