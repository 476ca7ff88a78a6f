//! Layered cluster-configuration resolution.
//!
//! Turns an environment snapshot into the canonical named-cluster map.
//! Resolution is an ordered list of pure parse-attempt rules — each either
//! yields cluster definitions or signals "did not apply" — and the first
//! rule that yields definitions wins; later rules are never merged in.
//!
//! | Precedence | Source | Result |
//! |---|---|---|
//! | 1 | `OSMCP_CLUSTER_NAME` + `OSMCP_URL` | one entry keyed by that name |
//! | 2 | `OSMCP_CLUSTERS` (JSON map) | one entry per key |
//! | 3 | `OSMCP_URL` alone | one entry keyed by `default` |
//! | 4 | nothing | empty map (fatal later, at registry build) |
//!
//! A malformed bulk declaration is logged and treated as absent (falls
//! through to rule 3). Individual entries failing validation are dropped
//! with a warning; only a fully empty result is fatal, and only once the
//! registry is built.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::cluster::{ClusterConfig, LEGACY_CLUSTER_NAME};

pub const KEY_CLUSTER_NAME: &str = "OSMCP_CLUSTER_NAME";
pub const KEY_URL: &str = "OSMCP_URL";
pub const KEY_USERNAME: &str = "OSMCP_USERNAME";
pub const KEY_PASSWORD: &str = "OSMCP_PASSWORD";
pub const KEY_API_KEY: &str = "OSMCP_API_KEY";
pub const KEY_AWS_REGION: &str = "OSMCP_AWS_REGION";
pub const KEY_AWS_SERVICE: &str = "OSMCP_AWS_SERVICE";
pub const KEY_TLS_VERIFY: &str = "OSMCP_TLS_VERIFY";
pub const KEY_CA_CERT: &str = "OSMCP_CA_CERT";
pub const KEY_CLIENT_CERT: &str = "OSMCP_CLIENT_CERT";
pub const KEY_CLIENT_KEY: &str = "OSMCP_CLIENT_KEY";
pub const KEY_TIMEOUT_SECS: &str = "OSMCP_TIMEOUT_SECS";
pub const KEY_PROBE_TIMEOUT_SECS: &str = "OSMCP_PROBE_TIMEOUT_SECS";
pub const KEY_RETRIES: &str = "OSMCP_RETRIES";
pub const KEY_INDEX_PREFIX: &str = "OSMCP_INDEX_PREFIX";
pub const KEY_DEFAULT_INDEX: &str = "OSMCP_DEFAULT_INDEX";
pub const KEY_CLUSTERS: &str = "OSMCP_CLUSTERS";
pub const KEY_DEFAULT_CLUSTER: &str = "OSMCP_DEFAULT_CLUSTER";

/// Immutable snapshot of the environment variables consulted during
/// resolution. Taking a snapshot keeps [`resolve`] a pure function of its
/// input, which is what makes each precedence rule independently testable.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Snapshot the process environment.
    pub fn from_env() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build a snapshot from explicit key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Fetch a variable, treating whitespace-only values as unset.
    fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// The fully resolved, name-keyed cluster map (declaration order preserved)
/// plus the preferred cluster for requests that omit a selector.
#[derive(Debug, Clone, Default)]
pub struct CanonicalConfig {
    pub clusters: Vec<ClusterConfig>,
    pub default_cluster: Option<String>,
}

impl CanonicalConfig {
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Cluster names in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.clusters.iter().map(|c| c.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ClusterConfig> {
        self.clusters.iter().find(|c| c.name == name)
    }
}

/// Resolve the environment snapshot into the canonical cluster map.
///
/// Deterministic and free of I/O beyond the snapshot it is given. An empty
/// result is not an error here — the registry build surfaces it as
/// `ConfigInvalid` so that `resolve` stays total.
pub fn resolve(env: &EnvSnapshot) -> CanonicalConfig {
    let candidates = named_shorthand(env)
        .or_else(|| bulk_declaration(env))
        .or_else(|| legacy_shorthand(env))
        .unwrap_or_default();

    let mut clusters: Vec<ClusterConfig> = Vec::new();
    for candidate in candidates {
        if let Err(e) = candidate.validate() {
            warn!(cluster = %candidate.name, "dropping invalid cluster entry: {}", e);
            continue;
        }
        if clusters.iter().any(|c| c.name == candidate.name) {
            warn!(cluster = %candidate.name, "dropping duplicate cluster entry");
            continue;
        }
        clusters.push(candidate);
    }

    CanonicalConfig {
        clusters,
        default_cluster: env.get(KEY_DEFAULT_CLUSTER).map(|s| s.to_string()),
    }
}

/// Rule 1: an explicit cluster name together with connection fields.
fn named_shorthand(env: &EnvSnapshot) -> Option<Vec<ClusterConfig>> {
    let name = env.get(KEY_CLUSTER_NAME)?;
    let value = shorthand_value(env)?;
    Some(parse_entry(name, value).into_iter().collect())
}

/// Rule 2: a serialized JSON map of name → cluster definition.
fn bulk_declaration(env: &EnvSnapshot) -> Option<Vec<ClusterConfig>> {
    let raw = env.get(KEY_CLUSTERS)?;

    let parsed: Value = match serde_json::from_str(raw) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("ignoring malformed {} declaration: {}", KEY_CLUSTERS, e);
            return None;
        }
    };
    let map = match parsed {
        Value::Object(map) if !map.is_empty() => map,
        Value::Object(_) => return None,
        _ => {
            warn!(
                "ignoring {} declaration: expected a JSON object of name → cluster",
                KEY_CLUSTERS
            );
            return None;
        }
    };

    // The declaration yielded definitions, so this rule applies even if
    // every individual entry turns out to be unparseable.
    let mut entries = Vec::new();
    for (name, value) in map {
        entries.extend(parse_entry(&name, value));
    }
    Some(entries)
}

/// Rule 3: connection fields with no name, keyed by the fixed default.
fn legacy_shorthand(env: &EnvSnapshot) -> Option<Vec<ClusterConfig>> {
    let value = shorthand_value(env)?;
    Some(parse_entry(LEGACY_CLUSTER_NAME, value).into_iter().collect())
}

/// Deserialize one candidate entry, logging and dropping it on mismatch.
fn parse_entry(name: &str, value: Value) -> Option<ClusterConfig> {
    match serde_json::from_value::<ClusterConfig>(value) {
        Ok(mut config) => {
            config.name = name.to_string();
            Some(config)
        }
        Err(e) => {
            warn!(cluster = %name, "dropping unparseable cluster entry: {}", e);
            None
        }
    }
}

/// Collect the flat `OSMCP_*` connection fields into the serde shape shared
/// with bulk entries. Returns `None` when no endpoint is configured — the
/// shorthand rules do not apply without one.
fn shorthand_value(env: &EnvSnapshot) -> Option<Value> {
    let url = env.get(KEY_URL)?;
    let urls: Vec<&str> = url
        .split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .collect();

    let mut obj = Map::new();
    obj.insert("url".to_string(), json!(urls));

    let string_fields = [
        (KEY_USERNAME, "username"),
        (KEY_PASSWORD, "password"),
        (KEY_API_KEY, "api_key"),
        (KEY_AWS_REGION, "aws_region"),
        (KEY_AWS_SERVICE, "aws_service"),
        (KEY_CA_CERT, "ca_cert"),
        (KEY_CLIENT_CERT, "client_cert"),
        (KEY_CLIENT_KEY, "client_key"),
        (KEY_INDEX_PREFIX, "index_prefix"),
        (KEY_DEFAULT_INDEX, "default_index"),
    ];
    for (key, field) in string_fields {
        if let Some(value) = env.get(key) {
            obj.insert(field.to_string(), json!(value));
        }
    }

    if let Some(value) = env.get(KEY_TLS_VERIFY) {
        match value.parse::<bool>() {
            Ok(flag) => {
                obj.insert("tls_verify".to_string(), json!(flag));
            }
            Err(_) => {
                obj.insert("tls_verify".to_string(), json!(value));
            }
        }
    }
    let numeric_fields = [
        (KEY_TIMEOUT_SECS, "timeout_secs"),
        (KEY_PROBE_TIMEOUT_SECS, "probe_timeout_secs"),
        (KEY_RETRIES, "retries"),
    ];
    for (key, field) in numeric_fields {
        if let Some(value) = env.get(key) {
            match value.parse::<u64>() {
                Ok(n) => {
                    obj.insert(field.to_string(), json!(n));
                }
                // Leave the raw string in place so the entry fails
                // deserialization and is dropped with a warning.
                Err(_) => {
                    obj.insert(field.to_string(), json!(value));
                }
            }
        }
    }

    Some(Value::Object(obj))
}
