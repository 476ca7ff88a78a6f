//! Error taxonomy and the response envelope.
//!
//! Every failure that crosses the dispatch boundary is one of the variants
//! below and reaches the caller as a structured `{ "status": "error" }`
//! envelope with a stable machine-readable code — never as an unhandled
//! panic or a silently empty result.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Stable machine-readable error codes, serialized in snake_case inside
/// the error envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// No valid cluster entries could be resolved from any source.
    ConfigInvalid,
    /// A request named a cluster absent from the registry.
    ClusterNotFound,
    /// Every configured cluster failed its liveness probe.
    NoClustersAvailable,
    /// Requested operation name is not in the catalog.
    UnknownOperation,
    /// Argument shape failed schema validation.
    InvalidArguments,
    /// The resolved backend's operation call itself failed.
    BackendFailure,
}

/// Dispatch-level errors.
///
/// `ConfigInvalid` and `NoClustersAvailable` are fatal at registry build
/// time; the rest are per-request and recoverable.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no valid cluster configuration: {0}")]
    ConfigInvalid(String),

    #[error("unknown cluster '{}' (available: {})", .name, .available.join(", "))]
    ClusterNotFound {
        name: String,
        available: Vec<String>,
    },

    #[error("no configured cluster is reachable")]
    NoClustersAvailable,

    #[error("no operation registered with name: {0}")]
    UnknownOperation(String),

    #[error("{0}")]
    InvalidArguments(String),

    #[error("{0}")]
    BackendFailure(String),
}

impl DispatchError {
    /// The stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ConfigInvalid(_) => ErrorCode::ConfigInvalid,
            Self::ClusterNotFound { .. } => ErrorCode::ClusterNotFound,
            Self::NoClustersAvailable => ErrorCode::NoClustersAvailable,
            Self::UnknownOperation(_) => ErrorCode::UnknownOperation,
            Self::InvalidArguments(_) => ErrorCode::InvalidArguments,
            Self::BackendFailure(_) => ErrorCode::BackendFailure,
        }
    }

}

/// Uniform response envelope for every dispatched operation.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope {
    Ok { result: Value },
    Error { code: ErrorCode, message: String },
}

impl Envelope {
    pub fn ok(result: Value) -> Self {
        Self::Ok { result }
    }

    pub fn error(err: &DispatchError) -> Self {
        Self::Error {
            code: err.code(),
            message: err.to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}
