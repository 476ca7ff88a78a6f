//! The static operation catalog.
//!
//! Every operation the server exposes is declared here once: its name, a
//! one-line description for agent discovery, its JSON argument schema, and
//! whether it targets a cluster (and therefore accepts the optional
//! `cluster` selector argument). The catalog is compile-time-known —
//! operations are never created or destroyed at runtime.
//!
//! Arguments are validated twice, on purpose. [`validate_args`] performs
//! the shallow schema check (required fields present, declared types
//! match, enum membership, default injection) so that a bad call fails
//! with a message naming the offending field. [`OpCall::parse`] then
//! deserializes into the per-operation argument struct, so handlers never
//! inspect a loose JSON bag.

use serde::Deserialize;
use serde_json::{json, Value};

/// One catalog entry.
pub struct OpSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// Whether the operation resolves and calls a backend cluster. The
    /// `cluster` selector argument is only honored when set.
    pub cluster_scoped: bool,
    pub schema: fn() -> Value,
}

/// Look up an operation by name.
pub fn find(name: &str) -> Option<&'static OpSpec> {
    CATALOG.iter().find(|op| op.name == name)
}

/// All operations, in catalog order.
pub fn all() -> &'static [OpSpec] {
    CATALOG
}

/// The full argument schema for an operation, with the `cluster` selector
/// property folded in for cluster-scoped operations.
pub fn schema_for(spec: &OpSpec) -> Value {
    let mut schema = (spec.schema)();
    if spec.cluster_scoped {
        if let Some(props) = schema
            .get_mut("properties")
            .and_then(|p| p.as_object_mut())
        {
            props.insert(
                "cluster".to_string(),
                json!({
                    "type": "string",
                    "description": "Target cluster name; defaults to the configured default cluster"
                }),
            );
        }
    }
    schema
}

static CATALOG: &[OpSpec] = &[
    // ── Search ───────────────────────────────────────────────────────────
    OpSpec {
        name: "search",
        description: "Run a query against an index",
        cluster_scoped: true,
        schema: || {
            json!({
                "type": "object",
                "properties": {
                    "index": { "type": "string", "description": "Index name or pattern; defaults to the cluster's default index" },
                    "query": { "type": "object", "description": "Query DSL object" },
                    "from": { "type": "integer", "description": "Offset of the first hit" },
                    "size": { "type": "integer", "description": "Max hits to return", "default": 10 },
                    "sort": { "description": "Sort specification (field name, object, or array)" }
                }
            })
        },
    },
    OpSpec {
        name: "count",
        description: "Count documents matching a query",
        cluster_scoped: true,
        schema: || {
            json!({
                "type": "object",
                "properties": {
                    "index": { "type": "string", "description": "Index name or pattern" },
                    "query": { "type": "object", "description": "Query DSL object" }
                }
            })
        },
    },
    OpSpec {
        name: "aggregate",
        description: "Run aggregations without returning hits",
        cluster_scoped: true,
        schema: || {
            json!({
                "type": "object",
                "properties": {
                    "index": { "type": "string", "description": "Index name or pattern" },
                    "aggs": { "type": "object", "description": "Aggregation DSL object" },
                    "query": { "type": "object", "description": "Optional filter query" }
                },
                "required": ["aggs"]
            })
        },
    },
    OpSpec {
        name: "delete_by_query",
        description: "Delete every document matching a query",
        cluster_scoped: true,
        schema: || {
            json!({
                "type": "object",
                "properties": {
                    "index": { "type": "string", "description": "Index name (required — no default-index fallback for deletion)" },
                    "query": { "type": "object", "description": "Query DSL object" }
                },
                "required": ["index", "query"]
            })
        },
    },
    // ── Documents ────────────────────────────────────────────────────────
    OpSpec {
        name: "get_document",
        description: "Fetch a document by ID",
        cluster_scoped: true,
        schema: || {
            json!({
                "type": "object",
                "properties": {
                    "index": { "type": "string" },
                    "id": { "type": "string" }
                },
                "required": ["index", "id"]
            })
        },
    },
    OpSpec {
        name: "index_document",
        description: "Index (create or replace) a document",
        cluster_scoped: true,
        schema: || {
            json!({
                "type": "object",
                "properties": {
                    "index": { "type": "string" },
                    "id": { "type": "string", "description": "Document ID; omitted for auto-generation" },
                    "document": { "type": "object", "description": "Document body" },
                    "refresh": { "type": "boolean", "description": "Make the change visible to search immediately" }
                },
                "required": ["index", "document"]
            })
        },
    },
    OpSpec {
        name: "update_document",
        description: "Apply a partial update to a document",
        cluster_scoped: true,
        schema: || {
            json!({
                "type": "object",
                "properties": {
                    "index": { "type": "string" },
                    "id": { "type": "string" },
                    "doc": { "type": "object", "description": "Fields to merge into the document" }
                },
                "required": ["index", "id", "doc"]
            })
        },
    },
    OpSpec {
        name: "delete_document",
        description: "Delete a document by ID",
        cluster_scoped: true,
        schema: || {
            json!({
                "type": "object",
                "properties": {
                    "index": { "type": "string" },
                    "id": { "type": "string" }
                },
                "required": ["index", "id"]
            })
        },
    },
    OpSpec {
        name: "bulk",
        description: "Execute a batch of index/update/delete actions",
        cluster_scoped: true,
        schema: || {
            json!({
                "type": "object",
                "properties": {
                    "index": { "type": "string", "description": "Default index for actions that omit one" },
                    "operations": {
                        "type": "array",
                        "description": "Alternating action and source lines, as in the bulk NDJSON body"
                    }
                },
                "required": ["operations"]
            })
        },
    },
    // ── Index administration ─────────────────────────────────────────────
    OpSpec {
        name: "list_indices",
        description: "List indices with basic stats",
        cluster_scoped: true,
        schema: || {
            json!({
                "type": "object",
                "properties": {
                    "pattern": { "type": "string", "description": "Index name pattern (e.g. \"logs-*\")" }
                }
            })
        },
    },
    OpSpec {
        name: "get_index",
        description: "Fetch an index's settings, mappings, and aliases",
        cluster_scoped: true,
        schema: || index_only_schema(),
    },
    OpSpec {
        name: "create_index",
        description: "Create an index",
        cluster_scoped: true,
        schema: || {
            json!({
                "type": "object",
                "properties": {
                    "index": { "type": "string" },
                    "settings": { "type": "object" },
                    "mappings": { "type": "object" }
                },
                "required": ["index"]
            })
        },
    },
    OpSpec {
        name: "delete_index",
        description: "Delete an index",
        cluster_scoped: true,
        schema: || index_only_schema(),
    },
    OpSpec {
        name: "get_mapping",
        description: "Fetch an index's mappings",
        cluster_scoped: true,
        schema: || index_only_schema(),
    },
    OpSpec {
        name: "put_mapping",
        description: "Update an index's mappings",
        cluster_scoped: true,
        schema: || {
            json!({
                "type": "object",
                "properties": {
                    "index": { "type": "string" },
                    "mappings": { "type": "object", "description": "Mapping body (e.g. { \"properties\": … })" }
                },
                "required": ["index", "mappings"]
            })
        },
    },
    OpSpec {
        name: "get_index_settings",
        description: "Fetch an index's settings",
        cluster_scoped: true,
        schema: || index_only_schema(),
    },
    OpSpec {
        name: "put_index_settings",
        description: "Update an index's dynamic settings",
        cluster_scoped: true,
        schema: || {
            json!({
                "type": "object",
                "properties": {
                    "index": { "type": "string" },
                    "settings": { "type": "object" }
                },
                "required": ["index", "settings"]
            })
        },
    },
    // ── Cluster administration ───────────────────────────────────────────
    OpSpec {
        name: "cluster_info",
        description: "Fetch basic cluster info (name, version, distribution)",
        cluster_scoped: true,
        schema: || empty_schema(),
    },
    OpSpec {
        name: "cluster_health",
        description: "Fetch cluster health (status, shard counts)",
        cluster_scoped: true,
        schema: || empty_schema(),
    },
    OpSpec {
        name: "cluster_stats",
        description: "Fetch cluster-wide statistics",
        cluster_scoped: true,
        schema: || empty_schema(),
    },
    // ── Security administration ──────────────────────────────────────────
    OpSpec {
        name: "get_users",
        description: "List internal users",
        cluster_scoped: true,
        schema: || empty_schema(),
    },
    OpSpec {
        name: "put_user",
        description: "Create or replace an internal user",
        cluster_scoped: true,
        schema: || named_definition_schema("User definition (password, backend_roles, attributes)"),
    },
    OpSpec {
        name: "delete_user",
        description: "Delete an internal user",
        cluster_scoped: true,
        schema: || name_only_schema(),
    },
    OpSpec {
        name: "get_roles",
        description: "List security roles",
        cluster_scoped: true,
        schema: || empty_schema(),
    },
    OpSpec {
        name: "put_role",
        description: "Create or replace a security role",
        cluster_scoped: true,
        schema: || named_definition_schema("Role definition (cluster/index permissions)"),
    },
    OpSpec {
        name: "delete_role",
        description: "Delete a security role",
        cluster_scoped: true,
        schema: || name_only_schema(),
    },
    OpSpec {
        name: "get_role_mappings",
        description: "List role mappings",
        cluster_scoped: true,
        schema: || empty_schema(),
    },
    OpSpec {
        name: "put_role_mapping",
        description: "Create or replace a role mapping",
        cluster_scoped: true,
        schema: || named_definition_schema("Mapping definition (users, backend_roles, hosts)"),
    },
    OpSpec {
        name: "delete_role_mapping",
        description: "Delete a role mapping",
        cluster_scoped: true,
        schema: || name_only_schema(),
    },
    // ── Introspection ────────────────────────────────────────────────────
    OpSpec {
        name: "list_clusters",
        description: "List registered cluster names and the resolved default",
        cluster_scoped: false,
        schema: || empty_schema(),
    },
];

fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn index_only_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "index": { "type": "string" }
        },
        "required": ["index"]
    })
}

fn name_only_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" }
        },
        "required": ["name"]
    })
}

fn named_definition_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "definition": { "type": "object", "description": description }
        },
        "required": ["name", "definition"]
    })
}

// ── Shallow schema validation ────────────────────────────────────────────

/// Validate arguments against an operation schema.
///
/// Checks required fields, declared types, and enum membership, and
/// injects declared defaults for absent optional fields. Returns the
/// populated argument object, or a message naming the offending field.
pub fn validate_args(schema: &Value, args: &Value) -> Result<Value, String> {
    let empty = serde_json::Map::new();
    let args_obj = match args {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return Err(format!(
                "arguments must be an object, got {}",
                json_type_name(other)
            ))
        }
    };

    let properties = schema
        .get("properties")
        .and_then(|p| p.as_object())
        .cloned()
        .unwrap_or_default();

    let required: Vec<String> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default();

    let mut result = args_obj.clone();

    for req_field in &required {
        if !args_obj.contains_key(req_field) {
            return Err(format!("missing required argument: {}", req_field));
        }
    }

    for (prop_name, prop_schema) in &properties {
        if let Some(value) = args_obj.get(prop_name) {
            if let Some(expected_type) = prop_schema.get("type").and_then(|t| t.as_str()) {
                let type_ok = match expected_type {
                    "string" => value.is_string(),
                    "integer" => value.is_i64() || value.is_u64(),
                    "number" => value.is_number(),
                    "boolean" => value.is_boolean(),
                    "array" => value.is_array(),
                    "object" => value.is_object(),
                    _ => true,
                };
                if !type_ok {
                    return Err(format!(
                        "argument '{}' must be of type '{}', got {}",
                        prop_name,
                        expected_type,
                        json_type_name(value)
                    ));
                }
            }

            if let Some(enum_values) = prop_schema.get("enum").and_then(|e| e.as_array()) {
                if !enum_values.contains(value) {
                    let allowed: Vec<String> = enum_values.iter().map(|v| v.to_string()).collect();
                    return Err(format!(
                        "argument '{}' must be one of [{}], got {}",
                        prop_name,
                        allowed.join(", "),
                        value
                    ));
                }
            }
        } else if let Some(default) = prop_schema.get("default") {
            result.insert(prop_name.clone(), default.clone());
        }
    }

    Ok(Value::Object(result))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Typed argument shapes ────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SearchArgs {
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub query: Option<Value>,
    #[serde(default)]
    pub from: Option<u64>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub sort: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountArgs {
    #[serde(default)]
    pub index: Option<String>,
    #[serde(default)]
    pub query: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregateArgs {
    #[serde(default)]
    pub index: Option<String>,
    pub aggs: Value,
    #[serde(default)]
    pub query: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteByQueryArgs {
    pub index: String,
    pub query: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocumentPathArgs {
    pub index: String,
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexDocumentArgs {
    pub index: String,
    #[serde(default)]
    pub id: Option<String>,
    pub document: Value,
    #[serde(default)]
    pub refresh: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDocumentArgs {
    pub index: String,
    pub id: String,
    pub doc: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkArgs {
    #[serde(default)]
    pub index: Option<String>,
    pub operations: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListIndicesArgs {
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexArgs {
    pub index: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateIndexArgs {
    pub index: String,
    #[serde(default)]
    pub settings: Option<Value>,
    #[serde(default)]
    pub mappings: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PutMappingArgs {
    pub index: String,
    pub mappings: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PutIndexSettingsArgs {
    pub index: String,
    pub settings: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameArgs {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedDefinitionArgs {
    pub name: String,
    pub definition: Value,
}

/// A parsed operation call: one variant per catalog entry, each carrying
/// its strongly-typed arguments. Unknown fields and wrong shapes fail at
/// parse time, not deep inside a handler.
#[derive(Debug, Clone)]
pub enum OpCall {
    Search(SearchArgs),
    Count(CountArgs),
    Aggregate(AggregateArgs),
    DeleteByQuery(DeleteByQueryArgs),
    GetDocument(DocumentPathArgs),
    IndexDocument(IndexDocumentArgs),
    UpdateDocument(UpdateDocumentArgs),
    DeleteDocument(DocumentPathArgs),
    Bulk(BulkArgs),
    ListIndices(ListIndicesArgs),
    GetIndex(IndexArgs),
    CreateIndex(CreateIndexArgs),
    DeleteIndex(IndexArgs),
    GetMapping(IndexArgs),
    PutMapping(PutMappingArgs),
    GetIndexSettings(IndexArgs),
    PutIndexSettings(PutIndexSettingsArgs),
    ClusterInfo,
    ClusterHealth,
    ClusterStats,
    GetUsers,
    PutUser(NamedDefinitionArgs),
    DeleteUser(NameArgs),
    GetRoles,
    PutRole(NamedDefinitionArgs),
    DeleteRole(NameArgs),
    GetRoleMappings,
    PutRoleMapping(NamedDefinitionArgs),
    DeleteRoleMapping(NameArgs),
    ListClusters,
}

impl OpCall {
    /// Parse validated arguments into the typed call for `name`.
    ///
    /// `name` must already have been resolved through [`find`]; an
    /// unknown name here is a programming error and reported as such.
    pub fn parse(name: &str, args: Value) -> Result<Self, String> {
        fn typed<T: serde::de::DeserializeOwned>(
            args: Value,
            build: fn(T) -> OpCall,
        ) -> Result<OpCall, String> {
            serde_json::from_value::<T>(args)
                .map(build)
                .map_err(|e| e.to_string())
        }

        match name {
            "search" => typed(args, OpCall::Search),
            "count" => typed(args, OpCall::Count),
            "aggregate" => typed(args, OpCall::Aggregate),
            "delete_by_query" => typed(args, OpCall::DeleteByQuery),
            "get_document" => typed(args, OpCall::GetDocument),
            "index_document" => typed(args, OpCall::IndexDocument),
            "update_document" => typed(args, OpCall::UpdateDocument),
            "delete_document" => typed(args, OpCall::DeleteDocument),
            "bulk" => typed(args, OpCall::Bulk),
            "list_indices" => typed(args, OpCall::ListIndices),
            "get_index" => typed(args, OpCall::GetIndex),
            "create_index" => typed(args, OpCall::CreateIndex),
            "delete_index" => typed(args, OpCall::DeleteIndex),
            "get_mapping" => typed(args, OpCall::GetMapping),
            "put_mapping" => typed(args, OpCall::PutMapping),
            "get_index_settings" => typed(args, OpCall::GetIndexSettings),
            "put_index_settings" => typed(args, OpCall::PutIndexSettings),
            "cluster_info" => Ok(OpCall::ClusterInfo),
            "cluster_health" => Ok(OpCall::ClusterHealth),
            "cluster_stats" => Ok(OpCall::ClusterStats),
            "get_users" => Ok(OpCall::GetUsers),
            "put_user" => typed(args, OpCall::PutUser),
            "delete_user" => typed(args, OpCall::DeleteUser),
            "get_roles" => Ok(OpCall::GetRoles),
            "put_role" => typed(args, OpCall::PutRole),
            "delete_role" => typed(args, OpCall::DeleteRole),
            "get_role_mappings" => Ok(OpCall::GetRoleMappings),
            "put_role_mapping" => typed(args, OpCall::PutRoleMapping),
            "delete_role_mapping" => typed(args, OpCall::DeleteRoleMapping),
            "list_clusters" => Ok(OpCall::ListClusters),
            other => Err(format!("no operation registered with name: {}", other)),
        }
    }
}
