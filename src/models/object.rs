//! Models for the `cmdb.object.*` namespace.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::common::{deserialize_id, deserialize_optional_string_or_int};

/// Result of `cmdb.object.create`.
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectCreated {
    /// Id of the new object.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u64,

    /// Server message.
    #[serde(default)]
    pub message: Option<String>,

    /// Whether the server reports success; absent counts as success.
    #[serde(default = "default_success")]
    pub success: bool,
}

/// Result of update, archive, delete and purge calls.
#[derive(Debug, Clone, Deserialize)]
pub struct OperationResult {
    /// Whether the server reports success; absent counts as success.
    #[serde(default = "default_success")]
    pub success: bool,

    /// Server message.
    #[serde(default)]
    pub message: Option<String>,
}

/// A CMDB object as returned by `cmdb.object.read`.
#[derive(Debug, Clone, Deserialize)]
pub struct CmdbObjectRecord {
    /// Object id.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u64,

    /// Object title.
    #[serde(default)]
    pub title: String,

    /// SYSID.
    #[serde(default)]
    pub sysid: Option<String>,

    /// Numeric object type id.
    #[serde(default, deserialize_with = "deserialize_optional_string_or_int")]
    pub objecttype: Option<String>,

    /// Localized object type title.
    #[serde(default)]
    pub type_title: Option<String>,

    /// Record status (2 = normal, 3 = archived, 4 = deleted).
    #[serde(default, deserialize_with = "deserialize_optional_string_or_int")]
    pub status: Option<String>,

    /// CMDB status id.
    #[serde(default, deserialize_with = "deserialize_optional_string_or_int")]
    pub cmdb_status: Option<String>,

    /// Localized CMDB status title.
    #[serde(default)]
    pub cmdb_status_title: Option<String>,

    /// Creation timestamp as reported by the server.
    #[serde(default)]
    pub created: Option<String>,

    /// Last update timestamp as reported by the server.
    #[serde(default)]
    pub updated: Option<String>,

    /// Any attributes not modeled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_success() -> bool {
    true
}
