//! Models for the `idoit.*` namespace: login, version and search.

use serde::Deserialize;

use super::common::deserialize_optional_string_or_int;

/// Result of `idoit.login`.
#[derive(Debug, Clone, Deserialize)]
pub struct Login {
    /// Session token for `X-RPC-Auth-Session`.
    #[serde(rename = "session-id")]
    pub session_id: String,

    /// Numeric user id.
    #[serde(default, deserialize_with = "deserialize_optional_string_or_int")]
    pub userid: Option<String>,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// E-mail address.
    #[serde(default)]
    pub mail: Option<String>,

    /// Login name.
    #[serde(default)]
    pub username: Option<String>,

    /// Tenant id.
    #[serde(
        rename = "client-id",
        default,
        deserialize_with = "deserialize_optional_string_or_int"
    )]
    pub client_id: Option<String>,

    /// Tenant name.
    #[serde(rename = "client-name", default)]
    pub client_name: Option<String>,
}

/// The user a request was authenticated as, reported by `idoit.version`.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionLogin {
    /// Numeric user id.
    #[serde(default, deserialize_with = "deserialize_optional_string_or_int")]
    pub userid: Option<String>,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// E-mail address.
    #[serde(default)]
    pub mail: Option<String>,

    /// Login name.
    #[serde(default)]
    pub username: Option<String>,

    /// Tenant name.
    #[serde(default)]
    pub mandator: Option<String>,

    /// Session language.
    #[serde(default)]
    pub language: Option<String>,
}

/// Result of `idoit.version`.
#[derive(Debug, Clone, Deserialize)]
pub struct Version {
    /// Authenticated user.
    #[serde(default)]
    pub login: Option<VersionLogin>,

    /// Product version, e.g. `1.16`.
    pub version: String,

    /// Release step (usually empty).
    #[serde(default)]
    pub step: String,

    /// Edition, e.g. `PRO` or `OPEN`.
    #[serde(rename = "type", default)]
    pub edition: String,
}

impl Version {
    /// Returns `"<version> <edition>"`, e.g. `1.16 PRO`.
    pub fn display(&self) -> String {
        if self.edition.is_empty() {
            self.version.clone()
        } else {
            format!("{} {}", self.version, self.edition)
        }
    }
}

/// One hit of `idoit.search`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Id of the matched document (usually an object id).
    #[serde(default, deserialize_with = "deserialize_optional_string_or_int")]
    pub document_id: Option<String>,

    /// Breadcrumb of the matched attribute.
    #[serde(default)]
    pub key: Option<String>,

    /// Matched value.
    #[serde(default)]
    pub value: Option<String>,

    /// Search provider, e.g. `cmdb`.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    /// Relative link into the web UI.
    #[serde(default)]
    pub link: Option<String>,

    /// Relevance score.
    #[serde(default, deserialize_with = "deserialize_optional_string_or_int")]
    pub score: Option<String>,

    /// Record status of the hit.
    #[serde(default)]
    pub status: Option<String>,
}
