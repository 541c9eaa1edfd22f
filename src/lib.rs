//! # idoit-api-client
//!
//! A client library for the i-doit CMDB, speaking JSON-RPC 2.0 over HTTP(S).
//!
//! ## Features
//!
//! - **Single and batch calls**: `request()` and `batch_request()` frame
//!   JSON-RPC envelopes, inject the API key and language, and unwrap results
//! - **Authentication**: username/password headers, or a session token after
//!   `login()`
//! - **Strict response evaluation**: server errors, malformed envelopes and
//!   transport failures surface as distinct error kinds
//! - **Diagnostics**: last request/response payloads and headers are kept for
//!   inspection
//! - **Security**: API keys and passwords are never logged or exposed in error
//!   messages
//!
//! ## Architecture
//!
//! - [`config`] - Settings validation and loading from environment variables
//! - [`error`] - Error types with security-conscious message sanitization
//! - [`client`] - Transport and session manager ([`ApiClient`])
//! - [`diagnostics`] - Snapshot of the last HTTP exchange
//! - [`models`] - JSON-RPC envelopes and typed results
//! - [`namespaces`] - Typed wrappers for `idoit.*` and `cmdb.object.*`
//!
//! ## Configuration
//!
//! [`Config::from_env`](config::Config::from_env) reads:
//!
//! - `IDOIT_URL`: JSON-RPC endpoint, e.g. `https://cmdb.example.com/src/jsonrpc.php`
//! - `IDOIT_KEY`: API key
//!
//! Optional: `IDOIT_PORT`, `IDOIT_USERNAME`, `IDOIT_PASSWORD`,
//! `IDOIT_LANGUAGE`, `IDOIT_BYPASS_SECURE_CONNECTION` and the
//! `IDOIT_PROXY_*` family.
//!
//! ## Example
//!
//! ```ignore
//! use idoit_api_client::{ApiClient, Config, Params};
//! use serde_json::json;
//!
//! async fn example() -> Result<(), idoit_api_client::IdoitError> {
//!     let mut client = ApiClient::new(Config::from_env()?);
//!
//!     client.login().await?;
//!
//!     let mut params = Params::new();
//!     params.insert("id".to_string(), json!(23));
//!     let object = client.request("cmdb.object.read", params).await?;
//!     println!("{}", object["title"]);
//!
//!     client.close().await;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod models;
pub mod namespaces;

pub use client::ApiClient;
pub use config::{Config, Settings};
pub use error::{ErrorKind, IdoitError};
pub use models::{BatchRequest, Params};
