//! JSON-RPC 2.0 envelopes as spoken by i-doit.
//!
//! i-doit expects `"version": "2.0"` on requests (not `"jsonrpc"`) and
//! answers with the standard `"jsonrpc": "2.0"` envelope.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::IdoitError;

/// Protocol version sent with every request.
pub const JSON_RPC_VERSION: &str = "2.0";

/// Method parameters: a JSON object.
pub type Params = Map<String, Value>;

/// Converts a JSON value into a parameter object.
///
/// `null` becomes an empty object.
///
/// # Errors
///
/// Returns `IdoitError::InvalidArgument` for any other non-object value.
pub fn into_params(value: Value) -> Result<Params, IdoitError> {
    match value {
        Value::Object(params) => Ok(params),
        Value::Null => Ok(Params::new()),
        other => Err(IdoitError::invalid_argument(format!(
            "params must be a JSON object, got {}",
            json_type(&other)
        ))),
    }
}

/// A single outgoing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Always [`JSON_RPC_VERSION`].
    pub version: String,
    /// Namespaced method, e.g. `cmdb.object.read`.
    pub method: String,
    /// Parameters including `apikey` and optional `language`.
    pub params: Params,
    /// Client-scoped, strictly increasing id.
    pub id: u64,
}

impl RequestEnvelope {
    /// Creates an envelope.
    pub fn new(method: impl Into<String>, params: Params, id: u64) -> Self {
        Self {
            version: JSON_RPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }
}

/// One entry of a batch call, before framing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Namespaced method. An empty method fails the whole batch.
    #[serde(default)]
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Params,
}

impl BatchRequest {
    /// Creates a batch entry without parameters.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Params::new(),
        }
    }

    /// Sets the parameters.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

/// A validated JSON-RPC error object.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    /// Negative error code.
    pub code: i64,
    /// Non-empty server message.
    pub message: String,
    /// Optional details, keyed by topic.
    pub data: Option<Map<String, Value>>,
}

impl RpcError {
    /// Validates a raw `error` member.
    ///
    /// # Errors
    ///
    /// Returns `IdoitError::Protocol` when the object is malformed: not an
    /// object, `code` missing/non-integer/non-negative, or `message`
    /// missing/empty/non-string.
    pub fn from_value(value: Value) -> Result<Self, IdoitError> {
        let Value::Object(mut error) = value else {
            return Err(IdoitError::protocol(
                "i-doit responded with an unknown error: error is not an object",
            ));
        };

        let code = error.get("code").and_then(Value::as_i64).ok_or_else(|| {
            IdoitError::protocol("i-doit responded with an error without a valid code")
        })?;
        if code >= 0 {
            return Err(IdoitError::protocol(format!(
                "i-doit responded with a non-negative error code: {}",
                code
            )));
        }

        let message = match error.remove("message") {
            Some(Value::String(message)) if !message.is_empty() => message,
            _ => {
                return Err(IdoitError::protocol(
                    "i-doit responded with an error without a message",
                ))
            }
        };

        let data = match error.remove("data") {
            Some(Value::Object(data)) => Some(data),
            _ => None,
        };

        Ok(Self {
            code,
            message,
            data,
        })
    }

    /// Returns `"<message> [<topic>: <text>; ...]"`, or the bare message when
    /// there are no details.
    pub fn composed_message(&self) -> String {
        let details: Vec<String> = self
            .data
            .iter()
            .flatten()
            .map(|(topic, text)| format!("{}: {}", topic, detail_text(text)))
            .collect();

        if details.is_empty() {
            self.message.clone()
        } else {
            format!("{} [{}]", self.message, details.join("; "))
        }
    }

    /// Converts into the crate error, tagged with the request id.
    pub fn into_error(self, request_id: Option<u64>) -> IdoitError {
        IdoitError::api(self.code, self.composed_message(), request_id)
    }
}

/// Classifies one decoded response envelope.
///
/// Returns the `result` member as-is (including `null`, `false` or empty
/// values).
///
/// # Errors
///
/// - `IdoitError::Api` for a well-formed `error` member
/// - `IdoitError::Protocol` for malformed envelopes, malformed errors, or a
///   missing `result`
pub fn evaluate_response(response: Value) -> Result<Value, IdoitError> {
    let Value::Object(mut envelope) = response else {
        return Err(IdoitError::protocol(format!(
            "response envelope must be an object, got {}",
            json_type(&response)
        )));
    };

    let request_id = envelope.get("id").and_then(Value::as_u64);

    match envelope.remove("error") {
        None | Some(Value::Null) => {}
        Some(error) => return Err(RpcError::from_value(error)?.into_error(request_id)),
    }

    envelope
        .remove("result")
        .ok_or_else(|| IdoitError::protocol("i-doit forgot to add a result to its response"))
}

fn detail_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
