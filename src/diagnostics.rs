//! Per-call diagnostics kept by the client.
//!
//! Every call through the transport overwrites the snapshot. Callers only
//! get read access through [`ApiClient`](crate::client::ApiClient).

use std::time::Duration;

use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use reqwest::{StatusCode, Version};
use serde_json::Value;

use crate::client::PASSWORD_HEADER;

/// Transport-level metadata of the last HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportInfo {
    /// The URL the request was sent to.
    pub url: String,
    /// HTTP status code.
    pub status: StatusCode,
    /// Protocol version, e.g. `HTTP/1.1`.
    pub http_version: String,
    /// Time from sending the request to receiving the full body.
    pub duration: Duration,
    /// Size of the response body in bytes.
    pub body_size: usize,
}

/// Snapshot of the last request and response.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub(crate) last_request_content: Option<Value>,
    pub(crate) last_request_headers: Option<String>,
    pub(crate) last_response_headers: Option<String>,
    pub(crate) last_response: Option<Value>,
    pub(crate) last_info: Option<TransportInfo>,
}

impl Diagnostics {
    /// The last outgoing payload (single envelope, batch array, or raw value).
    pub fn last_request_content(&self) -> Option<&Value> {
        self.last_request_content.as_ref()
    }

    /// The last request line and headers, password redacted.
    pub fn last_request_headers(&self) -> Option<&str> {
        self.last_request_headers.as_deref()
    }

    /// The last status line and response headers.
    pub fn last_response_headers(&self) -> Option<&str> {
        self.last_response_headers.as_deref()
    }

    /// The last decoded response body.
    pub fn last_response(&self) -> Option<&Value> {
        self.last_response.as_ref()
    }

    /// Metadata of the last HTTP exchange.
    pub fn last_info(&self) -> Option<&TransportInfo> {
        self.last_info.as_ref()
    }

    /// Clears everything describing the response side of a call.
    pub(crate) fn begin_call(&mut self) {
        self.last_request_headers = None;
        self.last_response_headers = None;
        self.last_response = None;
        self.last_info = None;
    }
}

/// Renders a request line plus headers as they go over the wire.
///
/// Headers the client adds on its own are not part of `request`; callers
/// set `User-Agent` and `Accept` per request so they show up here.
pub(crate) fn render_request_headers(request: &reqwest::Request) -> String {
    let url = request.url();
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut rendered = format!("{} {} HTTP/1.1\r\n", request.method(), target);
    if let Some(host) = url.host_str() {
        match url.port() {
            Some(port) => rendered.push_str(&format!("Host: {}:{}\r\n", host, port)),
            None => rendered.push_str(&format!("Host: {}\r\n", host)),
        }
    }
    rendered.push_str(&render_header_map(request.headers()));
    if !request.headers().contains_key(CONTENT_LENGTH) {
        if let Some(body) = request.body().and_then(|body| body.as_bytes()) {
            rendered.push_str(&format!("content-length: {}\r\n", body.len()));
        }
    }
    rendered
}

/// Renders a status line plus headers.
pub(crate) fn render_response_headers(
    version: Version,
    status: StatusCode,
    headers: &HeaderMap,
) -> String {
    format!("{:?} {}\r\n{}", version, status, render_header_map(headers))
}

fn render_header_map(headers: &HeaderMap) -> String {
    let mut rendered = String::new();
    for (name, value) in headers {
        let value = if name.as_str().eq_ignore_ascii_case(PASSWORD_HEADER) {
            "[REDACTED]"
        } else {
            value.to_str().unwrap_or("[binary]")
        };
        rendered.push_str(&format!("{}: {}\r\n", name, value));
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, CONTENT_TYPE};

    #[test]
    fn test_render_response_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let rendered = render_response_headers(Version::HTTP_11, StatusCode::OK, &headers);
        assert_eq!(
            rendered,
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n"
        );
    }

    #[test]
    fn test_render_request_headers_redacts_password() {
        let request = reqwest::Client::new()
            .post("http://cmdb.local:8080/src/jsonrpc.php")
            .header("X-RPC-Auth-Username", "admin")
            .header(PASSWORD_HEADER, "hunter2")
            .body("{}")
            .build()
            .unwrap();
        let rendered = render_request_headers(&request);
        assert!(rendered.starts_with("POST /src/jsonrpc.php HTTP/1.1\r\n"));
        assert!(rendered.contains("Host: cmdb.local:8080\r\n"));
        assert!(rendered.contains("x-rpc-auth-username: admin\r\n"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.ends_with("content-length: 2\r\n"));
    }

    #[test]
    fn test_begin_call_keeps_request_content() {
        let mut diagnostics = Diagnostics {
            last_request_content: Some(serde_json::json!({"id": 1})),
            last_response: Some(serde_json::json!({"result": true})),
            ..Diagnostics::default()
        };
        diagnostics.begin_call();
        assert!(diagnostics.last_request_content().is_some());
        assert!(diagnostics.last_response().is_none());
    }
}
