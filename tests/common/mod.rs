//! Shared mock i-doit server for integration tests.

#![allow(dead_code)]

use idoit_api_client::{ApiClient, Settings};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const ENDPOINT_PATH: &str = "/src/jsonrpc.php";
pub const API_KEY: &str = "c1ia5q";
pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "hunter2";
pub const SESSION_ID: &str = "2itcinpd4t6t4lf0t57jqkf2t3";

/// A wiremock server standing in for `/src/jsonrpc.php`.
pub struct MockIdoit {
    pub server: MockServer,
    pub url: String,
}

impl MockIdoit {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let url = format!("{}{}", server.uri(), ENDPOINT_PATH);
        Self { server, url }
    }

    /// Settings with only URL and API key.
    pub fn settings(&self) -> Settings {
        Settings::new(self.url.clone(), API_KEY)
    }

    /// Settings including username and password.
    pub fn settings_with_credentials(&self) -> Settings {
        self.settings().with_credentials(USERNAME, PASSWORD)
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::from_settings(self.settings()).expect("valid settings")
    }

    pub fn client_with(&self, settings: Settings) -> ApiClient {
        ApiClient::from_settings(settings).expect("valid settings")
    }

    /// Answers single calls of `rpc_method` with `result`.
    pub async fn mock_result(&self, rpc_method: &str, result: Value) {
        self.mount(rpc_method, ResultResponder(result)).await;
    }

    /// Answers single calls of `rpc_method` with a JSON-RPC error.
    pub async fn mock_error(&self, rpc_method: &str, code: i64, message: &str) {
        self.mount(
            rpc_method,
            ErrorResponder(json!({"code": code, "message": message})),
        )
        .await;
    }

    /// Answers `idoit.login` with a session and `idoit.logout` with success.
    pub async fn mock_session(&self) {
        self.mock_result(
            "idoit.login",
            json!({
                "result": true,
                "userid": "9",
                "name": "i-doit Systemadministrator ",
                "mail": "i-doit@acme-it.example",
                "username": USERNAME,
                "session-id": SESSION_ID,
                "client-id": 1,
                "client-name": "ACME IT Solutions"
            }),
        )
        .await;
        self.mock_result(
            "idoit.logout",
            json!({"message": "Logout successfull", "result": true}),
        )
        .await;
    }

    /// Answers everything with `result = params`, per entry for batches.
    pub async fn mock_echo(&self) {
        Mock::given(method("POST"))
            .and(path(ENDPOINT_PATH))
            .respond_with(EchoResponder)
            .mount(&self.server)
            .await;
    }

    /// Answers everything with a fixed response.
    pub async fn mock_any(&self, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(ENDPOINT_PATH))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// Answers batches with the given `{"result": ..}` / `{"error": ..}` parts.
    pub async fn mock_batch(&self, parts: Vec<Value>) {
        Mock::given(method("POST"))
            .and(path(ENDPOINT_PATH))
            .respond_with(BatchResponder(parts))
            .mount(&self.server)
            .await;
    }

    async fn mount<R: Respond + 'static>(&self, rpc_method: &str, responder: R) {
        Mock::given(method("POST"))
            .and(path(ENDPOINT_PATH))
            .and(body_partial_json(json!({"method": rpc_method})))
            .respond_with(responder)
            .mount(&self.server)
            .await;
    }

    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Decoded bodies of all received requests.
    pub async fn bodies(&self) -> Vec<Value> {
        self.requests()
            .await
            .iter()
            .map(|request| serde_json::from_slice(&request.body).expect("JSON body"))
            .collect()
    }
}

/// Returns a header value of a received request.
pub fn header<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
}

fn request_id(request: &Request) -> Value {
    serde_json::from_slice::<Value>(&request.body)
        .map(|body| body["id"].clone())
        .unwrap_or(Value::Null)
}

struct ResultResponder(Value);

impl Respond for ResultResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": request_id(request),
            "result": self.0
        }))
    }
}

struct ErrorResponder(Value);

impl Respond for ErrorResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": request_id(request),
            "error": self.0
        }))
    }
}

struct EchoResponder;

impl Respond for EchoResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let echo = |envelope: &Value| {
            json!({
                "jsonrpc": "2.0",
                "id": envelope["id"],
                "result": envelope["params"]
            })
        };
        let response = match &body {
            Value::Array(envelopes) => Value::Array(envelopes.iter().map(echo).collect()),
            envelope => echo(envelope),
        };
        ResponseTemplate::new(200).set_body_json(response)
    }
}

struct BatchResponder(Vec<Value>);

impl Respond for BatchResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let envelopes = body.as_array().cloned().unwrap_or_default();
        let responses: Vec<Value> = self
            .0
            .iter()
            .enumerate()
            .map(|(index, part)| {
                let mut response = json!({
                    "jsonrpc": "2.0",
                    "id": envelopes.get(index).map(|e| e["id"].clone()).unwrap_or(Value::Null)
                });
                if let (Some(target), Some(source)) = (response.as_object_mut(), part.as_object())
                {
                    target.extend(source.clone());
                }
                response
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(Value::Array(responses))
    }
}
