//! JSON-RPC client for the i-doit API.
//!
//! This module provides [`ApiClient`], the transport and session manager
//! every namespace wrapper builds on. It frames single and batch JSON-RPC
//! requests, hands out request ids, authenticates through headers, and
//! evaluates responses.
//!
//! # Connection lifecycle
//!
//! ```text
//! Disconnected --connect()--> Connected --login()--> LoggedIn
//!      ^                          |                     |
//!      +-------disconnect()-------+<-----logout()-------+
//! ```
//!
//! `request()`, `batch_request()` and `login()` connect on demand. Calling
//! `connect()` while connected, `disconnect()` while disconnected, `login()`
//! while logged in, or `logout()` while logged out is an
//! [`IdoitError::InvalidOperation`].
//!
//! # Concurrency
//!
//! Every network operation takes `&mut self`, so one client has at most one
//! call in flight. Use several clients for parallel work.
//!
//! # Security
//!
//! The API key, password and session token are never logged. Response
//! bodies quoted in errors are sanitized first.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE, USER_AGENT as USER_AGENT_HEADER};
use reqwest::{Client, Proxy, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{Config, ProxyType, Settings};
use crate::diagnostics::{
    render_request_headers, render_response_headers, Diagnostics, TransportInfo,
};
use crate::error::IdoitError;
use crate::models::{evaluate_response, BatchRequest, Login, Params, RequestEnvelope};
use crate::namespaces::{CmdbObject, Idoit};

/// Header carrying the session token after login.
pub const SESSION_HEADER: &str = "X-RPC-Auth-Session";

/// Header carrying the username when not logged in.
pub const USERNAME_HEADER: &str = "X-RPC-Auth-Username";

/// Header carrying the password when not logged in.
pub const PASSWORD_HEADER: &str = "X-RPC-Auth-Password";

/// Connect timeout in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Maximum length of a response body quoted in an error.
const MAX_ERROR_BODY_LEN: usize = 500;

/// User agent sent with every request.
const USER_AGENT: &str = concat!("idoit-api-client/", env!("CARGO_PKG_VERSION"));

/// Transport and session manager for one i-doit instance.
///
/// # Example
///
/// ```ignore
/// let config = Config::from_env()?;
/// let mut client = ApiClient::new(config);
///
/// client.login().await?;
/// let version = client.idoit().read_version().await?;
/// println!("i-doit {}", version.display());
/// client.close().await;
/// ```
pub struct ApiClient {
    config: Config,

    /// The connection handle; `None` while disconnected.
    http: Option<Client>,

    /// Session token from `idoit.login`.
    /// SECURITY: Never log this value!
    session: Option<String>,

    /// Last request id handed out.
    request_id: u64,

    diagnostics: Diagnostics,
}

impl ApiClient {
    /// Creates a disconnected client.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: None,
            session: None,
            request_id: 0,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Validates settings and creates a disconnected client.
    ///
    /// # Errors
    ///
    /// Returns `IdoitError::Config` if the settings are invalid.
    pub fn from_settings(settings: Settings) -> Result<Self, IdoitError> {
        Ok(Self::new(Config::new(settings)?))
    }

    /// The validated configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether a connection handle exists.
    pub fn is_connected(&self) -> bool {
        self.http.is_some()
    }

    /// Whether a session token is held.
    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    /// The current session token. Never log this value.
    pub fn session_id(&self) -> Option<&str> {
        self.session.as_deref()
    }

    /// Number of request ids handed out so far.
    ///
    /// A single request counts once; a batch counts once per entry.
    pub fn count_requests(&self) -> u64 {
        self.request_id
    }

    /// The diagnostics snapshot of the last call.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// The last outgoing payload.
    pub fn last_request_content(&self) -> Option<&Value> {
        self.diagnostics.last_request_content()
    }

    /// The last request line and headers.
    pub fn last_request_headers(&self) -> Option<&str> {
        self.diagnostics.last_request_headers()
    }

    /// The last status line and response headers.
    pub fn last_response_headers(&self) -> Option<&str> {
        self.diagnostics.last_response_headers()
    }

    /// The last decoded response body.
    pub fn last_response(&self) -> Option<&Value> {
        self.diagnostics.last_response()
    }

    /// Metadata of the last HTTP exchange.
    pub fn last_info(&self) -> Option<&TransportInfo> {
        self.diagnostics.last_info()
    }

    /// Wrapper for the `idoit.*` namespace.
    pub fn idoit(&mut self) -> Idoit<'_> {
        Idoit::new(self)
    }

    /// Wrapper for the `cmdb.object.*` namespace.
    pub fn cmdb_object(&mut self) -> CmdbObject<'_> {
        CmdbObject::new(self)
    }

    /// Allocates the connection handle.
    ///
    /// # Errors
    ///
    /// - `IdoitError::InvalidOperation` if already connected
    /// - `IdoitError::HttpClient` if the HTTP client cannot be built
    pub fn connect(&mut self) -> Result<(), IdoitError> {
        if self.is_connected() {
            return Err(IdoitError::invalid_operation("client is already connected"));
        }

        self.http = Some(Self::build_http_client(&self.config)?);
        tracing::debug!(endpoint = %self.config.endpoint(), "Connected to i-doit");
        Ok(())
    }

    /// Releases the connection handle.
    ///
    /// The session token survives; the next call reconnects and keeps using
    /// it.
    ///
    /// # Errors
    ///
    /// Returns `IdoitError::InvalidOperation` if not connected.
    pub fn disconnect(&mut self) -> Result<(), IdoitError> {
        if self.http.take().is_none() {
            return Err(IdoitError::invalid_operation("client is not connected"));
        }

        tracing::debug!("Disconnected from i-doit");
        Ok(())
    }

    /// Logs in with the configured credentials and stores the session token.
    ///
    /// Connects first if necessary.
    ///
    /// # Errors
    ///
    /// - `IdoitError::InvalidOperation` if already logged in
    /// - `IdoitError::Protocol` if the response carries no session id
    /// - any error of [`ApiClient::request`]
    pub async fn login(&mut self) -> Result<Login, IdoitError> {
        if self.is_logged_in() {
            return Err(IdoitError::invalid_operation("client is already logged in"));
        }

        let result = self.request("idoit.login", Params::new()).await?;
        let login: Login = serde_json::from_value(result).map_err(|e| {
            IdoitError::protocol(format!(
                "i-doit responded to login without a session id: {}",
                e
            ))
        })?;
        if login.session_id.is_empty() {
            return Err(IdoitError::protocol(
                "i-doit responded to login with an empty session id",
            ));
        }

        self.session = Some(login.session_id.clone());
        tracing::info!(username = ?login.username, "Logged in to i-doit");
        Ok(login)
    }

    /// Ends the session.
    ///
    /// The token is only cleared once the server confirms the logout.
    ///
    /// # Errors
    ///
    /// - `IdoitError::InvalidOperation` if not logged in
    /// - any error of [`ApiClient::request`]
    pub async fn logout(&mut self) -> Result<(), IdoitError> {
        if !self.is_logged_in() {
            return Err(IdoitError::invalid_operation("client is not logged in"));
        }

        self.request("idoit.logout", Params::new()).await?;
        self.session = None;
        tracing::info!("Logged out from i-doit");
        Ok(())
    }

    /// Logs out and disconnects, ignoring every failure.
    pub async fn close(mut self) {
        if self.is_logged_in() {
            if let Err(e) = self.logout().await {
                tracing::warn!(
                    error = %e.sanitized_display(&self.config.secrets()),
                    "Logout failed while closing client"
                );
            }
        }
        if self.is_connected() {
            let _ = self.disconnect();
        }
        self.session = None;
    }

    /// Calls a method and returns its `result`.
    ///
    /// `apikey` is always set; `language` is added when configured and not
    /// already present in `params`.
    ///
    /// # Errors
    ///
    /// - `IdoitError::InvalidArgument` for an empty method
    /// - transport errors (`Http`, `Timeout`, `HttpStatus`)
    /// - `IdoitError::Protocol` for responses violating JSON-RPC
    /// - `IdoitError::Api` for server-reported errors
    pub async fn request(&mut self, method: &str, params: Params) -> Result<Value, IdoitError> {
        if method.trim().is_empty() {
            return Err(IdoitError::invalid_argument("method must not be empty"));
        }

        let id = self.next_id();
        let envelope = RequestEnvelope::new(method, self.augment_params(params), id);
        tracing::debug!(method = %method, id = id, "Calling i-doit");

        let payload = serde_json::to_value(&envelope)?;
        let response = self.execute(payload, &HeaderMap::new(), method).await?;

        if let Some(response_id) = response.get("id").and_then(Value::as_u64) {
            if response_id != id {
                tracing::warn!(
                    method = %method,
                    expected = id,
                    received = response_id,
                    "Response id does not match request id"
                );
            }
        }

        evaluate_response(response)
    }

    /// Calls a method and deserializes its `result`.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::request`], plus `IdoitError::Protocol` when the
    /// result does not match `T`.
    pub async fn request_as<T>(&mut self, method: &str, params: Params) -> Result<T, IdoitError>
    where
        T: DeserializeOwned,
    {
        let result = self.request(method, params).await?;
        serde_json::from_value(result).map_err(|e| {
            IdoitError::protocol(format!("unexpected result for {}: {}", method, e))
        })
    }

    /// Sends several calls in one HTTP request.
    ///
    /// Results come back in request order. The first failing sub-response
    /// (in array order) aborts the whole call; no partial results are
    /// returned.
    ///
    /// # Errors
    ///
    /// - `IdoitError::InvalidArgument` for an empty batch or an entry without
    ///   a method (nothing is sent)
    /// - `IdoitError::Protocol` if the server does not answer with one
    ///   envelope per entry
    /// - `IdoitError::Api` carrying the failing entry's request id
    /// - transport errors
    pub async fn batch_request(
        &mut self,
        requests: Vec<BatchRequest>,
    ) -> Result<Vec<Value>, IdoitError> {
        if requests.is_empty() {
            return Err(IdoitError::invalid_argument(
                "batch request must contain at least one entry",
            ));
        }
        if let Some(index) = requests.iter().position(|r| r.method.trim().is_empty()) {
            return Err(IdoitError::invalid_argument(format!(
                "batch entry #{} is missing a method",
                index
            )));
        }

        let mut envelopes = Vec::with_capacity(requests.len());
        for entry in requests {
            let id = self.next_id();
            let params = self.augment_params(entry.params);
            envelopes.push(RequestEnvelope::new(entry.method, params, id));
        }
        tracing::debug!(
            entries = envelopes.len(),
            first_id = envelopes[0].id,
            "Calling i-doit with batch request"
        );

        let payload = serde_json::to_value(&envelopes)?;
        let response = self.execute(payload, &HeaderMap::new(), "batch").await?;

        let responses = match response {
            Value::Array(responses) => responses,
            other => {
                // A single envelope answers the batch as a whole.
                evaluate_response(other)?;
                return Err(IdoitError::protocol(
                    "i-doit answered a batch request with a single response",
                ));
            }
        };

        if responses.len() != envelopes.len() {
            return Err(IdoitError::protocol(format!(
                "i-doit answered {} batch entries with {} responses",
                envelopes.len(),
                responses.len()
            )));
        }

        responses
            .into_iter()
            .zip(&envelopes)
            .enumerate()
            .map(|(index, (response, envelope))| {
                evaluate_response(response).map_err(|e| batch_entry_error(e, index, envelope))
            })
            .collect()
    }

    /// Sends an arbitrary payload with extra headers.
    ///
    /// No API key or language is injected, no id is assigned and the
    /// response is not evaluated. Authentication headers are still attached.
    ///
    /// # Errors
    ///
    /// Transport errors and `IdoitError::Protocol` for non-JSON bodies.
    pub async fn raw_request(
        &mut self,
        payload: Value,
        headers: HeaderMap,
    ) -> Result<Value, IdoitError> {
        let operation = payload
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or("raw")
            .to_string();
        tracing::debug!(operation = %operation, "Sending raw request to i-doit");

        self.execute(payload, &headers, &operation).await
    }

    /// Posts a payload and decodes the JSON body.
    ///
    /// Connects on demand and refreshes the diagnostics snapshot.
    async fn execute(
        &mut self,
        payload: Value,
        extra_headers: &HeaderMap,
        operation: &str,
    ) -> Result<Value, IdoitError> {
        if !self.is_connected() {
            self.connect()?;
        }
        let http = match &self.http {
            Some(http) => http.clone(),
            None => return Err(IdoitError::invalid_operation("client is not connected")),
        };

        self.diagnostics.begin_call();
        let body = serde_json::to_vec(&payload)?;
        self.diagnostics.last_request_content = Some(payload);

        let mut builder = http
            .post(self.config.endpoint().clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(USER_AGENT_HEADER, USER_AGENT);
        if let Some(session) = &self.session {
            builder = builder.header(SESSION_HEADER, session);
        } else if let Some(credentials) = self.config.credentials() {
            builder = builder
                .header(USERNAME_HEADER, credentials.username())
                .header(PASSWORD_HEADER, credentials.password());
        }
        let request = builder
            .headers(extra_headers.clone())
            .body(body)
            .build()
            .map_err(IdoitError::Http)?;

        self.diagnostics.last_request_headers = Some(render_request_headers(&request));

        let started = Instant::now();
        let response = http
            .execute(request)
            .await
            .map_err(|e| Self::transport_error(e, operation))?;

        let status = response.status();
        let http_version = response.version();
        self.diagnostics.last_response_headers = Some(render_response_headers(
            http_version,
            status,
            response.headers(),
        ));
        let url = response.url().to_string();

        let body = response
            .text()
            .await
            .map_err(|e| Self::transport_error(e, operation))?;

        self.diagnostics.last_info = Some(TransportInfo {
            url,
            status,
            http_version: format!("{:?}", http_version),
            duration: started.elapsed(),
            body_size: body.len(),
        });
        tracing::debug!(
            operation = %operation,
            status = %status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "i-doit responded"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!(body = %self.loggable_body(&body), "i-doit response body");
        }

        let decoded = self.decode_body(status, &body)?;
        self.diagnostics.last_response = Some(decoded.clone());
        Ok(decoded)
    }

    /// Decodes a response body into a JSON object or array.
    fn decode_body(&self, status: StatusCode, body: &str) -> Result<Value, IdoitError> {
        if body.trim().is_empty() {
            if !status.is_success() {
                return Err(IdoitError::HttpStatus {
                    status,
                    body: String::new(),
                });
            }
            return Err(IdoitError::protocol(
                "i-doit responded with invalid JSON: empty body",
            ));
        }

        match serde_json::from_str::<Value>(body) {
            Ok(value @ (Value::Object(_) | Value::Array(_))) => Ok(value),
            _ => {
                let excerpt = self.excerpt(body);
                if status.is_success() {
                    Err(IdoitError::protocol(format!(
                        "i-doit responded with an invalid JSON string: {}",
                        excerpt
                    )))
                } else {
                    Err(IdoitError::HttpStatus {
                        status,
                        body: excerpt,
                    })
                }
            }
        }
    }

    /// Builds the HTTP client according to TLS and proxy settings.
    fn build_http_client(config: &Config) -> Result<Client, IdoitError> {
        let mut builder = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(USER_AGENT);

        if config.bypass_secure_connection() {
            tracing::warn!("TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(proxy_config) = config.proxy() {
            let mut proxy =
                Proxy::all(proxy_config.proxy_url()?).map_err(IdoitError::HttpClient)?;
            if let (ProxyType::Http, Some(credentials)) =
                (proxy_config.kind, &proxy_config.credentials)
            {
                proxy = proxy.basic_auth(credentials.username(), credentials.password());
            }
            tracing::debug!(
                kind = ?proxy_config.kind,
                host = %proxy_config.host,
                port = proxy_config.port,
                "Using proxy"
            );
            builder = builder.proxy(proxy);
        }

        builder.build().map_err(IdoitError::HttpClient)
    }

    fn transport_error(error: reqwest::Error, operation: &str) -> IdoitError {
        if error.is_timeout() {
            return IdoitError::timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS), operation);
        }
        IdoitError::Http(error)
    }

    /// Adds `apikey` (always) and `language` (unless present) to params.
    fn augment_params(&self, mut params: Params) -> Params {
        params.insert(
            "apikey".to_string(),
            Value::String(self.config.api_key().to_string()),
        );
        if let Some(language) = self.config.language() {
            params
                .entry("language")
                .or_insert_with(|| Value::String(language.to_string()));
        }
        params
    }

    fn next_id(&mut self) -> u64 {
        self.request_id += 1;
        self.request_id
    }

    /// Redacts the API key, passwords and the session token.
    fn sanitize(&self, text: &str) -> String {
        self.config
            .secrets()
            .into_iter()
            .chain(self.session.as_deref())
            .fold(text.to_string(), |text, secret| {
                IdoitError::sanitize_message(&text, secret)
            })
    }

    /// A response body fit for the log. Session ids handed out by
    /// `idoit.login` are not yet known to `sanitize`, so they are blanked by
    /// key.
    fn loggable_body(&self, body: &str) -> String {
        match serde_json::from_str::<Value>(body) {
            Ok(mut value) => {
                redact_session_ids(&mut value);
                self.sanitize(&value.to_string())
            }
            Err(_) => self.sanitize(body),
        }
    }

    /// Sanitizes and truncates a body for quoting in an error.
    fn excerpt(&self, body: &str) -> String {
        let body = self.sanitize(body);
        if body.chars().count() > MAX_ERROR_BODY_LEN {
            let truncated: String = body.chars().take(MAX_ERROR_BODY_LEN).collect();
            format!("{}...[truncated]", truncated)
        } else {
            body
        }
    }
}

impl Drop for ApiClient {
    /// Best-effort logout on the current tokio runtime. Never panics.
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        let http = match self.http.take() {
            Some(http) => http,
            None => match Self::build_http_client(&self.config) {
                Ok(http) => http,
                Err(_) => return,
            },
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("No async runtime available, skipping logout on drop");
            return;
        };

        let id = self.next_id();
        let envelope = RequestEnvelope::new("idoit.logout", self.augment_params(Params::new()), id);
        let request = http
            .post(self.config.endpoint().clone())
            .header(SESSION_HEADER, session)
            .json(&envelope);

        runtime.spawn(async move {
            match request.send().await {
                Ok(response) => {
                    tracing::debug!(status = %response.status(), "Logged out on drop");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Logout on drop failed");
                }
            }
        });
    }
}

fn redact_session_ids(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                if key == "session-id" {
                    *item = Value::String("[REDACTED]".to_string());
                } else {
                    redact_session_ids(item);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_session_ids),
        _ => {}
    }
}

/// Tags an evaluation failure with the batch entry it belongs to.
fn batch_entry_error(error: IdoitError, index: usize, envelope: &RequestEnvelope) -> IdoitError {
    match error {
        IdoitError::Api {
            code,
            message,
            request_id,
        } => IdoitError::Api {
            code,
            message,
            request_id: request_id.or(Some(envelope.id)),
        },
        IdoitError::Protocol(message) => IdoitError::Protocol(format!(
            "batch entry #{} ({}, id {}): {}",
            index, envelope.method, envelope.id, message
        )),
        other => other,
    }
}
