//! Configuration management for the i-doit API client.
//!
//! Settings arrive as a loosely typed [`Settings`] record (built in code,
//! deserialized from JSON, or read from environment variables) and are
//! validated once into an immutable [`Config`]. Any violation is a
//! [`IdoitError::Config`] raised before a single byte goes over the wire.

use std::env;
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

use serde::Deserialize;
use url::Url;

use crate::error::IdoitError;

/// Raw, unvalidated client settings.
///
/// Keys follow the camelCase naming used by i-doit client configuration
/// files, so a JSON document can be deserialized directly.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Endpoint URL, e.g. `https://cmdb.example.com/src/jsonrpc.php`.
    pub url: Option<String>,
    /// TCP port; derived from the URL when absent.
    pub port: Option<i64>,
    /// API key.
    pub key: Option<String>,
    /// Username for header-based login.
    pub username: Option<String>,
    /// Password for header-based login.
    pub password: Option<String>,
    /// Language sent with every request unless the caller provides one.
    pub language: Option<String>,
    /// Outbound proxy.
    pub proxy: Option<ProxySettings>,
    /// Disables TLS certificate verification.
    pub bypass_secure_connection: Option<bool>,
}

/// Raw, unvalidated proxy settings.
#[derive(Clone, Default, Deserialize)]
pub struct ProxySettings {
    /// Whether the proxy is used at all. Mandatory.
    pub active: Option<bool>,
    /// `HTTP` or `SOCKS5`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Proxy host name or address.
    pub host: Option<String>,
    /// Proxy port.
    pub port: Option<i64>,
    /// Proxy username.
    pub username: Option<String>,
    /// Proxy password.
    pub password: Option<String>,
}

impl Settings {
    /// Creates settings with the two mandatory values.
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            key: Some(key.into()),
            ..Self::default()
        }
    }

    /// Sets an explicit port.
    pub fn with_port(mut self, port: i64) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets username and password.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Sets the request language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Sets the proxy block.
    pub fn with_proxy(mut self, proxy: ProxySettings) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Enables or disables TLS certificate verification bypass.
    pub fn with_bypass_secure_connection(mut self, bypass: bool) -> Self {
        self.bypass_secure_connection = Some(bypass);
        self
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("url", &self.url)
            .field("port", &self.port)
            .field("key", &redacted(&self.key))
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .field("language", &self.language)
            .field("proxy", &self.proxy)
            .field("bypass_secure_connection", &self.bypass_secure_connection)
            .finish()
    }
}

impl fmt::Debug for ProxySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySettings")
            .field("active", &self.active)
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &redacted(&self.password))
            .finish()
    }
}

fn redacted(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "[REDACTED]")
}

/// A username/password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// The username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password. Never log this value.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Supported proxy protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyType {
    /// Plain HTTP proxy (CONNECT for https targets).
    Http,
    /// SOCKS5 proxy.
    Socks5,
}

impl FromStr for ProxyType {
    type Err = IdoitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HTTP" => Ok(ProxyType::Http),
            "SOCKS5" => Ok(ProxyType::Socks5),
            other => Err(IdoitError::invalid_config(format!(
                "proxy type must be HTTP or SOCKS5, got {:?}",
                other
            ))),
        }
    }
}

/// Validated proxy configuration. Only present when the proxy is active.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Proxy protocol.
    pub kind: ProxyType,
    /// Proxy host.
    pub host: String,
    /// Proxy port.
    pub port: u16,
    /// Optional proxy credentials.
    pub credentials: Option<Credentials>,
}

impl ProxyConfig {
    /// Returns the proxy URL understood by the HTTP client.
    ///
    /// SOCKS5 credentials travel percent-encoded in the URL userinfo; HTTP
    /// proxies use basic auth set separately by the client. IPv6 hosts are
    /// bracketed.
    ///
    /// # Errors
    ///
    /// Returns `IdoitError::Config` if the host or credentials cannot be
    /// expressed as a URL.
    pub fn proxy_url(&self) -> Result<Url, IdoitError> {
        let scheme = match self.kind {
            ProxyType::Http => "http",
            ProxyType::Socks5 => "socks5",
        };
        let mut url = Url::parse(&format!("{}://localhost", scheme))
            .map_err(|e| IdoitError::invalid_config(format!("invalid proxy url: {}", e)))?;

        url.set_host(Some(&proxy_host(&self.host)?)).map_err(|e| {
            IdoitError::invalid_config(format!("invalid proxy.host {:?}: {}", self.host, e))
        })?;
        url.set_port(Some(self.port))
            .map_err(|_| IdoitError::invalid_config("proxy url does not accept a port"))?;

        if let (ProxyType::Socks5, Some(credentials)) = (self.kind, &self.credentials) {
            url.set_username(&credentials.username)
                .and_then(|_| url.set_password(Some(&credentials.password)))
                .map_err(|_| IdoitError::invalid_config("proxy url does not accept credentials"))?;
        }

        Ok(url)
    }
}

/// Brackets IPv6 literals and rejects hosts carrying a port.
fn proxy_host(host: &str) -> Result<String, IdoitError> {
    let host = host.trim();
    let unbracketed = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = unbracketed.parse::<Ipv6Addr>() {
        return Ok(format!("[{}]", ip));
    }
    if host.contains(':') {
        return Err(IdoitError::invalid_config(
            "proxy.host must not contain a port; use proxy.port",
        ));
    }
    Ok(host.to_string())
}

/// Validated, immutable client configuration.
#[derive(Clone)]
pub struct Config {
    endpoint: Url,
    port: u16,
    api_key: String,
    credentials: Option<Credentials>,
    language: Option<String>,
    proxy: Option<ProxyConfig>,
    bypass_secure_connection: bool,
}

impl Config {
    /// Validates settings into a configuration.
    ///
    /// # Errors
    ///
    /// Returns `IdoitError::Config` describing the first violated rule.
    pub fn new(settings: Settings) -> Result<Self, IdoitError> {
        let url = required(settings.url, "url")?;
        let api_key = required(settings.key, "key")?;
        let mut endpoint = Self::validate_url(&url)?;

        let port = match settings.port {
            Some(port) => validate_port(port, "port")?,
            None => endpoint.port_or_known_default().ok_or_else(|| {
                IdoitError::invalid_config("unable to derive port from url")
            })?,
        };
        endpoint
            .set_port(Some(port))
            .map_err(|_| IdoitError::invalid_config("url does not accept a port"))?;

        let credentials = credential_pair(settings.username, settings.password, "")?;

        let language = match settings.language {
            Some(language) if language.trim().is_empty() => {
                return Err(IdoitError::invalid_config("language must not be empty"));
            }
            other => other,
        };

        let proxy = match settings.proxy {
            Some(proxy) => Self::validate_proxy(proxy)?,
            None => None,
        };

        Ok(Config {
            endpoint,
            port,
            api_key,
            credentials,
            language,
            proxy,
            bypass_secure_connection: settings.bypass_secure_connection.unwrap_or(false),
        })
    }

    /// Validates loosely typed JSON settings.
    ///
    /// Values of the wrong type (a string port, a non-object proxy block,
    /// a non-boolean bypass flag) are configuration errors.
    ///
    /// # Errors
    ///
    /// Returns `IdoitError::Config` on type mismatches or rule violations.
    pub fn from_json(value: serde_json::Value) -> Result<Self, IdoitError> {
        if !value.is_object() {
            return Err(IdoitError::invalid_config("settings must be a JSON object"));
        }
        let settings: Settings = serde_json::from_value(value)
            .map_err(|e| IdoitError::invalid_config(format!("malformed settings: {}", e)))?;
        Self::new(settings)
    }

    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `IDOIT_URL`, `IDOIT_KEY` (required)
    /// - `IDOIT_PORT`, `IDOIT_USERNAME`, `IDOIT_PASSWORD`, `IDOIT_LANGUAGE`
    /// - `IDOIT_BYPASS_SECURE_CONNECTION`
    /// - `IDOIT_PROXY_ACTIVE`, `IDOIT_PROXY_TYPE`, `IDOIT_PROXY_HOST`,
    ///   `IDOIT_PROXY_PORT`, `IDOIT_PROXY_USERNAME`, `IDOIT_PROXY_PASSWORD`
    ///
    /// # Errors
    ///
    /// Returns `IdoitError::Config` if a required variable is missing or a
    /// value fails validation.
    ///
    /// # Example
    ///
    /// ```ignore
    /// dotenvy::dotenv().ok();
    /// let config = Config::from_env()?;
    /// ```
    pub fn from_env() -> Result<Self, IdoitError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IdoitError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let url = get("IDOIT_URL").ok_or_else(|| missing_env("IDOIT_URL"))?;
        let key = get("IDOIT_KEY").ok_or_else(|| missing_env("IDOIT_KEY"))?;

        let proxy_vars = [
            "IDOIT_PROXY_ACTIVE",
            "IDOIT_PROXY_TYPE",
            "IDOIT_PROXY_HOST",
            "IDOIT_PROXY_PORT",
            "IDOIT_PROXY_USERNAME",
            "IDOIT_PROXY_PASSWORD",
        ];
        let proxy = if proxy_vars.iter().any(|&name| get(name).is_some()) {
            Some(ProxySettings {
                active: get("IDOIT_PROXY_ACTIVE")
                    .map(|v| parse_env_bool("IDOIT_PROXY_ACTIVE", &v))
                    .transpose()?,
                kind: get("IDOIT_PROXY_TYPE"),
                host: get("IDOIT_PROXY_HOST"),
                port: get("IDOIT_PROXY_PORT")
                    .map(|v| parse_env_int("IDOIT_PROXY_PORT", &v))
                    .transpose()?,
                username: get("IDOIT_PROXY_USERNAME"),
                password: get("IDOIT_PROXY_PASSWORD"),
            })
        } else {
            None
        };

        let settings = Settings {
            url: Some(url),
            port: get("IDOIT_PORT")
                .map(|v| parse_env_int("IDOIT_PORT", &v))
                .transpose()?,
            key: Some(key),
            username: get("IDOIT_USERNAME"),
            password: get("IDOIT_PASSWORD"),
            language: get("IDOIT_LANGUAGE"),
            proxy,
            bypass_secure_connection: get("IDOIT_BYPASS_SECURE_CONNECTION")
                .map(|v| parse_env_bool("IDOIT_BYPASS_SECURE_CONNECTION", &v))
                .transpose()?,
        };

        Self::new(settings)
    }

    /// The endpoint URL with the resolved port applied.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The resolved TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The API key. Never log this value.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Username/password pair, if configured.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// The configured request language.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// The active proxy, if any.
    pub fn proxy(&self) -> Option<&ProxyConfig> {
        self.proxy.as_ref()
    }

    /// Whether TLS certificate verification is disabled.
    pub fn bypass_secure_connection(&self) -> bool {
        self.bypass_secure_connection
    }

    /// Values that must never appear in logs or error messages.
    pub(crate) fn secrets(&self) -> Vec<&str> {
        let mut secrets = vec![self.api_key.as_str()];
        if let Some(credentials) = &self.credentials {
            secrets.push(credentials.password());
        }
        if let Some(credentials) = self.proxy.as_ref().and_then(|p| p.credentials.as_ref()) {
            secrets.push(credentials.password());
        }
        secrets
    }

    /// Validates the endpoint URL.
    fn validate_url(url: &str) -> Result<Url, IdoitError> {
        let url = url.trim();

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(IdoitError::invalid_config(
                "url must start with http:// or https://",
            ));
        }

        Url::parse(url).map_err(|e| IdoitError::invalid_config(format!("invalid url: {}", e)))
    }

    /// Validates the proxy block. Inactive proxies validate to `None`.
    fn validate_proxy(proxy: ProxySettings) -> Result<Option<ProxyConfig>, IdoitError> {
        let active = proxy
            .active
            .ok_or_else(|| IdoitError::invalid_config("proxy.active is required"))?;
        if !active {
            return Ok(None);
        }

        let kind = required(proxy.kind, "proxy.type")?.parse::<ProxyType>()?;
        let host = required(proxy.host, "proxy.host")?;
        let port = proxy
            .port
            .ok_or_else(|| IdoitError::invalid_config("proxy.port is required"))
            .and_then(|port| validate_port(port, "proxy.port"))?;
        let credentials = credential_pair(proxy.username, proxy.password, "proxy.")?;

        let proxy = ProxyConfig {
            kind,
            host,
            port,
            credentials,
        };
        proxy.proxy_url()?;
        Ok(Some(proxy))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint.as_str())
            .field("port", &self.port)
            .field("api_key", &"[REDACTED]")
            .field("credentials", &self.credentials)
            .field("language", &self.language)
            .field("proxy", &self.proxy)
            .field("bypass_secure_connection", &self.bypass_secure_connection)
            .finish()
    }
}

impl TryFrom<Settings> for Config {
    type Error = IdoitError;

    fn try_from(settings: Settings) -> Result<Self, Self::Error> {
        Config::new(settings)
    }
}

/// Returns the value if present and not blank.
fn required(value: Option<String>, name: &str) -> Result<String, IdoitError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        Some(_) => Err(IdoitError::invalid_config(format!(
            "{} must not be empty",
            name
        ))),
        None => Err(IdoitError::invalid_config(format!("{} is required", name))),
    }
}

fn validate_port(port: i64, name: &str) -> Result<u16, IdoitError> {
    u16::try_from(port)
        .ok()
        .filter(|port| *port >= 1)
        .ok_or_else(|| {
            IdoitError::invalid_config(format!(
                "{} must be between 1 and 65535, got {}",
                name, port
            ))
        })
}

/// Username and password must be given together, both non-empty.
fn credential_pair(
    username: Option<String>,
    password: Option<String>,
    prefix: &str,
) -> Result<Option<Credentials>, IdoitError> {
    match (username, password) {
        (None, None) => Ok(None),
        (Some(username), Some(password)) => {
            if username.trim().is_empty() || password.is_empty() {
                return Err(IdoitError::invalid_config(format!(
                    "{}username and {}password must not be empty",
                    prefix, prefix
                )));
            }
            Ok(Some(Credentials { username, password }))
        }
        (Some(_), None) => Err(IdoitError::invalid_config(format!(
            "{}username requires {}password",
            prefix, prefix
        ))),
        (None, Some(_)) => Err(IdoitError::invalid_config(format!(
            "{}password requires {}username",
            prefix, prefix
        ))),
    }
}

fn missing_env(name: &str) -> IdoitError {
    IdoitError::invalid_config(format!(
        "missing required environment variable: {}",
        name
    ))
}

fn parse_env_int(name: &str, value: &str) -> Result<i64, IdoitError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| IdoitError::invalid_config(format!("{} must be an integer", name)))
}

fn parse_env_bool(name: &str, value: &str) -> Result<bool, IdoitError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(IdoitError::invalid_config(format!(
            "{} must be a boolean",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use std::collections::HashMap;

    const URL: &str = "https://cmdb.example.com/src/jsonrpc.php";

    fn assert_config_error(result: Result<Config, IdoitError>) {
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration, "{}", err);
    }

    #[test]
    fn test_minimal_settings() {
        let config = Config::new(Settings::new(URL, "c1ia5q")).unwrap();
        assert_eq!(config.port(), 443);
        assert_eq!(config.api_key(), "c1ia5q");
        assert!(config.credentials().is_none());
        assert!(config.language().is_none());
        assert!(config.proxy().is_none());
        assert!(!config.bypass_secure_connection());
    }

    #[test]
    fn test_missing_url_or_key() {
        assert_config_error(Config::new(Settings {
            key: Some("c1ia5q".to_string()),
            ..Settings::default()
        }));
        assert_config_error(Config::new(Settings {
            url: Some(URL.to_string()),
            ..Settings::default()
        }));
        assert_config_error(Config::new(Settings::new("", "c1ia5q")));
        assert_config_error(Config::new(Settings::new(URL, "  ")));
    }

    #[test]
    fn test_url_requires_scheme() {
        assert_config_error(Config::new(Settings::new("cmdb.example.com", "k")));
        assert_config_error(Config::new(Settings::new("ftp://cmdb.example.com", "k")));
    }

    #[test]
    fn test_port_derived_from_scheme() {
        let http = Config::new(Settings::new("http://cmdb.example.com/src/jsonrpc.php", "k"))
            .unwrap();
        assert_eq!(http.port(), 80);

        let https = Config::new(Settings::new(URL, "k")).unwrap();
        assert_eq!(https.port(), 443);
    }

    #[test]
    fn test_port_taken_from_url_when_explicit() {
        let config = Config::new(Settings::new("http://127.0.0.1:8080/jsonrpc", "k")).unwrap();
        assert_eq!(config.port(), 8080);
        assert_eq!(config.endpoint().as_str(), "http://127.0.0.1:8080/jsonrpc");
    }

    #[test]
    fn test_explicit_port_overrides_url() {
        let config = Config::new(Settings::new(URL, "k").with_port(8443)).unwrap();
        assert_eq!(config.port(), 8443);
        assert_eq!(config.endpoint().port(), Some(8443));
    }

    #[test]
    fn test_port_out_of_range() {
        for port in [0, -1, 65536, 100_000] {
            assert_config_error(Config::new(Settings::new(URL, "k").with_port(port)));
        }
        assert!(Config::new(Settings::new(URL, "k").with_port(1)).is_ok());
        assert!(Config::new(Settings::new(URL, "k").with_port(65535)).is_ok());
    }

    #[test]
    fn test_credentials_must_be_paired() {
        let mut settings = Settings::new(URL, "k");
        settings.username = Some("admin".to_string());
        assert_config_error(Config::new(settings));

        let mut settings = Settings::new(URL, "k");
        settings.password = Some("admin".to_string());
        assert_config_error(Config::new(settings));

        assert_config_error(Config::new(
            Settings::new(URL, "k").with_credentials("admin", ""),
        ));

        let config = Config::new(Settings::new(URL, "k").with_credentials("admin", "secret"))
            .unwrap();
        let credentials = config.credentials().unwrap();
        assert_eq!(credentials.username(), "admin");
        assert_eq!(credentials.password(), "secret");
    }

    #[test]
    fn test_language_must_not_be_empty() {
        assert_config_error(Config::new(Settings::new(URL, "k").with_language("")));
        let config = Config::new(Settings::new(URL, "k").with_language("de")).unwrap();
        assert_eq!(config.language(), Some("de"));
    }

    #[test]
    fn test_proxy_requires_active_flag() {
        assert_config_error(Config::new(
            Settings::new(URL, "k").with_proxy(ProxySettings::default()),
        ));
    }

    #[test]
    fn test_inactive_proxy_is_ignored() {
        let config = Config::new(Settings::new(URL, "k").with_proxy(ProxySettings {
            active: Some(false),
            ..ProxySettings::default()
        }))
        .unwrap();
        assert!(config.proxy().is_none());
    }

    #[test]
    fn test_active_proxy_requires_type_host_port() {
        let complete = ProxySettings {
            active: Some(true),
            kind: Some("HTTP".to_string()),
            host: Some("proxy.example.com".to_string()),
            port: Some(3128),
            ..ProxySettings::default()
        };
        assert!(Config::new(Settings::new(URL, "k").with_proxy(complete.clone())).is_ok());

        let mut no_type = complete.clone();
        no_type.kind = None;
        assert_config_error(Config::new(Settings::new(URL, "k").with_proxy(no_type)));

        let mut bad_type = complete.clone();
        bad_type.kind = Some("FTP".to_string());
        assert_config_error(Config::new(Settings::new(URL, "k").with_proxy(bad_type)));

        let mut no_host = complete.clone();
        no_host.host = None;
        assert_config_error(Config::new(Settings::new(URL, "k").with_proxy(no_host)));

        let mut no_port = complete.clone();
        no_port.port = None;
        assert_config_error(Config::new(Settings::new(URL, "k").with_proxy(no_port)));

        let mut half_credentials = complete;
        half_credentials.username = Some("proxyuser".to_string());
        assert_config_error(Config::new(
            Settings::new(URL, "k").with_proxy(half_credentials),
        ));
    }

    #[test]
    fn test_socks5_proxy_url_carries_credentials() {
        let config = Config::new(Settings::new(URL, "k").with_proxy(ProxySettings {
            active: Some(true),
            kind: Some("SOCKS5".to_string()),
            host: Some("socks.example.com".to_string()),
            port: Some(1080),
            username: Some("u".to_string()),
            password: Some("p".to_string()),
        }))
        .unwrap();
        let proxy = config.proxy().unwrap();
        assert_eq!(proxy.kind, ProxyType::Socks5);
        assert_eq!(
            proxy.proxy_url().unwrap().as_str(),
            "socks5://u:p@socks.example.com:1080"
        );
    }

    #[test]
    fn test_from_json_rejects_wrong_types() {
        assert_config_error(Config::from_json(json!("not an object")));
        assert_config_error(Config::from_json(json!({
            "url": URL, "key": "k", "port": "443"
        })));
        assert_config_error(Config::from_json(json!({
            "url": URL, "key": "k", "proxy": "yes"
        })));
        assert_config_error(Config::from_json(json!({
            "url": URL, "key": "k", "bypassSecureConnection": "true"
        })));
    }

    #[test]
    fn test_from_json_full_settings() {
        let config = Config::from_json(json!({
            "url": URL,
            "port": 8443,
            "key": "c1ia5q",
            "username": "admin",
            "password": "admin",
            "language": "en",
            "proxy": {
                "active": true,
                "type": "HTTP",
                "host": "proxy.example.com",
                "port": 3128
            },
            "bypassSecureConnection": true
        }))
        .unwrap();
        assert_eq!(config.port(), 8443);
        assert_eq!(config.language(), Some("en"));
        assert!(config.bypass_secure_connection());
        assert_eq!(
            config.proxy().unwrap().proxy_url().unwrap().as_str(),
            "http://proxy.example.com:3128/"
        );
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("IDOIT_URL", "http://cmdb.local/src/jsonrpc.php"),
            ("IDOIT_KEY", "c1ia5q"),
            ("IDOIT_USERNAME", "admin"),
            ("IDOIT_PASSWORD", "admin"),
            ("IDOIT_LANGUAGE", "de"),
            ("IDOIT_BYPASS_SECURE_CONNECTION", "yes"),
        ]);
        let config = Config::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.port(), 80);
        assert_eq!(config.language(), Some("de"));
        assert!(config.bypass_secure_connection());
        assert!(config.credentials().is_some());
    }

    #[test]
    fn test_from_lookup_missing_key() {
        let err = Config::from_lookup(|name| match name {
            "IDOIT_URL" => Some("http://cmdb.local".to_string()),
            "IDOIT_KEY" => Some("   ".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("IDOIT_KEY"));
    }

    #[test]
    fn test_from_lookup_invalid_port() {
        let err = Config::from_lookup(|name| match name {
            "IDOIT_URL" => Some("http://cmdb.local".to_string()),
            "IDOIT_KEY" => Some("k".to_string()),
            "IDOIT_PORT" => Some("eighty".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(err.to_string().contains("IDOIT_PORT"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::new(Settings::new(URL, "c1ia5q").with_credentials("admin", "hunter2"))
            .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("c1ia5q"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("admin"));
    }

    fn socks5(host: &str, username: &str, password: &str) -> ProxySettings {
        ProxySettings {
            active: Some(true),
            kind: Some("SOCKS5".to_string()),
            host: Some(host.to_string()),
            port: Some(1080),
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[test]
    fn test_socks5_credentials_are_percent_encoded() {
        let settings =
            Settings::new(URL, "k").with_proxy(socks5("socks.local", "user", "p@ss/w:rd"));
        let config = Config::new(settings).unwrap();
        let url = config.proxy().unwrap().proxy_url().unwrap();
        assert_eq!(url.host_str(), Some("socks.local"));
        assert_eq!(url.port(), Some(1080));
        assert_eq!(url.username(), "user");
        assert_eq!(url.password(), Some("p%40ss%2Fw%3Ard"));
    }

    #[test]
    fn test_proxy_ipv6_host_is_bracketed() {
        let settings = Settings::new(URL, "k").with_proxy(socks5("::1", "u", "p"));
        let config = Config::new(settings).unwrap();
        let url = config.proxy().unwrap().proxy_url().unwrap();
        assert_eq!(url.host_str(), Some("[::1]"));
        assert_eq!(url.as_str(), "socks5://u:p@[::1]:1080");
    }

    #[test]
    fn test_proxy_host_rejects_port_and_path() {
        assert_config_error(Config::new(
            Settings::new(URL, "k").with_proxy(socks5("socks.local:1080", "u", "p")),
        ));
        assert_config_error(Config::new(
            Settings::new(URL, "k").with_proxy(socks5("socks.local/x", "u", "p")),
        ));
    }

    #[test]
    fn test_settings_debug_redacts_secrets() {
        let settings = Settings::new(URL, "c1ia5q")
            .with_credentials("admin", "hunter2")
            .with_proxy(socks5("socks.local", "proxyuser", "pr0xy"));
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("c1ia5q"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("pr0xy"));
        assert!(debug.contains("admin"));
        assert!(debug.contains("proxyuser"));
    }

    #[test]
    fn test_secrets_include_proxy_password() {
        let config = Config::new(
            Settings::new(URL, "c1ia5q")
                .with_credentials("admin", "hunter2")
                .with_proxy(socks5("socks.local", "proxyuser", "pr0xy")),
        )
        .unwrap();
        assert_eq!(config.secrets(), vec!["c1ia5q", "hunter2", "pr0xy"]);
    }
}
