//! Blocking HTTP client with retry and authentication
//!
//! ## Overview
//!
//! The engine's external calls are few and small: one forecast fetch per
//! hourly run and at most a handful of webhook posts. A blocking `ureq` agent
//! with a hard timeout fits that better than an async stack, and keeps every
//! call bounded so a slow endpoint cannot stall the run.
//!
//! ## Retry Policy
//!
//! - Transport errors, `429` and `5xx` are retried with exponential backoff.
//! - Other `4xx` responses are returned immediately: repeating a bad request
//!   does not fix it.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use airwatch_connectors::http::{HttpClient, HttpConfig};
//!
//! let client = HttpClient::new(
//!     HttpConfig::new("https://hooks.example.com")
//!         .bearer_token("token")
//!         .timeout_secs(10),
//! )?;
//! let reply = client.post_json("/airwatch", &serde_json::json!({ "text": "hello" }))?;
//! # Ok::<(), airwatch_connectors::http::HttpError>(())
//! ```

use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

use crate::ConnectionStats;

/// HTTP-specific errors
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(String),

    /// Server returned error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// HTTP configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Per-request timeout, connect through body
    pub timeout: Duration,
    /// Authentication method
    pub auth: AuthMethod,
    /// Custom headers
    pub headers: BTreeMap<String, String>,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub backoff_base: Duration,
    /// Upper bound on any single retry delay
    pub backoff_max: Duration,
    /// User agent string
    pub user_agent: String,
}

/// Authentication methods
#[derive(Debug, Clone, PartialEq)]
pub enum AuthMethod {
    /// No authentication
    None,
    /// Bearer token
    Bearer(String),
    /// Basic authentication
    Basic { username: String, password: String },
    /// API key in header
    ApiKey { header: String, value: String },
}

impl AuthMethod {
    /// Header carrying the credentials, if any
    pub fn header(&self) -> Option<(String, String)> {
        match self {
            AuthMethod::None => None,
            AuthMethod::Bearer(token) => Some(("Authorization".into(), format!("Bearer {}", token))),
            AuthMethod::Basic { username, password } => {
                let credentials = STANDARD.encode(format!("{}:{}", username, password));
                Some(("Authorization".into(), format!("Basic {}", credentials)))
            }
            AuthMethod::ApiKey { header, value } => Some((header.clone(), value.clone())),
        }
    }
}

impl HttpConfig {
    /// Create new configuration with base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            auth: AuthMethod::None,
            headers: BTreeMap::new(),
            max_retries: 2,
            backoff_base: Duration::from_millis(250),
            backoff_max: Duration::from_secs(4),
            user_agent: format!("AirWatch/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set bearer token authentication
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = AuthMethod::Bearer(token.into());
        self
    }

    /// Set basic authentication
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::Basic {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    /// Set API key authentication
    pub fn api_key(mut self, header: impl Into<String>, value: impl Into<String>) -> Self {
        self.auth = AuthMethod::ApiKey {
            header: header.into(),
            value: value.into(),
        };
        self
    }

    /// Set request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    /// Add custom header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.backoff_base
            .checked_mul(factor)
            .map_or(self.backoff_max, |delay| delay.min(self.backoff_max))
    }

    fn url(&self, path: &str) -> String {
        if path.is_empty() {
            return self.base_url.clone();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// HTTP client over a `ureq` agent
pub struct HttpClient {
    config: HttpConfig,
    agent: ureq::Agent,
    stats: Mutex<ConnectionStats>,
}

impl HttpClient {
    /// Create new HTTP client
    pub fn new(config: HttpConfig) -> Result<Self, HttpError> {
        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(HttpError::Config("Base URL must start with http:// or https://".into()));
        }
        if config.timeout.is_zero() {
            return Err(HttpError::Config("Timeout must be positive".into()));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();

        Ok(Self {
            config,
            agent,
            stats: Mutex::new(ConnectionStats::default()),
        })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// GET `path` with query parameters and decode the JSON reply
    pub fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value, HttpError> {
        let mut request = self.build_request(self.agent.get(&self.config.url(path)));
        for (name, value) in query {
            request = request.query(name, value);
        }
        self.execute_with_retry(request, None)
    }

    /// POST a JSON body to `path`
    pub fn post_json<T: Serialize>(&self, path: &str, body: &T) -> Result<Value, HttpError> {
        let json = serde_json::to_string(body).map_err(|e| HttpError::Serialization(e.to_string()))?;
        let request = self
            .build_request(self.agent.post(&self.config.url(path)))
            .set("Content-Type", "application/json");
        self.execute_with_retry(request, Some(json))
    }

    pub fn stats(&self) -> ConnectionStats {
        self.stats.lock().map(|stats| stats.clone()).unwrap_or_default()
    }

    fn record(&self, update: impl FnOnce(&mut ConnectionStats)) {
        if let Ok(mut stats) = self.stats.lock() {
            update(&mut stats);
        }
    }

    /// Attach authentication and headers
    fn build_request(&self, mut request: ureq::Request) -> ureq::Request {
        if let Some((name, value)) = self.config.auth.header() {
            request = request.set(&name, &value);
        }
        for (name, value) in &self.config.headers {
            request = request.set(name, value);
        }
        request.set("Accept", "application/json")
    }

    fn execute_with_retry(&self, request: ureq::Request, body: Option<String>) -> Result<Value, HttpError> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = self.config.retry_delay(attempt);
                debug!("retry {} of {} {} in {:?}", attempt, request.method(), request.url(), delay);
                self.record(|s| s.retries += 1);
                std::thread::sleep(delay);
            }

            let response = match &body {
                Some(json) => request.clone().send_string(json),
                None => request.clone().call(),
            };

            match response {
                Ok(resp) => {
                    let sent = body.as_ref().map_or(0, |b| b.len() as u64);
                    self.record(|s| {
                        s.requests_ok += 1;
                        s.bytes_sent += sent;
                    });
                    let text = resp.into_string().map_err(|e| HttpError::Request(e.to_string()))?;
                    if text.trim().is_empty() {
                        return Ok(Value::Null);
                    }
                    return serde_json::from_str(&text).map_err(|e| HttpError::Serialization(e.to_string()));
                }
                Err(ureq::Error::Status(code, resp)) => {
                    let error = HttpError::ServerError {
                        status: code,
                        message: resp.into_string().unwrap_or_default(),
                    };
                    if code >= 500 || code == 429 {
                        last_error = Some(error);
                        continue;
                    }
                    return Err(self.failed(error));
                }
                Err(ureq::Error::Transport(e)) => {
                    last_error = Some(HttpError::Request(e.to_string()));
                    continue;
                }
            }
        }

        let error = last_error.unwrap_or_else(|| HttpError::Request("no attempt made".into()));
        warn!("{} {} failed after {} attempts: {}", request.method(), request.url(), self.config.max_retries + 1, error);
        Err(self.failed(error))
    }

    fn failed(&self, error: HttpError) -> HttpError {
        let message = error.to_string();
        self.record(|s| {
            s.requests_failed += 1;
            s.last_error = Some(message);
        });
        error
    }
}
