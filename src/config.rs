//! Client configuration.
//!
//! [`ClientBuilder`] collects settings, [`ClientBuilder::build_config`] validates them into a
//! [`ClientConfig`], and [`ClientBuilder::build`] spawns the dispatcher.

use crate::client::Client;
use crate::error::ConfigError;
use crate::rate_limit::HEADER_PRECISION;
use crate::sleeper::{Sleeper, TokioSleeper};
use crate::telemetry::{EventSink, NullSink, TelemetrySink};
use crate::transport::Transport;
use http::header::USER_AGENT;
use http::{HeaderMap, HeaderName, HeaderValue};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Default admission ceiling: requests in flight across all buckets.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

pub const PRODUCTION_BASE_URL: &str = "https://www.asaas.com/api/v3";
pub const SANDBOX_BASE_URL: &str = "https://sandbox.asaas.com/api/v3";

/// Sent as `User-Agent` on every request.
pub const USER_AGENT_VALUE: &str = concat!("ratequeue/", env!("CARGO_PKG_VERSION"));

/// Header carrying the API key.
pub const ACCESS_TOKEN_HEADER: &str = "access_token";

/// Which API host requests go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Production,
    #[default]
    Sandbox,
}

impl Environment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Production => PRODUCTION_BASE_URL,
            Environment::Sandbox => SANDBOX_BASE_URL,
        }
    }

    pub fn from_production_flag(production: bool) -> Self {
        if production {
            Environment::Production
        } else {
            Environment::Sandbox
        }
    }
}

/// Validated configuration.
#[derive(Clone)]
pub struct ClientConfig {
    pub(crate) max_concurrent: usize,
    pub(crate) environment: Environment,
    pub(crate) base_url: Url,
    pub(crate) default_headers: HeaderMap,
    pub(crate) sleeper: Arc<dyn Sleeper>,
    pub(crate) sink: EventSink,
    pub(crate) transport: Option<Arc<dyn Transport>>,
}

impl ClientConfig {
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Base URL with a trailing slash, ready for joining endpoints.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Headers sent on every request before caller overrides.
    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("max_concurrent", &self.max_concurrent)
            .field("environment", &self.environment)
            .field("base_url", &self.base_url.as_str())
            .field("sleeper", &self.sleeper)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    max_concurrent: usize,
    environment: Environment,
    base_url: Option<String>,
    access_token: Option<String>,
    headers: Vec<(String, String)>,
    sleeper: Arc<dyn Sleeper>,
    sink: EventSink,
    transport: Option<Arc<dyn Transport>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            environment: Environment::default(),
            base_url: None,
            access_token: None,
            headers: Vec::new(),
            sleeper: Arc::new(TokioSleeper),
            sink: NullSink.into_event_sink(),
            transport: None,
        }
    }

    /// Admission ceiling across all buckets. Must be > 0.
    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Use a base URL other than the environment's host.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Extra header sent on every request.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn sleeper<S: Sleeper + 'static>(mut self, sleeper: S) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub fn sink<S>(mut self, sink: S) -> Self
    where
        S: TelemetrySink,
        S::Future: Send + 'static,
    {
        self.sink = sink.into_event_sink();
        self
    }

    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build_config(self) -> Result<ClientConfig, ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::InvalidConcurrency(0));
        }

        let raw = self.base_url.as_deref().unwrap_or(self.environment.base_url());
        let base_url = parse_base_url(raw)?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        default_headers
            .insert(HeaderName::from_static(HEADER_PRECISION), HeaderValue::from_static("millisecond"));
        if let Some(token) = &self.access_token {
            let value = HeaderValue::from_str(token).map_err(|_| ConfigError::InvalidHeader {
                name: ACCESS_TOKEN_HEADER.to_string(),
            })?;
            default_headers.insert(HeaderName::from_static(ACCESS_TOKEN_HEADER), value);
        }
        for (name, value) in &self.headers {
            let invalid = || ConfigError::InvalidHeader { name: name.clone() };
            let header = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            default_headers.insert(header, value);
        }

        Ok(ClientConfig {
            max_concurrent: self.max_concurrent,
            environment: self.environment,
            base_url,
            default_headers,
            sleeper: self.sleeper,
            sink: self.sink,
            transport: self.transport,
        })
    }

    /// Validate and spawn the dispatcher. Must be called inside a tokio runtime.
    pub fn build(self) -> Result<Client, ConfigError> {
        Ok(Client::from_config(self.build_config()?))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("max_concurrent", &self.max_concurrent)
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl { url: raw.to_string(), reason };
    let mut url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(invalid("cannot be a base".to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
