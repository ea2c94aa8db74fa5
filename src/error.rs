//! Error types surfaced to callers of the dispatcher.
//!
//! `502`/`525` and `429` (with a usable retry-after) are absorbed by the dispatcher and never
//! reach a caller; everything else lands in [`DispatchError`].
use http::StatusCode;
use std::fmt;

/// Boxed error used as the source of transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Details of a non-2xx response the remote API sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFailure {
    /// HTTP status of the response.
    pub status: StatusCode,
    /// Application error code from the response body, when it carried one.
    pub code: Option<String>,
    /// Human-readable reason derived from the status line and body.
    pub reason: String,
}

impl RemoteFailure {
    pub fn new(status: StatusCode, reason: impl Into<String>) -> Self {
        Self { status, code: None, reason: reason.into() }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} [{}]: {}", self.status.as_u16(), code, self.reason),
            None => write!(f, "{}: {}", self.status.as_u16(), self.reason),
        }
    }
}

/// Failure of the underlying network call (connection refused, reset, TLS, ...).
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), source: None }
    }

    /// Wrap a lower-level error, keeping it reachable through `source()`.
    pub fn with_source<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self { message: message.into(), source: Some(source.into()) }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Outcome of a request that did not produce a successful payload.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No transport was configured when the request was submitted.
    #[error("HTTP transport is missing")]
    DriverMissing,
    /// The network call itself failed.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
    /// 401 from the remote API.
    #[error("unauthorized: {0}")]
    Unauthorized(RemoteFailure),
    /// 403 from the remote API.
    #[error("forbidden: {0}")]
    Forbidden(RemoteFailure),
    /// 404 from the remote API.
    #[error("not found: {0}")]
    NotFound(RemoteFailure),
    /// 500 complaining that the response body was too long to produce.
    #[error("response too large: {0}")]
    ResponseTooLarge(RemoteFailure),
    /// Any other non-2xx status.
    #[error("request failed: {0}")]
    RequestFailed(RemoteFailure),
    /// 429 without a retry-after in the body or a `RateLimit-Reset` header.
    #[error("rate limited ({status}) without a usable retry-after")]
    RateLimitProtocol { status: StatusCode },
    /// The request could not be built (bad URL, unserializable body, invalid header).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// The dispatcher stopped before the request completed.
    #[error("dispatcher shut down before the request completed")]
    Shutdown,
}

impl DispatchError {
    /// Remote status code, when the error came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Unauthorized(f)
            | Self::Forbidden(f)
            | Self::NotFound(f)
            | Self::ResponseTooLarge(f)
            | Self::RequestFailed(f) => Some(f.status),
            Self::RateLimitProtocol { status } => Some(*status),
            _ => None,
        }
    }

    /// Remote failure details, when the error came from a response body.
    pub fn remote(&self) -> Option<&RemoteFailure> {
        match self {
            Self::Unauthorized(f)
            | Self::Forbidden(f)
            | Self::NotFound(f)
            | Self::ResponseTooLarge(f)
            | Self::RequestFailed(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_driver_missing(&self) -> bool {
        matches!(self, Self::DriverMissing)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_response_too_large(&self) -> bool {
        matches!(self, Self::ResponseTooLarge(_))
    }

    pub fn is_rate_limit_protocol(&self) -> bool {
        matches!(self, Self::RateLimitProtocol { .. })
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown)
    }
}

/// Invalid client configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The admission ceiling must allow at least one request in flight.
    #[error("max_concurrent must be > 0 (got {0})")]
    InvalidConcurrency(usize),
    /// The base URL override did not parse as an absolute URL.
    #[error("invalid base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    /// A default header name or value was rejected.
    #[error("invalid default header {name:?}")]
    InvalidHeader { name: String },
}
