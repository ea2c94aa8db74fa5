//! The network boundary.
//!
//! A [`Transport`] performs exactly one HTTP exchange per call. It must not retry and must
//! not interpret rate-limit headers; the dispatcher owns both concerns.
//!
//! - Production: `ratequeue-reqwest` provides a `reqwest`-backed transport.
//! - Tests: [`ScriptedTransport`] answers from a script and records every call.

use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use std::fmt;
use url::Url;

mod scripted;
pub use scripted::{CallRecord, ScriptedTransport};

/// Fully-formed outbound request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Response as received from the network, any status.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: StatusCode) -> Self {
        Self { status, headers: HeaderMap::new(), body: Bytes::new() }
    }

    pub fn ok() -> Self {
        Self::new(StatusCode::OK)
    }

    /// Append a header. Invalid names or values are skipped with a warning.
    pub fn with_header(mut self, name: &str, value: impl fmt::Display) -> Self {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value.to_string())) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => tracing::warn!(header = name, "skipping invalid response header"),
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// JSON body plus `Content-Type: application/json`.
    pub fn with_json(self, value: &serde_json::Value) -> Self {
        self.with_header("content-type", "application/json").with_body(value.to_string())
    }

    /// Shorthand for the three `RateLimit-*` headers.
    pub fn with_quota(self, limit: u32, remaining: u32, reset_secs: f64) -> Self {
        self.with_header(crate::rate_limit::HEADER_LIMIT, limit)
            .with_header(crate::rate_limit::HEADER_REMAINING, remaining)
            .with_header(crate::rate_limit::HEADER_RESET, reset_secs)
    }

    /// First value of a header, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Executes a single HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn execute(&self, request: &TransportRequest)
        -> Result<TransportResponse, TransportError>;
}
