//! `reqwest` transport for `ratequeue` (companion crate).
//!
//! ```rust,no_run
//! use ratequeue::Client;
//! use ratequeue_reqwest::ReqwestTransport;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::builder()
//!     .access_token("$aact_example")
//!     .transport(ReqwestTransport::new())
//!     .build()?;
//! let balance = client.get("finance/balance").await?;
//! # Ok(()) }
//! ```

use async_trait::async_trait;
use ratequeue::transport::{Transport, TransportRequest, TransportResponse};
use ratequeue::TransportError;
use std::time::Duration;

/// Performs each exchange with a shared `reqwest::Client` (connection pool included).
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Client whose calls fail with a transport error after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::with_source("failed to build HTTP client", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        request: &TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let fail = |stage: &str, err: reqwest::Error| {
            tracing::debug!(method = %request.method, url = %request.url, error = %err, "{}", stage);
            TransportError::with_source(
                format!("{} {} {}: {}", request.method, request.url.path(), stage, err),
                err,
            )
        };

        let response = builder.send().await.map_err(|e| fail("request failed", e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| fail("reading body failed", e))?;

        Ok(TransportResponse { status, headers, body })
    }
}
