use super::{Transport, TransportRequest, TransportResponse};
use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

type Responder =
    dyn Fn(&TransportRequest, usize) -> Result<TransportResponse, TransportError> + Send + Sync;

/// One call observed by [`ScriptedTransport`]. Instants come from tokio's clock, so they are
/// deterministic under a paused runtime.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub started_at: Instant,
    pub finished_at: Option<Instant>,
    pub status: Option<StatusCode>,
}

impl CallRecord {
    /// Path relative to the API base, e.g. `customers/cus_1`.
    pub fn path(&self) -> &str {
        self.url.path()
    }
}

#[derive(Default)]
struct CallLog {
    calls: Mutex<Vec<CallRecord>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl CallLog {
    fn calls(&self) -> MutexGuard<'_, Vec<CallRecord>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Transport double that answers from a script and records every call.
///
/// Clones share the script and the call log.
///
/// ```rust
/// use ratequeue::transport::{ScriptedTransport, TransportResponse};
/// use http::StatusCode;
///
/// let transport = ScriptedTransport::from_script([
///     Ok(TransportResponse::new(StatusCode::BAD_GATEWAY)),
///     Ok(TransportResponse::ok().with_body("{}")),
/// ]);
/// assert_eq!(transport.call_count(), 0);
/// ```
#[derive(Clone)]
pub struct ScriptedTransport {
    responder: Arc<Responder>,
    latency: Duration,
    log: Arc<CallLog>,
}

impl ScriptedTransport {
    /// Answer every call with `responder(request, call_index)`.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&TransportRequest, usize) -> Result<TransportResponse, TransportError>
            + Send
            + Sync
            + 'static,
    {
        Self { responder: Arc::new(responder), latency: Duration::ZERO, log: Arc::default() }
    }

    /// Answer calls in order from `script`; once it runs dry every call gets `200 {}`.
    pub fn from_script<I>(script: I) -> Self
    where
        I: IntoIterator<Item = Result<TransportResponse, TransportError>>,
    {
        let script: Mutex<VecDeque<_>> = Mutex::new(script.into_iter().collect());
        Self::new(move |_, _| {
            let next = script.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).pop_front();
            next.unwrap_or_else(|| Ok(TransportResponse::ok().with_body("{}")))
        })
    }

    /// Answer every call with `200 {}`.
    pub fn always_ok() -> Self {
        Self::from_script(std::iter::empty())
    }

    /// Hold each call open for `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.log.calls().clone()
    }

    pub fn call_count(&self) -> usize {
        self.log.calls().len()
    }

    /// Highest number of calls that were executing at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.log.max_in_flight.load(Ordering::SeqCst)
    }

    /// Calls whose URL path ends with `suffix`, in start order.
    pub fn calls_to(&self, suffix: &str) -> Vec<CallRecord> {
        self.log.calls().iter().filter(|c| c.path().ends_with(suffix)).cloned().collect()
    }
}

impl fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("latency", &self.latency)
            .field("calls", &self.call_count())
            .field("responder", &"<responder>")
            .finish()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(
        &self,
        request: &TransportRequest,
    ) -> Result<TransportResponse, TransportError> {
        let index = {
            let mut calls = self.log.calls();
            calls.push(CallRecord {
                method: request.method.clone(),
                url: request.url.clone(),
                headers: request.headers.clone(),
                body: request.body.clone(),
                started_at: Instant::now(),
                finished_at: None,
                status: None,
            });
            calls.len() - 1
        };
        let current = self.log.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let result = (self.responder)(request, index);

        self.log.in_flight.fetch_sub(1, Ordering::SeqCst);
        if let Some(record) = self.log.calls().get_mut(index) {
            record.finished_at = Some(Instant::now());
            record.status = result.as_ref().ok().map(|r| r.status);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(path: &str) -> TransportRequest {
        TransportRequest {
            method: Method::GET,
            url: Url::parse("https://api.test/v3/").unwrap().join(path).unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    #[tokio::test]
    async fn script_is_consumed_in_order_then_defaults_to_ok() {
        let transport = ScriptedTransport::from_script([
            Ok(TransportResponse::new(StatusCode::BAD_GATEWAY)),
            Err(TransportError::new("reset")),
        ]);

        let first = transport.execute(&request("a")).await.unwrap();
        assert_eq!(first.status, StatusCode::BAD_GATEWAY);
        assert!(transport.execute(&request("b")).await.is_err());
        let third = transport.execute(&request("c")).await.unwrap();
        assert_eq!(third.status, StatusCode::OK);

        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].status, Some(StatusCode::BAD_GATEWAY));
        assert_eq!(calls[1].status, None);
        assert_eq!(transport.calls_to("/c").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_recorded_and_concurrency_tracked() {
        let transport = ScriptedTransport::always_ok().with_latency(Duration::from_millis(100));
        let a = request("a");
        let b = request("b");
        let (ra, rb) = tokio::join!(transport.execute(&a), transport.execute(&b));
        assert!(ra.is_ok() && rb.is_ok());
        assert_eq!(transport.max_in_flight(), 2);

        let call = &transport.calls()[0];
        let finished = call.finished_at.unwrap();
        assert!(finished - call.started_at >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn responder_sees_call_index() {
        let transport = ScriptedTransport::new(|_, index| {
            Ok(TransportResponse::ok().with_body(index.to_string()))
        });
        let clone = transport.clone();
        assert_eq!(transport.execute(&request("x")).await.unwrap().body_text(), "0");
        assert_eq!(clone.execute(&request("x")).await.unwrap().body_text(), "1");
        assert_eq!(transport.call_count(), 2);
    }
}
