//! Requests in flight through buckets and the dispatcher.

use crate::error::DispatchError;
use crate::route::Route;
use crate::transport::TransportRequest;
use http::{HeaderMap, Method};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Final result delivered to a caller.
pub type DispatchResult = Result<Value, DispatchError>;

/// A fully built request plus the handle that completes its caller.
///
/// Moves between its bucket and the dispatcher; whoever holds it last resolves it. Dropping
/// an unresolved descriptor completes the caller with [`DispatchError::Shutdown`].
pub struct RequestDescriptor {
    bucket: String,
    transport: TransportRequest,
    completion: oneshot::Sender<DispatchResult>,
    submitted_at: Instant,
}

impl RequestDescriptor {
    pub(crate) fn new(bucket: String, transport: TransportRequest) -> (Self, Completion) {
        let (completion, rx) = oneshot::channel();
        let descriptor = Self { bucket, transport, completion, submitted_at: Instant::now() };
        (descriptor, Completion::pending(rx))
    }

    pub fn method(&self) -> &Method {
        &self.transport.method
    }

    /// Bucket key this request is serialized under.
    pub fn bucket_key(&self) -> &str {
        &self.bucket
    }

    pub fn transport_request(&self) -> &TransportRequest {
        &self.transport
    }

    pub fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    /// Complete the caller. A caller that stopped waiting is ignored.
    pub(crate) fn resolve(self, result: DispatchResult) {
        let _ = self.completion.send(result);
    }
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("bucket", &self.bucket)
            .field("url", &self.transport.url.as_str())
            .finish()
    }
}

impl fmt::Display for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "REQ {} {}", self.transport.method, self.transport.url.path())
    }
}

/// Future returned by every submit; resolves exactly once with the payload or the error.
///
/// Dropping it does not cancel the request.
#[must_use = "the request is dispatched either way; await the completion to observe the result"]
pub struct Completion {
    state: CompletionState,
}

enum CompletionState {
    Pending(oneshot::Receiver<DispatchResult>),
    Ready(Option<DispatchResult>),
}

impl Completion {
    fn pending(rx: oneshot::Receiver<DispatchResult>) -> Self {
        Self { state: CompletionState::Pending(rx) }
    }

    /// A completion that is already resolved.
    pub(crate) fn ready(result: DispatchResult) -> Self {
        Self { state: CompletionState::Ready(Some(result)) }
    }
}

impl Future for Completion {
    type Output = DispatchResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.state {
            CompletionState::Pending(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(DispatchError::Shutdown))),
            CompletionState::Ready(slot) => {
                Poll::Ready(slot.take().unwrap_or(Err(DispatchError::Shutdown)))
            }
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            CompletionState::Pending(_) => "pending",
            CompletionState::Ready(Some(_)) => "ready",
            CompletionState::Ready(None) => "taken",
        };
        f.debug_struct("Completion").field("state", &state).finish()
    }
}

/// Owned request for the [`tower_service::Service`] impl on [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub route: Route,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method, route: impl Into<Route>) -> Self {
        Self { method, route: route.into(), body: None, headers: HeaderMap::new() }
    }

    pub fn get(route: impl Into<Route>) -> Self {
        Self::new(Method::GET, route)
    }

    pub fn delete(route: impl Into<Route>) -> Self {
        Self::new(Method::DELETE, route)
    }

    pub fn post(route: impl Into<Route>, body: Value) -> Self {
        Self::new(Method::POST, route).with_body(body)
    }

    pub fn put(route: impl Into<Route>, body: Value) -> Self {
        Self::new(Method::PUT, route).with_body(body)
    }

    pub fn patch(route: impl Into<Route>, body: Value) -> Self {
        Self::new(Method::PATCH, route).with_body(body)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use url::Url;

    fn descriptor() -> (RequestDescriptor, Completion) {
        let transport = TransportRequest {
            method: Method::GET,
            url: Url::parse("https://api.test/v3/customers/cus_1").unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        };
        RequestDescriptor::new("GET customers/:id".into(), transport)
    }

    #[tokio::test]
    async fn resolve_completes_caller() {
        let (request, completion) = descriptor();
        assert_eq!(request.to_string(), "REQ GET /v3/customers/cus_1");
        request.resolve(Ok(serde_json::json!({ "id": "cus_1" })));
        assert_eq!(completion.await.unwrap()["id"], "cus_1");
    }

    #[tokio::test]
    async fn dropped_descriptor_resolves_shutdown() {
        let (request, completion) = descriptor();
        drop(request);
        assert!(completion.await.unwrap_err().is_shutdown());
    }

    #[tokio::test]
    async fn ready_completion_yields_its_result() {
        let completion = Completion::ready(Err(DispatchError::DriverMissing));
        assert!(completion.await.unwrap_err().is_driver_missing());
    }

    #[test]
    fn api_request_constructors() {
        let request = ApiRequest::post("customers", serde_json::json!({ "name": "Ana" }));
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.route.template(), "customers");
        assert!(request.body.is_some());
        assert!(ApiRequest::get("payments").body.is_none());
    }
}
