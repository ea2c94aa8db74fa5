//! Caller-facing handle.
//!
//! ```rust,no_run
//! use ratequeue::{endpoint, Client, Route};
//! use ratequeue::transport::ScriptedTransport;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::builder()
//!     .access_token("$aact_example")
//!     .transport(ScriptedTransport::always_ok())
//!     .build()?;
//!
//! let customer = client.get(Route::bind(endpoint::CUSTOMER_GET, ["cus_000005219613"])).await?;
//! println!("{customer}");
//! # Ok(())
//! # }
//! ```

use crate::config::{ClientBuilder, ClientConfig};
use crate::dispatcher::{self, Command, DispatcherSettings};
use crate::error::DispatchError;
use crate::request::{ApiRequest, Completion, RequestDescriptor};
use crate::route::Route;
use crate::transport::{Transport, TransportRequest};
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use url::Url;

/// Handle to a running dispatcher. Cheap to clone; the dispatcher stops once every clone is
/// dropped and the requests already submitted have completed.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    commands: mpsc::UnboundedSender<Command>,
    base_url: Url,
    default_headers: HeaderMap,
    max_concurrent: usize,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Spawn a dispatcher for `config`. Must be called inside a tokio runtime.
    pub fn from_config(config: ClientConfig) -> Self {
        let ClientConfig { max_concurrent, base_url, default_headers, sleeper, sink, transport, .. } =
            config;
        let commands =
            dispatcher::spawn(DispatcherSettings { max_concurrent, transport, sleeper, sink });
        Self { inner: Arc::new(Inner { commands, base_url, default_headers, max_concurrent }) }
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }

    /// Install or replace the transport. Requests submitted after this call use it.
    pub fn set_transport<T: Transport + 'static>(&self, transport: T) {
        self.set_shared_transport(Arc::new(transport));
    }

    pub fn set_shared_transport(&self, transport: Arc<dyn Transport>) {
        if self.inner.commands.send(Command::SetTransport(transport)).is_err() {
            tracing::warn!("dispatcher gone, transport not installed");
        }
    }

    /// Queue a request. It is routed into its bucket before this returns, so submission order
    /// is preserved whether or not the completion is awaited.
    pub fn submit(
        &self,
        method: Method,
        route: impl Into<Route>,
        body: Option<Value>,
        headers: HeaderMap,
    ) -> Completion {
        let route = route.into();
        let bucket = route.bucket_key(&method);
        let request = match self.build_request(method, &route, body, headers) {
            Ok(request) => request,
            Err(err) => return Completion::ready(Err(err)),
        };

        let (descriptor, completion) = RequestDescriptor::new(bucket, request);
        if let Err(returned) = self.inner.commands.send(Command::Submit(descriptor)) {
            // Dropping the descriptor resolves the completion as shut down.
            drop(returned);
        }
        completion
    }

    pub fn get(&self, route: impl Into<Route>) -> Completion {
        self.submit(Method::GET, route, None, HeaderMap::new())
    }

    pub fn delete(&self, route: impl Into<Route>) -> Completion {
        self.submit(Method::DELETE, route, None, HeaderMap::new())
    }

    pub fn post<B: Serialize + ?Sized>(&self, route: impl Into<Route>, body: &B) -> Completion {
        self.submit_json(Method::POST, route, body)
    }

    pub fn put<B: Serialize + ?Sized>(&self, route: impl Into<Route>, body: &B) -> Completion {
        self.submit_json(Method::PUT, route, body)
    }

    pub fn patch<B: Serialize + ?Sized>(&self, route: impl Into<Route>, body: &B) -> Completion {
        self.submit_json(Method::PATCH, route, body)
    }

    fn submit_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        route: impl Into<Route>,
        body: &B,
    ) -> Completion {
        match serde_json::to_value(body) {
            Ok(body) => self.submit(method, route, Some(body), HeaderMap::new()),
            Err(err) => Completion::ready(Err(DispatchError::InvalidRequest(format!(
                "body is not serializable: {}",
                err
            )))),
        }
    }

    fn build_request(
        &self,
        method: Method,
        route: &Route,
        body: Option<Value>,
        caller_headers: HeaderMap,
    ) -> Result<TransportRequest, DispatchError> {
        let endpoint = route.endpoint();
        let url = self
            .inner
            .base_url
            .join(&format!("./{}", endpoint.trim_start_matches('/')))
            .map_err(|e| DispatchError::InvalidRequest(format!("bad endpoint {:?}: {}", endpoint, e)))?;

        let mut headers = self.inner.default_headers.clone();
        let body = match body {
            None => Bytes::new(),
            Some(body) if caller_headers.contains_key(CONTENT_TYPE) => match body {
                Value::String(raw) => Bytes::from(raw),
                other => Bytes::from(other.to_string()),
            },
            Some(body) => {
                let encoded = Bytes::from(body.to_string());
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                headers.insert(CONTENT_LENGTH, HeaderValue::from(encoded.len()));
                encoded
            }
        };
        headers.extend(caller_headers);

        Ok(TransportRequest { method, url, headers, body })
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url.as_str())
            .field("max_concurrent", &self.inner.max_concurrent)
            .field("running", &!self.inner.commands.is_closed())
            .finish()
    }
}

impl tower_service::Service<ApiRequest> for Client {
    type Response = Value;
    type Error = DispatchError;
    type Future = Completion;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        if self.inner.commands.is_closed() {
            Poll::Ready(Err(DispatchError::Shutdown))
        } else {
            Poll::Ready(Ok(()))
        }
    }

    fn call(&mut self, request: ApiRequest) -> Self::Future {
        self.submit(request.method, request.route, request.body, request.headers)
    }
}
