#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # ratequeue
//!
//! Rate-limit-aware dispatcher for outbound calls to a REST API that reports its quota
//! through `RateLimit-*` headers and rejects excess traffic with `429`.
//!
//! ## Features
//!
//! - **Per-route buckets**: requests sharing a bucket key run one at a time, in arrival order
//! - **Quota tracking**: a bucket pauses when `RateLimit-Remaining` hits zero and resumes on reset
//! - **Admission ceiling**: at most `max_concurrent` requests in flight across all routes
//! - **Transparent retries**: `429` re-queues the request, `502`/`525` retry on the same slot
//! - **Typed errors** for everything else
//! - **Pluggable transport** and telemetry sinks (`tower::Service`)
//!
//! ## Quick Start
//!
//! ```rust
//! use ratequeue::transport::{ScriptedTransport, TransportResponse};
//! use ratequeue::{endpoint, Client, Route};
//! use http::StatusCode;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let transport = ScriptedTransport::from_script([Ok(TransportResponse::new(StatusCode::OK)
//!         .with_quota(60, 59, 1.0)
//!         .with_body(r#"{"object":"customer","id":"cus_1"}"#))]);
//!
//!     let client = Client::builder().transport(transport).build().unwrap();
//!     let customer = client.get(Route::bind(endpoint::CUSTOMER_GET, ["cus_1"])).await.unwrap();
//!     assert_eq!(customer["id"], "cus_1");
//! }
//! ```

pub mod bucket;
pub mod classify;
pub mod client;
pub mod config;
mod dispatcher;
pub mod endpoint;
pub mod error;
pub mod prelude;
pub mod rate_limit;
pub mod request;
pub mod route;
pub mod sleeper;
pub mod telemetry;
pub mod transport;

// Re-exports
pub use bucket::{AttemptOutcome, BucketState, RouteBucket, Step};
pub use client::Client;
pub use config::{ClientBuilder, ClientConfig, Environment};
pub use error::{ConfigError, DispatchError, RemoteFailure, TransportError};
pub use rate_limit::{QuotaHeaders, RateSignal};
pub use request::{ApiRequest, Completion, DispatchResult, RequestDescriptor};
pub use route::Route;
pub use sleeper::{RecordingSleeper, ResetTimer, Sleeper, TokioSleeper};
pub use transport::{Transport, TransportRequest, TransportResponse};
