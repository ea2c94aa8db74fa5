//! Telemetry for the dispatcher.
//!
//! Buckets and the dispatcher describe what they do as [`DispatchEvent`]s. Events flow into a
//! sink, which is any `tower::Service<DispatchEvent>`; the client holds it boxed as an
//! [`EventSink`].
//!
//! # Event Types
//!
//! - **Bucket**: `Queued`, `QuotaExhausted`, `ResetElapsed`, `RateLimited`
//! - **Dispatcher**: `Admitted`, `GlobalPause`, `TransientRetry`
//! - **Outcome**: `Completed`, `Failed`
//!
//! Emission never blocks a scheduling loop: a sink that is not ready loses the event.

pub mod events;
pub mod sinks;

pub use events::DispatchEvent;
pub use sinks::{emit_best_effort, EventSink, LogSink, MemorySink, NullSink, TelemetrySink};
