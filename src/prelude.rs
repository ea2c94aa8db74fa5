//! Convenient re-exports for common ratequeue types.
pub use crate::{
    endpoint,
    telemetry::{DispatchEvent, LogSink, MemorySink, NullSink, TelemetrySink},
    transport::{Transport, TransportRequest, TransportResponse},
    ApiRequest, Client, ClientBuilder, Completion, DispatchError, Environment, RemoteFailure,
    ConfigError, Route, TransportError,
};
