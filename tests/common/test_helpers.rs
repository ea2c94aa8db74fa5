use ratequeue::telemetry::MemorySink;
use ratequeue::transport::{ScriptedTransport, TransportResponse};
use ratequeue::Client;
use serde_json::Value;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Client against `transport` with the given ceiling, recording events into `sink`.
pub fn client(transport: ScriptedTransport, max_concurrent: usize, sink: MemorySink) -> Client {
    init_tracing();
    Client::builder()
        .base_url("https://api.test/v3")
        .access_token("test-token")
        .max_concurrent(max_concurrent)
        .sink(sink)
        .transport(transport)
        .build()
        .expect("valid test config")
}

pub fn json(status: u16, body: Value) -> TransportResponse {
    TransportResponse::new(http::StatusCode::from_u16(status).expect("valid status")).with_json(&body)
}

/// Value of query parameter `key` in a recorded call.
pub fn query_value(call: &ratequeue::transport::CallRecord, key: &str) -> Option<String> {
    call.url.query_pairs().find(|(k, _)| k == key).map(|(_, v)| v.into_owned())
}
