//! Response classification.
//!
//! Decides, from status and body alone, whether a response completes the caller, is retried
//! on the same slot, sends the request back to its bucket, or fails the caller.

use crate::error::{DispatchError, RemoteFailure};
use crate::rate_limit::{parse_seconds, RateSignal, HEADER_RESET};
use crate::transport::TransportResponse;
use http::StatusCode;
use serde_json::Value;

/// Cloudflare "SSL handshake failed"; retried like a 502.
pub const SSL_HANDSHAKE_FAILED: u16 = 525;

pub const RESPONSE_TOO_LARGE_MESSAGE: &str =
    "Response was more than 2000 characters. Use another method to get this data.";

const TOO_LARGE_MARKERS: [&str; 2] = ["longer than 2000 characters", "string value is too long"];

/// What the dispatcher does with a response.
#[derive(Debug)]
pub enum Classification {
    /// 2xx; the payload goes to the caller.
    Success(Value),
    /// 502/525; retry the same request.
    Transient(StatusCode),
    /// 429 with a usable retry-after.
    RateLimited(RateSignal),
    /// Anything else, including a 429 without retry-after.
    Failure(DispatchError),
}

pub fn classify(response: &TransportResponse) -> Classification {
    let status = response.status;
    if status == StatusCode::TOO_MANY_REQUESTS {
        return match rate_signal(response) {
            Some(signal) => Classification::RateLimited(signal),
            None => Classification::Failure(DispatchError::RateLimitProtocol { status }),
        };
    }
    if is_transient(status) {
        return Classification::Transient(status);
    }
    if status.is_success() {
        return Classification::Success(decode_payload(&response.body));
    }
    Classification::Failure(failure(response))
}

pub fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::BAD_GATEWAY || status.as_u16() == SSL_HANDSHAKE_FAILED
}

/// Retry-after from the body's `retry_after`, else the first `RateLimit-Reset` value.
pub fn rate_signal(response: &TransportResponse) -> Option<RateSignal> {
    let body = serde_json::from_slice::<Value>(&response.body).ok();
    let global = body
        .as_ref()
        .and_then(|b| b.get("global"))
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let from_body = body.as_ref().and_then(|b| b.get("retry_after")).and_then(|v| match v {
        Value::Number(n) => n.as_f64().filter(|s| s.is_finite() && *s >= 0.0),
        Value::String(s) => parse_seconds(s),
        _ => None,
    });
    let retry_after = from_body.or_else(|| {
        response
            .headers
            .get_all(HEADER_RESET)
            .iter()
            .next()
            .and_then(|v| v.to_str().ok())
            .and_then(parse_seconds)
    })?;
    RateSignal::from_secs_f64(retry_after, global)
}

/// Successful payload; an empty or non-JSON body is `Null`.
pub fn decode_payload(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

/// Typed error for a non-2xx response.
pub fn failure(response: &TransportResponse) -> DispatchError {
    let status = response.status;
    let raw = response.body_text();
    let parsed = serde_json::from_str::<Value>(&raw).ok().filter(|v| !v.is_null());

    let mut reason = format!("{} - ", status.canonical_reason().unwrap_or("Unknown"));
    match &parsed {
        Some(value) => {
            reason.push_str(&serde_json::to_string_pretty(value).unwrap_or_else(|_| raw.clone()))
        }
        None => reason.push_str(&raw),
    }

    let code = parsed.as_ref().and_then(|v| v.get("code")).and_then(|code| match code {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    });
    let remote = |reason: String| {
        let failure = RemoteFailure::new(status, reason);
        match &code {
            Some(code) => failure.with_code(code.clone()),
            None => failure,
        }
    };

    match status {
        StatusCode::UNAUTHORIZED => DispatchError::Unauthorized(remote(reason)),
        StatusCode::FORBIDDEN => DispatchError::Forbidden(remote(reason)),
        StatusCode::NOT_FOUND => DispatchError::NotFound(remote(reason)),
        StatusCode::INTERNAL_SERVER_ERROR if is_too_large(&raw) => {
            DispatchError::ResponseTooLarge(remote(RESPONSE_TOO_LARGE_MESSAGE.to_string()))
        }
        _ => DispatchError::RequestFailed(remote(reason)),
    }
}

fn is_too_large(body: &str) -> bool {
    let body = body.to_lowercase();
    TOO_LARGE_MARKERS.iter().any(|marker| body.contains(marker))
}
