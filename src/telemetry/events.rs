use http::StatusCode;
use std::fmt;
use std::time::Duration;

/// Something a bucket or the dispatcher did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    /// A request joined a bucket's queue.
    Queued {
        bucket: String,
        /// Queue length after the push.
        depth: usize,
    },
    /// A request took a global slot and is about to hit the transport.
    Admitted {
        bucket: String,
        /// Slots in use including this one.
        in_flight: usize,
    },
    /// The bucket stopped releasing requests until its reset timer fires.
    QuotaExhausted { bucket: String, reset_after: Option<Duration> },
    /// A bucket's reset timer fired.
    ResetElapsed { bucket: String },
    /// A `429` sent the request back to its bucket.
    RateLimited { bucket: String, retry_after: Duration, global: bool },
    /// Admission is suspended for every bucket.
    GlobalPause { retry_after: Duration },
    /// A `502`/`525` is being retried on the same slot.
    TransientRetry {
        bucket: String,
        status: StatusCode,
        /// 1-indexed retry number.
        attempt: u32,
    },
    /// The caller received a payload.
    Completed { bucket: String, status: StatusCode, elapsed: Duration },
    /// The caller received an error.
    Failed { bucket: String, status: Option<StatusCode>, elapsed: Duration },
}

impl DispatchEvent {
    /// Bucket key the event belongs to; `None` for dispatcher-wide events.
    pub fn bucket(&self) -> Option<&str> {
        match self {
            Self::Queued { bucket, .. }
            | Self::Admitted { bucket, .. }
            | Self::QuotaExhausted { bucket, .. }
            | Self::ResetElapsed { bucket }
            | Self::RateLimited { bucket, .. }
            | Self::TransientRetry { bucket, .. }
            | Self::Completed { bucket, .. }
            | Self::Failed { bucket, .. } => Some(bucket),
            Self::GlobalPause { .. } => None,
        }
    }
}

impl fmt::Display for DispatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued { bucket, depth } => write!(f, "Queued({}, depth={})", bucket, depth),
            Self::Admitted { bucket, in_flight } => {
                write!(f, "Admitted({}, in_flight={})", bucket, in_flight)
            }
            Self::QuotaExhausted { bucket, reset_after: Some(d) } => {
                write!(f, "QuotaExhausted({}, reset_after={:?})", bucket, d)
            }
            Self::QuotaExhausted { bucket, reset_after: None } => {
                write!(f, "QuotaExhausted({})", bucket)
            }
            Self::ResetElapsed { bucket } => write!(f, "ResetElapsed({})", bucket),
            Self::RateLimited { bucket, retry_after, global } => write!(
                f,
                "RateLimited({}, retry_after={:?}, global={})",
                bucket, retry_after, global
            ),
            Self::GlobalPause { retry_after } => {
                write!(f, "GlobalPause(retry_after={:?})", retry_after)
            }
            Self::TransientRetry { bucket, status, attempt } => write!(
                f,
                "TransientRetry({}, status={}, attempt=#{})",
                bucket,
                status.as_u16(),
                attempt
            ),
            Self::Completed { bucket, status, elapsed } => write!(
                f,
                "Completed({}, status={}, elapsed={:?})",
                bucket,
                status.as_u16(),
                elapsed
            ),
            Self::Failed { bucket, status: Some(status), elapsed } => write!(
                f,
                "Failed({}, status={}, elapsed={:?})",
                bucket,
                status.as_u16(),
                elapsed
            ),
            Self::Failed { bucket, status: None, elapsed } => {
                write!(f, "Failed({}, elapsed={:?})", bucket, elapsed)
            }
        }
    }
}
