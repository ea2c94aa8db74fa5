//! Per-route serialization and throttling.
//!
//! A bucket owns the FIFO queue for one bucket key and releases at most one request at a
//! time (single-flight). It tracks the route's last observed quota and stops releasing when
//! `remaining` is known to be below one, resuming when its reset timer fires.
//!
//! [`RouteBucket`] is the pure state machine; [`run`] drives it on a tokio task, handing
//! released requests to the dispatcher and waiting on the attempt outcome and the reset
//! timer.
//!
//! ```text
//!            enqueue                 remaining < 1
//!   Idle ───────────────▶ Running ─────────────────▶ WaitingReset
//!    ▲                    │  ▲                            │
//!    └── queue drained ───┘  └──────── reset fired ───────┘
//!    └── 429 re-queued ───┘
//! ```

use crate::rate_limit::{QuotaHeaders, RateSignal};
use crate::request::RequestDescriptor;
use crate::sleeper::{ResetTimer, Sleeper};
use crate::telemetry::{emit_best_effort, DispatchEvent, EventSink};
use std::collections::VecDeque;
use std::fmt;
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Checker state of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketState {
    /// No checker active; the next enqueue starts one.
    Idle,
    /// Releasing requests one at a time.
    Running,
    /// Quota exhausted; only the reset timer resumes the bucket.
    WaitingReset,
}

impl fmt::Display for BucketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BucketState::Idle => write!(f, "Idle"),
            BucketState::Running => write!(f, "Running"),
            BucketState::WaitingReset => write!(f, "WaitingReset"),
        }
    }
}

/// How one released request ended, as far as its bucket cares.
#[derive(Debug)]
pub enum AttemptOutcome<R> {
    /// The caller was resolved (payload or error).
    Completed(QuotaHeaders),
    /// Explicit `429`: the request comes back to be queued again.
    RateLimited { request: R, signal: RateSignal, quota: QuotaHeaders },
}

/// What the checker decided on one step.
#[derive(Debug, PartialEq, Eq)]
pub enum Step<R> {
    /// Hand this request to the dispatcher.
    Release(R),
    /// `remaining` dropped below one; the bucket now waits for its reset.
    Exhausted,
    /// The queue is empty; the bucket went idle.
    Drained,
    /// Nothing to do: not running, or a request is still in flight.
    Hold,
}

/// Pure per-route state machine.
#[derive(Debug)]
pub struct RouteBucket<R> {
    key: String,
    queue: VecDeque<R>,
    limit: Option<u32>,
    remaining: Option<u32>,
    state: BucketState,
    in_flight: bool,
}

impl<R> RouteBucket<R> {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            queue: VecDeque::new(),
            limit: None,
            remaining: None,
            state: BucketState::Idle,
            in_flight: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> BucketState {
        self.state
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Append to the queue; an idle bucket starts running.
    pub fn enqueue(&mut self, request: R) {
        self.queue.push_back(request);
        if self.state == BucketState::Idle {
            self.state = BucketState::Running;
        }
    }

    /// One checker step.
    pub fn step(&mut self) -> Step<R> {
        if self.state != BucketState::Running || self.in_flight {
            return Step::Hold;
        }
        if matches!(self.remaining, Some(r) if r < 1) {
            self.state = BucketState::WaitingReset;
            return Step::Exhausted;
        }
        match self.queue.pop_front() {
            Some(request) => {
                self.in_flight = true;
                Step::Release(request)
            }
            None => {
                self.state = BucketState::Idle;
                Step::Drained
            }
        }
    }

    /// Fold the outcome of the released request back in. Returns the duration of a reset
    /// timer to (re)arm, if any.
    pub fn complete(&mut self, outcome: AttemptOutcome<R>) -> Option<Duration> {
        self.in_flight = false;
        match outcome {
            AttemptOutcome::Completed(quota) => self.observe(&quota),
            AttemptOutcome::RateLimited { request, signal, quota } => {
                self.queue.push_back(request);
                self.state = BucketState::Idle;
                // Without a reset header the retry-after is the only thing that resumes us.
                self.observe(&quota).or(Some(signal.retry_after()))
            }
        }
    }

    /// The released request vanished without an outcome (dispatcher gone).
    pub fn abandon(&mut self) {
        self.in_flight = false;
    }

    /// The reset timer fired: the window is full again.
    pub fn reset_elapsed(&mut self) {
        self.remaining = self.limit;
        if !self.in_flight {
            self.state = BucketState::Running;
        }
    }

    fn observe(&mut self, quota: &QuotaHeaders) -> Option<Duration> {
        if let Some(limit) = quota.limit {
            self.limit = Some(limit);
        }
        if let Some(remaining) = quota.remaining {
            self.remaining = Some(remaining);
        }
        quota.reset_after
    }
}

impl<R> fmt::Display for RouteBucket<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BUCKET {}", self.key)
    }
}

/// A released request on its way to the global admission queue.
#[derive(Debug)]
pub(crate) struct Admission {
    pub(crate) request: RequestDescriptor,
    pub(crate) reply: oneshot::Sender<AttemptOutcome<RequestDescriptor>>,
}

/// Drive `bucket` until `inbound` closes.
pub(crate) async fn run(
    mut bucket: RouteBucket<RequestDescriptor>,
    mut inbound: mpsc::UnboundedReceiver<RequestDescriptor>,
    admissions: mpsc::UnboundedSender<Admission>,
    sleeper: Arc<dyn Sleeper>,
    mut sink: EventSink,
) {
    let mut timer: Option<(ResetTimer, Duration)> = None;
    let mut attempt: Option<oneshot::Receiver<AttemptOutcome<RequestDescriptor>>> = None;

    loop {
        loop {
            match bucket.step() {
                Step::Release(request) => {
                    tracing::debug!(bucket = %bucket.key(), request = %request, "releasing request");
                    let (reply, rx) = oneshot::channel();
                    if admissions.send(Admission { request, reply }).is_err() {
                        tracing::debug!(bucket = %bucket.key(), "dispatcher gone, bucket stopping");
                        return;
                    }
                    attempt = Some(rx);
                }
                Step::Exhausted => {
                    let reset_after = timer.as_ref().map(|(_, d)| *d);
                    tracing::info!(
                        bucket = %bucket.key(),
                        interval = ?reset_after,
                        "expecting rate limit, waiting for reset"
                    );
                    emit_best_effort(
                        &mut sink,
                        DispatchEvent::QuotaExhausted { bucket: bucket.key().to_string(), reset_after },
                    );
                }
                Step::Drained | Step::Hold => break,
            }
        }

        tokio::select! {
            received = inbound.recv() => match received {
                Some(request) => {
                    tracing::debug!(bucket = %bucket.key(), request = %request, "queued");
                    bucket.enqueue(request);
                    emit_best_effort(
                        &mut sink,
                        DispatchEvent::Queued { bucket: bucket.key().to_string(), depth: bucket.queued() },
                    );
                }
                None => break,
            },
            outcome = wait_outcome(&mut attempt) => {
                attempt = None;
                match outcome {
                    Ok(outcome) => {
                        if let AttemptOutcome::RateLimited { signal, .. } = &outcome {
                            tracing::debug!(bucket = %bucket.key(), signal = %signal, "stopping queue checker");
                        }
                        if let Some(reset_after) = bucket.complete(outcome) {
                            timer = Some((sleeper.sleep(reset_after), reset_after));
                        }
                    }
                    Err(_) => bucket.abandon(),
                }
            }
            _ = wait_timer(&mut timer) => {
                timer = None;
                tracing::debug!(bucket = %bucket.key(), "rate limit reset");
                bucket.reset_elapsed();
                emit_best_effort(&mut sink, DispatchEvent::ResetElapsed { bucket: bucket.key().to_string() });
            }
        }
    }

    tracing::trace!(bucket = %bucket.key(), queued = bucket.queued(), "bucket closed");
}

async fn wait_outcome<T>(slot: &mut Option<oneshot::Receiver<T>>) -> Result<T, oneshot::error::RecvError> {
    match slot {
        Some(rx) => rx.await,
        None => pending().await,
    }
}

async fn wait_timer(slot: &mut Option<(ResetTimer, Duration)>) {
    match slot {
        Some((timer, _)) => timer.await,
        None => pending().await,
    }
}
