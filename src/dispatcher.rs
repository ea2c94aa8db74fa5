//! Global admission and execution.
//!
//! The dispatcher task owns every bucket handle, the global FIFO of released requests and the
//! count of requests in flight. Executions are polled inside the same task, so nothing here
//! needs a lock: `in_flight` has exactly one writer.
//!
//! Per admitted request the dispatcher calls the transport, classifies the response and:
//!
//! - `2xx` or any failure: resolves the caller and reports the quota headers to the bucket;
//! - `502`/`525`: calls again on the same slot, invisible to bucket and caller;
//! - `429`: hands the request back to its bucket, which re-queues it.

use crate::bucket::{self, Admission, AttemptOutcome, RouteBucket};
use crate::classify::{classify, Classification};
use crate::error::DispatchError;
use crate::rate_limit::QuotaHeaders;
use crate::request::RequestDescriptor;
use crate::sleeper::{ResetTimer, Sleeper};
use crate::telemetry::{emit_best_effort, DispatchEvent, EventSink};
use crate::transport::Transport;
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::{pending, Future};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Messages from client handles.
pub(crate) enum Command {
    Submit(RequestDescriptor),
    SetTransport(Arc<dyn Transport>),
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Submit(request) => f.debug_tuple("Submit").field(request).finish(),
            Command::SetTransport(transport) => {
                f.debug_tuple("SetTransport").field(transport).finish()
            }
        }
    }
}

/// Everything the dispatcher task needs at start.
pub(crate) struct DispatcherSettings {
    pub(crate) max_concurrent: usize,
    pub(crate) transport: Option<Arc<dyn Transport>>,
    pub(crate) sleeper: Arc<dyn Sleeper>,
    pub(crate) sink: EventSink,
}

type Execution = Pin<Box<dyn Future<Output = Executed> + Send>>;

struct Executed {
    reply: oneshot::Sender<AttemptOutcome<RequestDescriptor>>,
    outcome: AttemptOutcome<RequestDescriptor>,
}

/// Spawn the dispatcher task. It runs until every command sender is dropped and no
/// submitted request is outstanding.
pub(crate) fn spawn(settings: DispatcherSettings) -> mpsc::UnboundedSender<Command> {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (admissions_tx, admissions_rx) = mpsc::unbounded_channel();
    let dispatcher = Dispatcher {
        transport: settings.transport,
        max_concurrent: settings.max_concurrent,
        buckets: HashMap::new(),
        queue: VecDeque::new(),
        in_flight: 0,
        outstanding: 0,
        pause: None,
        admissions_tx,
        sleeper: settings.sleeper,
        sink: settings.sink,
    };
    tokio::spawn(dispatcher.run(commands_rx, admissions_rx));
    commands_tx
}

struct Dispatcher {
    transport: Option<Arc<dyn Transport>>,
    max_concurrent: usize,
    buckets: HashMap<String, mpsc::UnboundedSender<RequestDescriptor>>,
    queue: VecDeque<Admission>,
    in_flight: usize,
    /// Submitted requests whose caller is not resolved yet.
    outstanding: usize,
    /// Global rate limit in effect; nothing is admitted until it fires.
    pause: Option<ResetTimer>,
    admissions_tx: mpsc::UnboundedSender<Admission>,
    sleeper: Arc<dyn Sleeper>,
    sink: EventSink,
}

impl Dispatcher {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut admissions: mpsc::UnboundedReceiver<Admission>,
    ) {
        let mut executions: FuturesUnordered<Execution> = FuturesUnordered::new();
        let mut accepting = true;

        loop {
            self.admit(&mut executions);
            if !accepting && self.outstanding == 0 {
                break;
            }

            tokio::select! {
                command = commands.recv(), if accepting => match command {
                    Some(Command::Submit(request)) => self.submit(request),
                    Some(Command::SetTransport(transport)) => {
                        tracing::debug!(transport = ?transport, "transport installed");
                        self.transport = Some(transport);
                    }
                    None => {
                        tracing::debug!(outstanding = self.outstanding, "all clients dropped, draining");
                        accepting = false;
                    }
                },
                Some(admission) = admissions.recv() => self.queue.push_back(admission),
                Some(executed) = executions.next(), if !executions.is_empty() => self.finish(executed),
                _ = wait_pause(&mut self.pause) => {
                    self.pause = None;
                    tracing::info!("global rate limit lifted");
                }
            }
        }

        tracing::debug!(buckets = self.buckets.len(), "dispatcher stopped");
    }

    fn submit(&mut self, request: RequestDescriptor) {
        if self.transport.is_none() {
            tracing::warn!(request = %request, "HTTP transport is missing");
            request.resolve(Err(DispatchError::DriverMissing));
            return;
        }

        let (admissions_tx, sleeper, sink) = (&self.admissions_tx, &self.sleeper, &self.sink);
        let key = request.bucket_key().to_string();
        let handle = self.buckets.entry(key).or_insert_with_key(|key| {
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(bucket::run(
                RouteBucket::new(key.clone()),
                rx,
                admissions_tx.clone(),
                Arc::clone(sleeper),
                sink.clone(),
            ));
            tx
        });

        match handle.send(request) {
            Ok(()) => self.outstanding += 1,
            Err(returned) => tracing::warn!(request = %returned.0, "bucket task gone"),
        }
    }

    fn admit(&mut self, executions: &mut FuturesUnordered<Execution>) {
        if self.pause.is_some() {
            return;
        }
        while self.in_flight < self.max_concurrent {
            let Some(Admission { request, reply }) = self.queue.pop_front() else {
                break;
            };
            let Some(transport) = self.transport.clone() else {
                request.resolve(Err(DispatchError::DriverMissing));
                let _ = reply.send(AttemptOutcome::Completed(QuotaHeaders::default()));
                self.outstanding = self.outstanding.saturating_sub(1);
                continue;
            };

            self.in_flight += 1;
            tracing::debug!(request = %request, in_flight = self.in_flight, "dispatching");
            emit_best_effort(
                &mut self.sink,
                DispatchEvent::Admitted {
                    bucket: request.bucket_key().to_string(),
                    in_flight: self.in_flight,
                },
            );
            executions.push(Box::pin(execute(transport, request, reply, self.sink.clone())));
        }
    }

    fn finish(&mut self, executed: Executed) {
        self.in_flight -= 1;
        let Executed { reply, outcome } = executed;

        if let AttemptOutcome::RateLimited { signal, .. } = &outcome {
            if signal.is_global() {
                tracing::warn!(signal = %signal, "global rate limit, pausing admission");
                self.pause = Some(self.sleeper.sleep(signal.retry_after()));
                emit_best_effort(
                    &mut self.sink,
                    DispatchEvent::GlobalPause { retry_after: signal.retry_after() },
                );
            }
        }

        let resolved = matches!(outcome, AttemptOutcome::Completed(_));
        // A bucket that went away drops a returned request, which resolves it as shut down.
        if reply.send(outcome).is_err() || resolved {
            self.outstanding = self.outstanding.saturating_sub(1);
        }
    }
}

async fn wait_pause(slot: &mut Option<ResetTimer>) {
    match slot {
        Some(timer) => timer.await,
        None => pending().await,
    }
}

/// One admitted request, including its transient retries.
async fn execute(
    transport: Arc<dyn Transport>,
    request: RequestDescriptor,
    reply: oneshot::Sender<AttemptOutcome<RequestDescriptor>>,
    mut sink: EventSink,
) -> Executed {
    let bucket = request.bucket_key().to_string();
    let mut retries: u32 = 0;

    let outcome = loop {
        let response = match transport.execute(request.transport_request()).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(request = %request, error = %err, "request failed");
                emit_best_effort(
                    &mut sink,
                    DispatchEvent::Failed {
                        bucket,
                        status: None,
                        elapsed: request.submitted_at().elapsed(),
                    },
                );
                request.resolve(Err(err.into()));
                break AttemptOutcome::Completed(QuotaHeaders::default());
            }
        };

        let quota = QuotaHeaders::from_headers(&response.headers);
        match classify(&response) {
            Classification::Transient(status) => {
                retries = retries.saturating_add(1);
                tracing::warn!(request = %request, status = status.as_u16(), attempt = retries, "502/525 - retrying request");
                emit_best_effort(
                    &mut sink,
                    DispatchEvent::TransientRetry { bucket: bucket.clone(), status, attempt: retries },
                );
            }
            Classification::Success(payload) => {
                tracing::debug!(request = %request, "successful");
                emit_best_effort(
                    &mut sink,
                    DispatchEvent::Completed {
                        bucket,
                        status: response.status,
                        elapsed: request.submitted_at().elapsed(),
                    },
                );
                request.resolve(Ok(payload));
                break AttemptOutcome::Completed(quota);
            }
            Classification::RateLimited(signal) => {
                tracing::warn!(request = %request, signal = %signal, "hit rate-limit");
                emit_best_effort(
                    &mut sink,
                    DispatchEvent::RateLimited {
                        bucket,
                        retry_after: signal.retry_after(),
                        global: signal.is_global(),
                    },
                );
                break AttemptOutcome::RateLimited { request, signal, quota };
            }
            Classification::Failure(err) => {
                if err.is_rate_limit_protocol() {
                    tracing::error!(request = %request, "does not contain retry after rate-limit value");
                } else {
                    tracing::warn!(request = %request, error = %err, "request failed");
                }
                emit_best_effort(
                    &mut sink,
                    DispatchEvent::Failed {
                        bucket,
                        status: Some(response.status),
                        elapsed: request.submitted_at().elapsed(),
                    },
                );
                request.resolve(Err(err));
                break AttemptOutcome::Completed(quota);
            }
        }
    };

    Executed { reply, outcome }
}
