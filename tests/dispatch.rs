mod common;

use common::test_helpers::{client, json, query_value};
use futures::future::join_all;
use http::StatusCode;
use ratequeue::telemetry::{DispatchEvent, MemorySink};
use ratequeue::transport::{ScriptedTransport, TransportResponse};
use ratequeue::Route;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn widgets(n: usize) -> Route {
    Route::new("widgets").with_query("n", n)
}

#[tokio::test(start_paused = true)]
async fn same_bucket_runs_single_flight_in_arrival_order() {
    let transport = ScriptedTransport::always_ok().with_latency(Duration::from_millis(50));
    let client = client(transport.clone(), 5, MemorySink::new());

    let completions: Vec<_> =
        (0..5).map(|i| client.get(Route::bind("customers/:id", [format!("cus_{i}")]))).collect();
    for result in join_all(completions).await {
        assert!(result.is_ok());
    }

    let calls = transport.calls();
    let paths: Vec<_> = calls.iter().map(|c| c.path().to_string()).collect();
    assert_eq!(
        paths,
        (0..5).map(|i| format!("/v3/customers/cus_{i}")).collect::<Vec<_>>()
    );
    for pair in calls.windows(2) {
        assert!(pair[1].started_at >= pair[0].finished_at.unwrap());
    }
    assert_eq!(transport.max_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn exhausted_quota_holds_bucket_until_reset() {
    let transport = ScriptedTransport::new(|_, index| {
        Ok(match index {
            0 => json(200, json!({ "n": 0 })).with_quota(3, 0, 2.0),
            _ => json(200, json!({})),
        })
    });
    let sink = MemorySink::new();
    let client = client(transport.clone(), 5, sink.clone());
    let start = Instant::now();

    let completions: Vec<_> = (0..3).map(|i| client.get(widgets(i))).collect();
    let results = join_all(completions).await;
    assert!(results.iter().all(Result::is_ok));

    let calls = transport.calls();
    assert_eq!(calls.len(), 3);
    let order: Vec<_> = calls.iter().map(|c| query_value(c, "n").unwrap()).collect();
    assert_eq!(order, ["0", "1", "2"]);

    assert!(calls[0].started_at - start < Duration::from_millis(1));
    assert!(calls[1].started_at - start >= Duration::from_secs(2));
    assert!(calls[2].started_at >= calls[1].finished_at.unwrap());

    let events = sink.events_for("GET widgets");
    assert!(events.contains(&DispatchEvent::QuotaExhausted {
        bucket: "GET widgets".into(),
        reset_after: Some(Duration::from_secs(2)),
    }));
    assert!(events.contains(&DispatchEvent::ResetElapsed { bucket: "GET widgets".into() }));
}

#[tokio::test(start_paused = true)]
async fn rate_limited_request_is_requeued_behind_waiting_requests() {
    let transport = ScriptedTransport::from_script([
        Ok(json(429, json!({ "retry_after": 1.5, "global": false }))),
        Ok(json(200, json!({ "who": "second" }))),
        Ok(json(200, json!({ "who": "first" }))),
    ]);
    let sink = MemorySink::new();
    let client = client(transport.clone(), 5, sink.clone());

    let first = client.get(widgets(1));
    let second = client.get(widgets(2));
    let (first, second) = tokio::join!(first, second);
    assert_eq!(first.unwrap()["who"], "first");
    assert_eq!(second.unwrap()["who"], "second");

    let calls = transport.calls();
    let order: Vec<_> = calls.iter().map(|c| query_value(c, "n").unwrap()).collect();
    assert_eq!(order, ["1", "2", "1"]);
    assert!(calls[1].started_at - calls[0].finished_at.unwrap() >= Duration::from_millis(1500));

    assert!(sink.events().contains(&DispatchEvent::RateLimited {
        bucket: "GET widgets".into(),
        retry_after: Duration::from_millis(1500),
        global: false,
    }));
}

#[tokio::test(start_paused = true)]
async fn rate_limit_reset_header_stands_in_for_retry_after() {
    let transport = ScriptedTransport::from_script([Ok(TransportResponse::new(
        StatusCode::TOO_MANY_REQUESTS,
    )
    .with_header("RateLimit-Reset", "0.75")
    .with_body("Too Many Requests"))]);
    let client = client(transport.clone(), 5, MemorySink::new());

    assert!(client.get("payments").await.is_ok());
    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].started_at - calls[0].finished_at.unwrap() >= Duration::from_millis(750));
}

#[tokio::test(start_paused = true)]
async fn bad_gateway_retries_on_the_same_slot() {
    let a_calls = Arc::new(AtomicUsize::new(0));
    let counter = a_calls.clone();
    let transport = ScriptedTransport::new(move |request, _| {
        let path = request.url.path().to_string();
        if path.ends_with("/a") {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 | 2 => return Ok(TransportResponse::new(StatusCode::BAD_GATEWAY)),
                1 => return Ok(TransportResponse::new(StatusCode::from_u16(525).unwrap())),
                _ => {}
            }
        }
        Ok(json(200, json!({ "path": path })))
    })
    .with_latency(Duration::from_millis(10));
    let sink = MemorySink::new();
    let client = client(transport.clone(), 1, sink.clone());

    let a = client.get("a");
    let b = client.get("b");
    let (a, b) = tokio::join!(a, b);
    assert_eq!(a.unwrap()["path"], "/v3/a");
    assert_eq!(b.unwrap()["path"], "/v3/b");

    let a_calls = transport.calls_to("/a");
    let b_call = &transport.calls_to("/b")[0];
    assert_eq!(a_calls.len(), 4);
    assert_eq!(transport.max_in_flight(), 1);
    // The retries hold the only slot: b runs entirely before or after all of a.
    let a_start = a_calls[0].started_at;
    let a_end = a_calls[3].finished_at.unwrap();
    assert!(b_call.started_at >= a_end || b_call.finished_at.unwrap() <= a_start);

    let retries = sink
        .events()
        .into_iter()
        .filter(|e| matches!(e, DispatchEvent::TransientRetry { .. }))
        .count();
    assert_eq!(retries, 3);
}

#[tokio::test(start_paused = true)]
async fn in_flight_never_exceeds_ceiling() {
    let transport = ScriptedTransport::always_ok().with_latency(Duration::from_millis(25));
    let client = client(transport.clone(), 3, MemorySink::new());

    let completions: Vec<_> =
        (0..20).map(|i| client.get(Route::new(format!("route{}/items", i % 7)))).collect();
    let results = join_all(completions).await;
    assert!(results.iter().all(Result::is_ok));

    assert_eq!(transport.call_count(), 20);
    assert_eq!(transport.max_in_flight(), 3);
}

#[tokio::test(start_paused = true)]
async fn not_found_rejects_without_touching_quota() {
    let transport = ScriptedTransport::from_script([Ok(json(
        404,
        json!({ "errors": [{ "code": "invalid_object", "description": "Customer not found" }] }),
    ))]);
    let client = client(transport.clone(), 5, MemorySink::new());

    let missing = client.get(Route::bind("customers/:id", ["cus_404"]));
    let present = client.get(Route::bind("customers/:id", ["cus_1"]));
    let (missing, present) = tokio::join!(missing, present);

    let err = missing.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    let reason = &err.remote().unwrap().reason;
    assert!(reason.starts_with("Not Found - "));
    assert!(reason.contains("Customer not found"));

    assert!(present.is_ok());
    let calls = transport.calls();
    assert!(calls[1].started_at - calls[0].finished_at.unwrap() < Duration::from_millis(1));
}

#[tokio::test(start_paused = true)]
async fn quota_headers_on_error_responses_still_count() {
    let transport = ScriptedTransport::from_script([Ok(json(400, json!({ "errors": [] }))
        .with_quota(10, 0, 1.0))]);
    let client = client(transport.clone(), 5, MemorySink::new());

    let bad = client.post("payments", &json!({ "value": -1 }));
    let good = client.post("payments", &json!({ "value": 10 }));
    let (bad, good) = tokio::join!(bad, good);
    assert!(matches!(bad, Err(ratequeue::DispatchError::RequestFailed(_))));
    assert!(good.is_ok());

    let calls = transport.calls();
    assert!(calls[1].started_at - calls[0].finished_at.unwrap() >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn rate_limit_without_retry_after_fails_caller() {
    let transport = ScriptedTransport::from_script([Ok(json(429, json!({ "message": "slow" })))]);
    let client = client(transport.clone(), 5, MemorySink::new());

    let err = client.get("payments").await.unwrap_err();
    assert!(err.is_rate_limit_protocol());
    assert_eq!(transport.call_count(), 1);

    // The bucket keeps draining afterwards.
    assert!(client.get("payments").await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn global_rate_limit_pauses_every_bucket() {
    let transport = ScriptedTransport::new(|_, index| {
        Ok(match index {
            0 => json(429, json!({ "retry_after": 1, "global": true })),
            _ => json(200, json!({})),
        })
    })
    .with_latency(Duration::from_millis(10));
    let sink = MemorySink::new();
    let client = client(transport.clone(), 1, sink.clone());

    let a = client.get("a");
    while transport.call_count() == 0 {
        tokio::task::yield_now().await;
    }
    let b = client.get("b");
    let (a, b) = tokio::join!(a, b);
    assert!(a.is_ok() && b.is_ok());

    let first_a = transport.calls_to("/a")[0].finished_at.unwrap();
    let b_start = transport.calls_to("/b")[0].started_at;
    assert!(b_start - first_a >= Duration::from_secs(1));
    assert!(sink
        .events()
        .contains(&DispatchEvent::GlobalPause { retry_after: Duration::from_secs(1) }));
}

#[tokio::test(start_paused = true)]
async fn transport_error_rejects_caller_and_bucket_moves_on() {
    let transport = ScriptedTransport::from_script([Err(ratequeue::TransportError::new(
        "connection reset",
    ))]);
    let client = client(transport.clone(), 5, MemorySink::new());

    let first = client.delete(Route::bind("customers/:id", ["cus_1"]));
    let second = client.delete(Route::bind("customers/:id", ["cus_2"]));
    let (first, second) = tokio::join!(first, second);

    let err = first.unwrap_err();
    assert!(err.is_transport());
    assert!(err.to_string().contains("connection reset"));
    assert!(second.is_ok());
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn pending_requests_finish_after_client_is_dropped() {
    let transport = ScriptedTransport::always_ok().with_latency(Duration::from_millis(100));
    let client = client(transport.clone(), 5, MemorySink::new());

    let a = client.get("a");
    let b = client.get("a");
    drop(client);

    assert!(a.await.is_ok());
    assert!(b.await.is_ok());
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn reset_timers_come_from_the_configured_sleeper() {
    common::test_helpers::init_tracing();
    let sleeper = ratequeue::RecordingSleeper::new();
    let transport = ScriptedTransport::from_script([
        Ok(json(200, json!({})).with_quota(5, 4, 1.0)),
        Ok(json(429, json!({ "retry_after": 0.25 }))),
        Ok(json(200, json!({})).with_quota(5, 4, 1.0)),
    ]);
    let client = ratequeue::Client::builder()
        .base_url("https://api.test/v3")
        .sleeper(sleeper.clone())
        .transport(transport.clone())
        .build()
        .unwrap();

    client.get("customers").await.unwrap();
    client.get("customers").await.unwrap();

    assert_eq!(transport.call_count(), 3);
    assert_eq!(
        sleeper.armed(),
        vec![Duration::from_secs(1), Duration::from_millis(250), Duration::from_secs(1)]
    );
}
