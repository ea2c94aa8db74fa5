use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use futures::future::join_all;
use ratequeue::transport::ScriptedTransport;
use ratequeue::{Client, Route};

fn client(rt: &tokio::runtime::Runtime, max_concurrent: usize) -> Client {
    let _guard = rt.enter();
    Client::builder()
        .base_url("http://bench.local/v3")
        .max_concurrent(max_concurrent)
        .transport(ScriptedTransport::always_ok())
        .build()
        .unwrap()
}

// One request through bucket, admission queue and classification.
fn single_request_latency(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let client = client(&rt, 5);

    c.bench_function("dispatch_single_get", |b| {
        b.to_async(&rt).iter(|| async {
            let _ = black_box(client.get(black_box("customers")).await);
        });
    });
}

// A burst spread over several buckets.
fn burst_across_buckets(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("dispatch_burst_100");

    for buckets in [1usize, 10, 50] {
        let client = client(&rt, 5);
        group.bench_with_input(BenchmarkId::from_parameter(buckets), &buckets, |b, &buckets| {
            b.to_async(&rt).iter(|| async {
                let completions = (0..100)
                    .map(|i| client.get(Route::new(format!("route{}/items", i % buckets))));
                let _ = black_box(join_all(completions).await);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, single_request_latency, burst_across_buckets);
criterion_main!(benches);
