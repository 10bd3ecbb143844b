//! Envelope classification benchmark.
//!
//! Compares the single-pass scan with deferred payloads against parsing the
//! whole message into a `serde_json::Value`, for small and large payloads.
//!
//! Run with: cargo bench --bench envelope
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::{Value, json};
use webdriver_bidi::protocol::envelope;

// ============================================================================
// Fixtures
// ============================================================================

const PAYLOAD_NODES: &[usize] = &[1, 100, 10_000];

fn success_frame(nodes: usize) -> Vec<u8> {
    let children: Vec<Value> = (0..nodes)
        .map(|i| json!({ "type": "node", "value": { "nodeType": 1, "localName": format!("div{i}") } }))
        .collect();

    serde_json::to_vec(&json!({
        "id": 42,
        "type": "success",
        "result": { "realm": "r1", "result": { "type": "array", "value": children } },
    }))
    .expect("fixture")
}

// ============================================================================
// Benchmark: Classification
// ============================================================================

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");

    for &nodes in PAYLOAD_NODES {
        let frame = success_frame(nodes);
        group.throughput(Throughput::Bytes(frame.len() as u64));

        group.bench_with_input(BenchmarkId::new("deferred", nodes), &frame, |b, frame| {
            b.iter(|| {
                let envelope = envelope::decode(black_box(frame)).expect("decode");
                black_box(envelope.map(|envelope| envelope.id()));
            });
        });

        group.bench_with_input(BenchmarkId::new("full_value", nodes), &frame, |b, frame| {
            b.iter(|| {
                let value: Value = serde_json::from_slice(black_box(frame)).expect("parse");
                black_box(value["id"].as_u64());
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
