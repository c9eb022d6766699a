//! Relay hot-path benchmark suite.
//!
//! Benchmarks the per-frame work the pump does on every relayed message:
//! - Message/frame conversion at typical CDP payload sizes
//! - Pending-buffer churn while the local link is down
//!
//! Run with: cargo bench --bench relay_buffer
//! Results saved to: target/criterion/

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use prizm_browser_node::{PENDING_FRAME_LIMIT, PendingOutbound, RelayFrame};

// ============================================================================
// Benchmark Parameters
// ============================================================================

/// Payload sizes spanning a small CDP command to a screenshot-sized result.
const PAYLOAD_SIZES: &[usize] = &[64, 1024, 64 * 1024];

/// Frame counts pushed through the pending buffer per iteration.
const BURST_SIZES: &[usize] = &[256, 1024, 4096];

// ============================================================================
// Benchmark: Frame Conversion
// ============================================================================

fn bench_frame_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_conversion");

    for &size in PAYLOAD_SIZES {
        let payload = cdp_payload(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("text", size), &payload, |b, payload| {
            b.iter(|| {
                let frame = RelayFrame::text(black_box(payload.as_str()));
                black_box(frame.into_message())
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Pending Buffer Churn
// ============================================================================

fn bench_buffer_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_churn");

    for &burst in BURST_SIZES {
        let payload = cdp_payload(256);
        group.throughput(Throughput::Elements(burst as u64));
        group.bench_with_input(BenchmarkId::new("push", burst), &burst, |b, &burst| {
            b.iter(|| {
                let mut buffer = PendingOutbound::new();
                for _ in 0..burst {
                    black_box(buffer.push(RelayFrame::text(payload.as_str())));
                }
                buffer.dropped_total()
            });
        });
    }

    group.finish();
}

fn bench_buffer_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_drain");

    let payload = cdp_payload(256);
    group.throughput(Throughput::Elements(PENDING_FRAME_LIMIT as u64));
    group.bench_function("fill_then_drain", |b| {
        b.iter(|| {
            let mut buffer = PendingOutbound::new();
            for _ in 0..PENDING_FRAME_LIMIT {
                buffer.push(RelayFrame::text(payload.as_str()));
            }
            let mut drained = 0usize;
            while let Some(frame) = buffer.pop() {
                drained += black_box(frame).len();
            }
            drained
        });
    });

    group.finish();
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Builds a JSON-shaped text payload of roughly `size` bytes.
fn cdp_payload(size: usize) -> String {
    let mut payload = String::with_capacity(size + 64);
    payload.push_str(r#"{"id":42,"method":"Runtime.evaluate","params":{"expression":""#);
    while payload.len() < size {
        payload.push_str("0123456789abcdef");
    }
    payload.push_str(r#""}}"#);
    payload
}

// ============================================================================
// Criterion Setup
// ============================================================================

criterion_group!(
    benches,
    bench_frame_conversion,
    bench_buffer_churn,
    bench_buffer_drain
);
criterion_main!(benches);
