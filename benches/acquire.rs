//! Shared handle benchmarks.
//!
//! Measures the cached `acquire` path and the reset/reopen cycle, using the
//! scripted transport so no DS9 is needed.
//!
//! Run with: cargo bench --bench acquire
//! Results saved to: target/criterion/

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use ds9_xpa::{StubTransport, Xpa};

// ============================================================================
// Benchmark: Acquire
// ============================================================================

fn bench_acquire(c: &mut Criterion) {
    let xpa = Xpa::with_transport(Arc::new(StubTransport::new()));
    xpa.acquire().expect("stub opens");

    c.bench_function("acquire_cached", |b| {
        b.iter(|| black_box(xpa.acquire().expect("cached handle")));
    });

    c.bench_function("acquire_after_reset", |b| {
        b.iter(|| {
            xpa.reset();
            black_box(xpa.acquire().expect("stub opens"))
        });
    });
}

criterion_group!(benches, bench_acquire);
criterion_main!(benches);
