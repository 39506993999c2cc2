//! Benchmarks for the two-slot ring channel
//!
//! The sampling task consumes inside a real-time period, so the consume path must be
//! a handful of atomic operations plus one slot copy. Covers:
//! - Publish then consume on one thread (uncontended round trip)
//! - Publish into a full channel (the overflow path)
//! - Consume from an empty channel (the common idle period)
//! - Cross-thread hand-off throughput
//!
//! Platform: Cross-platform (heap channel, CI-safe)

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use fgfdm::HeapChannel;
use fgfdm::test_utils::sample_frame;
use std::hint::black_box;

fn bench_single_thread(c: &mut Criterion) {
    let frame = sample_frame();
    let mut channel = HeapChannel::new();
    let (producer, consumer) = channel.split();

    let mut group = c.benchmark_group("single_thread");

    group.bench_function("publish_consume", |b| {
        let mut sequence = 0u32;
        b.iter(|| {
            sequence = sequence.wrapping_add(1);
            let _ = producer.try_publish(black_box(&frame), 0, sequence, true);
            black_box(consumer.try_consume())
        })
    });

    group.bench_function("consume_empty", |b| b.iter(|| black_box(consumer.try_consume())));

    let _ = producer.try_publish(&frame, 0, 0, true);
    group.bench_function("publish_full", |b| {
        b.iter(|| black_box(producer.try_publish(black_box(&frame), 0, 1, true)))
    });

    group.finish();
}

fn bench_cross_thread(c: &mut Criterion) {
    const BATCH: u64 = 10_000;
    let frame = sample_frame();

    let mut group = c.benchmark_group("cross_thread");
    group.throughput(Throughput::Elements(BATCH));

    group.bench_function("handoff", |b| {
        b.iter(|| {
            let mut channel = HeapChannel::new();
            let (producer, consumer) = channel.split();
            let frame = &frame;

            std::thread::scope(|scope| {
                scope.spawn(move || {
                    let mut published = 0u64;
                    while published < BATCH {
                        if producer.try_publish(frame, 0, published as u32, true).is_ok() {
                            published += 1;
                        }
                    }
                });

                let mut consumed = 0u64;
                while consumed < BATCH {
                    if let Some(slot) = consumer.try_consume() {
                        black_box(slot.sequence);
                        consumed += 1;
                    }
                }
            })
        })
    });

    group.finish();
}

criterion_group!(benches, bench_single_thread, bench_cross_thread);
criterion_main!(benches);
