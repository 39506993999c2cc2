//! Benchmarks for native-FDM frame decoding
//!
//! The ingress loop decodes every datagram on arrival, so decode cost bounds how far
//! behind the simulator the listener can fall. Covers:
//! - Decoding a typical frame and a frame with every group at its maximum
//! - Rejection paths (short datagram, version mismatch) which must stay cheap
//! - Encoding, used by the loopback sender
//!
//! Platform: Cross-platform (synthetic frames, CI-safe)

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use fgfdm::codec::{self, FRAME_SIZE};
use fgfdm::test_utils::{max_groups_frame, sample_frame};
use std::hint::black_box;

fn bench_decode(c: &mut Criterion) {
    let typical = codec::encode(&sample_frame());
    let full = codec::encode(&max_groups_frame());

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(FRAME_SIZE as u64));

    group.bench_function("typical_frame", |b| {
        b.iter(|| black_box(codec::decode(black_box(&typical))))
    });

    group.bench_function("max_groups_frame", |b| {
        b.iter(|| black_box(codec::decode(black_box(&full))))
    });

    group.finish();
}

fn bench_reject(c: &mut Criterion) {
    let mut wrong_version = codec::encode(&sample_frame());
    wrong_version[..4].copy_from_slice(&23u32.to_be_bytes());
    let short = [0u8; FRAME_SIZE - 8];

    let mut group = c.benchmark_group("reject");

    group.bench_function("short_datagram", |b| {
        b.iter(|| black_box(codec::decode(black_box(&short))))
    });

    group.bench_function("version_mismatch", |b| {
        b.iter(|| black_box(codec::decode(black_box(&wrong_version))))
    });

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let frame = sample_frame();

    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(FRAME_SIZE as u64));
    group.bench_function("typical_frame", |b| b.iter(|| black_box(codec::encode(black_box(&frame)))));
    group.finish();
}

criterion_group!(benches, bench_decode, bench_reject, bench_encode);
criterion_main!(benches);
