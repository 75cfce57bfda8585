//! Benchmarks for chunk encoding and range reads
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use replay_rs::{codec, FrameStore, MemorySource, ReplaySession, ReplaySettings, StreamKind, Vec3};

fn frames(n: usize) -> Vec<Vec3> {
    (0..n)
        .map(|i| Vec3::new(i as f32, (i as f32).sin(), (i as f32).cos()))
        .collect()
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_codec");

    for size in [1_000, 10_000, 100_000].iter() {
        let records = frames(*size);
        let bytes = codec::encode(&records);
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_with_input(BenchmarkId::new("encode", size), &records, |b, records| {
            b.iter(|| codec::encode(black_box(records)));
        });

        group.bench_with_input(BenchmarkId::new("decode", size), &bytes, |b, bytes| {
            b.iter(|| codec::decode::<Vec3>(black_box(bytes)));
        });
    }

    group.finish();
}

fn bench_read_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_range");
    let dir = tempfile::tempdir().expect("tempdir");

    let mut store: FrameStore<Vec3> =
        FrameStore::open(dir.path(), StreamKind::Position).expect("open store");
    for chunk in frames(100_000).chunks(1_000) {
        store.append(chunk).expect("append chunk");
    }

    for start in [0usize, 50_000, 99_000].iter() {
        group.bench_with_input(BenchmarkId::new("window_1000", start), start, |b, &start| {
            b.iter(|| store.read_range(black_box(start), 1_000, &[]));
        });
    }

    group.finish();
}

fn bench_replay_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay_tick");

    for buffer_size in [100usize, 1_000].iter() {
        group.bench_with_input(
            BenchmarkId::new("sliding_window", buffer_size),
            buffer_size,
            |b, &buffer_size| {
                let settings = ReplaySettings::default()
                    .with_loop(true)
                    .with_buffer_size(buffer_size);
                let mut replay = ReplaySession::with_source(
                    "bench",
                    settings,
                    MemorySource::new(frames(10_000), 0.01),
                    |v: Vec3| {
                        black_box(v);
                    },
                );
                replay.load().expect("load");
                replay.play().expect("play");
                b.iter(|| replay.tick(black_box(1.0 / 60.0)));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_codec, bench_read_range, bench_replay_tick);
criterion_main!(benches);
