use benchmark::channel::*;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

pub fn bench_create_destroy(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel/create_destroy");
    group.bench_function("gochan", |b| b.iter(create_destroy_gochan));
    group.bench_function("std", |b| b.iter(create_destroy_std));
    group.finish();
}

pub fn bench_buffered_same_thread(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel/buffered_same_thread");
    group.bench_function("gochan", |b| b.iter(|| buffered_same_thread_gochan(black_box(1_000))));
    group.bench_function("std", |b| b.iter(|| buffered_same_thread_std(black_box(1_000))));
    group.finish();
}

pub fn bench_ping_pong_unbuffered(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel/ping_pong_unbuffered");
    group.bench_function("gochan", |b| b.iter(|| ping_pong_gochan(black_box(1_000), 0)));
    group.bench_function("std", |b| b.iter(|| ping_pong_std(black_box(1_000), 0)));
    group.finish();
}

pub fn bench_ping_pong_buffered(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel/ping_pong_buffered");
    group.bench_function("gochan", |b| b.iter(|| ping_pong_gochan(black_box(1_000), 64)));
    group.bench_function("std", |b| b.iter(|| ping_pong_std(black_box(1_000), 64)));
    group.finish();
}

pub fn bench_fan_in(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel/fan_in");
    group.bench_function("gochan", |b| b.iter(|| fan_in_gochan(black_box(8), black_box(250))));
    group.finish();
}

criterion_group!(
    benches,
    bench_create_destroy,
    bench_buffered_same_thread,
    bench_ping_pong_unbuffered,
    bench_ping_pong_buffered,
    bench_fan_in,
);
criterion_main!(benches);
