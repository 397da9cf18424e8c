//! Performance benchmarks for safemap
//!
//! Compares `ConcurrentMap` against the two hand-rolled alternatives callers
//! usually write themselves: `Mutex<HashMap>` and `std::sync::RwLock<HashMap>`.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use safemap::ConcurrentMap;
use std::collections::HashMap;
use std::sync::{Arc, Barrier, Mutex, RwLock};
use std::thread;

const MAP_SIZES: [usize; 3] = [100, 1_000, 10_000];
const OPERATIONS_PER_THREAD: usize = 10_000;
const NUM_THREADS: usize = 4;

fn bench_single_thread(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_thread");

    for &size in MAP_SIZES.iter() {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("safemap_insert", size), &size, |b, &size| {
            b.iter(|| {
                let map = ConcurrentMap::with_capacity(size);
                for i in 0..size {
                    map.insert(black_box(i), i);
                }
                map
            })
        });

        group.bench_with_input(BenchmarkId::new("safemap_get", size), &size, |b, &size| {
            let map: ConcurrentMap<usize, usize> = (0..size).map(|i| (i, i)).collect();
            b.iter(|| {
                for i in 0..size {
                    black_box(map.get(&i));
                }
            })
        });

        group.bench_with_input(BenchmarkId::new("safemap_for_each", size), &size, |b, &size| {
            let map: ConcurrentMap<usize, usize> = (0..size).map(|i| (i, i)).collect();
            b.iter(|| {
                let mut sum = 0;
                map.for_each(|_, v| sum += v);
                black_box(sum)
            })
        });

        group.bench_with_input(BenchmarkId::new("std_rwlock_get", size), &size, |b, &size| {
            let map: RwLock<HashMap<usize, usize>> =
                RwLock::new((0..size).map(|i| (i, i)).collect());
            b.iter(|| {
                for i in 0..size {
                    black_box(map.read().unwrap().get(&i).copied());
                }
            })
        });
    }

    group.finish();
}

/// Run `NUM_THREADS` threads doing `reads_per_write` reads for every write
fn run_mixed<R, W>(reads_per_write: usize, read: R, write: W)
where
    R: Fn(usize) + Send + Sync + 'static,
    W: Fn(usize) + Send + Sync + 'static,
{
    let read = Arc::new(read);
    let write = Arc::new(write);
    let barrier = Arc::new(Barrier::new(NUM_THREADS));

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|t| {
            let read = Arc::clone(&read);
            let write = Arc::clone(&write);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..OPERATIONS_PER_THREAD {
                    let key = (t * OPERATIONS_PER_THREAD + i) % 1_000;
                    if i % (reads_per_write + 1) == 0 {
                        write(key);
                    } else {
                        read(key);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

fn bench_mixed_workload(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_workload");
    group.throughput(Throughput::Elements((NUM_THREADS * OPERATIONS_PER_THREAD) as u64));

    for &reads_per_write in [1usize, 9, 99].iter() {
        group.bench_with_input(
            BenchmarkId::new("safemap", reads_per_write),
            &reads_per_write,
            |b, &ratio| {
                b.iter(|| {
                    let map = Arc::new(ConcurrentMap::<usize, usize>::with_capacity(1_000));
                    let reader = Arc::clone(&map);
                    run_mixed(
                        ratio,
                        move |k| {
                            black_box(reader.get(&k));
                        },
                        move |k| {
                            map.insert(k, k);
                        },
                    );
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("std_mutex", reads_per_write),
            &reads_per_write,
            |b, &ratio| {
                b.iter(|| {
                    let map = Arc::new(Mutex::new(HashMap::<usize, usize>::with_capacity(1_000)));
                    let reader = Arc::clone(&map);
                    run_mixed(
                        ratio,
                        move |k| {
                            black_box(reader.lock().unwrap().get(&k).copied());
                        },
                        move |k| {
                            map.lock().unwrap().insert(k, k);
                        },
                    );
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("std_rwlock", reads_per_write),
            &reads_per_write,
            |b, &ratio| {
                b.iter(|| {
                    let map = Arc::new(RwLock::new(HashMap::<usize, usize>::with_capacity(1_000)));
                    let reader = Arc::clone(&map);
                    run_mixed(
                        ratio,
                        move |k| {
                            black_box(reader.read().unwrap().get(&k).copied());
                        },
                        move |k| {
                            map.write().unwrap().insert(k, k);
                        },
                    );
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_single_thread, bench_mixed_workload);
criterion_main!(benches);
