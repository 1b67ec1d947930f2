//! Criterion benchmarks: slab map against the standard ordered set on the
//! same deterministic workloads.

use std::collections::BTreeSet;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use slabmap::map::{Plain, SlabMap};

const KEYS: usize = 4096;

struct KeyStream {
    x: u64,
}

impl KeyStream {
    fn new() -> Self {
        Self { x: 17 }
    }

    fn next(&mut self) -> u32 {
        self.x = self.x.wrapping_mul(29).wrapping_add(4_294_967_279);
        self.x as u32
    }
}

fn filled_map() -> SlabMap<Plain<u32>> {
    let mut map = SlabMap::<Plain<u32>>::new().unwrap();
    let mut keys = KeyStream::new();
    for _ in 0..KEYS {
        map.insert(&(keys.next() % 65536)).unwrap();
    }
    map
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("slabmap/insert", |b| {
        b.iter(|| {
            let mut map = SlabMap::<Plain<u32>>::new().unwrap();
            let mut keys = KeyStream::new();
            for _ in 0..KEYS {
                let key = keys.next() % 65536;
                map.insert(black_box(&key)).unwrap();
            }
            map.len()
        });
    });

    c.bench_function("btreeset/insert", |b| {
        b.iter(|| {
            let mut set = BTreeSet::new();
            let mut keys = KeyStream::new();
            for _ in 0..KEYS {
                set.insert(black_box(keys.next() % 65536));
            }
            set.len()
        });
    });
}

fn bench_lookup(c: &mut Criterion) {
    let map = filled_map();
    c.bench_function("slabmap/find", |b| {
        b.iter(|| {
            let mut keys = KeyStream::new();
            let mut hits = 0usize;
            for _ in 0..KEYS {
                let key = keys.next() % 65536;
                hits += usize::from(map.contains_key(black_box(&key)));
            }
            hits
        });
    });

    let mut set = BTreeSet::new();
    let mut keys = KeyStream::new();
    for _ in 0..KEYS {
        set.insert(keys.next() % 65536);
    }
    c.bench_function("btreeset/find", |b| {
        b.iter(|| {
            let mut keys = KeyStream::new();
            let mut hits = 0usize;
            for _ in 0..KEYS {
                let key = keys.next() % 65536;
                hits += usize::from(set.contains(black_box(&key)));
            }
            hits
        });
    });
}

fn bench_iterate(c: &mut Criterion) {
    let map = filled_map();
    c.bench_function("slabmap/iterate", |b| {
        b.iter(|| map.iter().copied().fold(0u64, |acc, key| acc + u64::from(key)));
    });

    c.bench_function("slabmap/reinsert_after_clear", |b| {
        let mut map = filled_map();
        b.iter(|| {
            map.clear();
            let mut keys = KeyStream::new();
            for _ in 0..KEYS {
                map.insert(&(keys.next() % 65536)).unwrap();
            }
            map.len()
        });
    });
}

criterion_group!(benches, bench_insert, bench_lookup, bench_iterate);
criterion_main!(benches);
