//! Demonstration harness: drive a map through a deterministic workload and
//! show ordered iteration, rank-based removal and lower-bound probes.
//!
//! Run with `cargo run --example ordered_keys`.

use slabmap::prelude::*;

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

fn main() -> MemoryResult<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut map = SlabMap::<Plain<u32>>::new()?;
    let mut keys = KeyStream::new();

    println!("inserting 2048 generated keys");
    for _ in 0..2048 {
        let key = keys.next() % 8192;
        map.insert(&key)?;
    }
    println!(
        "map size: {}, blocks: {}, span: {:?}..={:?}",
        map.len(),
        map.pool().block_count(),
        map.first().map(|it| *unsafe { map.element(it) }),
        map.last().map(|it| *unsafe { map.element(it) }),
    );

    println!("removing half of the keys by rank");
    let size = map.len();
    for k in 0..size / 2 {
        let rank = keys.next() as usize % (size - k);
        let mut it = map.first().expect("map cannot be empty here");
        for _ in 0..rank {
            it = unsafe { map.next(it) }.expect("rank stays within the map");
        }
        let key = *unsafe { map.element(it) };
        assert!(map.remove(&key));
    }
    println!("map size: {}", map.len());

    println!("re-inserting {} fresh keys", size / 2);
    for _ in 0..size / 2 {
        let key = keys.next() % 8192;
        map.insert(&key)?;
    }
    println!("map size: {}", map.len());

    println!("lower-bound probes:");
    for probe in [5656u32, 2227, 6031, 893, 8191] {
        match map.lower_bound(&probe) {
            Some(it) => println!("  {:4} -> {:4}", probe, unsafe { map.element(it) }),
            None => println!("  {probe:4} -> (none)"),
        }
    }

    // Ordered iteration, first and last ten entries.
    let contents: Vec<u32> = map.iter().copied().collect();
    println!("first ten: {:?}", &contents[..10.min(contents.len())]);
    println!("last ten:  {:?}", &contents[contents.len().saturating_sub(10)..]);

    Ok(())
}
