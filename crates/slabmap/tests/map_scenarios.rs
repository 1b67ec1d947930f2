//! End-to-end map scenarios driven by a fixed deterministic workload.

use std::collections::BTreeSet;

use slabmap::map::{Plain, SlabMap};

type U32Map = SlabMap<Plain<u32>>;

/// Deterministic key generator: x₀ = 17, x ← x·29 + 4294967279 over u64,
/// emitting the low 32 bits.
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

fn contents(map: &U32Map) -> Vec<u32> {
    map.iter().copied().collect()
}

/// Scenarios 1–3 share one generator stream: bulk insert, rank-based
/// removal of half the entries, refill, then lower-bound probes with known
/// answers.
#[test]
fn bulk_insert_remove_refill_and_lower_bounds() {
    let mut map = U32Map::new().unwrap();
    let mut keys = KeyStream::new();
    let mut model = BTreeSet::new();

    // Insert 2048 generated keys.
    for _ in 0..2048 {
        let key = keys.next() % 8192;
        map.insert(&key).unwrap();
        model.insert(key);
    }
    assert_eq!(map.len(), model.len());
    assert_eq!(contents(&map), model.iter().copied().collect::<Vec<_>>());

    // Remove half of the entries, picking each victim by rank.
    let size = map.len();
    for k in 0..size / 2 {
        let rank = keys.next() as usize % (size - k);
        let mut it = map.first().unwrap();
        for _ in 0..rank {
            it = unsafe { map.next(it) }.unwrap();
        }
        let key = *unsafe { map.element(it) };
        assert!(map.remove(&key), "victim key {key} must be present");
        assert!(model.remove(&key));
    }
    assert_eq!(map.len(), size / 2);

    // Refill with fresh keys from the same stream.
    for _ in 0..size / 2 {
        let key = keys.next() % 8192;
        map.insert(&key).unwrap();
        model.insert(key);
    }
    assert_eq!(map.len(), model.len());
    assert_eq!(contents(&map), model.iter().copied().collect::<Vec<_>>());

    // Backward iteration is the exact reverse.
    let mut backward: Vec<u32> = Vec::with_capacity(map.len());
    let mut it = map.last();
    while let Some(cur) = it {
        backward.push(*unsafe { map.element(cur) });
        it = unsafe { map.prev(cur) };
    }
    backward.reverse();
    assert_eq!(backward, contents(&map));

    // Lower-bound probes with answers fixed by the workload above.
    for (probe, expect) in [(5656, 5660), (2227, 2228), (6031, 6031), (893, 896)] {
        let it = map.lower_bound(&probe).expect("bound must exist");
        assert_eq!(*unsafe { map.element(it) }, expect, "lower_bound({probe})");
    }
    assert!(map.lower_bound(&8191).is_none());
}

#[test]
fn empty_map_semantics() {
    let mut map = U32Map::new().unwrap();
    assert!(map.is_empty());
    assert_eq!(map.len(), 0);
    assert!(map.find(&7).is_none());
    assert!(map.get(&7).is_none());
    assert!(map.lower_bound(&7).is_none());
    assert!(map.first().is_none());
    assert!(map.last().is_none());
    assert!(!map.remove(&7));
    assert_eq!(map.iter().count(), 0);
}

#[test]
fn single_entry_semantics() {
    let mut map = U32Map::new().unwrap();
    let it = map.insert(&41).unwrap();

    assert_eq!(map.len(), 1);
    assert_eq!(map.first(), Some(it));
    assert_eq!(map.last(), Some(it));
    assert_eq!(map.find(&41), Some(it));
    assert!(unsafe { map.next(it) }.is_none());
    assert!(unsafe { map.prev(it) }.is_none());

    assert!(map.remove(&41));
    assert!(map.is_empty());
    assert!(map.first().is_none());
}

#[test]
fn cleared_map_is_fully_reusable() {
    let mut map = U32Map::new().unwrap();

    for key in 0..100u32 {
        map.insert(&key).unwrap();
    }
    assert_eq!(map.len(), 100);

    map.clear();
    assert!(map.is_empty());
    assert_eq!(map.len(), 0);
    assert!(map.find(&50).is_none());

    for key in 1000..1100u32 {
        map.insert(&key).unwrap();
    }
    assert_eq!(map.len(), 100);
    assert_eq!(contents(&map), (1000..1100).collect::<Vec<_>>());
}

#[test]
fn clearing_keeps_grown_blocks_for_reuse() {
    let mut map = U32Map::new().unwrap();

    // Grow past one block (128 nodes per block).
    for key in 0..300u32 {
        map.insert(&key).unwrap();
    }
    let blocks = map.pool().block_count();
    assert!(blocks >= 3);

    map.clear();
    assert_eq!(map.pool().block_count(), blocks, "clear must retain blocks");

    // Refilling within the grown capacity allocates no new block.
    for key in 0..300u32 {
        map.insert(&key).unwrap();
    }
    assert_eq!(map.pool().block_count(), blocks);
}

#[test]
fn cursors_survive_unrelated_mutations() {
    let mut map = U32Map::new().unwrap();
    for key in [10u32, 20, 30, 40, 50] {
        map.insert(&key).unwrap();
    }

    let cursor_30 = map.find(&30).unwrap();

    // Inserts may rotate ancestors but never move nodes.
    for key in [5u32, 15, 25, 35, 45, 55] {
        map.insert(&key).unwrap();
    }
    assert_eq!(*unsafe { map.element(cursor_30) }, 30);

    // Removing other entries leaves the cursor valid too.
    assert!(map.remove(&10));
    assert!(map.remove(&50));
    assert_eq!(*unsafe { map.element(cursor_30) }, 30);
    assert_eq!(map.find(&30), Some(cursor_30));
}
