//! # slabmap
//!
//! A slab-backed ordered map: an intrusive, height-balanced (AVL) search tree
//! whose nodes live in a pooled block allocator.
//!
//! The crate has two layers:
//! - [`pool::SlabPool`] — a fixed-slot allocator backed by a growing chain of
//!   uniformly sized blocks, with O(1) amortised allocate/free and an O(blocks)
//!   bulk reset.
//! - [`map::SlabMap`] — an ordered associative container over pool slots. Each
//!   slot holds a tree node and the caller's element side by side, so lookups
//!   touch exactly one allocation per node.
//!
//! ## Quick Start
//!
//! ```rust
//! use slabmap::prelude::*;
//!
//! let mut map = SlabMap::<Plain<u32>>::new()?;
//! map.insert(&42)?;
//! map.insert(&7)?;
//! map.insert(&19)?;
//!
//! assert_eq!(map.len(), 3);
//! assert_eq!(map.iter().copied().collect::<Vec<_>>(), vec![7, 19, 42]);
//! assert!(map.remove(&19));
//! assert!(map.get(&19).is_none());
//! # Ok::<(), slabmap::MemoryError>(())
//! ```
//!
//! ## Design
//!
//! - Keys are unique and ordered by a caller-supplied [`map::KeyOps`]
//!   capability record, monomorphised at compile time.
//! - `insert` is the only allocating operation; every other operation is
//!   allocation-free and infallible apart from "not found".
//! - [`map::SlabMap::clear`] resets the pool in O(blocks) and retains the
//!   grown capacity for reuse.
//! - Single-threaded by contract: neither type is `Send` or `Sync`, and no
//!   internal synchronisation exists.

// Pointer-level memory management is the whole point of this crate; the
// workspace-wide `unsafe_code = "warn"` is opted out here.
#![allow(unsafe_code)]
// Explicit lifetimes are clearer in unsafe code even when elidable
#![allow(clippy::elidable_lifetime_names)]
// Pointer casts between block bytes and typed nodes are intentional
#![allow(clippy::cast_ptr_alignment)]

// Error types
pub mod error;

// Core modules
pub mod map;
pub mod pool;
pub mod utils;

pub use error::{MemoryError, MemoryResult};

/// Commonly used types, ready for glob import.
pub mod prelude {
    pub use crate::error::{MemoryError, MemoryResult};
    pub use crate::map::{Cursor, KeyOps, Plain, SlabMap};
    pub use crate::pool::{PoolConfig, SlabPool};
}
