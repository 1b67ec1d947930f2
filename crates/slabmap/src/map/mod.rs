//! Ordered map over pool slots
//!
//! [`SlabMap`] keeps caller elements sorted by an embedded key, using an
//! intrusive height-balanced search tree whose nodes are
//! [`SlabPool`](crate::pool::SlabPool) slots. The element lives in the same
//! slot as the node links, so each entry costs one allocation and lookups
//! take one pointer chase per tree level.
//!
//! The key side of an element is described by a [`KeyOps`] implementation;
//! [`Plain`] covers the common case where the element *is* its key.
//!
//! ```
//! use slabmap::map::{Plain, SlabMap};
//!
//! let mut map = SlabMap::<Plain<u16>>::new()?;
//! for key in [3u16, 1, 4, 1, 5] {
//!     map.insert(&key)?;
//! }
//! // `1` was inserted twice but keys are unique:
//! assert_eq!(map.iter().copied().collect::<Vec<_>>(), vec![1, 3, 4, 5]);
//! # Ok::<(), slabmap::MemoryError>(())
//! ```

mod iter;
mod key;
mod node;
mod tree;

pub use iter::Iter;
pub use key::{KeyOps, Plain};
pub use tree::{Cursor, SlabMap};
