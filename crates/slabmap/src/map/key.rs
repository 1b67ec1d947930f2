//! Key capability record
//!
//! A [`SlabMap`](super::SlabMap) never inspects element bytes itself; it goes
//! through a [`KeyOps`] implementation chosen at compile time. This keeps the
//! map generic over how keys are stored inside elements without paying for
//! dynamic dispatch.

use core::cmp::Ordering;
use core::marker::PhantomData;
use core::mem::MaybeUninit;

/// How a map writes, reads and orders the keys embedded in its elements.
///
/// # Contract
///
/// - [`compare`](Self::compare) must be a total order (reflexive,
///   antisymmetric, transitive, trichotomous) and stable for the lifetime of
///   inserted elements.
/// - [`set_key`](Self::set_key) must initialise the **entire** element, and a
///   following [`key`](Self::key) must return a key comparing equal to the
///   one that was set.
/// - `Element` must not need [`Drop`]: the map releases slots without running
///   destructors so that clearing stays O(blocks).
pub trait KeyOps {
    /// The caller's element type, stored in-line with each tree node.
    type Element;
    /// The key type embedded in an element.
    type Key: ?Sized;

    /// Writes `key` into a freshly allocated element, initialising all of it.
    fn set_key(slot: &mut MaybeUninit<Self::Element>, key: &Self::Key);

    /// Reads the key back out of a live element.
    fn key(element: &Self::Element) -> &Self::Key;

    /// Three-way comparison defining the map order.
    fn compare(a: &Self::Key, b: &Self::Key) -> Ordering;
}

/// The simplest adapter: the element *is* the key.
///
/// ```
/// use slabmap::prelude::*;
///
/// let mut map = SlabMap::<Plain<i64>>::new()?;
/// map.insert(&-3)?;
/// assert!(map.contains_key(&-3));
/// # Ok::<(), slabmap::MemoryError>(())
/// ```
pub struct Plain<T>(PhantomData<T>);

impl<T: Ord + Clone> KeyOps for Plain<T> {
    type Element = T;
    type Key = T;

    fn set_key(slot: &mut MaybeUninit<T>, key: &T) {
        slot.write(key.clone());
    }

    fn key(element: &T) -> &T {
        element
    }

    fn compare(a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}
