//! The ordered map.
//!
//! # Safety
//!
//! Nodes are pool slots addressed by raw pointers; `parent` links exist for
//! upward walks only and are never followed while releasing memory. All
//! rebalancing happens on the way up from the mutation point:
//!
//! - after an insert, the walk stops as soon as a balance factor becomes 0
//!   (the subtree height did not change) and a single rebalancing rotation
//!   always ends it;
//! - after a removal, the walk stops on ±1 and continues through rotations
//!   that leave the new subtree root at 0, since those shrink the subtree.

use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;
use core::mem::{self, MaybeUninit};
use core::ptr::{self, NonNull};

use tracing::trace;

use super::iter::Iter;
use super::key::KeyOps;
use super::node::Node;
use crate::error::MemoryResult;
use crate::pool::{PoolConfig, SlabPool};

/// Pool slots per block; fixed for all maps.
const NODES_PER_BLOCK: usize = 128;

/// Direction of a rebalancing walk.
#[derive(Clone, Copy)]
enum Retrace {
    Insert,
    Remove,
}

/// A handle to a live map entry.
///
/// Cursors are plain copyable references into the tree: they stay valid
/// across any operation that does not remove the entry they name. Inserts
/// never invalidate cursors (rotations relink nodes but never move them);
/// removing an entry invalidates only cursors naming it; [`SlabMap::clear`]
/// invalidates all of them. Dereferencing a cursor goes through the unsafe
/// accessors on [`SlabMap`], which spell out that contract.
pub struct Cursor<A: KeyOps> {
    node: NonNull<Node<A::Element>>,
    _ops: PhantomData<A>,
}

impl<A: KeyOps> Cursor<A> {
    fn from_ptr(node: *mut Node<A::Element>) -> Option<Self> {
        NonNull::new(node).map(|node| Self { node, _ops: PhantomData })
    }

    /// Precondition: `node` is non-null.
    unsafe fn from_ptr_unchecked(node: *mut Node<A::Element>) -> Self {
        Self {
            // SAFETY: guaranteed non-null by the caller.
            node: unsafe { NonNull::new_unchecked(node) },
            _ops: PhantomData,
        }
    }

    fn as_ptr(self) -> *mut Node<A::Element> {
        self.node.as_ptr()
    }
}

impl<A: KeyOps> Clone for Cursor<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A: KeyOps> Copy for Cursor<A> {}

impl<A: KeyOps> PartialEq for Cursor<A> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl<A: KeyOps> Eq for Cursor<A> {}

impl<A: KeyOps> fmt::Debug for Cursor<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor({:p})", self.node.as_ptr())
    }
}

/// An ordered associative container backed by a [`SlabPool`].
///
/// Keys are unique under `A`'s ordering; every entry occupies exactly one
/// pool slot holding the node links and the element side by side. Lookups,
/// inserts and removals are O(log n); stepping a cursor is O(1) amortised;
/// [`clear`](Self::clear) is O(blocks) and keeps the grown capacity.
///
/// `insert` is the only operation that can allocate, and on allocation
/// failure the map is left untouched.
pub struct SlabMap<A: KeyOps> {
    pool: SlabPool,
    root: *mut Node<A::Element>,
    len: usize,
    _ops: PhantomData<A>,
}

impl<A: KeyOps> SlabMap<A> {
    /// Size of the map object itself; upper bound for in-place storage.
    pub const OBJECT_SIZE: usize = mem::size_of::<Self>();
    /// Alignment of the map object itself.
    pub const OBJECT_ALIGN: usize = mem::align_of::<Self>();

    /// Creates an empty map. No block is allocated until the first insert.
    ///
    /// # Errors
    ///
    /// [`MemoryError::SizeOverflow`](crate::MemoryError::SizeOverflow) if the
    /// per-block layout for this element type cannot be computed.
    pub fn new() -> MemoryResult<Self> {
        const {
            assert!(
                !mem::needs_drop::<A::Element>(),
                "slab map elements must not need Drop: slots are released without \
                 running destructors"
            );
        }

        let pool = SlabPool::new(PoolConfig::for_type::<Node<A::Element>>(NODES_PER_BLOCK))?;
        Ok(Self {
            pool,
            root: ptr::null_mut(),
            len: 0,
            _ops: PhantomData,
        })
    }

    /// Creates a map directly inside caller-provided storage.
    ///
    /// The caller retains ownership of `storage` and tears the map down with
    /// [`MaybeUninit::assume_init_drop`] when done.
    pub fn new_in_place<'a>(storage: &'a mut MaybeUninit<Self>) -> MemoryResult<&'a mut Self> {
        Ok(storage.write(Self::new()?))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.root.is_null()
    }

    /// Read-only view of the backing pool, mainly for capacity inspection.
    pub fn pool(&self) -> &SlabPool {
        &self.pool
    }

    /// Removes all entries in O(blocks), retaining the pool's capacity.
    ///
    /// All cursors become invalid.
    pub fn clear(&mut self) {
        // SAFETY: the root is dropped below, so no node pointer survives.
        unsafe { self.pool.reset() };
        self.root = ptr::null_mut();
        self.len = 0;
        trace!("slab map cleared");
    }

    /// Inserts `key`, or finds it if already present.
    ///
    /// Returns a cursor to the (new or existing) entry. An insert of an
    /// existing key does not touch the tree. On allocation failure the map
    /// is unchanged.
    pub fn insert(&mut self, key: &A::Key) -> MemoryResult<Cursor<A>> {
        if self.root.is_null() {
            let node = self.alloc_node(key)?;
            self.root = node;
            self.len += 1;
            // SAFETY: freshly allocated, non-null.
            return Ok(unsafe { Cursor::from_ptr_unchecked(node) });
        }

        unsafe {
            // Descend to the closest node.
            let mut node = self.root;
            let mut child;
            loop {
                match A::compare(key, A::key((*node).element.assume_init_ref())) {
                    Ordering::Equal => return Ok(Cursor::from_ptr_unchecked(node)),
                    Ordering::Less => child = 0,
                    Ordering::Greater => child = 1,
                }
                let next = (*node).children[child];
                if next.is_null() {
                    break;
                }
                node = next;
            }

            let inserted = self.alloc_node(key)?;
            Node::link(node, inserted, child);
            self.retrace(node, child, Retrace::Insert);
            self.len += 1;
            Ok(Cursor::from_ptr_unchecked(inserted))
        }
    }

    /// Removes `key` if present; `false` when it was not in the map.
    pub fn remove(&mut self, key: &A::Key) -> bool {
        match self.find(key) {
            // SAFETY: the cursor was just produced by `find` on this map.
            Some(it) => {
                unsafe { self.remove_at(it) };
                true
            }
            None => false,
        }
    }

    /// Removes the entry a cursor names.
    ///
    /// # Safety
    ///
    /// `it` must name a live entry of this map. The cursor (and any copy of
    /// it) is invalid afterwards; all other cursors survive.
    pub unsafe fn remove_at(&mut self, it: Cursor<A>) {
        let node = it.as_ptr();
        unsafe {
            let child = Node::child_index(node);

            if (*node).children[0].is_null() || (*node).children[1].is_null() {
                // At most one child: splice the node out.
                let next = if (*node).children[0].is_null() {
                    (*node).children[1]
                } else {
                    (*node).children[0]
                };

                if ptr::eq(self.root, node) {
                    self.root = next;
                    if !next.is_null() {
                        (*next).parent = ptr::null_mut();
                    }
                } else {
                    Node::link((*node).parent, next, child);
                    self.retrace((*node).parent, child, Retrace::Remove);
                }
            } else {
                // Two children: substitute the in-order successor, then
                // rebalance from the lowest point whose subtree changed.
                let next = Node::leftmost((*node).children[1]);

                if ptr::eq(self.root, node) {
                    self.root = next;
                }

                Node::link(next, (*node).children[0], 0);
                (*next).balance = (*node).balance;

                if ptr::eq((*next).parent, node) {
                    Node::link((*node).parent, next, child);
                    self.retrace(next, 1, Retrace::Remove);
                } else {
                    let next_parent = (*next).parent;
                    let next_child = Node::child_index(next);

                    Node::link(next_parent, (*next).children[1], next_child);
                    Node::link((*node).parent, next, child);
                    Node::link(next, (*node).children[1], 1);
                    self.retrace(next_parent, next_child, Retrace::Remove);
                }
            }

            self.pool.deallocate(NonNull::new_unchecked(node.cast::<u8>()));
        }
        self.len -= 1;
    }

    /// Finds the entry with exactly `key`.
    pub fn find(&self, key: &A::Key) -> Option<Cursor<A>> {
        let mut node = self.root;
        unsafe {
            while !node.is_null() {
                match A::compare(key, A::key((*node).element.assume_init_ref())) {
                    Ordering::Equal => break,
                    Ordering::Less => node = (*node).children[0],
                    Ordering::Greater => node = (*node).children[1],
                }
            }
        }
        Cursor::from_ptr(node)
    }

    /// Finds the least entry whose key is `>= key`, or `None` when every key
    /// is smaller (or the map is empty).
    pub fn lower_bound(&self, key: &A::Key) -> Option<Cursor<A>> {
        unsafe {
            let mut node = self.root;
            let mut prev = node;
            while !node.is_null() {
                match A::compare(key, A::key((*node).element.assume_init_ref())) {
                    Ordering::Equal => return Cursor::from_ptr(node),
                    Ordering::Less => {
                        prev = node;
                        node = (*node).children[0];
                    }
                    Ordering::Greater => {
                        prev = node;
                        node = (*node).children[1];
                    }
                }
            }
            if prev.is_null() {
                return None;
            }
            if A::compare(key, A::key((*prev).element.assume_init_ref())) == Ordering::Less {
                Cursor::from_ptr(prev)
            } else {
                Cursor::from_ptr(Node::successor(prev))
            }
        }
    }

    /// Cursor to the least entry.
    pub fn first(&self) -> Option<Cursor<A>> {
        Cursor::from_ptr(self.first_node())
    }

    /// Cursor to the greatest entry.
    pub fn last(&self) -> Option<Cursor<A>> {
        Cursor::from_ptr(self.last_node())
    }

    /// Steps a cursor to its in-order successor; `None` past the last entry.
    ///
    /// # Safety
    ///
    /// `it` must name a live entry of this map.
    pub unsafe fn next(&self, it: Cursor<A>) -> Option<Cursor<A>> {
        unsafe { Cursor::from_ptr(Node::successor(it.as_ptr())) }
    }

    /// Steps a cursor to its in-order predecessor; `None` before the first
    /// entry.
    ///
    /// # Safety
    ///
    /// `it` must name a live entry of this map.
    pub unsafe fn prev(&self, it: Cursor<A>) -> Option<Cursor<A>> {
        unsafe { Cursor::from_ptr(Node::predecessor(it.as_ptr())) }
    }

    /// Borrows the element a cursor names.
    ///
    /// # Safety
    ///
    /// `it` must name a live entry of this map.
    pub unsafe fn element(&self, it: Cursor<A>) -> &A::Element {
        unsafe { (*it.as_ptr()).element.assume_init_ref() }
    }

    /// Mutably borrows the element a cursor names.
    ///
    /// # Safety
    ///
    /// `it` must name a live entry of this map, and the caller must not
    /// change the element's key relative to `A`'s ordering.
    pub unsafe fn element_mut(&mut self, it: Cursor<A>) -> &mut A::Element {
        unsafe { (*it.as_ptr()).element.assume_init_mut() }
    }

    /// Borrows the element stored under `key`.
    pub fn get(&self, key: &A::Key) -> Option<&A::Element> {
        let it = self.find(key)?;
        // SAFETY: the cursor was just produced by `find` on this map.
        Some(unsafe { self.element(it) })
    }

    /// Mutably borrows the element stored under `key`. The caller must not
    /// change the element's key relative to `A`'s ordering.
    pub fn get_mut(&mut self, key: &A::Key) -> Option<&mut A::Element> {
        let it = self.find(key)?;
        // SAFETY: the cursor was just produced by `find` on this map.
        Some(unsafe { self.element_mut(it) })
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &A::Key) -> bool {
        self.find(key).is_some()
    }

    /// In-order iterator over the elements.
    pub fn iter(&self) -> Iter<'_, A> {
        Iter::new(self.first_node(), self.last_node(), self.len)
    }

    fn first_node(&self) -> *mut Node<A::Element> {
        if self.root.is_null() {
            ptr::null_mut()
        } else {
            // SAFETY: non-null root.
            unsafe { Node::leftmost(self.root) }
        }
    }

    fn last_node(&self) -> *mut Node<A::Element> {
        if self.root.is_null() {
            ptr::null_mut()
        } else {
            // SAFETY: non-null root.
            unsafe { Node::rightmost(self.root) }
        }
    }

    /// Allocates a slot, writes the node header and the keyed element.
    fn alloc_node(&mut self, key: &A::Key) -> MemoryResult<*mut Node<A::Element>> {
        let slot = self.pool.allocate()?;
        let node = slot.as_ptr().cast::<Node<A::Element>>();
        // SAFETY: the pool hands out slots sized and aligned for
        // `Node<A::Element>`; `set_key` initialises the whole element.
        unsafe {
            node.write(Node::new());
            A::set_key(&mut (*node).element, key);
        }
        Ok(node)
    }

    /// Walks up from `node` adjusting balance factors after the subtree
    /// under `child` grew (insert) or shrank (remove), rotating where a
    /// factor leaves `{-1, 0, +1}`. Repoints `root` when a rotation
    /// displaced it.
    unsafe fn retrace(&mut self, node: *mut Node<A::Element>, child: usize, kind: Retrace) {
        let mut node = node;
        let mut child = child;
        let mut displaced: *mut Node<A::Element> = ptr::null_mut();

        unsafe {
            while !node.is_null() {
                match kind {
                    Retrace::Insert => {
                        (*node).balance += if child == 0 { -1 } else { 1 };
                        if (*node).balance == 0 {
                            break;
                        }
                    }
                    Retrace::Remove => {
                        (*node).balance += if child == 0 { 1 } else { -1 };
                        if (*node).balance == -1 || (*node).balance == 1 {
                            break;
                        }
                    }
                }

                if (*node).balance < -1 || (*node).balance > 1 {
                    displaced = node;
                    node = Node::rebalance(node);
                    match kind {
                        // An insert rotation restores the old subtree height.
                        Retrace::Insert => break,
                        // A remove rotation that leaves the subtree at 0
                        // shrank it; keep walking.
                        Retrace::Remove => {
                            if (*node).balance != 0 {
                                break;
                            }
                        }
                    }
                }

                child = Node::child_index(node);
                node = (*node).parent;
            }

            if !displaced.is_null() && ptr::eq(self.root, displaced) {
                self.root = (*self.root).parent;
            }
        }
    }
}

impl<A: KeyOps> fmt::Debug for SlabMap<A>
where
    A::Element: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
