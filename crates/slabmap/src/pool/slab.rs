//! Slab pool implementation
//!
//! # Safety
//!
//! This module implements a single-threaded fixed-slot allocator:
//! - Blocks are raw allocations laid out as header, slot-pointer stack,
//!   padding, slot array; all blocks of a pool share one `Layout`.
//! - Available slot addresses live in per-block LIFO stacks; a
//!   `(current, index)` cursor names the next address to hand out.
//! - Handed-out slots are disjoint from every stack entry; their union is
//!   the full slot set of the chain.
//!
//! ## Invariants
//!
//! - `index` stays in `[0, block_size]`; `index == block_size` means the
//!   cursor block is exhausted.
//! - Blocks behind the cursor hold only consumed stack entries; blocks ahead
//!   of it hold fully populated stacks.
//! - The chain only grows (at the tail) or is torn down whole.

use core::alloc::Layout;
use core::cmp;
use core::fmt;
use core::mem::{self, MaybeUninit};
use core::ptr::{self, NonNull};
use std::alloc::{alloc, dealloc};

use tracing::{debug, trace};

use super::PoolConfig;
use crate::error::{MemoryError, MemoryResult};
use crate::utils::checked_align_up;

/// Head of one block allocation. The slot-pointer stack follows immediately
/// after this header; the slot array starts at the pool's `slots_offset`.
#[repr(C)]
struct BlockHeader {
    prev: *mut BlockHeader,
    next: *mut BlockHeader,
}

/// Pooled allocator for fixed-size slots.
///
/// All slots of a pool have the same size and alignment, fixed at creation.
/// Allocation pops an address from the cursor block's stack; freeing pushes
/// the address back, so a free immediately followed by an allocation returns
/// the same slot. The chain of blocks is retained until the pool is dropped;
/// [`reset`](Self::reset) rewinds the cursor and refills every stack without
/// releasing memory.
///
/// The pool is single-threaded by contract and is deliberately neither `Send`
/// nor `Sync`.
pub struct SlabPool {
    /// Slots per block.
    block_size: usize,
    /// Bytes per slot.
    element_size: usize,
    /// Byte offset of the slot array within a block.
    slots_offset: usize,
    /// Size and alignment of every block allocation.
    block_layout: Layout,
    /// Cursor: next stack entry to hand out from `current`.
    index: usize,
    current: *mut BlockHeader,
    head: *mut BlockHeader,
    tail: *mut BlockHeader,
}

impl SlabPool {
    /// Size of the pool object itself; upper bound for in-place storage.
    pub const OBJECT_SIZE: usize = mem::size_of::<Self>();
    /// Alignment of the pool object itself.
    pub const OBJECT_ALIGN: usize = mem::align_of::<Self>();

    /// Creates a pool from `cfg` without allocating any block yet.
    ///
    /// # Errors
    ///
    /// - [`MemoryError::InvalidConfig`] if `block_size` or `element_size`
    ///   is zero;
    /// - [`MemoryError::InvalidAlignment`] if `element_align` is not a power
    ///   of two;
    /// - [`MemoryError::SizeOverflow`] if the per-block layout cannot be
    ///   computed without wrapping.
    pub fn new(cfg: PoolConfig) -> MemoryResult<Self> {
        if cfg.block_size == 0 {
            return Err(MemoryError::InvalidConfig { reason: "block_size must be at least 1" });
        }
        if cfg.element_size == 0 {
            return Err(MemoryError::InvalidConfig { reason: "element_size must be at least 1" });
        }
        if !cfg.element_align.is_power_of_two() {
            return Err(MemoryError::InvalidAlignment { alignment: cfg.element_align });
        }

        let align = cmp::max(cfg.element_align, mem::align_of::<BlockHeader>());

        let stack_bytes = cfg
            .block_size
            .checked_mul(mem::size_of::<*mut u8>())
            .ok_or(MemoryError::SizeOverflow { operation: "slot-pointer stack size" })?;
        let element_bytes = cfg
            .block_size
            .checked_mul(cfg.element_size)
            .ok_or(MemoryError::SizeOverflow { operation: "slot array size" })?;

        let size = mem::size_of::<BlockHeader>()
            .checked_add(stack_bytes)
            .and_then(|size| checked_align_up(size, align))
            .ok_or(MemoryError::SizeOverflow { operation: "slot array offset" })?;
        let slots_offset = size;

        let size = size
            .checked_add(element_bytes)
            .and_then(|size| checked_align_up(size, align))
            .ok_or(MemoryError::SizeOverflow { operation: "block allocation size" })?;

        let block_layout = Layout::from_size_align(size, align)
            .map_err(|_| MemoryError::SizeOverflow { operation: "block layout" })?;

        debug!(
            block_size = cfg.block_size,
            element_size = cfg.element_size,
            align,
            block_bytes = block_layout.size(),
            "created slab pool"
        );

        Ok(Self {
            block_size: cfg.block_size,
            element_size: cfg.element_size,
            slots_offset,
            block_layout,
            index: 0,
            current: ptr::null_mut(),
            head: ptr::null_mut(),
            tail: ptr::null_mut(),
        })
    }

    /// Creates a pool directly inside caller-provided storage.
    ///
    /// The caller retains ownership of `storage` and is responsible for
    /// tearing the pool down with [`MaybeUninit::assume_init_drop`] once it
    /// is no longer used.
    pub fn new_in_place<'a>(
        cfg: PoolConfig,
        storage: &'a mut MaybeUninit<Self>,
    ) -> MemoryResult<&'a mut Self> {
        Ok(storage.write(Self::new(cfg)?))
    }

    /// Hands out one slot, growing the chain when the cursor runs off its
    /// end.
    ///
    /// # Errors
    ///
    /// [`MemoryError::AllocationFailed`] if a new block is needed and the
    /// allocation fails; the pool is left unchanged in that case.
    pub fn allocate(&mut self) -> MemoryResult<NonNull<u8>> {
        unsafe {
            if self.head.is_null() {
                let block = self.append_block()?;
                self.head = block;
                self.tail = block;
                self.current = block;
                self.index = 0;
            }

            if self.index == self.block_size {
                let next = (*self.current).next;
                if next.is_null() {
                    let block = self.append_block()?;
                    self.tail = block;
                    self.current = block;
                } else {
                    self.current = next;
                }
                self.index = 0;
            }

            let slot = *Self::slot_stack(self.current).add(self.index);
            self.index += 1;
            // SAFETY: stacks only ever hold addresses of slots inside blocks.
            Ok(NonNull::new_unchecked(slot))
        }
    }

    /// Returns a slot to the pool.
    ///
    /// # Safety
    ///
    /// `slot` must have been returned by [`allocate`](Self::allocate) on this
    /// pool and must not have been freed since.
    pub unsafe fn deallocate(&mut self, slot: NonNull<u8>) {
        debug_assert!(self.owns(slot.as_ptr()), "slot does not belong to this pool");
        unsafe {
            if self.index == 0 {
                let prev = (*self.current).prev;
                debug_assert!(!prev.is_null(), "more slots freed than allocated");
                self.current = prev;
                self.index = self.block_size;
            }
            self.index -= 1;
            Self::slot_stack(self.current).add(self.index).write(slot.as_ptr());
        }
    }

    /// Makes every slot available again while keeping all blocks.
    ///
    /// The cursor rewinds to the first block and every stack is rebuilt to
    /// enumerate its block's slots in natural order.
    ///
    /// # Safety
    ///
    /// All previously handed-out slots become dangling; the caller must not
    /// use them afterwards.
    pub unsafe fn reset(&mut self) {
        unsafe {
            self.index = 0;
            self.current = self.head;
            let mut block = self.head;
            while !block.is_null() {
                Self::refill_stack(block, self.slots_offset, self.block_size, self.element_size);
                block = (*block).next;
            }
        }
        trace!("slab pool reset; blocks retained");
    }

    /// Slots per block, as configured.
    pub fn slots_per_block(&self) -> usize {
        self.block_size
    }

    /// Bytes per slot, as configured.
    pub fn slot_size(&self) -> usize {
        self.element_size
    }

    /// Effective slot alignment (configured alignment raised to the header's).
    pub fn slot_align(&self) -> usize {
        self.block_layout.align()
    }

    /// Number of blocks currently in the chain.
    pub fn block_count(&self) -> usize {
        let mut count = 0;
        let mut block = self.head;
        while !block.is_null() {
            count += 1;
            // SAFETY: the chain links only ever point at live blocks.
            block = unsafe { (*block).next };
        }
        count
    }

    /// Total slot capacity of the chain.
    pub fn capacity(&self) -> usize {
        self.block_count() * self.block_size
    }

    /// Whether `slot` lies on a slot boundary of one of this pool's blocks.
    fn owns(&self, slot: *const u8) -> bool {
        let addr = slot as usize;
        let mut block = self.head;
        while !block.is_null() {
            unsafe {
                let base = block.cast::<u8>().add(self.slots_offset) as usize;
                if addr >= base
                    && addr < base + self.block_size * self.element_size
                    && (addr - base) % self.element_size == 0
                {
                    return true;
                }
                block = (*block).next;
            }
        }
        false
    }

    /// Allocates one block, links it behind the current tail and populates
    /// its stack. Does not update `head`/`tail`/`current`.
    unsafe fn append_block(&mut self) -> MemoryResult<*mut BlockHeader> {
        // SAFETY: block_layout covers at least the header, so it is non-zero.
        let bytes = unsafe { alloc(self.block_layout) };
        if bytes.is_null() {
            return Err(MemoryError::AllocationFailed {
                size: self.block_layout.size(),
                align: self.block_layout.align(),
            });
        }

        let block = bytes.cast::<BlockHeader>();
        unsafe {
            (*block).prev = self.tail;
            (*block).next = ptr::null_mut();
            if !self.tail.is_null() {
                (*self.tail).next = block;
            }
            Self::refill_stack(block, self.slots_offset, self.block_size, self.element_size);
        }

        trace!(bytes = self.block_layout.size(), "slab pool grew by one block");
        Ok(block)
    }

    /// Rebuilds `block`'s stack so it lists all of the block's slots in
    /// natural order.
    unsafe fn refill_stack(
        block: *mut BlockHeader,
        slots_offset: usize,
        block_size: usize,
        element_size: usize,
    ) {
        unsafe {
            let stack = Self::slot_stack(block);
            let mut slot = block.cast::<u8>().add(slots_offset);
            for entry in 0..block_size {
                stack.add(entry).write(slot);
                slot = slot.add(element_size);
            }
        }
    }

    /// The slot-pointer stack sitting right behind a block's header.
    unsafe fn slot_stack(block: *mut BlockHeader) -> *mut *mut u8 {
        unsafe { block.cast::<u8>().add(mem::size_of::<BlockHeader>()).cast::<*mut u8>() }
    }
}

impl Drop for SlabPool {
    fn drop(&mut self) {
        let mut block = self.head;
        while !block.is_null() {
            // SAFETY: every chain entry came from `alloc` with `block_layout`
            // and is released exactly once here.
            unsafe {
                let next = (*block).next;
                dealloc(block.cast::<u8>(), self.block_layout);
                block = next;
            }
        }
    }
}

impl fmt::Debug for SlabPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlabPool")
            .field("block_size", &self.block_size)
            .field("element_size", &self.element_size)
            .field("blocks", &self.block_count())
            .finish_non_exhaustive()
    }
}
