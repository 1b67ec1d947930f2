//! Pool configuration

use core::mem;

/// Configuration for a [`SlabPool`](super::SlabPool).
///
/// Validation happens at pool creation, not here: `block_size` and
/// `element_size` must be at least 1 and `element_align` must be a power of
/// two, or [`SlabPool::new`](super::SlabPool::new) rejects the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of slots per block.
    pub block_size: usize,
    /// Size of each slot in bytes.
    pub element_size: usize,
    /// Required slot alignment; the pool raises it to the block header's
    /// alignment if that is stricter.
    pub element_align: usize,
}

impl PoolConfig {
    /// Creates a configuration from explicit slot geometry.
    pub const fn new(block_size: usize, element_size: usize, element_align: usize) -> Self {
        Self { block_size, element_size, element_align }
    }

    /// Creates a configuration sized for values of type `T`.
    pub const fn for_type<T>(block_size: usize) -> Self {
        Self {
            block_size,
            element_size: mem::size_of::<T>(),
            element_align: mem::align_of::<T>(),
        }
    }
}
