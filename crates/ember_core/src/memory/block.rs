//! # Block Pool Allocator
//!
//! Fixed-size blocks carved from one aligned buffer.
//!
//! Free blocks form a singly linked list threaded through their own first
//! word, so the allocator needs no side storage for the list. Block `i`
//! starts at `i * stride`, where the stride is the block size rounded up to
//! the alignment and to at least one word.

#![allow(unsafe_code)]

use std::mem::size_of;
use std::ptr::NonNull;

use parking_lot::Mutex;

use super::buffer::RawBuffer;
use crate::error::{AllocError, AllocResult};

/// End-of-list marker stored in a free block's link word.
const END: usize = usize::MAX;

struct FreeList {
    /// Index of the first free block.
    head: usize,
    free_count: usize,
    /// Per-block allocation flag, used to reject foreign and double frees.
    allocated: Vec<bool>,
}

/// A thread-safe allocator of fixed-size, aligned memory blocks.
///
/// # Example
///
/// ```rust,ignore
/// let pool = PoolAllocator::new(64, 1024, 16)?;
///
/// let block = pool.allocate().expect("pool exhausted");
/// // ... write up to 64 bytes through `block` ...
/// pool.deallocate(block);
/// ```
pub struct PoolAllocator {
    buffer: RawBuffer,
    block_size: usize,
    stride: usize,
    block_count: usize,
    free: Mutex<FreeList>,
}

impl PoolAllocator {
    /// Creates a pool of `block_count` blocks of `block_size` bytes.
    ///
    /// # Arguments
    ///
    /// * `block_size` - Usable bytes per block
    /// * `block_count` - Number of blocks
    /// * `alignment` - Alignment of every block, a power of two
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] for zero sizes, a bad alignment, an
    /// overflowing total size, or allocation failure.
    pub fn new(block_size: usize, block_count: usize, alignment: usize) -> AllocResult<Self> {
        if block_size == 0 {
            return Err(AllocError::Zero("block size"));
        }
        if block_count == 0 {
            return Err(AllocError::Zero("block count"));
        }
        if !alignment.is_power_of_two() {
            return Err(AllocError::InvalidAlignment(alignment));
        }

        let overflow = AllocError::LayoutOverflow {
            size: block_size,
            count: block_count,
        };
        let stride = block_size
            .max(size_of::<usize>())
            .checked_next_multiple_of(alignment)
            .ok_or_else(|| overflow.clone())?;
        let total = stride.checked_mul(block_count).ok_or(overflow)?;

        let pool = Self {
            buffer: RawBuffer::new(total, alignment)?,
            block_size,
            stride,
            block_count,
            free: Mutex::new(FreeList {
                head: END,
                free_count: 0,
                allocated: vec![false; block_count],
            }),
        };
        pool.reset();

        tracing::debug!(block_size, block_count, stride, "block pool created");
        Ok(pool)
    }

    /// Usable bytes per block.
    #[inline]
    #[must_use]
    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    /// Total number of blocks.
    #[inline]
    #[must_use]
    pub const fn block_count(&self) -> usize {
        self.block_count
    }

    /// Distance in bytes between consecutive blocks.
    #[inline]
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.stride
    }

    /// Number of blocks currently free.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.lock().free_count
    }

    fn block_ptr(&self, index: usize) -> NonNull<u8> {
        debug_assert!(index < self.block_count);
        // SAFETY: index < block_count, so the offset lies inside the buffer.
        unsafe { self.buffer.at(index * self.stride) }
    }

    fn read_link(&self, index: usize) -> usize {
        let ptr = self.block_ptr(index).cast::<usize>();
        // SAFETY: every block holds at least one word; the link may be unaligned.
        unsafe { ptr.as_ptr().read_unaligned() }
    }

    fn write_link(&self, index: usize, next: usize) {
        let ptr = self.block_ptr(index).cast::<usize>();
        // SAFETY: as in `read_link`; the block is free, so nobody else uses it.
        unsafe { ptr.as_ptr().write_unaligned(next) }
    }

    /// Pops a free block in O(1).
    ///
    /// # Returns
    ///
    /// The block, or `None` if the pool is exhausted.
    pub fn allocate(&self) -> Option<NonNull<u8>> {
        let mut free = self.free.lock();
        if free.head == END {
            return None;
        }

        let index = free.head;
        free.head = self.read_link(index);
        free.free_count -= 1;
        free.allocated[index] = true;

        Some(self.block_ptr(index))
    }

    /// Returns a block to the pool in O(1).
    ///
    /// Freeing a pointer this pool did not hand out, or freeing it twice, is
    /// a programmer error: fatal in debug builds, logged and ignored in
    /// release builds.
    pub fn deallocate(&self, block: NonNull<u8>) {
        let Some(index) = self.index_of(block) else {
            tracing::error!(?block, "block does not belong to this pool");
            debug_assert!(false, "block {block:?} does not belong to this pool");
            return;
        };

        let mut free = self.free.lock();
        if !free.allocated[index] {
            tracing::error!(index, "block freed twice");
            debug_assert!(false, "block {index} freed twice");
            return;
        }

        self.write_link(index, free.head);
        free.head = index;
        free.free_count += 1;
        free.allocated[index] = false;
    }

    /// Checks whether `ptr` is the start of one of this pool's blocks.
    #[must_use]
    pub fn contains(&self, ptr: NonNull<u8>) -> bool {
        self.index_of(ptr).is_some()
    }

    fn index_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        let offset = self.buffer.offset_of(ptr)?;
        (offset % self.stride == 0).then_some(offset / self.stride)
    }

    /// Frees every block at once.
    ///
    /// Outstanding blocks become invalid; no destructors run. The first
    /// allocation afterwards returns the lowest-address block.
    pub fn reset(&self) {
        let mut free = self.free.lock();
        for index in 0..self.block_count {
            let next = if index + 1 < self.block_count { index + 1 } else { END };
            self.write_link(index, next);
        }
        free.head = 0;
        free.free_count = self.block_count;
        free.allocated.fill(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_first_allocation_is_lowest_block() {
        let pool = PoolAllocator::new(32, 4, 16).unwrap();
        let first = pool.allocate().unwrap();
        let second = pool.allocate().unwrap();
        assert!(first < second);
        assert_eq!(first.as_ptr() as usize % 16, 0);
        assert_eq!(second.as_ptr() as usize - first.as_ptr() as usize, 32);
    }

    #[test]
    fn test_exhaustion_and_reuse() {
        let pool = PoolAllocator::new(8, 3, 8).unwrap();
        let blocks: Vec<_> = (0..3).map(|_| pool.allocate().unwrap()).collect();
        assert!(pool.allocate().is_none());
        assert_eq!(pool.free_count(), 0);

        pool.deallocate(blocks[1]);
        assert_eq!(pool.allocate(), Some(blocks[1]));
    }

    #[test]
    fn test_small_blocks_hold_a_link() {
        let pool = PoolAllocator::new(1, 5, 1).unwrap();
        assert_eq!(pool.stride(), size_of::<usize>());

        let distinct: HashSet<_> = (0..5).map(|_| pool.allocate().unwrap()).collect();
        assert_eq!(distinct.len(), 5);
    }

    #[test]
    fn test_reset_restores_every_block() {
        let pool = PoolAllocator::new(16, 4, 8).unwrap();
        let first = pool.allocate().unwrap();
        pool.allocate().unwrap();

        pool.reset();
        assert_eq!(pool.free_count(), 4);
        assert_eq!(pool.allocate(), Some(first));
    }

    #[test]
    fn test_contains() {
        let pool = PoolAllocator::new(16, 2, 16).unwrap();
        let block = pool.allocate().unwrap();
        assert!(pool.contains(block));

        let inside = NonNull::new(block.as_ptr().wrapping_add(1)).unwrap();
        assert!(!pool.contains(inside));

        let mut outside = 0u64;
        assert!(!pool.contains(NonNull::from(&mut outside).cast()));
    }

    #[test]
    fn test_constructor_errors() {
        assert!(matches!(PoolAllocator::new(0, 1, 8), Err(AllocError::Zero(_))));
        assert!(matches!(PoolAllocator::new(8, 0, 8), Err(AllocError::Zero(_))));
        assert!(matches!(
            PoolAllocator::new(8, 1, 12),
            Err(AllocError::InvalidAlignment(12))
        ));
        assert!(matches!(
            PoolAllocator::new(usize::MAX / 2, 4, 8),
            Err(AllocError::LayoutOverflow { .. })
        ));
    }
}
