//! # Stack Allocator
//!
//! A bump allocator with LIFO rollback for per-frame scratch memory.
//!
//! Allocation advances a single offset. [`StackAllocator::marker`] snapshots
//! the offset and [`StackAllocator::pop`] rolls back to it, freeing every
//! allocation made since in O(1).

#![allow(unsafe_code)]

use std::mem::{align_of, size_of};
use std::ops::Deref;
use std::ptr::NonNull;

use bytemuck::Zeroable;
use parking_lot::Mutex;

use super::buffer::RawBuffer;
use crate::error::AllocResult;

/// Snapshot of a [`StackAllocator`]'s offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StackMarker(usize);

impl StackMarker {
    /// The empty-stack marker.
    pub const ZERO: Self = Self(0);

    /// Offset in bytes from the start of the buffer.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> usize {
        self.0
    }
}

/// A thread-safe linear allocator with marker-based rollback.
///
/// Allocation never aborts: running out of space returns `None`.
///
/// # Example
///
/// ```rust,ignore
/// let stack = StackAllocator::new(64 * 1024, 16)?;
///
/// {
///     let scope = stack.scope();
///     let scratch = scope.push_typed::<[f32; 4]>(256).expect("out of scratch");
///     // ... use scratch ...
/// } // rolled back here
/// ```
pub struct StackAllocator {
    buffer: RawBuffer,
    offset: Mutex<usize>,
}

impl StackAllocator {
    /// Creates a stack of `capacity` bytes whose base is aligned to `alignment`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`](crate::AllocError) for a zero capacity, a bad
    /// alignment, or allocation failure.
    pub fn new(capacity: usize, alignment: usize) -> AllocResult<Self> {
        let buffer = RawBuffer::new(capacity, alignment)?;
        tracing::debug!(capacity, alignment, "stack allocator created");
        Ok(Self {
            buffer,
            offset: Mutex::new(0),
        })
    }

    /// Total size in bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes in use, including alignment padding.
    #[inline]
    #[must_use]
    pub fn used(&self) -> usize {
        *self.offset.lock()
    }

    /// Bytes still available.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity() - self.used()
    }

    /// Allocates `size` bytes aligned to `align`.
    ///
    /// # Returns
    ///
    /// The start of the region, or `None` if it does not fit or `align` is
    /// not a power of two.
    pub fn push(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        if !align.is_power_of_two() {
            debug_assert!(false, "alignment {align} is not a power of two");
            return None;
        }

        let mut offset = self.offset.lock();
        let base = self.buffer.addr();
        let start = (base + *offset).checked_next_multiple_of(align)? - base;
        let end = start.checked_add(size)?;
        if end > self.capacity() {
            return None;
        }

        *offset = end;
        // SAFETY: start <= end <= capacity.
        Some(unsafe { self.buffer.at(start) })
    }

    /// Like [`push`](Self::push), with the region zero-filled.
    pub fn push_zeroed(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        let ptr = self.push(size, align)?;
        // SAFETY: push reserved `size` bytes at `ptr` for this caller.
        unsafe { ptr.as_ptr().write_bytes(0, size) };
        Some(ptr)
    }

    /// Allocates a zeroed array of `count` values of `T`.
    ///
    /// An all-zero `T` is valid, so the slice is initialized. It stays valid
    /// until the stack is popped below it.
    pub fn push_typed<T: Zeroable>(&self, count: usize) -> Option<NonNull<[T]>> {
        let size = size_of::<T>().checked_mul(count)?;
        let ptr = self.push_zeroed(size, align_of::<T>())?;
        Some(NonNull::slice_from_raw_parts(ptr.cast::<T>(), count))
    }

    /// Snapshots the current offset.
    #[inline]
    #[must_use]
    pub fn marker(&self) -> StackMarker {
        StackMarker(*self.offset.lock())
    }

    /// Rolls back to `marker`, freeing everything allocated after it.
    ///
    /// A marker beyond the current offset is a programmer error: fatal in
    /// debug builds, logged and ignored in release builds.
    pub fn pop(&self, marker: StackMarker) {
        let mut offset = self.offset.lock();
        if marker.0 > *offset {
            tracing::error!(marker = marker.0, offset = *offset, "stack marker beyond top");
            debug_assert!(false, "stack marker {} beyond top {}", marker.0, *offset);
            return;
        }
        *offset = marker.0;
    }

    /// Frees everything.
    #[inline]
    pub fn clear(&self) {
        self.pop(StackMarker::ZERO);
    }

    /// Opens a scope that rolls back to the current offset when dropped.
    #[must_use]
    pub fn scope(&self) -> ScopedStackAllocation<'_> {
        ScopedStackAllocation {
            stack: self,
            marker: self.marker(),
        }
    }
}

/// Guard returned by [`StackAllocator::scope`].
///
/// Pops back to the marker taken at creation on every exit path, including
/// unwinding.
pub struct ScopedStackAllocation<'a> {
    stack: &'a StackAllocator,
    marker: StackMarker,
}

impl ScopedStackAllocation<'_> {
    /// The marker this scope returns to.
    #[inline]
    #[must_use]
    pub const fn marker(&self) -> StackMarker {
        self.marker
    }
}

impl Deref for ScopedStackAllocation<'_> {
    type Target = StackAllocator;

    fn deref(&self) -> &StackAllocator {
        self.stack
    }
}

impl Drop for ScopedStackAllocation<'_> {
    fn drop(&mut self) {
        self.stack.pop(self.marker);
    }
}
