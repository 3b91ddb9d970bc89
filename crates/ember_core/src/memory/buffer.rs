//! Aligned heap buffer shared by the block pool and the stack allocator.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use crate::error::{AllocError, AllocResult};

/// An owned, aligned, uninitialized byte buffer.
pub(crate) struct RawBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
}

// SAFETY: RawBuffer uniquely owns its allocation; callers hand out disjoint
// regions under their own locks.
unsafe impl Send for RawBuffer {}
// SAFETY: see above; the buffer itself exposes only its base pointer.
unsafe impl Sync for RawBuffer {}

impl RawBuffer {
    /// Allocates `size` bytes aligned to `align`.
    pub(crate) fn new(size: usize, align: usize) -> AllocResult<Self> {
        if size == 0 {
            return Err(AllocError::Zero("buffer size"));
        }
        if !align.is_power_of_two() {
            return Err(AllocError::InvalidAlignment(align));
        }
        let layout = Layout::from_size_align(size, align)
            .map_err(|_| AllocError::LayoutOverflow { size, count: 1 })?;

        // SAFETY: layout has a non-zero size.
        let raw = unsafe { alloc::alloc(layout) };
        let ptr = NonNull::new(raw).ok_or(AllocError::OutOfMemory(size))?;

        Ok(Self { ptr, layout })
    }

    #[inline]
    pub(crate) const fn len(&self) -> usize {
        self.layout.size()
    }

    #[cfg(test)]
    #[inline]
    pub(crate) const fn align(&self) -> usize {
        self.layout.align()
    }

    #[inline]
    pub(crate) fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// Pointer to byte `offset`.
    ///
    /// # Safety
    ///
    /// `offset` must be at most `len()`.
    #[inline]
    pub(crate) unsafe fn at(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset <= self.len());
        // SAFETY: offset stays within (or one past) the allocation.
        unsafe { NonNull::new_unchecked(self.ptr.as_ptr().add(offset)) }
    }

    /// Offset of `ptr` within the buffer, if it points inside it.
    #[inline]
    pub(crate) fn offset_of(&self, ptr: NonNull<u8>) -> Option<usize> {
        let addr = ptr.as_ptr() as usize;
        let offset = addr.checked_sub(self.addr())?;
        (offset < self.len()).then_some(offset)
    }
}

impl Drop for RawBuffer {
    fn drop(&mut self) {
        // SAFETY: ptr was allocated in `new` with this exact layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) };
    }
}
