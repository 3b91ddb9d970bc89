//! # Object Pool
//!
//! Typed slot pool for objects that are frequently acquired and released.
//!
//! Storage grows in chunks and never shrinks, so a handle stays valid until
//! its value is released or the pool is cleared.

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::error::{AllocError, AllocResult};

/// Handle to an object acquired from an [`ObjectPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    chunk: usize,
    slot: usize,
}

impl PoolHandle {
    /// Index of the chunk holding the object.
    #[inline]
    #[must_use]
    pub const fn chunk(self) -> usize {
        self.chunk
    }

    /// Slot within the chunk.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> usize {
        self.slot
    }
}

/// Occupancy snapshot of an [`ObjectPool`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Objects currently acquired.
    pub active: usize,
    /// Free slots.
    pub free: usize,
    /// Total slots across all chunks (`active + free`).
    pub capacity: usize,
    /// Number of chunks.
    pub chunks: usize,
}

struct PoolInner<T> {
    chunks: Vec<Box<[Option<T>]>>,
    /// Free slots; the last entry is handed out next.
    free: Vec<PoolHandle>,
    active: usize,
}

impl<T> PoolInner<T> {
    fn push_chunk(&mut self, size: usize) {
        let chunk = self.chunks.len();
        self.chunks.push((0..size).map(|_| None).collect());
        self.free
            .extend((0..size).rev().map(|slot| PoolHandle { chunk, slot }));
    }

    fn slot(&self, handle: PoolHandle) -> Option<&T> {
        self.chunks.get(handle.chunk)?.get(handle.slot)?.as_ref()
    }

    fn slot_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.chunks.get_mut(handle.chunk)?.get_mut(handle.slot)?.as_mut()
    }

    fn capacity(&self) -> usize {
        self.chunks.iter().map(|chunk| chunk.len()).sum()
    }
}

/// A thread-safe pool of `T` values.
///
/// # Example
///
/// ```rust,ignore
/// struct Particle { x: f32, y: f32, life: f32 }
///
/// let pool = ObjectPool::new(10_000, true, 1_000)?;
///
/// let handle = pool.acquire(Particle { x: 0.0, y: 0.0, life: 1.0 }).expect("pool full");
/// pool.with_mut(handle, |p| p.life -= 0.1);
/// pool.release(handle);
/// ```
pub struct ObjectPool<T> {
    inner: Mutex<PoolInner<T>>,
    auto_expand: bool,
    expansion_size: usize,
}

impl<T> ObjectPool<T> {
    /// Creates a pool with `initial_capacity` slots.
    ///
    /// # Arguments
    ///
    /// * `initial_capacity` - Slots in the first chunk
    /// * `auto_expand` - Grow when exhausted instead of failing
    /// * `expansion_size` - Slots per additional chunk
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::Zero`] if `initial_capacity` is zero, or if
    /// `expansion_size` is zero while `auto_expand` is set.
    pub fn new(initial_capacity: usize, auto_expand: bool, expansion_size: usize) -> AllocResult<Self> {
        if initial_capacity == 0 {
            return Err(AllocError::Zero("initial capacity"));
        }
        if auto_expand && expansion_size == 0 {
            return Err(AllocError::Zero("expansion size"));
        }

        let mut inner = PoolInner {
            chunks: Vec::new(),
            free: Vec::with_capacity(initial_capacity),
            active: 0,
        };
        inner.push_chunk(initial_capacity);

        Ok(Self {
            inner: Mutex::new(inner),
            auto_expand,
            expansion_size,
        })
    }

    /// Stores `value` in a free slot.
    ///
    /// # Returns
    ///
    /// A handle, or `None` if the pool is exhausted and may not grow.
    pub fn acquire(&self, value: T) -> Option<PoolHandle> {
        self.acquire_with(|| value)
    }

    /// Stores the value built by `init` in a free slot.
    ///
    /// `init` only runs if a slot is available.
    pub fn acquire_with(&self, init: impl FnOnce() -> T) -> Option<PoolHandle> {
        let mut inner = self.inner.lock();

        if inner.free.is_empty() {
            if !self.auto_expand {
                return None;
            }
            inner.push_chunk(self.expansion_size);
            tracing::debug!(
                chunks = inner.chunks.len(),
                capacity = inner.capacity(),
                "object pool expanded"
            );
        }

        let handle = inner.free.pop()?;
        inner.chunks[handle.chunk][handle.slot] = Some(init());
        inner.active += 1;
        Some(handle)
    }

    /// Takes the value out of its slot and frees the slot.
    ///
    /// # Returns
    ///
    /// The value, or `None` if the handle is stale or foreign.
    pub fn release(&self, handle: PoolHandle) -> Option<T> {
        let mut inner = self.inner.lock();
        let value = inner
            .chunks
            .get_mut(handle.chunk)?
            .get_mut(handle.slot)?
            .take()?;
        inner.free.push(handle);
        inner.active -= 1;
        Some(value)
    }

    /// Locks the pool and returns a guard to the value.
    ///
    /// The whole pool stays locked while the guard lives.
    #[must_use]
    pub fn get(&self, handle: PoolHandle) -> Option<MappedMutexGuard<'_, T>> {
        MutexGuard::try_map(self.inner.lock(), |inner| inner.slot_mut(handle)).ok()
    }

    /// Direct access through exclusive ownership, without locking.
    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.inner.get_mut().slot_mut(handle)
    }

    /// Runs `f` on the value under the lock.
    pub fn with<R>(&self, handle: PoolHandle, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.inner.lock().slot(handle).map(f)
    }

    /// Runs `f` on the value mutably under the lock.
    pub fn with_mut<R>(&self, handle: PoolHandle, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.inner.lock().slot_mut(handle).map(f)
    }

    /// Drops every value and frees every slot. Capacity is kept.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;

        inner.free.clear();
        // last pushed is handed out first: chunk 0, slot 0
        for (chunk, slots) in inner.chunks.iter_mut().enumerate().rev() {
            slots.iter_mut().for_each(|slot| *slot = None);
            inner
                .free
                .extend((0..slots.len()).rev().map(|slot| PoolHandle { chunk, slot }));
        }
        inner.active = 0;
    }

    /// Number of acquired objects.
    #[must_use]
    pub fn active(&self) -> usize {
        self.inner.lock().active
    }

    /// Occupancy snapshot.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let inner = self.inner.lock();
        PoolStats {
            active: inner.active,
            free: inner.free.len(),
            capacity: inner.capacity(),
            chunks: inner.chunks.len(),
        }
    }
}
