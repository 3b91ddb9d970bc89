//! # Memory Management
//!
//! Three independent allocation strategies for systems that want to avoid
//! per-frame heap traffic.
//!
//! ## Allocators
//!
//! - [`PoolAllocator`]: fixed-size raw blocks, O(1) allocate and free
//! - [`StackAllocator`]: linear scratch memory with marker rollback
//! - [`ObjectPool`]: typed slots that grow in chunks
//!
//! Each allocator guards its state with its own mutex and can be shared
//! across threads.

mod block;
mod buffer;
mod pool;
mod stack;

pub use block::PoolAllocator;
pub use pool::{ObjectPool, PoolHandle, PoolStats};
pub use stack::{ScopedStackAllocation, StackAllocator, StackMarker};
