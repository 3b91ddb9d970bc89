//! # Ember Core
//!
//! Entity Component System runtime and allocators:
//! - Dense entity ids with per-entity component signatures
//! - Packed per-type component stores with swap-on-remove
//! - Signature-matched systems run in priority order
//! - Block pool, stack and object pool allocators
//!
//! ## Architecture Rules
//!
//! 1. **Single-threaded ECS** - `World` has no internal locking
//! 2. **Mutations complete before returning** - stores, signatures and
//!    system matched sets never disagree between calls
//! 3. **Programmer errors are loud in debug** - the `try_*` forms report them
//!    as [`EcsError`] instead
//!
//! ## Example
//!
//! ```rust,ignore
//! use ember_core::{Component, FnSystem, World};
//!
//! struct Position { x: f32, y: f32 }
//! impl Component for Position {}
//!
//! let mut world = World::new();
//! world.register_component::<Position>();
//! let entity = world.create_entity();
//! world.add(entity, Position { x: 0.0, y: 0.0 });
//! world.tick(1.0 / 60.0);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;

pub use config::WorldConfig;
pub use ecs::{
    Component, ComponentRegistry, ComponentSet, ComponentStore, ComponentTypeId, Entity,
    EntityDirectory, ErasedStore, FnSystem, Name, Signature, System, SystemId, SystemScheduler,
    Tag, World, MAX_COMPONENTS, MAX_ENTITIES,
};
pub use error::{AllocError, AllocResult, EcsError, EcsResult};
pub use memory::{
    ObjectPool, PoolAllocator, PoolHandle, PoolStats, ScopedStackAllocation, StackAllocator,
    StackMarker,
};
