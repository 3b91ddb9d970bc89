//! # Entity Component System
//!
//! Dense entity ids, packed per-type component stores and signature-driven
//! system dispatch.
//!
//! ## Design Philosophy
//!
//! - Entity ids are dense indices drawn from a fixed pool and recycled FIFO
//! - Each component type lives in its own packed array (swap-on-remove)
//! - A 64-bit signature per entity records which types it holds
//! - Systems declare a required signature; the scheduler tracks which
//!   entities match and runs systems in priority order

mod component;
mod entity;
mod query;
mod registry;
mod scheduler;
mod storage;
mod system;
mod world;

pub use component::{Component, ComponentTypeId, Name, Tag};
pub use entity::{Entity, EntityDirectory, Signature, MAX_COMPONENTS, MAX_ENTITIES};
pub use query::ComponentSet;
pub use registry::ComponentRegistry;
pub use scheduler::{signature_matches, SystemScheduler};
pub use storage::{ComponentStore, ErasedStore};
pub use system::{FnSystem, System, SystemId};
pub use world::World;
