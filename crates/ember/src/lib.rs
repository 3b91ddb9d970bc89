//! # Ember
//!
//! Engine core: the ECS runtime and allocators from [`ember_core`], the
//! resource registry from [`ember_resources`], and the [`FrameLoop`] that
//! drives both.
//!
//! ## Modules
//!
//! - `config`: one TOML document for world, registry and frame timing
//! - `frame_loop`: per-frame orchestration and timing
//!
//! ## Example
//!
//! ```rust,ignore
//! use ember::{EngineConfig, FnSystem, FrameLoop};
//!
//! let config = EngineConfig::from_toml_file("engine.toml")?;
//! let mut frames = FrameLoop::from_config(&config)?;
//! frames.world_mut().register_component::<Sprite>();
//!
//! let registry = std::sync::Arc::clone(frames.registry());
//! frames.world_mut().register_system_for::<(Sprite,), _>(
//!     FnSystem::new("draw", move |world, entities, _dt| {
//!         for &entity in entities {
//!             let texture = registry.get(world.get::<Sprite>(entity).texture);
//!             // ...
//!         }
//!     }),
//!     0,
//! );
//!
//! loop {
//!     frames.frame();
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod frame_loop;

pub use ember_core as core;
pub use ember_resources as resources;

pub use config::{EngineConfig, FrameLoopConfig};
pub use error::{EngineError, EngineResult};
pub use frame_loop::{FrameLoop, FrameStats, FrameStatsAccumulator};

pub use ember_core::{Component, Entity, FnSystem, Signature, System, SystemId, World};
pub use ember_resources::{
    LoadOutcome, RegistryConfig, ResourceHandle, ResourceKind, ResourceRegistry,
};
