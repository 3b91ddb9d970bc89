//! # Ember Resources
//!
//! Handle-based view of external assets:
//! - One reference-counted entry per canonical path
//! - Synchronous loads, and asynchronous loads on worker threads with a
//!   bounded number running at once
//! - Optional hot-reload driven by file modification times
//!
//! ## Architecture Rules
//!
//! 1. **`tick` never blocks** - finished loads are polled, not waited on
//! 2. **Callbacks run on the ticking thread** - outside every registry lock
//! 3. **Failures leave the cache unchanged** - a failed reload keeps the
//!    previous data
//!
//! ## Example
//!
//! ```rust,ignore
//! use ember_resources::{RegistryConfig, ResourceKind, ResourceRegistry};
//!
//! let registry = ResourceRegistry::new(RegistryConfig::development())?;
//! let shader = registry.load_async("shaders/lit.spv", ResourceKind::Unknown, |handle, outcome| {
//!     println!("{handle}: {outcome:?}");
//! });
//! loop {
//!     registry.tick();
//!     // ...
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod fs;
pub mod handle;
pub mod kind;
pub mod loader;
pub mod registry;

pub use config::RegistryConfig;
pub use error::{ResourceError, ResourceResult};
pub use fs::{FileSystem, MemoryFileSystem, StdFileSystem};
pub use handle::{ResourceGuard, ResourceHandle};
pub use kind::ResourceKind;
pub use loader::{read_bytes, LoadedResource, RawLoader, ResourceLoader, TomlLoader};
pub use registry::{
    LoadCallback, LoadOutcome, LoadState, RegistryStats, ResourceInfo, ResourceRegistry,
};
