//! # ECS Error Types
//!
//! Precondition failures of the ECS. The `try_*` operations on
//! [`World`](crate::World) return them; the infallible forms treat them as
//! programmer errors.

use thiserror::Error;

use crate::ecs::Entity;

/// Errors that can occur in the ECS.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The component type was never registered with this world.
    #[error("component type {0} is not registered")]
    ComponentNotRegistered(&'static str),

    /// The component type was registered twice.
    #[error("component type {0} is already registered")]
    ComponentAlreadyRegistered(&'static str),

    /// Every one of the signature's bits is already assigned.
    #[error("cannot register {type_name}: all {max} component type ids are in use")]
    TooManyComponentTypes {
        /// The type that failed to register.
        type_name: &'static str,
        /// Width of the signature.
        max: usize,
    },

    /// The entity id is not alive.
    #[error("entity {0} is not alive")]
    EntityNotAlive(Entity),

    /// The entity already holds a component of this type.
    #[error("entity {entity} already has component {type_name}")]
    DuplicateComponent {
        /// The entity.
        entity: Entity,
        /// The component type.
        type_name: &'static str,
    },

    /// The entity does not hold a component of this type.
    #[error("entity {entity} has no component {type_name}")]
    MissingComponent {
        /// The entity.
        entity: Entity,
        /// The component type.
        type_name: &'static str,
    },

    /// The component store is at capacity.
    #[error("component store {type_name} is full (capacity {capacity})")]
    StoreFull {
        /// The component type.
        type_name: &'static str,
        /// Store capacity.
        capacity: usize,
    },

    /// The system id does not name a registered system.
    #[error("unknown system {0}")]
    UnknownSystem(u32),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;

/// Reports a violated precondition.
///
/// Fatal in debug builds; logged and otherwise ignored in release builds.
#[track_caller]
pub(crate) fn precondition_failed(err: &EcsError) {
    tracing::error!(error = %err, "ecs precondition violated");
    if cfg!(debug_assertions) {
        panic!("{err}");
    }
}

/// Reports a violated precondition that leaves no value to return.
#[track_caller]
pub(crate) fn fatal(err: &EcsError) -> ! {
    tracing::error!(error = %err, "ecs precondition violated");
    panic!("{err}");
}

/// Errors from allocator construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// A size or count argument was zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// The alignment is not a power of two.
    #[error("alignment {0} is not a power of two")]
    InvalidAlignment(usize),

    /// The total size does not fit a valid layout.
    #[error("allocation of {count} x {size} bytes overflows")]
    LayoutOverflow {
        /// Bytes per element.
        size: usize,
        /// Number of elements.
        count: usize,
    },

    /// The system allocator returned null.
    #[error("out of memory allocating {0} bytes")]
    OutOfMemory(usize),
}

/// Result type for allocator construction.
pub type AllocResult<T> = Result<T, AllocError>;
