//! # Systems
//!
//! A system is per-frame logic bound to a required [`Signature`](super::Signature).
//! The scheduler keeps the set of entities matching that signature and hands a
//! snapshot of it to [`System::update`] each tick.

use std::fmt;

use super::entity::Entity;
use super::world::World;

/// Handle to a system registered with a [`World`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SystemId(pub(crate) u32);

impl SystemId {
    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system#{}", self.0)
    }
}

/// Per-frame logic run by the scheduler.
///
/// Only [`update`](System::update) is required. The entity hooks run while
/// the world is being mutated; they see the entity's components as they are
/// at that moment (on removal, before the components are dropped). A system
/// is detached while it runs, so changes made from its own `init`, `update`
/// or `shutdown` update its matched set without calling its hooks.
pub trait System: 'static {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Called once before the first update.
    fn init(&mut self, _world: &mut World) {}

    /// Called every tick while enabled.
    ///
    /// # Arguments
    ///
    /// * `world` - The world, for component access and mutation
    /// * `entities` - Entities matching this system's signature, ascending
    /// * `delta_time` - Seconds since the previous tick
    fn update(&mut self, world: &mut World, entities: &[Entity], delta_time: f32);

    /// Called once on world shutdown, in reverse priority order.
    fn shutdown(&mut self, _world: &mut World) {}

    /// An entity started matching this system's signature.
    fn on_entity_added(&mut self, _world: &World, _entity: Entity) {}

    /// An entity stopped matching, or is being destroyed.
    fn on_entity_removed(&mut self, _world: &World, _entity: Entity) {}
}

/// A system built from a closure.
///
/// # Example
///
/// ```rust,ignore
/// let movement = FnSystem::new("movement", |world, entities, dt| {
///     for &entity in entities {
///         let velocity = *world.get::<Velocity>(entity);
///         let position = world.get_mut::<Position>(entity);
///         position.x += velocity.dx * dt;
///     }
/// });
/// ```
pub struct FnSystem<F> {
    name: String,
    update: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&mut World, &[Entity], f32) + 'static,
{
    /// Wraps `update` as a named system.
    pub fn new(name: impl Into<String>, update: F) -> Self {
        Self {
            name: name.into(),
            update,
        }
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut World, &[Entity], f32) + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&mut self, world: &mut World, entities: &[Entity], delta_time: f32) {
        (self.update)(world, entities, delta_time);
    }
}
