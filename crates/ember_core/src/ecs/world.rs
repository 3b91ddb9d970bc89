//! # ECS World
//!
//! The façade that composes the [`EntityDirectory`], the component
//! [`ComponentRegistry`] and the [`SystemScheduler`].
//!
//! Every mutation completes before returning: the store is updated, the
//! entity's signature is rewritten and every system's matched set is
//! reconciled.
//!
//! Destruction order is systems first (hooks still see the components), then
//! the component stores, then the directory.

use std::any::type_name;
use std::collections::BTreeSet;

use super::component::{Component, ComponentTypeId, Name, Tag};
use super::entity::{Entity, EntityDirectory, Signature, MAX_ENTITIES};
use super::query::ComponentSet;
use super::registry::ComponentRegistry;
use super::scheduler::SystemScheduler;
use super::storage::ComponentStore;
use super::system::{System, SystemId};
use crate::config::WorldConfig;
use crate::error::{fatal, precondition_failed, EcsError, EcsResult};

/// The ECS World - container for all entities, components and systems.
///
/// # Example
///
/// ```rust,ignore
/// let mut world = World::new();
/// world.register_component::<Position>();
///
/// let entity = world.create_entity();
/// world.add(entity, Position { x: 1.0, y: 2.0 });
/// world.tick(1.0 / 60.0);
/// ```
pub struct World {
    directory: EntityDirectory,
    components: ComponentRegistry,
    scheduler: SystemScheduler,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a world holding up to [`MAX_ENTITIES`] entities.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_ENTITIES)
    }

    /// Creates a world with the specified entity capacity.
    ///
    /// Every component store shares this capacity.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or not below `u32::MAX`.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            directory: EntityDirectory::new(capacity),
            components: ComponentRegistry::new(capacity),
            scheduler: SystemScheduler::new(),
        }
    }

    /// Creates a world from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the configuration is invalid.
    pub fn from_config(config: &WorldConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self::with_capacity(config.max_entities))
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Maximum number of live entities.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.directory.capacity()
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.directory.live_count()
    }

    /// Checks if an entity is alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.directory.is_alive(entity)
    }

    /// Live entities in ascending id order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.directory.iter_alive()
    }

    /// The set of component types an entity holds.
    #[inline]
    #[must_use]
    pub fn signature(&self, entity: Entity) -> Signature {
        self.directory.signature(entity)
    }

    /// Creates a new entity with no components.
    ///
    /// # Returns
    ///
    /// The entity, or [`Entity::NULL`] if the world is full.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.directory.create();
        if entity.is_null() {
            tracing::warn!(capacity = self.capacity(), "entity pool exhausted");
        }
        entity
    }

    /// Creates an entity carrying a [`Name`] component.
    ///
    /// Registers [`Name`] on first use.
    pub fn create_named_entity(&mut self, name: impl Into<String>) -> Entity {
        let entity = self.create_entity();
        if !entity.is_null() {
            self.set_name(entity, name);
        }
        entity
    }

    /// Destroys an entity and drops all of its components.
    ///
    /// Does nothing if the entity is not alive.
    pub fn destroy_entity(&mut self, entity: Entity) {
        if !self.directory.is_alive(entity) {
            return;
        }

        let signature = self.directory.signature(entity);
        self.with_scheduler(|scheduler, world| scheduler.on_entity_destroyed(world, entity));
        self.components.on_entity_destroyed(entity, signature);
        self.directory.destroy(entity);
    }

    // =========================================================================
    // Component types
    // =========================================================================

    /// Registers a component type.
    ///
    /// Registering a type twice is a programmer error; in release builds the
    /// existing id is returned.
    ///
    /// # Panics
    ///
    /// Panics if all [`MAX_COMPONENTS`](super::MAX_COMPONENTS) ids are taken,
    /// and on double registration in debug builds.
    pub fn register_component<T: Component>(&mut self) -> ComponentTypeId {
        match self.components.register::<T>() {
            Ok(id) => id,
            Err(err @ EcsError::ComponentAlreadyRegistered(_)) => {
                precondition_failed(&err);
                match self.components.id_of::<T>() {
                    Some(id) => id,
                    None => fatal(&err),
                }
            }
            Err(err) => fatal(&err),
        }
    }

    /// Registers a component type.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ComponentAlreadyRegistered`] on double registration
    /// - [`EcsError::TooManyComponentTypes`] if all ids are taken
    pub fn try_register_component<T: Component>(&mut self) -> EcsResult<ComponentTypeId> {
        self.components.register::<T>()
    }

    /// Returns the id assigned to `T`, if registered.
    #[inline]
    #[must_use]
    pub fn component_type_id<T: Component>(&self) -> Option<ComponentTypeId> {
        self.components.id_of::<T>()
    }

    /// Number of registered component types.
    #[inline]
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Combined signature of a component tuple, or `None` if any member is
    /// unregistered.
    #[must_use]
    pub fn signature_of<Q: ComponentSet>(&self) -> Option<Signature> {
        Q::signature(&self.components)
    }

    fn ensure_registered<T: Component>(&mut self) -> ComponentTypeId {
        match self.components.id_of::<T>() {
            Some(id) => id,
            None => self.register_component::<T>(),
        }
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Attaches a component to an entity.
    ///
    /// Adding to a dead entity, adding an unregistered type, or adding a
    /// type the entity already has is a programmer error: fatal in debug
    /// builds, logged and ignored in release builds.
    pub fn add<T: Component>(&mut self, entity: Entity, component: T) {
        if let Err(err) = self.try_add(entity, component) {
            precondition_failed(&err);
        }
    }

    /// Attaches a component to an entity.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ComponentNotRegistered`] if `T` is unregistered
    /// - [`EcsError::EntityNotAlive`] if the entity is dead
    /// - [`EcsError::DuplicateComponent`] if the entity already has a `T`
    /// - [`EcsError::StoreFull`] if `T`'s store is at capacity
    pub fn try_add<T: Component>(&mut self, entity: Entity, component: T) -> EcsResult<()> {
        let id = self
            .components
            .id_of::<T>()
            .ok_or(EcsError::ComponentNotRegistered(type_name::<T>()))?;
        if !self.directory.is_alive(entity) {
            return Err(EcsError::EntityNotAlive(entity));
        }

        self.components
            .store_mut::<T>()
            .ok_or(EcsError::ComponentNotRegistered(type_name::<T>()))?
            .insert(entity, component)?;

        let signature = self.directory.signature(entity).with(id);
        self.directory.set_signature(entity, signature);
        self.with_scheduler(|scheduler, world| {
            scheduler.on_entity_signature_changed(world, entity, signature);
        });

        Ok(())
    }

    /// Detaches a component from an entity.
    ///
    /// Systems that stop matching are notified before the value is dropped.
    ///
    /// # Returns
    ///
    /// The removed component, or `None` if the entity had none (including
    /// dead entities and unregistered types).
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        let id = self.components.id_of::<T>()?;
        if !self.directory.is_alive(entity) || !self.has::<T>(entity) {
            return None;
        }

        let signature = self.directory.signature(entity).without(id);
        self.directory.set_signature(entity, signature);
        self.with_scheduler(|scheduler, world| {
            scheduler.on_entity_signature_changed(world, entity, signature);
        });

        self.components.store_mut::<T>()?.remove(entity)
    }

    /// Gets an entity's component.
    ///
    /// # Panics
    ///
    /// Panics if `T` is unregistered or the entity has no `T`.
    #[must_use]
    #[track_caller]
    pub fn get<T: Component>(&self, entity: Entity) -> &T {
        match self.try_get(entity) {
            Ok(component) => component,
            Err(err) => fatal(&err),
        }
    }

    /// Gets an entity's component.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ComponentNotRegistered`] if `T` is unregistered
    /// - [`EcsError::MissingComponent`] if the entity has no `T`
    pub fn try_get<T: Component>(&self, entity: Entity) -> EcsResult<&T> {
        self.components
            .store::<T>()
            .ok_or(EcsError::ComponentNotRegistered(type_name::<T>()))?
            .get(entity)
            .ok_or(EcsError::MissingComponent {
                entity,
                type_name: type_name::<T>(),
            })
    }

    /// Gets an entity's component mutably.
    ///
    /// # Panics
    ///
    /// Panics if `T` is unregistered or the entity has no `T`.
    #[track_caller]
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> &mut T {
        match self.try_get_mut(entity) {
            Ok(component) => component,
            Err(err) => fatal(&err),
        }
    }

    /// Gets an entity's component mutably.
    ///
    /// # Errors
    ///
    /// Same as [`try_get`](Self::try_get).
    pub fn try_get_mut<T: Component>(&mut self, entity: Entity) -> EcsResult<&mut T> {
        self.components
            .store_mut::<T>()
            .ok_or(EcsError::ComponentNotRegistered(type_name::<T>()))?
            .get_mut(entity)
            .ok_or(EcsError::MissingComponent {
                entity,
                type_name: type_name::<T>(),
            })
    }

    /// Checks whether an entity has a `T`.
    #[inline]
    #[must_use]
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.components
            .store::<T>()
            .is_some_and(|store| store.contains(entity))
    }

    /// The typed store for `T`, if registered.
    #[must_use]
    pub fn store<T: Component>(&self) -> Option<&ComponentStore<T>> {
        self.components.store::<T>()
    }

    /// Raw component data for `T` in slot order, ignoring the entity mapping.
    #[must_use]
    pub fn raw<T: Component>(&self) -> &[T] {
        match self.components.store::<T>() {
            Some(store) => store.as_slice(),
            None => &[],
        }
    }

    /// Number of stored `T` components.
    #[must_use]
    pub fn store_len<T: Component>(&self) -> usize {
        self.components.store::<T>().map_or(0, ComponentStore::len)
    }

    /// Calls `f` for every entity holding all of `Q`'s components, in
    /// ascending entity order.
    ///
    /// Iterates the smallest participating store. Does nothing if any member
    /// of `Q` is unregistered.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// world.for_each::<(Position, Velocity)>(|entity, (position, velocity)| {
    ///     println!("{entity}: {position:?} {velocity:?}");
    /// });
    /// ```
    pub fn for_each<'w, Q: ComponentSet>(&'w self, mut f: impl FnMut(Entity, Q::Item<'w>)) {
        let Some(stores) = Q::stores(&self.components) else {
            return;
        };

        let mut candidates = Q::candidates(stores).to_vec();
        candidates.sort_unstable();

        for entity in candidates {
            if let Some(item) = Q::fetch(stores, entity) {
                f(entity, item);
            }
        }
    }

    /// Calls `f` for every `T` component, mutably, in slot order.
    pub fn for_each_mut<T: Component>(&mut self, mut f: impl FnMut(Entity, &mut T)) {
        if let Some(store) = self.components.store_mut::<T>() {
            for (entity, component) in store.iter_mut() {
                f(entity, component);
            }
        }
    }

    // =========================================================================
    // Names and tags
    // =========================================================================

    /// Sets an entity's [`Name`], registering the type on first use.
    pub fn set_name(&mut self, entity: Entity, name: impl Into<String>) {
        self.ensure_registered::<Name>();
        let name = Name(name.into());
        match self.try_get_mut::<Name>(entity) {
            Ok(existing) => *existing = name,
            Err(_) => self.add(entity, name),
        }
    }

    /// An entity's name, if it has one.
    #[must_use]
    pub fn name(&self, entity: Entity) -> Option<&str> {
        self.try_get::<Name>(entity).ok().map(Name::as_str)
    }

    /// Sets an entity's [`Tag`], registering the type on first use.
    pub fn add_tag(&mut self, entity: Entity, tag: impl Into<String>) {
        self.ensure_registered::<Tag>();
        let tag = Tag(tag.into());
        match self.try_get_mut::<Tag>(entity) {
            Ok(existing) => *existing = tag,
            Err(_) => self.add(entity, tag),
        }
    }

    /// The lowest-id entity with the given name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<Entity> {
        self.components
            .store::<Name>()?
            .iter()
            .filter(|(_, candidate)| candidate.as_str() == name)
            .map(|(entity, _)| entity)
            .min()
    }

    /// Every entity with the given tag, ascending.
    #[must_use]
    pub fn find_by_tag(&self, tag: &str) -> Vec<Entity> {
        let Some(store) = self.components.store::<Tag>() else {
            return Vec::new();
        };

        let mut found: Vec<Entity> = store
            .iter()
            .filter(|(_, candidate)| candidate.as_str() == tag)
            .map(|(entity, _)| entity)
            .collect();
        found.sort_unstable();
        found
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Runs `f` with the scheduler detached so hooks can borrow the world.
    ///
    /// The scheduler is put back even if a hook panics.
    fn with_scheduler<R>(&mut self, f: impl FnOnce(&mut SystemScheduler, &World) -> R) -> R {
        let mut detached = DetachedScheduler {
            scheduler: std::mem::take(&mut self.scheduler),
            world: self,
        };
        f(&mut detached.scheduler, &*detached.world)
    }

    /// Registers a system.
    ///
    /// # Arguments
    ///
    /// * `system` - The system
    /// * `priority` - Lower runs earlier; ties run in registration order
    /// * `signature` - Required components; empty matches nothing
    ///
    /// If the world is already initialized the system's `init` runs now.
    pub fn register_system<S: System>(
        &mut self,
        system: S,
        priority: i32,
        signature: Signature,
    ) -> SystemId {
        let id = self.with_scheduler(|scheduler, world| {
            scheduler.register(world, Box::new(system), priority, signature)
        });

        if self.scheduler.is_initialized() {
            self.run_on(id, false, |system, world, _| system.init(world));
        }
        id
    }

    /// Registers a system requiring every component in `Q`.
    ///
    /// An unregistered member is a programmer error; in release builds the
    /// system is registered with an empty signature and never matches.
    pub fn register_system_for<Q: ComponentSet, S: System>(
        &mut self,
        system: S,
        priority: i32,
    ) -> SystemId {
        let signature = self.signature_of::<Q>().unwrap_or_else(|| {
            precondition_failed(&EcsError::ComponentNotRegistered(type_name::<Q>()));
            Signature::EMPTY
        });
        self.register_system(system, priority, signature)
    }

    /// Replaces a system's required signature and rebuilds its matched set.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownSystem`] for an unknown id.
    pub fn set_system_signature(&mut self, id: SystemId, signature: Signature) -> EcsResult<()> {
        let found = self.with_scheduler(|scheduler, world| {
            scheduler.set_signature(world, id, signature)
        });
        found.then_some(()).ok_or(EcsError::UnknownSystem(id.raw()))
    }

    /// Enables or disables a system. Disabled systems keep their matched set.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownSystem`] for an unknown id.
    pub fn set_system_enabled(&mut self, id: SystemId, enabled: bool) -> EcsResult<()> {
        self.scheduler
            .set_enabled(id, enabled)
            .then_some(())
            .ok_or(EcsError::UnknownSystem(id.raw()))
    }

    /// Changes a system's priority.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownSystem`] for an unknown id.
    pub fn set_system_priority(&mut self, id: SystemId, priority: i32) -> EcsResult<()> {
        self.scheduler
            .set_priority(id, priority)
            .then_some(())
            .ok_or(EcsError::UnknownSystem(id.raw()))
    }

    /// Whether a system is enabled (`None` if unknown).
    #[must_use]
    pub fn is_system_enabled(&self, id: SystemId) -> Option<bool> {
        self.scheduler.is_enabled(id)
    }

    /// A system's matched entities, ascending (`None` if unknown).
    #[must_use]
    pub fn matched_entities(&self, id: SystemId) -> Option<&BTreeSet<Entity>> {
        self.scheduler.matched(id)
    }

    /// Number of registered systems.
    #[inline]
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.scheduler.len()
    }

    /// Whether [`initialize`](Self::initialize) has run.
    #[inline]
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.scheduler.is_initialized()
    }

    fn run_on(
        &mut self,
        id: SystemId,
        only_enabled: bool,
        f: impl FnOnce(&mut dyn System, &mut World, &[Entity]),
    ) {
        let Some((system, entities)) = self.scheduler.take(id, only_enabled) else {
            return;
        };
        let mut detached = DetachedSystem {
            id,
            system: Some(system),
            world: self,
        };
        if let Some(system) = detached.system.as_mut() {
            f(system.as_mut(), &mut *detached.world, &entities);
        }
    }

    /// Runs every system's `init` in priority order. Idempotent.
    pub fn initialize(&mut self) {
        if self.scheduler.is_initialized() {
            return;
        }
        self.scheduler.set_initialized(true);

        for id in self.scheduler.ids() {
            self.run_on(id, false, |system, world, _| system.init(world));
        }
        tracing::debug!(systems = self.scheduler.len(), "world initialized");
    }

    /// Runs every enabled system once, in ascending priority.
    ///
    /// Initializes the world first if needed.
    pub fn tick(&mut self, delta_time: f32) {
        self.initialize();

        for id in self.scheduler.ids() {
            self.run_on(id, true, |system, world, entities| {
                system.update(world, entities, delta_time);
            });
        }
    }

    /// Runs every system's `shutdown` in reverse priority order.
    ///
    /// Systems stay registered; the next [`tick`](Self::tick) initializes
    /// them again. Does nothing if the world was never initialized.
    pub fn shutdown(&mut self) {
        if !self.scheduler.is_initialized() {
            return;
        }

        for id in self.scheduler.ids().into_iter().rev() {
            self.run_on(id, false, |system, world, _| system.shutdown(world));
        }
        self.scheduler.set_initialized(false);
        tracing::debug!("world shut down");
    }

    /// Shuts down, then destroys every system, store and entity.
    pub fn reset(&mut self) {
        self.shutdown();
        self.scheduler.clear();
        self.components.clear();
        self.directory.reset();
    }
}

// ============================================================================
// UNWIND GUARDS
// ============================================================================

/// Returns a detached scheduler to its world on drop.
struct DetachedScheduler<'w> {
    world: &'w mut World,
    scheduler: SystemScheduler,
}

impl Drop for DetachedScheduler<'_> {
    fn drop(&mut self) {
        self.world.scheduler = std::mem::take(&mut self.scheduler);
    }
}

/// Returns a running system to its slot on drop.
struct DetachedSystem<'w> {
    world: &'w mut World,
    id: SystemId,
    system: Option<Box<dyn System>>,
}

impl Drop for DetachedSystem<'_> {
    fn drop(&mut self) {
        if let Some(system) = self.system.take() {
            self.world.scheduler.restore(self.id, system);
        }
    }
}
