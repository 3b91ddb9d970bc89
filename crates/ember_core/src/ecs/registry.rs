//! # Component Type Registry
//!
//! Maps Rust component types to their [`ComponentTypeId`] and store.
//!
//! - Types are keyed by [`TypeId`]
//! - Ids are handed out sequentially in `[0, MAX_COMPONENTS)`
//! - Stores are created on registration and live until [`clear`](ComponentRegistry::clear)

use std::any::{type_name, TypeId};
use std::collections::HashMap;

use super::component::{Component, ComponentTypeId};
use super::entity::{Entity, Signature, MAX_COMPONENTS};
use super::storage::{ComponentStore, ErasedStore};
use crate::error::{EcsError, EcsResult};

/// Registry of component types and their stores.
pub struct ComponentRegistry {
    /// Rust type -> component type id.
    ids: HashMap<TypeId, ComponentTypeId>,
    /// Stores indexed by component type id.
    stores: Vec<Box<dyn ErasedStore>>,
    /// Capacity of every store.
    store_capacity: usize,
}

impl ComponentRegistry {
    /// Creates an empty registry whose stores hold `store_capacity` components.
    #[must_use]
    pub fn new(store_capacity: usize) -> Self {
        Self {
            ids: HashMap::new(),
            stores: Vec::with_capacity(MAX_COMPONENTS),
            store_capacity,
        }
    }

    /// Registers `C`, creating its store.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ComponentAlreadyRegistered`] if `C` was registered before
    /// - [`EcsError::TooManyComponentTypes`] if all ids are taken
    pub fn register<C: Component>(&mut self) -> EcsResult<ComponentTypeId> {
        if self.ids.contains_key(&TypeId::of::<C>()) {
            return Err(EcsError::ComponentAlreadyRegistered(type_name::<C>()));
        }

        let next = self.stores.len();
        if next >= MAX_COMPONENTS {
            return Err(EcsError::TooManyComponentTypes {
                type_name: type_name::<C>(),
                max: MAX_COMPONENTS,
            });
        }

        // next < MAX_COMPONENTS (64) always fits in a u8
        #[allow(clippy::cast_possible_truncation)]
        let id = ComponentTypeId::new(next as u8);
        self.stores
            .push(Box::new(ComponentStore::<C>::new(self.store_capacity)));
        self.ids.insert(TypeId::of::<C>(), id);

        Ok(id)
    }

    /// Returns the id assigned to `C`, if registered.
    #[inline]
    #[must_use]
    pub fn id_of<C: Component>(&self) -> Option<ComponentTypeId> {
        self.ids.get(&TypeId::of::<C>()).copied()
    }

    /// Number of registered component types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Returns `true` if no type is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Typed store for `C`.
    #[must_use]
    pub fn store<C: Component>(&self) -> Option<&ComponentStore<C>> {
        let id = self.id_of::<C>()?;
        self.stores[id.index()]
            .as_any()
            .downcast_ref::<ComponentStore<C>>()
    }

    /// Typed mutable store for `C`.
    pub fn store_mut<C: Component>(&mut self) -> Option<&mut ComponentStore<C>> {
        let id = self.id_of::<C>()?;
        self.stores[id.index()]
            .as_any_mut()
            .downcast_mut::<ComponentStore<C>>()
    }

    /// Type-erased store by id.
    #[must_use]
    pub fn erased(&self, id: ComponentTypeId) -> Option<&dyn ErasedStore> {
        self.stores.get(id.index()).map(|store| &**store)
    }

    /// Drops the entity's components from every store named in `signature`.
    pub fn on_entity_destroyed(&mut self, entity: Entity, signature: Signature) {
        for (index, store) in self.stores.iter_mut().enumerate() {
            if signature.bits() & (1 << index) != 0 {
                store.on_entity_destroyed(entity);
            }
        }
    }

    /// Destroys every store and forgets every type.
    pub fn clear(&mut self) {
        self.stores.clear();
        self.ids.clear();
    }
}
